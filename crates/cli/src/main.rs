use anyhow::{Context, Result, bail};
use clap::Parser;
use smile_preview_core::{
    FrameSource, OutputMode, SmilePreview, StillImageSource, View, WebcamSource,
    capture::list_cameras, config::Config, init,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override the model defined in .env
    #[arg(short, long)]
    model: Option<String>,

    /// Video device index to capture from
    #[arg(long, default_value_t = 0)]
    camera: usize,

    /// Use a still image (or a text file holding a data: URI) instead of the camera
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Capture one frame, transform it, write the result and exit
    #[arg(long)]
    headless: bool,

    /// Where headless mode writes the result (defaults to smile-after.<ext>)
    #[arg(short, long, value_name = "PATH", requires = "headless")]
    output: Option<PathBuf>,

    /// Ask for a description instead of an edited photo
    #[arg(long)]
    text: bool,

    /// List available cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

fn main() -> Result<()> {
    // Setup
    init();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    // Handle --list-cameras
    if args.list_cameras {
        let cameras = list_cameras();
        if cameras.is_empty() {
            println!("No cameras found");
        } else {
            println!("Available cameras:");
            for info in cameras {
                println!("{}", info);
            }
        }
        return Ok(());
    }

    // Load config and apply CLI overrides
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(m) = args.model {
        config.model_name = m;
    }
    if args.text {
        config.output_mode = OutputMode::Text;
    }

    let source: Box<dyn FrameSource> = match &args.image {
        Some(path) => Box::new(
            StillImageSource::from_path(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
        ),
        None => Box::new(WebcamSource::open(args.camera).context(
            "Failed to open camera. Try --list-cameras to check indices, or pass --image",
        )?),
    };
    info!(source = %source.describe(), model = %config.model_name, "Configured");

    let app = SmilePreview::with_config(config);

    if !args.headless {
        app.run_interactive(source)?;
        return Ok(());
    }

    let session = app
        .run_headless(source.as_ref())
        .context("Headless run failed")?;

    match session.view() {
        View::Result => {
            if let Some(image) = session.result_image() {
                let path = args
                    .output
                    .unwrap_or_else(|| PathBuf::from(format!("smile-after.{}", image.extension())));
                std::fs::write(&path, image.bytes())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Saved result to {}", path.display());
            }
            if let Some(text) = session.result_text() {
                println!("{}", text);
            }
            Ok(())
        }
        View::Error => {
            let message = session.error_message().unwrap_or("Processing failed");
            error!(retryable = session.error_is_retryable(), "{}", message);
            bail!("{}", message)
        }
        other => bail!("Session ended in unexpected view: {}", other),
    }
}
