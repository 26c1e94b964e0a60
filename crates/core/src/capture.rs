//! Camera capture.
//!
//! The app never talks to a device directly. It asks a [`FrameSource`] for the
//! current frame when the user presses the shutter, and gets back an encoded
//! still or nothing. Stream setup, permissions and device selection all live
//! behind the trait.
//!
//! Two sources are provided:
//! - [`WebcamSource`]: a V4L2 webcam streaming MJPEG (Linux only)
//! - [`StillImageSource`]: a fixed image, for `--image` and for tests
//!
//! # Example
//!
//! ```ignore
//! use smile_preview_core::capture::{FrameSource, WebcamSource};
//!
//! let camera = WebcamSource::open(0)?;
//! if let Some(frame) = camera.current_frame() {
//!     println!("{} bytes of {}", frame.len(), frame.mime_type());
//! }
//! ```

use crate::error::Result;
use crate::image_processing::{EncodedImage, ImageProcessor};
use std::path::Path;
use tracing::warn;

/// Something that can hand out the latest camera frame.
pub trait FrameSource: Send + Sync {
    /// Whether a frame is available right now.
    fn is_ready(&self) -> bool;

    /// The most recent frame, or `None` if the stream has not produced one.
    fn current_frame(&self) -> Option<EncodedImage>;

    /// Number of frames received so far. Changes whenever the frame does.
    fn sequence(&self) -> u64 {
        0
    }

    /// Human-readable description of the source.
    fn describe(&self) -> String;
}

/// A frame source that always returns the same image.
pub struct StillImageSource {
    frame: Option<EncodedImage>,
    label: String,
}

impl StillImageSource {
    pub fn new(frame: EncodedImage) -> Self {
        Self {
            label: format!("still image ({})", frame.mime_type()),
            frame: Some(frame),
        }
    }

    /// A source that never becomes ready.
    pub fn empty() -> Self {
        Self {
            frame: None,
            label: "no image".to_string(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let frame = ImageProcessor::load_file(path)?;
        Ok(Self {
            frame: Some(frame),
            label: path.display().to_string(),
        })
    }
}

impl FrameSource for StillImageSource {
    fn is_ready(&self) -> bool {
        self.frame.is_some()
    }

    fn current_frame(&self) -> Option<EncodedImage> {
        self.frame.clone()
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Hands out frames flipped left to right, the way a selfie preview shows them.
///
/// Only captured frames go through the flip; the live preview mirrors at
/// display time.
pub struct Mirrored<'a>(pub &'a dyn FrameSource);

impl FrameSource for Mirrored<'_> {
    fn is_ready(&self) -> bool {
        self.0.is_ready()
    }

    fn current_frame(&self) -> Option<EncodedImage> {
        let frame = self.0.current_frame()?;
        match ImageProcessor::mirror(&frame) {
            Ok(mirrored) => Some(mirrored),
            Err(e) => {
                warn!(error = %e, "Cannot mirror frame, using it as captured");
                Some(frame)
            }
        }
    }

    fn sequence(&self) -> u64 {
        self.0.sequence()
    }

    fn describe(&self) -> String {
        format!("{} (mirrored)", self.0.describe())
    }
}

#[cfg(target_os = "linux")]
pub use webcam::{WebcamSource, list_cameras};

#[cfg(not(target_os = "linux"))]
pub use unsupported::{WebcamSource, list_cameras};

#[cfg(target_os = "linux")]
mod webcam {
    use super::FrameSource;
    use crate::error::{AppError, Result};
    use crate::image_processing::{EncodedImage, MIME_JPEG};
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tracing::{debug, info, warn};
    use v4l::buffer::Type;
    use v4l::io::mmap::Stream;
    use v4l::io::traits::CaptureStream;
    use v4l::prelude::*;
    use v4l::video::Capture;
    use v4l::FourCC;

    /// Portrait selfie framing.
    const PREFERRED_WIDTH: u32 = 720;
    const PREFERRED_HEIGHT: u32 = 960;
    const BUFFER_COUNT: u32 = 4;

    /// Longest wait for a frame. Bounds how long stopping the stream can take.
    const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(500);

    #[derive(Debug, PartialEq, Eq)]
    pub(super) enum StreamControl {
        Restart,
        Stop,
    }

    /// A dequeue that timed out leaves the stream unusable, so it is reopened.
    pub(super) fn after_stream_error(kind: io::ErrorKind) -> StreamControl {
        match kind {
            io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => StreamControl::Restart,
            _ => StreamControl::Stop,
        }
    }

    /// A V4L2 webcam streaming MJPEG frames on a background thread.
    ///
    /// The thread keeps only the latest frame. Dropping the source stops the
    /// stream and joins the thread; a stalled camera delays that by at most
    /// one dequeue timeout.
    pub struct WebcamSource {
        latest: Arc<Mutex<Option<EncodedImage>>>,
        frames: Arc<AtomicU64>,
        running: Arc<AtomicBool>,
        worker: Option<JoinHandle<()>>,
        label: String,
    }

    impl WebcamSource {
        /// Opens `/dev/video{index}` and starts streaming.
        ///
        /// # Errors
        ///
        /// Returns [`AppError::CameraNotFound`] if the device cannot be opened,
        /// or [`AppError::Camera`] if it does not stream MJPEG.
        pub fn open(index: usize) -> Result<Self> {
            let dev = Device::new(index).map_err(|e| {
                debug!(index, error = %e, "Failed to open video device");
                AppError::CameraNotFound(index)
            })?;

            let mjpg = FourCC::new(b"MJPG");
            let mut format = dev
                .format()
                .map_err(|e| AppError::camera(format!("Failed to query format: {}", e)))?;
            format.width = PREFERRED_WIDTH;
            format.height = PREFERRED_HEIGHT;
            format.fourcc = mjpg;

            let actual = dev
                .set_format(&format)
                .map_err(|e| AppError::camera(format!("Failed to set format: {}", e)))?;
            if actual.fourcc != mjpg {
                return Err(AppError::camera(format!(
                    "Camera {} does not offer MJPEG (got {})",
                    index, actual.fourcc
                )));
            }

            let label = format!("Camera {}: {}x{} MJPEG", index, actual.width, actual.height);
            info!(camera = %label, "Opened webcam");

            let latest = Arc::new(Mutex::new(None));
            let frames = Arc::new(AtomicU64::new(0));
            let running = Arc::new(AtomicBool::new(true));
            let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

            let worker = {
                let latest = latest.clone();
                let frames = frames.clone();
                let running = running.clone();
                thread::spawn(move || {
                    let mut ready_tx = Some(ready_tx);
                    while running.load(Ordering::Relaxed) {
                        let mut stream =
                            match Stream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT) {
                                Ok(stream) => stream,
                                Err(e) => {
                                    let err = AppError::camera(format!(
                                        "Failed to start stream: {}",
                                        e
                                    ));
                                    match ready_tx.take() {
                                        Some(tx) => {
                                            let _ = tx.send(Err(err));
                                        }
                                        None => warn!(error = %err, "Camera restart failed"),
                                    }
                                    return;
                                }
                            };
                        if let Some(tx) = ready_tx.take() {
                            let _ = tx.send(Ok(()));
                        }
                        stream.set_timeout(DEQUEUE_TIMEOUT);

                        while running.load(Ordering::Relaxed) {
                            match stream.next() {
                                Ok((buf, meta)) => {
                                    let used = (meta.bytesused as usize).min(buf.len());
                                    if used == 0 {
                                        continue;
                                    }
                                    let frame =
                                        EncodedImage::new(buf[..used].to_vec(), MIME_JPEG);
                                    if let Ok(mut slot) = latest.lock() {
                                        *slot = Some(frame);
                                        frames.fetch_add(1, Ordering::Relaxed);
                                    }
                                }
                                Err(e) => match after_stream_error(e.kind()) {
                                    StreamControl::Restart => {
                                        debug!("Camera stalled, restarting stream");
                                        break;
                                    }
                                    StreamControl::Stop => {
                                        warn!(error = %e, "Camera stream stopped");
                                        return;
                                    }
                                },
                            }
                        }
                    }
                })
            };

            ready_rx
                .recv()
                .map_err(|_| AppError::camera("Camera thread exited during startup"))??;

            Ok(Self {
                latest,
                frames,
                running,
                worker: Some(worker),
                label,
            })
        }
    }

    impl FrameSource for WebcamSource {
        fn is_ready(&self) -> bool {
            self.frames.load(Ordering::Relaxed) > 0
        }

        fn current_frame(&self) -> Option<EncodedImage> {
            self.latest.lock().ok().and_then(|slot| slot.clone())
        }

        fn sequence(&self) -> u64 {
            self.frames.load(Ordering::Relaxed)
        }

        fn describe(&self) -> String {
            self.label.clone()
        }
    }

    impl Drop for WebcamSource {
        fn drop(&mut self) {
            self.running.store(false, Ordering::Relaxed);
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }

    /// Lists video capture devices.
    pub fn list_cameras() -> Vec<String> {
        v4l::context::enum_devices()
            .into_iter()
            .map(|node| {
                format!(
                    "Camera {}: {} ({})",
                    node.index(),
                    node.name().unwrap_or_else(|| "unknown".to_string()),
                    node.path().display()
                )
            })
            .collect()
    }
}

#[cfg(not(target_os = "linux"))]
mod unsupported {
    use super::FrameSource;
    use crate::error::{AppError, Result};
    use crate::image_processing::EncodedImage;

    /// Placeholder on platforms without a webcam backend.
    pub struct WebcamSource;

    impl WebcamSource {
        pub fn open(_index: usize) -> Result<Self> {
            Err(AppError::camera(
                "Webcam capture is only supported on Linux; use --image instead",
            ))
        }
    }

    impl FrameSource for WebcamSource {
        fn is_ready(&self) -> bool {
            false
        }

        fn current_frame(&self) -> Option<EncodedImage> {
            None
        }

        fn describe(&self) -> String {
            "unsupported".to_string()
        }
    }

    pub fn list_cameras() -> Vec<String> {
        Vec::new()
    }
}
