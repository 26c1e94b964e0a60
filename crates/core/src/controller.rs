//! Drives a [`Session`] from user actions and transform completions.
//!
//! The controller is owned by the UI thread. A capture hands the frame to a
//! worker thread, which runs the transform on its own current-thread runtime
//! and posts a [`Completion`] back through a channel. The UI drains that
//! channel with [`SessionController::poll`] once per frame. Completions whose
//! generation no longer matches the session are dropped by the state machine.

use crate::capture::FrameSource;
use crate::error::{AppError, Result};
use crate::gemini::{ImageTransformer, TransformOutput};
use crate::image_processing::EncodedImage;
use crate::session::{Effect, Event, Session, Step, USER_FACING_ERROR, View};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Called from the worker thread when a completion has been posted.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Message from a worker thread back to the controller.
pub struct Completion {
    pub generation: u64,
    pub outcome: Result<TransformOutput>,
}

/// What happened when the user pressed the shutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Frame taken; a transform request is in flight under `generation`.
    Started { generation: u64 },
    /// The camera had no frame. The session stays on the camera view.
    NoFrame,
    /// Capture is not available from the current view.
    NotCapturing,
}

pub struct SessionController {
    session: Session,
    transformer: Arc<dyn ImageTransformer>,
    instruction: Arc<str>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    waker: Option<Waker>,
}

impl SessionController {
    pub fn new(transformer: Arc<dyn ImageTransformer>, instruction: impl Into<String>) -> Self {
        let (tx, rx) = channel();
        let instruction: String = instruction.into();
        Self {
            session: Session::new(),
            transformer,
            instruction: Arc::from(instruction),
            tx,
            rx,
            waker: None,
        }
    }

    /// Registers a callback run after each completion is posted, e.g. to
    /// request a repaint.
    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    /// Replaces the transformer and instruction used by later captures.
    /// A request already in flight keeps the ones it started with.
    pub fn reconfigure(
        &mut self,
        transformer: Arc<dyn ImageTransformer>,
        instruction: impl Into<String>,
    ) {
        let instruction: String = instruction.into();
        self.transformer = transformer;
        self.instruction = Arc::from(instruction);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> View {
        self.session.view()
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn start(&mut self) -> bool {
        self.dispatch(Event::Start).is_moved()
    }

    pub fn retry(&mut self) -> bool {
        self.dispatch(Event::Retry).is_moved()
    }

    pub fn reset(&mut self) -> bool {
        self.dispatch(Event::Reset).is_moved()
    }

    /// Takes the camera's current frame and starts transforming it.
    ///
    /// Capturing requires the camera view and a ready stream. When either is
    /// missing the session does not change.
    pub fn capture(&mut self, source: &dyn FrameSource) -> CaptureOutcome {
        if self.view() != View::Capturing {
            return CaptureOutcome::NotCapturing;
        }

        let Some(frame) = source.current_frame() else {
            debug!(source = %source.describe(), "Capture requested but no frame available");
            return CaptureOutcome::NoFrame;
        };

        match self.dispatch(Event::Capture(frame)) {
            Step::Moved {
                effect: Effect::StartTransform { generation, .. },
                ..
            } => CaptureOutcome::Started { generation },
            _ => CaptureOutcome::NotCapturing,
        }
    }

    /// Applies every completion that has arrived. Returns how many changed
    /// the session.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            if self.complete(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Blocks until the session leaves the processing view or `timeout`
    /// passes. Returns the view the session ended up in.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> View {
        let deadline = Instant::now() + timeout;
        while self.view() == View::Processing {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(completion) => {
                    self.complete(completion);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.view()
    }

    fn complete(&mut self, completion: Completion) -> bool {
        let Completion { generation, outcome } = completion;

        let outcome = match outcome {
            Ok(output) if output.image.is_none() && output.text.is_none() => Err(
                AppError::MalformedResponse("empty transform output".to_string()),
            ),
            other => other,
        };

        match outcome {
            Ok(output) => {
                let moved = self
                    .dispatch(Event::Succeeded { generation, output })
                    .is_moved();
                if moved {
                    info!(generation, "Transform succeeded");
                }
                moved
            }
            Err(err) => {
                let retryable = err.is_retryable();
                let event = Event::Failed {
                    generation,
                    message: USER_FACING_ERROR.to_string(),
                    retryable,
                };
                let moved = self.dispatch(event).is_moved();
                // Stale failures were already reported at debug level by dispatch
                if moved {
                    error!(generation, error = %err, retryable, "Transform failed");
                }
                moved
            }
        }
    }

    fn dispatch(&mut self, event: Event) -> Step {
        let session = std::mem::take(&mut self.session);
        let (session, step) = session.apply(event);
        self.session = session;

        match &step {
            Step::Moved { from, to, effect } => {
                debug!(%from, %to, generation = self.session.generation(), "Session moved");
                if let Effect::StartTransform { generation, image } = effect {
                    self.spawn_transform(*generation, image.clone());
                }
            }
            Step::Ignored { view, event } => {
                debug!(%view, event, "Event ignored");
            }
            Step::Stale {
                generation,
                current,
            } => {
                debug!(generation, current, "Dropped stale completion");
            }
        }

        step
    }

    fn spawn_transform(&self, generation: u64, image: EncodedImage) {
        let tx = self.tx.clone();
        let transformer = self.transformer.clone();
        let instruction = self.instruction.clone();
        let waker = self.waker.clone();

        thread::spawn(move || {
            let outcome = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => panic::catch_unwind(AssertUnwindSafe(|| {
                    rt.block_on(transformer.transform(&image, &instruction))
                }))
                .unwrap_or_else(|payload| Err(panic_error(payload.as_ref()))),
                Err(e) => Err(AppError::Io(e)),
            };

            // The controller may be gone; nothing to report to
            let _ = tx.send(Completion {
                generation,
                outcome,
            });

            if let Some(waker) = waker {
                waker();
            }
        });
    }
}

/// Turns a panic in the transform into an ordinary failure.
fn panic_error(payload: &(dyn Any + Send)) -> AppError {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    AppError::gemini(format!("transform panicked: {}", detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::StillImageSource;
    use crate::image_processing::{MIME_JPEG, MIME_PNG};
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    /// Answers every request with the same canned outcome.
    struct Canned {
        output: Option<TransformOutput>,
        calls: Mutex<Vec<(EncodedImage, String)>>,
    }

    impl Canned {
        fn ok(output: TransformOutput) -> Arc<Self> {
            Arc::new(Self {
                output: Some(output),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                output: None,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl ImageTransformer for Canned {
        fn transform<'a>(
            &'a self,
            image: &'a EncodedImage,
            instruction: &'a str,
        ) -> BoxFuture<'a, Result<TransformOutput>> {
            self.calls
                .lock()
                .unwrap()
                .push((image.clone(), instruction.to_string()));
            let outcome = self
                .output
                .clone()
                .ok_or_else(|| AppError::Network("connection reset".to_string()));
            Box::pin(async move { outcome })
        }
    }

    /// Panics instead of answering.
    struct Exploding;

    impl ImageTransformer for Exploding {
        fn transform<'a>(
            &'a self,
            _image: &'a EncodedImage,
            _instruction: &'a str,
        ) -> BoxFuture<'a, Result<TransformOutput>> {
            Box::pin(async { panic!("model client blew up") })
        }
    }

    fn selfie() -> EncodedImage {
        EncodedImage::new(vec![0xFF, 0xD8, 0x01], MIME_JPEG)
    }

    fn whitened() -> TransformOutput {
        TransformOutput {
            text: None,
            image: Some(EncodedImage::new(vec![0x89, 0x50], MIME_PNG)),
        }
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn capture_requires_camera_view() {
        let mut controller = SessionController::new(Canned::ok(whitened()), "whiten");
        let source = StillImageSource::new(selfie());
        assert_eq!(controller.capture(&source), CaptureOutcome::NotCapturing);
        assert_eq!(controller.view(), View::Landing);
    }

    #[test]
    fn capture_without_frame_stays_on_camera() {
        let transformer = Canned::ok(whitened());
        let mut controller = SessionController::new(transformer.clone(), "whiten");
        controller.start();

        let outcome = controller.capture(&StillImageSource::empty());
        assert_eq!(outcome, CaptureOutcome::NoFrame);
        assert_eq!(controller.view(), View::Capturing);
        assert!(transformer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn successful_round_trip() {
        let transformer = Canned::ok(whitened());
        let mut controller = SessionController::new(transformer.clone(), "whiten my teeth");
        controller.start();

        let outcome = controller.capture(&StillImageSource::new(selfie()));
        assert_eq!(outcome, CaptureOutcome::Started { generation: 1 });
        assert_eq!(controller.view(), View::Processing);

        assert_eq!(controller.wait_for_completion(WAIT), View::Result);
        let session = controller.session();
        assert_eq!(session.original_image(), Some(&selfie()));
        assert_eq!(session.result_image(), whitened().image.as_ref());

        let calls = transformer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (selfie(), "whiten my teeth".to_string()));
    }

    #[test]
    fn failure_lands_on_error_with_fixed_message() {
        let mut controller = SessionController::new(Canned::failing(), "whiten");
        controller.start();
        controller.capture(&StillImageSource::new(selfie()));

        assert_eq!(controller.wait_for_completion(WAIT), View::Error);
        assert_eq!(controller.session().error_message(), Some(USER_FACING_ERROR));
        assert!(controller.session().error_is_retryable());
        assert!(controller.session().result_image().is_none());
    }

    #[test]
    fn empty_output_counts_as_failure() {
        let mut controller = SessionController::new(
            Canned::ok(TransformOutput::default()),
            "whiten",
        );
        controller.start();
        controller.capture(&StillImageSource::new(selfie()));
        assert_eq!(controller.wait_for_completion(WAIT), View::Error);
        assert!(!controller.session().error_is_retryable());
    }

    #[test]
    fn reset_while_processing_drops_the_late_result() {
        let mut controller = SessionController::new(Canned::ok(whitened()), "whiten");
        controller.start();
        controller.capture(&StillImageSource::new(selfie()));
        controller.reset();
        controller.start();
        assert_eq!(controller.view(), View::Capturing);

        // Give the worker time to post, then make sure nothing is applied
        thread::sleep(Duration::from_millis(200));
        assert_eq!(controller.poll(), 0);
        assert_eq!(controller.view(), View::Capturing);
        assert!(controller.session().result_image().is_none());
    }

    #[test]
    fn waker_runs_after_completion() {
        let (tx, rx) = channel();
        let mut controller = SessionController::new(Canned::ok(whitened()), "whiten");
        controller.set_waker(Arc::new(move || {
            let _ = tx.send(());
        }));
        controller.start();
        controller.capture(&StillImageSource::new(selfie()));

        rx.recv_timeout(WAIT).expect("waker was not called");
        assert_eq!(controller.poll(), 1);
        assert_eq!(controller.view(), View::Result);
    }

    #[test]
    fn reconfigure_changes_later_instruction() {
        let first = Canned::ok(whitened());
        let second = Canned::ok(whitened());
        let mut controller = SessionController::new(first.clone(), "one");
        controller.reconfigure(second.clone(), "two");
        assert_eq!(controller.instruction(), "two");

        controller.start();
        controller.capture(&StillImageSource::new(selfie()));
        controller.wait_for_completion(WAIT);

        assert!(first.calls.lock().unwrap().is_empty());
        assert_eq!(second.calls.lock().unwrap()[0].1, "two");
    }

    #[test]
    fn panicking_transform_lands_on_error() {
        let mut controller = SessionController::new(Arc::new(Exploding), "whiten");
        controller.start();
        controller.capture(&StillImageSource::new(selfie()));

        assert_eq!(controller.wait_for_completion(WAIT), View::Error);
        assert_eq!(controller.session().error_message(), Some(USER_FACING_ERROR));
        assert!(!controller.session().error_is_retryable());

        // The user can start over from there
        assert!(controller.retry());
        assert_eq!(controller.view(), View::Capturing);
    }

    #[test]
    fn panic_payloads_become_messages() {
        let err = panic_error(&"boom");
        assert!(err.to_string().contains("boom"));
        let err = panic_error(&String::from("kaboom"));
        assert!(err.to_string().contains("kaboom"));
        let err = panic_error(&42u8);
        assert!(err.to_string().contains("unknown panic"));
    }

    #[test]
    fn stale_failure_is_not_applied() {
        let mut controller = SessionController::new(Canned::failing(), "whiten");
        controller.start();
        controller.capture(&StillImageSource::new(selfie()));
        controller.reset();

        let stale = Completion {
            generation: 1,
            outcome: Err(AppError::Network("late".to_string())),
        };
        assert!(!controller.complete(stale));
        assert_eq!(controller.view(), View::Landing);
        assert!(controller.session().error_message().is_none());
    }
}
