//! End-to-end session scenarios with a scripted transformer.

use futures::future::BoxFuture;
use smile_preview_core::session::USER_FACING_ERROR;
use smile_preview_core::{
    AppError, EncodedImage, ImageTransformer, SessionController, StillImageSource,
    TransformOutput, View, run_session,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

type Reply = (Duration, Result<TransformOutput, AppError>);

/// Answers each frame with its scripted reply after the reply's delay.
///
/// Replies are keyed by frame so concurrent workers cannot pick up each
/// other's script.
struct Scripted {
    replies: Mutex<HashMap<Vec<u8>, Reply>>,
}

impl Scripted {
    fn new(replies: Vec<(EncodedImage, Duration, Result<TransformOutput, AppError>)>) -> Arc<Self> {
        let replies = replies
            .into_iter()
            .map(|(frame, delay, reply)| (frame.bytes().to_vec(), (delay, reply)))
            .collect();
        Arc::new(Self {
            replies: Mutex::new(replies),
        })
    }
}

impl ImageTransformer for Scripted {
    fn transform<'a>(
        &'a self,
        image: &'a EncodedImage,
        _instruction: &'a str,
    ) -> BoxFuture<'a, smile_preview_core::Result<TransformOutput>> {
        let (delay, reply) = self
            .replies
            .lock()
            .unwrap()
            .remove(image.bytes())
            .expect("unexpected transform call");
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            reply
        })
    }
}

fn selfie() -> EncodedImage {
    frame(0xE0)
}

fn frame(tag: u8) -> EncodedImage {
    EncodedImage::new(vec![0xFF, 0xD8, 0xFF, tag], "image/jpeg")
}

fn edited(tag: u8) -> TransformOutput {
    TransformOutput {
        text: Some("Whitened".to_string()),
        image: Some(EncodedImage::new(vec![0x89, b'P', b'N', b'G', tag], "image/png")),
    }
}

const WARMUP: Duration = Duration::from_millis(200);
const WAIT: Duration = Duration::from_secs(10);

#[test]
fn slow_success_ends_on_result_with_before_and_after() {
    let transformer = Scripted::new(vec![(selfie(), Duration::from_secs(2), Ok(edited(1)))]);
    let controller = SessionController::new(transformer, "whiten");

    let session = run_session(controller, &StillImageSource::new(selfie()), WARMUP, WAIT).unwrap();

    assert_eq!(session.view(), View::Result);
    assert_eq!(session.original_image(), Some(&selfie()));
    assert_eq!(session.result_image(), edited(1).image.as_ref());
    assert!(session.error_message().is_none());
}

#[test]
fn network_error_ends_on_error_view() {
    let transformer = Scripted::new(vec![(
        selfie(),
        Duration::from_millis(10),
        Err(AppError::Network("connection refused".to_string())),
    )]);
    let controller = SessionController::new(transformer, "whiten");

    let session = run_session(controller, &StillImageSource::new(selfie()), WARMUP, WAIT).unwrap();

    assert_eq!(session.view(), View::Error);
    assert_eq!(session.error_message(), Some(USER_FACING_ERROR));
    assert!(session.result_image().is_none());
    assert!(session.error_is_retryable());
}

#[test]
fn auth_error_is_not_retryable() {
    let transformer = Scripted::new(vec![(
        selfie(),
        Duration::ZERO,
        Err(AppError::from_status(401, "API key not valid")),
    )]);
    let controller = SessionController::new(transformer, "whiten");

    let session = run_session(controller, &StillImageSource::new(selfie()), WARMUP, WAIT).unwrap();

    assert_eq!(session.view(), View::Error);
    assert!(!session.error_is_retryable());
}

#[test]
fn camera_that_never_becomes_ready_is_reported() {
    let transformer = Scripted::new(Vec::new());
    let controller = SessionController::new(transformer, "whiten");

    let err = run_session(controller, &StillImageSource::empty(), WARMUP, WAIT).unwrap_err();
    assert!(matches!(err, AppError::CameraNotReady));
}

#[test]
fn abandoned_request_never_overwrites_newer_session() {
    let transformer = Scripted::new(vec![
        (frame(1), Duration::from_millis(500), Ok(edited(1))),
        (frame(2), Duration::ZERO, Ok(edited(2))),
    ]);
    let mut controller = SessionController::new(transformer, "whiten");

    controller.start();
    controller.capture(&StillImageSource::new(frame(1)));
    controller.reset();
    controller.start();
    controller.capture(&StillImageSource::new(frame(2)));

    assert_eq!(controller.wait_for_completion(WAIT), View::Result);
    assert_eq!(controller.session().result_image(), edited(2).image.as_ref());

    // Let the first request finish; its reply must be dropped
    std::thread::sleep(Duration::from_millis(800));
    assert_eq!(controller.poll(), 0);
    assert_eq!(controller.session().result_image(), edited(2).image.as_ref());
}

#[test]
fn retry_after_error_allows_a_fresh_capture() {
    let transformer = Scripted::new(vec![
        (frame(1), Duration::ZERO, Err(AppError::RateLimited)),
        (frame(2), Duration::ZERO, Ok(edited(3))),
    ]);
    let mut controller = SessionController::new(transformer, "whiten");

    controller.start();
    controller.capture(&StillImageSource::new(frame(1)));
    assert_eq!(controller.wait_for_completion(WAIT), View::Error);

    assert!(controller.retry());
    assert_eq!(controller.view(), View::Capturing);
    assert!(controller.session().original_image().is_none());

    controller.capture(&StillImageSource::new(frame(2)));
    assert_eq!(controller.wait_for_completion(WAIT), View::Result);
    assert_eq!(controller.session().result_image(), edited(3).image.as_ref());
}
