//! The view state machine.
//!
//! A [`Session`] is a plain value. [`Session::apply`] consumes it together with
//! an [`Event`] and returns the next session plus a [`Step`] describing what
//! happened. Nothing in here performs I/O; when a capture needs a transform
//! request, the step carries an [`Effect`] for the caller to run.
//!
//! ```text
//! Landing --start--> Capturing --capture--> Processing --succeeded--> Result
//!    ^                   ^   |                   |  \                   |
//!    |                   |   reset               |   `--failed--> Error |
//!    |                   `---- retry ------------+----------------------'
//!    `------------------------ reset ------------'
//! ```
//!
//! Every capture, retry and reset moves the session to a new generation.
//! Completions carry the generation they were started under and are dropped
//! unless it is still current, so a slow response can never land on a session
//! the user has already left.

use crate::gemini::TransformOutput;
use crate::image_processing::EncodedImage;
use std::fmt;

/// Shown on the error view regardless of what actually went wrong.
pub const USER_FACING_ERROR: &str =
    "We couldn't process that image. Please try again with good lighting!";

/// The screen currently shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum View {
    Landing,
    Capturing,
    Processing,
    Result,
    Error,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Landing => "landing",
            Self::Capturing => "capturing",
            Self::Processing => "processing",
            Self::Result => "result",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Per-view data. Each view holds exactly the fields that are valid in it.
#[derive(Clone, Debug, PartialEq)]
enum State {
    Landing,
    Capturing,
    Processing {
        original: EncodedImage,
    },
    Result {
        original: EncodedImage,
        output: TransformOutput,
    },
    Error {
        original: EncodedImage,
        message: String,
        retryable: bool,
    },
}

/// Everything that can happen to a session.
#[derive(Clone, Debug)]
pub enum Event {
    /// Leave the landing view and open the camera.
    Start,
    /// A frame was taken; begin transforming it.
    Capture(EncodedImage),
    /// The transform request started under `generation` finished.
    Succeeded {
        generation: u64,
        output: TransformOutput,
    },
    /// The transform request started under `generation` failed.
    Failed {
        generation: u64,
        message: String,
        retryable: bool,
    },
    /// Go back to the camera with a clean slate.
    Retry,
    /// Go back to the landing view with a clean slate.
    Reset,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Capture(_) => "capture",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Retry => "retry",
            Self::Reset => "reset",
        }
    }
}

/// Work the caller must perform after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    None,
    /// Send `image` to the transform service, tagged with `generation`.
    StartTransform {
        generation: u64,
        image: EncodedImage,
    },
}

/// Result of applying an event.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// The session moved from one view to another.
    Moved { from: View, to: View, effect: Effect },
    /// The event has no meaning in the current view; nothing changed.
    Ignored { view: View, event: &'static str },
    /// A completion from an abandoned request; nothing changed.
    Stale { generation: u64, current: u64 },
}

impl Step {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// One user visit: the current view, its images and the request generation.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    state: State,
    generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session on the landing view.
    pub fn new() -> Self {
        Self {
            state: State::Landing,
            generation: 0,
        }
    }

    pub fn view(&self) -> View {
        match self.state {
            State::Landing => View::Landing,
            State::Capturing => View::Capturing,
            State::Processing { .. } => View::Processing,
            State::Result { .. } => View::Result,
            State::Error { .. } => View::Error,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The captured frame. Set from capture until the next retry or reset.
    pub fn original_image(&self) -> Option<&EncodedImage> {
        match &self.state {
            State::Processing { original }
            | State::Result { original, .. }
            | State::Error { original, .. } => Some(original),
            State::Landing | State::Capturing => None,
        }
    }

    /// The transformed image. Only ever set on the result view.
    pub fn result_image(&self) -> Option<&EncodedImage> {
        match &self.state {
            State::Result { output, .. } => output.image.as_ref(),
            _ => None,
        }
    }

    /// Text the model returned alongside (or instead of) the image.
    pub fn result_text(&self) -> Option<&str> {
        match &self.state {
            State::Result { output, .. } => output.text.as_deref(),
            _ => None,
        }
    }

    /// The message for the error view. Only ever set on the error view.
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            State::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether the failure shown on the error view is likely transient.
    pub fn error_is_retryable(&self) -> bool {
        matches!(self.state, State::Error { retryable: true, .. })
    }

    /// Applies one event and returns the next session with what happened.
    pub fn apply(self, event: Event) -> (Session, Step) {
        let from = self.view();
        let name = event.name();
        let Session { state, generation } = self;

        let (state, generation, effect) = match (state, event) {
            (State::Landing, Event::Start) => (State::Capturing, generation, Effect::None),

            (State::Capturing, Event::Capture(frame)) => {
                let next = generation + 1;
                let effect = Effect::StartTransform {
                    generation: next,
                    image: frame.clone(),
                };
                (State::Processing { original: frame }, next, effect)
            }

            (State::Processing { original }, Event::Succeeded { generation: g, output })
                if g == generation =>
            {
                (State::Result { original, output }, generation, Effect::None)
            }

            (
                State::Processing { original },
                Event::Failed {
                    generation: g,
                    message,
                    retryable,
                },
            ) if g == generation => (
                State::Error {
                    original,
                    message,
                    retryable,
                },
                generation,
                Effect::None,
            ),

            (state, Event::Succeeded { generation: g, .. } | Event::Failed { generation: g, .. }) => {
                let session = Session { state, generation };
                return if g == generation {
                    // Current generation, but no longer processing
                    (session, Step::Ignored { view: from, event: name })
                } else {
                    (
                        session,
                        Step::Stale {
                            generation: g,
                            current: generation,
                        },
                    )
                };
            }

            (State::Result { .. } | State::Error { .. }, Event::Retry) => {
                (State::Capturing, generation + 1, Effect::None)
            }

            (
                State::Capturing
                | State::Processing { .. }
                | State::Result { .. }
                | State::Error { .. },
                Event::Reset,
            ) => (State::Landing, generation + 1, Effect::None),

            (state, _) => {
                return (
                    Session { state, generation },
                    Step::Ignored { view: from, event: name },
                );
            }
        };

        let session = Session { state, generation };
        let to = session.view();
        (session, Step::Moved { from, to, effect })
    }
}
