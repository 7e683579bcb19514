//! Error taxonomy and the single boundary adapter every native call goes through.
//!
//! Nothing crosses into caller code unconverted: native failure reports are
//! mapped according to the [`Boundary`] they happened at, and panics raised
//! below the boundary (engine glue or decoders) are caught and reported as
//! [`BridgeError::NativeInternal`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::traits::engine::NativeFailure;

/// Errors surfaced to callers of the bridge
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Initialization error: {0}")]
    Initialization(String),
    #[error("Example format error in {line:?}: {message}")]
    ExampleFormat { line: String, message: String },
    #[error("Example group must contain at least one line")]
    EmptyGroup,
    #[error("Could not save model to {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },
    #[error("Native engine error: {0}")]
    NativeInternal(String),
    #[error("Invalid learner handle: {0}")]
    InvalidHandle(u64),
    #[error("Learner handle {0} is in use by another thread")]
    HandleBusy(u64),
    #[error("Learner return shape is unknown; no decoder applies")]
    UnknownShape,
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Which operation a native call belongs to; selects the error variant a
/// native failure is converted into.
#[derive(Debug, Clone, Copy)]
pub enum Boundary<'a> {
    Initialize,
    ReadExample(&'a str),
    PredictOrLearn,
    RemainingPasses,
    SaveModel(&'a Path),
    Close,
}

impl Boundary<'_> {
    /// Convert a native failure report raised at this boundary.
    pub fn convert(&self, failure: NativeFailure) -> BridgeError {
        match self {
            Boundary::Initialize => BridgeError::Initialization(failure.message),
            Boundary::ReadExample(line) => BridgeError::ExampleFormat {
                line: (*line).to_string(),
                message: failure.message,
            },
            Boundary::SaveModel(path) => BridgeError::Persistence {
                path: path.to_path_buf(),
                message: failure.message,
            },
            Boundary::PredictOrLearn | Boundary::RemainingPasses | Boundary::Close => {
                BridgeError::NativeInternal(failure.message)
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Boundary::Initialize => "initialize",
            Boundary::ReadExample(_) => "read_example",
            Boundary::PredictOrLearn => "predict_or_learn",
            Boundary::RemainingPasses => "run_remaining_passes",
            Boundary::SaveModel(_) => "save_model",
            Boundary::Close => "close",
        }
    }
}

/// Run `f` as one crossing of the native boundary.
///
/// Panics are caught and reported as `NativeInternal` with the panic
/// message; all failures are logged once here.
pub fn cross<T>(boundary: Boundary<'_>, f: impl FnOnce() -> BridgeResult<T>) -> BridgeResult<T> {
    let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(BridgeError::NativeInternal(panic_message(payload.as_ref()))),
    };
    if let Err(err) = &outcome {
        tracing::warn!(operation = boundary.name(), error = %err, "native call failed");
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "native call panicked".to_string()
    }
}
