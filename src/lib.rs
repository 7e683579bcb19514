//! vwbridge: a thin bridge to a native online-learning engine
//!
//! This library owns native learner instances behind handles, turns example
//! text into native predict/learn calls, decodes the native prediction into
//! the result shape the learner is configured for, and converts every native
//! failure into a [`BridgeError`] without taking the host process down.

pub mod config;
pub mod error;
pub mod example;
pub mod learner;
pub mod traits;
pub mod validation;

#[cfg(feature = "native")]
pub mod native;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for ergonomic use
pub use config::{LearnerArgs, LearnerOptions, Link, Loss, UpdateRule};
pub use error::{BridgeError, BridgeResult};
pub use example::{ExampleBuilder, NamespaceBuilder};
pub use learner::decode::PredictionResult;
pub use learner::group::ExampleGroup;
pub use learner::lifecycle::Learner;
pub use learner::registry::{HandleRegistry, LearnerHandle};
pub use learner::shape::ReturnShape;
pub use learner::stats::LearnerStats;
pub use traits::engine::{ActionScore, NativeEngine, NativeFailure, PredictionView};
pub use validation::{Metrics, ProgressiveValidation};

#[cfg(feature = "native")]
pub use native::VwEngine;
