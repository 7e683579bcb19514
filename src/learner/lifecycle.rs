use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use crate::config::LearnerArgs;
use crate::error::{cross, Boundary, BridgeError, BridgeResult};
use crate::learner::cycle;
use crate::learner::decode::PredictionResult;
use crate::learner::group::ExampleGroup;
use crate::learner::shape::{self, ReturnShape};
use crate::learner::stats::LearnerStats;
use crate::traits::engine::NativeEngine;

/// Owned native learner instance.
///
/// A learner is valid from a successful [`initialize`](Self::initialize)
/// until [`close`](Self::close), which consumes it. It is not `Clone` and
/// every mutating call takes `&mut self`, so one instance can never be
/// driven from two threads at once. A learner dropped without `close` is
/// still finished, with a warning.
///
/// After a `NativeInternal` error the engine state is undefined; the
/// learner should be closed and discarded.
pub struct Learner<E: NativeEngine> {
    engine: E,
    instance: Option<E::Instance>,
    shape: ReturnShape,
    command: Vec<String>,
    stats: LearnerStats,
}

impl<E: NativeEngine> Learner<E> {
    /// Create a native learner from a configuration line or argument vector.
    pub fn initialize(engine: E, args: impl Into<LearnerArgs>) -> BridgeResult<Self> {
        let command = args.into().to_argv();
        if command.is_empty() {
            return Err(BridgeError::Initialization(
                "argument vector must start with the program name".to_string(),
            ));
        }
        tracing::info!(command = %command.join(" "), "initializing learner");

        let instance = cross(Boundary::Initialize, || {
            engine
                .initialize(&command)
                .map_err(|f| Boundary::Initialize.convert(f))
        })?;

        let mut learner = Self {
            engine,
            instance: Some(instance),
            shape: ReturnShape::Unknown,
            command,
            stats: LearnerStats::new(),
        };
        learner.shape = learner.resolve_return_shape();
        tracing::debug!(shape = %learner.shape, "learner ready");
        Ok(learner)
    }

    /// Shape resolved at initialization; used to pick the decoder.
    pub fn return_shape(&self) -> ReturnShape {
        self.shape
    }

    /// Re-derive the return shape from the engine's current configuration.
    /// Never fails; anything the engine cannot report is `Unknown`.
    pub fn resolve_return_shape(&self) -> ReturnShape {
        let Some(instance) = self.instance.as_ref() else {
            return ReturnShape::Unknown;
        };
        let engine = &self.engine;
        match panic::catch_unwind(AssertUnwindSafe(|| engine.introspect(instance))) {
            Ok(introspection) => shape::resolve(&introspection),
            Err(_) => {
                tracing::warn!("engine panicked during introspection");
                ReturnShape::Unknown
            }
        }
    }

    /// Arguments the learner was created with, program name first
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn stats(&self) -> &LearnerStats {
        &self.stats
    }

    /// Predict (and optionally learn from) one example line.
    pub fn predict(&mut self, line: &str, learn: bool) -> BridgeResult<PredictionResult> {
        self.predict_group(&ExampleGroup::single(line), learn)
    }

    /// Predict for a sequence of lines; more than one line forms a multiline unit.
    pub fn predict_lines<S: AsRef<str>>(&mut self, lines: &[S], learn: bool) -> BridgeResult<PredictionResult> {
        let group = ExampleGroup::new(lines.iter().map(|line| line.as_ref()))?;
        self.predict_group(&group, learn)
    }

    /// Predict for an example group, decoded according to [`return_shape`](Self::return_shape).
    pub fn predict_group(&mut self, group: &ExampleGroup<'_>, learn: bool) -> BridgeResult<PredictionResult> {
        let shape = self.shape;
        if shape == ReturnShape::Unknown {
            return Err(BridgeError::UnknownShape);
        }
        self.predict_or_learn(group, learn, |example| PredictionResult::decode(shape, example))?
    }

    /// Run one predict or learn cycle and hand the outcome example to `decode`.
    ///
    /// `decode` must only read the prediction; parsed examples are released
    /// after it returns, even if it panics.
    pub fn predict_or_learn<T, F>(&mut self, group: &ExampleGroup<'_>, learn: bool, decode: F) -> BridgeResult<T>
    where
        F: FnOnce(&E::Example) -> T,
    {
        let start = Instant::now();
        let result = {
            let engine = &self.engine;
            let instance = self.instance.as_mut();
            cross(Boundary::PredictOrLearn, || {
                let instance = instance.ok_or_else(released)?;
                cycle::predict_or_learn(engine, instance, group, learn, decode)
            })
        };
        self.stats.record(learn, result.is_ok(), start.elapsed());
        tracing::debug!(lines = group.len(), learn, ok = result.is_ok(), "predict_or_learn");
        result
    }

    /// Finish training passes beyond the first, if the learner was configured
    /// for several. Blocks until the engine is done; no-op for single pass.
    pub fn run_remaining_passes(&mut self) -> BridgeResult<()> {
        let engine = &self.engine;
        let instance = self.instance.as_mut();
        cross(Boundary::RemainingPasses, || {
            let instance = instance.ok_or_else(released)?;
            let passes = engine.num_passes(instance);
            if passes <= 1 {
                return Ok(());
            }
            tracing::info!(passes, "running remaining passes");
            engine
                .drive_remaining_passes(instance)
                .map_err(|f| Boundary::RemainingPasses.convert(f))
        })
    }

    /// Write the current model in the engine's own format.
    pub fn save_model(&mut self, path: impl AsRef<Path>) -> BridgeResult<()> {
        let path = path.as_ref();
        let boundary = Boundary::SaveModel(path);
        let engine = &self.engine;
        let instance = self.instance.as_mut();
        cross(boundary, || {
            let instance = instance.ok_or_else(released)?;
            engine.save_model(instance, path).map_err(|f| boundary.convert(f))
        })?;
        tracing::info!(path = %path.display(), "model saved");
        Ok(())
    }

    /// Flush statistics and release the native instance.
    pub fn close(mut self) -> BridgeResult<()> {
        let instance = self.instance.take();
        tracing::debug!(stats = %self.stats.format_stats(), uptime_secs = self.stats.uptime_secs(), "closing learner");
        let engine = &self.engine;
        cross(Boundary::Close, || {
            let instance = instance.ok_or_else(released)?;
            engine.finish(instance).map_err(|f| Boundary::Close.convert(f))
        })
    }
}

fn released() -> BridgeError {
    BridgeError::NativeInternal("learner instance already released".to_string())
}

impl<E: NativeEngine> Drop for Learner<E> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            tracing::warn!("learner dropped without close; finishing native instance");
            let engine = &self.engine;
            match panic::catch_unwind(AssertUnwindSafe(|| engine.finish(instance))) {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => tracing::error!(error = %failure, "finishing dropped learner failed"),
                Err(_) => tracing::error!("engine panicked while finishing dropped learner"),
            }
        }
    }
}
