//! The generic predict/learn cycle shared by every result shape.

use std::panic::{self, AssertUnwindSafe};

use crate::error::{Boundary, BridgeError, BridgeResult};
use crate::learner::group::ExampleGroup;
use crate::traits::engine::NativeEngine;

/// Parsed native examples owned for the duration of one call.
///
/// Dropping the batch hands every example back to the engine, on success,
/// error and unwind alike.
struct ExampleBatch<'a, E: NativeEngine> {
    engine: &'a E,
    instance: &'a mut E::Instance,
    examples: Vec<E::Example>,
}

impl<'a, E: NativeEngine> ExampleBatch<'a, E> {
    fn with_capacity(engine: &'a E, instance: &'a mut E::Instance, capacity: usize) -> Self {
        Self {
            engine,
            instance,
            examples: Vec::with_capacity(capacity),
        }
    }

    fn read(&mut self, line: &str) -> BridgeResult<()> {
        let example = self
            .engine
            .read_example(self.instance, line)
            .map_err(|f| Boundary::ReadExample(line).convert(f))?;
        self.examples.push(example);
        Ok(())
    }

    fn run(&mut self, learn: bool) -> BridgeResult<()> {
        let outcome = if learn {
            self.engine.learn(self.instance, &mut self.examples)
        } else {
            self.engine.predict(self.instance, &mut self.examples)
        };
        outcome.map_err(|f| Boundary::PredictOrLearn.convert(f))
    }

    fn outcome(&self) -> BridgeResult<&E::Example> {
        self.examples.last().ok_or(BridgeError::EmptyGroup)
    }
}

impl<E: NativeEngine> Drop for ExampleBatch<'_, E> {
    fn drop(&mut self) {
        let engine = self.engine;
        let instance = &mut *self.instance;
        for example in self.examples.drain(..) {
            // a second panic while unwinding would abort the host
            let released = panic::catch_unwind(AssertUnwindSafe(|| engine.finish_example(instance, example)));
            if released.is_err() {
                tracing::error!("engine panicked while releasing an example");
            }
        }
    }
}

/// Parse every line of `group`, run one predict or learn cycle over them and
/// decode the outcome example.
///
/// A single-line group takes exactly the single-example path. For a
/// multiline group every line but the last is context and `decode` sees the
/// last example.
pub(crate) fn predict_or_learn<E, T, F>(
    engine: &E,
    instance: &mut E::Instance,
    group: &ExampleGroup<'_>,
    learn: bool,
    decode: F,
) -> BridgeResult<T>
where
    E: NativeEngine,
    F: FnOnce(&E::Example) -> T,
{
    let mut batch = ExampleBatch::with_capacity(engine, instance, group.len());
    for line in group.iter() {
        batch.read(line)?;
    }
    batch.run(learn)?;
    Ok(decode(batch.outcome()?))
}
