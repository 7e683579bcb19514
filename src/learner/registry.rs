//! Handle registry: maps integer handles to learners for callers that can
//! only hold plain integers.
//!
//! Handles increase monotonically from 1; 0 is never issued. Each learner
//! sits behind its own lock and is entered with `try_lock`, so a second
//! thread using the same handle gets `HandleBusy` instead of waiting or
//! racing. The map lock is released before the learner is entered.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::LearnerArgs;
use crate::error::{BridgeError, BridgeResult};
use crate::learner::decode::PredictionResult;
use crate::learner::group::ExampleGroup;
use crate::learner::lifecycle::Learner;
use crate::learner::shape::ReturnShape;
use crate::traits::engine::NativeEngine;

/// Opaque integer reference to a registered learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LearnerHandle(u64);

impl LearnerHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

type Slot<E> = Arc<Mutex<Option<Learner<E>>>>;

pub struct HandleRegistry<E: NativeEngine + Clone> {
    engine: E,
    learners: Mutex<HashMap<LearnerHandle, Slot<E>>>,
    next_id: AtomicU64,
}

impl<E: NativeEngine + Clone> HandleRegistry<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            learners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a learner and return its handle
    pub fn initialize(&self, args: impl Into<LearnerArgs>) -> BridgeResult<LearnerHandle> {
        let learner = Learner::initialize(self.engine.clone(), args)?;
        let handle = LearnerHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.learners
            .lock()
            .insert(handle, Arc::new(Mutex::new(Some(learner))));
        Ok(handle)
    }

    fn slot(&self, handle: LearnerHandle) -> BridgeResult<Slot<E>> {
        self.learners
            .lock()
            .get(&handle)
            .cloned()
            .ok_or(BridgeError::InvalidHandle(handle.0))
    }

    /// Run `f` with exclusive access to the learner behind `handle`.
    pub fn with_learner<R>(
        &self,
        handle: LearnerHandle,
        f: impl FnOnce(&mut Learner<E>) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        let slot = self.slot(handle)?;
        let mut guard = slot.try_lock().ok_or(BridgeError::HandleBusy(handle.0))?;
        // None once a concurrent close has taken the learner out
        let learner = guard.as_mut().ok_or(BridgeError::InvalidHandle(handle.0))?;
        f(learner)
    }

    pub fn return_shape(&self, handle: LearnerHandle) -> BridgeResult<ReturnShape> {
        self.with_learner(handle, |learner| Ok(learner.resolve_return_shape()))
    }

    /// Predict for one or more example lines; several lines form one multiline unit.
    pub fn predict<S: AsRef<str>>(
        &self,
        handle: LearnerHandle,
        lines: &[S],
        learn: bool,
    ) -> BridgeResult<PredictionResult> {
        let group = ExampleGroup::new(lines.iter().map(|line| line.as_ref()))?;
        self.with_learner(handle, |learner| learner.predict_group(&group, learn))
    }

    pub fn run_remaining_passes(&self, handle: LearnerHandle) -> BridgeResult<()> {
        self.with_learner(handle, |learner| learner.run_remaining_passes())
    }

    pub fn save_model(&self, handle: LearnerHandle, path: impl AsRef<Path>) -> BridgeResult<()> {
        self.with_learner(handle, |learner| learner.save_model(path))
    }

    /// Close the learner and invalidate the handle. Closing an already
    /// closed handle fails with `InvalidHandle`.
    pub fn close(&self, handle: LearnerHandle) -> BridgeResult<()> {
        let slot = self.slot(handle)?;
        let learner = {
            let mut guard = slot.try_lock().ok_or(BridgeError::HandleBusy(handle.0))?;
            let learner = guard.take().ok_or(BridgeError::InvalidHandle(handle.0))?;
            self.learners.lock().remove(&handle);
            learner
        };
        learner.close()
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.learners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_initialize_and_close() {
        let registry = HandleRegistry::new(MockEngine::default());
        let a = registry.initialize("--quiet").unwrap();
        let b = registry.initialize("--oaa 3").unwrap();
        assert_ne!(a, b);
        assert!(a.as_raw() > 0);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.return_shape(a).unwrap(), ReturnShape::Scalar);
        assert_eq!(registry.return_shape(b).unwrap(), ReturnShape::Multiclass);

        registry.close(a).unwrap();
        registry.close(b).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_initialize_registers_nothing() {
        let registry = HandleRegistry::new(MockEngine::default());
        assert!(matches!(registry.initialize("--nope"), Err(BridgeError::Initialization(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_use_after_close_fails_fast() {
        let registry = HandleRegistry::new(MockEngine::default());
        let handle = registry.initialize("--quiet").unwrap();
        registry.close(handle).unwrap();

        let raw = handle.as_raw();
        assert_eq!(registry.close(handle).unwrap_err(), BridgeError::InvalidHandle(raw));
        assert_eq!(registry.predict(handle, &["1 |f a"], false).unwrap_err(), BridgeError::InvalidHandle(raw));
        assert_eq!(registry.return_shape(handle).unwrap_err(), BridgeError::InvalidHandle(raw));
        assert_eq!(registry.run_remaining_passes(handle).unwrap_err(), BridgeError::InvalidHandle(raw));
    }

    #[test]
    fn test_unknown_handle() {
        let registry = HandleRegistry::new(MockEngine::default());
        let err = registry.return_shape(LearnerHandle::from_raw(99)).unwrap_err();
        assert_eq!(err, BridgeError::InvalidHandle(99));
    }

    #[test]
    fn test_predict_through_registry() {
        let registry = HandleRegistry::new(MockEngine::default());
        let handle = registry.initialize("--quiet").unwrap();
        for _ in 0..20 {
            registry.predict(handle, &["1 |f a b"], true).unwrap();
        }
        let result = registry.predict(handle, &["|f a b"], false).unwrap();
        assert!(result.as_scalar().unwrap() > 0.9);

        let empty: [&str; 0] = [];
        assert_eq!(registry.predict(handle, &empty, false).unwrap_err(), BridgeError::EmptyGroup);
        registry.close(handle).unwrap();
    }

    #[test]
    fn test_concurrent_use_of_same_handle_is_rejected() {
        let registry = Arc::new(HandleRegistry::new(MockEngine::default()));
        let handle = registry.initialize("--quiet").unwrap();
        let other = registry.initialize("--quiet").unwrap();

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let worker_registry = Arc::clone(&registry);
        let worker = thread::spawn(move || {
            worker_registry.with_learner(handle, |_learner| {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                Ok(())
            })
        });

        entered_rx.recv().unwrap();
        let raw = handle.as_raw();
        assert_eq!(registry.predict(handle, &["1 |f a"], true).unwrap_err(), BridgeError::HandleBusy(raw));
        assert_eq!(registry.close(handle).unwrap_err(), BridgeError::HandleBusy(raw));
        // other handles stay usable
        registry.predict(other, &["1 |f a"], true).unwrap();

        release_tx.send(()).unwrap();
        worker.join().unwrap().unwrap();

        registry.close(handle).unwrap();
        registry.close(other).unwrap();
    }

    #[test]
    fn test_save_model_through_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = HandleRegistry::new(MockEngine::default());
        let handle = registry.initialize("--quiet").unwrap();
        registry.save_model(handle, dir.path().join("m.json")).unwrap();
        assert!(dir.path().join("m.json").exists());
        registry.close(handle).unwrap();
    }
}
