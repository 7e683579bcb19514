use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::slice;

use crate::native::sys;
use crate::traits::engine::{
    ActionScore, Introspection, LabelKind, NativeEngine, NativeFailure, PredictionKind, PredictionView,
};

/// Engine over the Vowpal Wabbit C++ library
#[derive(Debug, Clone, Copy, Default)]
pub struct VwEngine;

/// Owned `VW::workspace`. Released only through [`NativeEngine::finish`].
pub struct VwInstance(NonNull<sys::vwb_instance>);

// The workspace is not tied to the thread that created it; exclusive access
// is enforced by `&mut` and the handle registry.
unsafe impl Send for VwInstance {}

/// Parsed example borrowed from the workspace's example pool
pub struct VwExample(NonNull<sys::vwb_example>);

impl VwInstance {
    fn as_ptr(&self) -> *mut sys::vwb_instance {
        self.0.as_ptr()
    }
}

fn last_error() -> NativeFailure {
    // SAFETY: the shim returns a pointer into a thread-local string that
    // stays valid until the next failing call on this thread.
    let message = unsafe {
        let ptr = sys::vwb_last_error();
        if ptr.is_null() {
            return NativeFailure::new("unknown native failure");
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    };
    NativeFailure::new(message)
}

fn check(status: c_int) -> Result<(), NativeFailure> {
    if status == 0 {
        Ok(())
    } else {
        Err(last_error())
    }
}

fn c_string(text: &str) -> Result<CString, NativeFailure> {
    CString::new(text).map_err(|_| NativeFailure::new(format!("embedded NUL byte in {:?}", text)))
}

/// Borrow a (pointer, length) pair handed out by the shim as a slice.
///
/// # Safety
/// `ptr` must point to `len` initialized values that outlive `'a`.
unsafe fn borrowed<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        return &[];
    }
    unsafe { slice::from_raw_parts(ptr, len) }
}

impl PredictionView for VwExample {
    fn scalar(&self) -> f32 {
        unsafe { sys::vwb_scalar(self.0.as_ptr()) }
    }

    fn scalars(&self) -> &[f32] {
        let mut len = 0;
        unsafe { borrowed(sys::vwb_scalars(self.0.as_ptr(), &mut len), len) }
    }

    fn multiclass(&self) -> u32 {
        unsafe { sys::vwb_multiclass(self.0.as_ptr()) }
    }

    fn multilabels(&self) -> &[u32] {
        let mut len = 0;
        unsafe { borrowed(sys::vwb_multilabels(self.0.as_ptr(), &mut len), len) }
    }

    fn action_scores(&self) -> &[ActionScore] {
        let mut len = 0;
        unsafe { borrowed(sys::vwb_action_scores(self.0.as_ptr(), &mut len), len) }
    }

    fn probability(&self) -> f32 {
        unsafe { sys::vwb_probability(self.0.as_ptr()) }
    }
}

fn raw_examples(examples: &mut [VwExample]) -> Vec<*mut sys::vwb_example> {
    examples.iter().map(|ex| ex.0.as_ptr()).collect()
}

impl NativeEngine for VwEngine {
    type Instance = VwInstance;
    type Example = VwExample;

    fn initialize(&self, args: &[String]) -> Result<VwInstance, NativeFailure> {
        let owned = args.iter().map(|arg| c_string(arg)).collect::<Result<Vec<_>, _>>()?;
        let argv: Vec<_> = owned.iter().map(|arg| arg.as_ptr()).collect();
        let mut out = ptr::null_mut();
        check(unsafe { sys::vwb_initialize(argv.as_ptr(), argv.len(), &mut out) })?;
        NonNull::new(out)
            .map(VwInstance)
            .ok_or_else(|| NativeFailure::new("engine returned no instance"))
    }

    fn read_example(&self, instance: &mut VwInstance, line: &str) -> Result<VwExample, NativeFailure> {
        let line = c_string(line)?;
        let mut out = ptr::null_mut();
        check(unsafe { sys::vwb_read_example(instance.as_ptr(), line.as_ptr(), &mut out) })?;
        NonNull::new(out)
            .map(VwExample)
            .ok_or_else(|| NativeFailure::new("engine returned no example"))
    }

    fn learn(&self, instance: &mut VwInstance, examples: &mut [VwExample]) -> Result<(), NativeFailure> {
        let raw = raw_examples(examples);
        check(unsafe { sys::vwb_learn(instance.as_ptr(), raw.as_ptr(), raw.len()) })
    }

    fn predict(&self, instance: &mut VwInstance, examples: &mut [VwExample]) -> Result<(), NativeFailure> {
        let raw = raw_examples(examples);
        check(unsafe { sys::vwb_predict(instance.as_ptr(), raw.as_ptr(), raw.len()) })
    }

    fn finish_example(&self, instance: &mut VwInstance, example: VwExample) {
        unsafe { sys::vwb_finish_example(instance.as_ptr(), example.0.as_ptr()) }
    }

    fn finish(&self, instance: VwInstance) -> Result<(), NativeFailure> {
        check(unsafe { sys::vwb_finish(instance.as_ptr()) })
    }

    fn save_model(&self, instance: &mut VwInstance, path: &Path) -> Result<(), NativeFailure> {
        let path = c_string(&path.to_string_lossy())?;
        check(unsafe { sys::vwb_save_model(instance.as_ptr(), path.as_ptr()) })
    }

    fn num_passes(&self, instance: &VwInstance) -> u32 {
        unsafe { sys::vwb_num_passes(instance.as_ptr()) }
    }

    fn drive_remaining_passes(&self, instance: &mut VwInstance) -> Result<(), NativeFailure> {
        check(unsafe { sys::vwb_run_remaining_passes(instance.as_ptr()) })
    }

    fn introspect(&self, instance: &VwInstance) -> Introspection {
        let (prediction, label, lda) = unsafe {
            (
                sys::vwb_prediction_kind(instance.as_ptr()),
                sys::vwb_label_kind(instance.as_ptr()),
                sys::vwb_lda(instance.as_ptr()),
            )
        };
        Introspection {
            prediction_kind: prediction_kind(prediction),
            label_kind: label_kind(label),
            lda_topics: lda,
        }
    }
}

fn prediction_kind(raw: i32) -> Option<PredictionKind> {
    let kind = match raw {
        sys::PRED_ACTION_PROBS => PredictionKind::ActionProbabilities,
        sys::PRED_ACTION_SCORES => PredictionKind::ActionScores,
        sys::PRED_MULTICLASS => PredictionKind::Multiclass,
        sys::PRED_MULTILABELS => PredictionKind::Multilabels,
        sys::PRED_PROB => PredictionKind::Probability,
        sys::PRED_SCALAR => PredictionKind::Scalar,
        sys::PRED_SCALARS => PredictionKind::Scalars,
        r if r < 0 => return None,
        _ => PredictionKind::Other,
    };
    Some(kind)
}

fn label_kind(raw: i32) -> LabelKind {
    match raw {
        sys::LABEL_SIMPLE => LabelKind::Simple,
        sys::LABEL_MULTILABEL => LabelKind::Multilabel,
        sys::LABEL_MULTICLASS => LabelKind::Multiclass,
        sys::LABEL_CB => LabelKind::ContextualBandit,
        sys::LABEL_CB_EVAL => LabelKind::ContextualBanditEval,
        sys::LABEL_CS => LabelKind::CostSensitive,
        _ => LabelKind::Other,
    }
}
