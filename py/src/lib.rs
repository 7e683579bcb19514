use std::sync::OnceLock;

use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;

use vwbridge::{BridgeError, BridgeResult, HandleRegistry, LearnerArgs, LearnerHandle, PredictionResult, VwEngine};

create_exception!(vwbridge_py, VWBridgeError, PyException);
create_exception!(vwbridge_py, InitializationError, VWBridgeError);
create_exception!(vwbridge_py, ExampleFormatError, VWBridgeError);
create_exception!(vwbridge_py, EmptyGroupError, VWBridgeError);
create_exception!(vwbridge_py, PersistenceError, VWBridgeError);
create_exception!(vwbridge_py, NativeInternalError, VWBridgeError);
create_exception!(vwbridge_py, InvalidHandleError, VWBridgeError);
create_exception!(vwbridge_py, HandleBusyError, VWBridgeError);
create_exception!(vwbridge_py, UnknownShapeError, VWBridgeError);

// One registry per process; handles are plain integers on the Python side.
static REGISTRY: OnceLock<HandleRegistry<VwEngine>> = OnceLock::new();

fn registry() -> &'static HandleRegistry<VwEngine> {
    REGISTRY.get_or_init(|| HandleRegistry::new(VwEngine))
}

fn to_py_err(err: BridgeError) -> PyErr {
    let message = err.to_string();
    match err {
        BridgeError::Initialization(_) => InitializationError::new_err(message),
        BridgeError::ExampleFormat { .. } => ExampleFormatError::new_err(message),
        BridgeError::EmptyGroup => EmptyGroupError::new_err(message),
        BridgeError::Persistence { .. } => PersistenceError::new_err(message),
        BridgeError::NativeInternal(_) => NativeInternalError::new_err(message),
        BridgeError::InvalidHandle(_) => InvalidHandleError::new_err(message),
        BridgeError::HandleBusy(_) => HandleBusyError::new_err(message),
        BridgeError::UnknownShape => UnknownShapeError::new_err(message),
    }
}

fn run<T>(result: BridgeResult<T>) -> PyResult<T> {
    result.map_err(to_py_err)
}

/// A str is one line, a list of str is one multiline unit.
fn lines(example: &PyAny) -> PyResult<Vec<String>> {
    if let Ok(line) = example.extract::<String>() {
        return Ok(vec![line]);
    }
    example.extract::<Vec<String>>()
}

fn into_py_value(py: Python<'_>, result: PredictionResult) -> PyObject {
    match result {
        PredictionResult::Scalar(v) | PredictionResult::Probability(v) => v.into_py(py),
        PredictionResult::ScalarArray(v) => v.into_py(py),
        PredictionResult::Multiclass(v) => v.into_py(py),
        PredictionResult::Multilabels(v) => v.into_py(py),
        PredictionResult::ActionScores(v) | PredictionResult::ActionProbabilities(v) => v
            .into_iter()
            .map(|a| (a.action, a.score))
            .collect::<Vec<_>>()
            .into_py(py),
    }
}

/// Create a learner from a command line string or an argument list and
/// return its handle
#[pyfunction]
fn initialize(config: &PyAny) -> PyResult<u64> {
    let args = if let Ok(line) = config.extract::<String>() {
        LearnerArgs::Line(line)
    } else {
        LearnerArgs::Argv(config.extract::<Vec<String>>()?)
    };
    run(registry().initialize(args)).map(|handle| handle.as_raw())
}

/// Flush statistics and release the learner. The handle is invalid afterwards.
#[pyfunction]
fn close(py: Python<'_>, handle: u64) -> PyResult<()> {
    let handle = LearnerHandle::from_raw(handle);
    run(py.allow_threads(|| registry().close(handle)))
}

/// Name of the result shape `predict` returns for this learner
#[pyfunction]
fn return_shape(handle: u64) -> PyResult<&'static str> {
    let shape = run(registry().return_shape(LearnerHandle::from_raw(handle)))?;
    Ok(shape.as_str())
}

#[pyfunction]
#[pyo3(signature = (handle, example, learn = true))]
fn predict(py: Python<'_>, handle: u64, example: &PyAny, learn: bool) -> PyResult<PyObject> {
    let lines = lines(example)?;
    let handle = LearnerHandle::from_raw(handle);
    let result = run(py.allow_threads(|| registry().predict(handle, lines.as_slice(), learn)))?;
    Ok(into_py_value(py, result))
}

/// Blocks until every configured pass has run; the GIL is released meanwhile.
#[pyfunction]
fn run_remaining_passes(py: Python<'_>, handle: u64) -> PyResult<()> {
    let handle = LearnerHandle::from_raw(handle);
    run(py.allow_threads(|| registry().run_remaining_passes(handle)))
}

#[pyfunction]
fn save_model(py: Python<'_>, handle: u64, path: String) -> PyResult<()> {
    let handle = LearnerHandle::from_raw(handle);
    run(py.allow_threads(|| registry().save_model(handle, &path)))
}

/// The Python module definition
#[pymodule]
fn vwbridge_py(py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(initialize, m)?)?;
    m.add_function(wrap_pyfunction!(close, m)?)?;
    m.add_function(wrap_pyfunction!(return_shape, m)?)?;
    m.add_function(wrap_pyfunction!(predict, m)?)?;
    m.add_function(wrap_pyfunction!(run_remaining_passes, m)?)?;
    m.add_function(wrap_pyfunction!(save_model, m)?)?;

    m.add("VWBridgeError", py.get_type::<VWBridgeError>())?;
    m.add("InitializationError", py.get_type::<InitializationError>())?;
    m.add("ExampleFormatError", py.get_type::<ExampleFormatError>())?;
    m.add("EmptyGroupError", py.get_type::<EmptyGroupError>())?;
    m.add("PersistenceError", py.get_type::<PersistenceError>())?;
    m.add("NativeInternalError", py.get_type::<NativeInternalError>())?;
    m.add("InvalidHandleError", py.get_type::<InvalidHandleError>())?;
    m.add("HandleBusyError", py.get_type::<HandleBusyError>())?;
    m.add("UnknownShapeError", py.get_type::<UnknownShapeError>())?;
    Ok(())
}
