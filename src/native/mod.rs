//! Vowpal Wabbit behind the engine seam, through the C shim in `native/`.

mod sys;
mod vw;

pub use vw::{VwEngine, VwExample, VwInstance};
