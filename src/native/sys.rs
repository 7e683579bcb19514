//! Raw declarations of the `vwb_*` C ABI (see `native/vw_shim.h`).

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int};

use crate::traits::engine::ActionScore;

#[repr(C)]
pub struct vwb_instance {
    _private: [u8; 0],
}

#[repr(C)]
pub struct vwb_example {
    _private: [u8; 0],
}

pub const PRED_ACTION_PROBS: i32 = 0;
pub const PRED_ACTION_SCORES: i32 = 1;
pub const PRED_MULTICLASS: i32 = 2;
pub const PRED_MULTILABELS: i32 = 3;
pub const PRED_PROB: i32 = 4;
pub const PRED_SCALAR: i32 = 5;
pub const PRED_SCALARS: i32 = 6;

pub const LABEL_SIMPLE: i32 = 0;
pub const LABEL_MULTILABEL: i32 = 1;
pub const LABEL_MULTICLASS: i32 = 2;
pub const LABEL_CB: i32 = 3;
pub const LABEL_CB_EVAL: i32 = 4;
pub const LABEL_CS: i32 = 5;

extern "C" {
    pub fn vwb_last_error() -> *const c_char;

    pub fn vwb_initialize(argv: *const *const c_char, argc: usize, out: *mut *mut vwb_instance) -> c_int;
    pub fn vwb_finish(instance: *mut vwb_instance) -> c_int;

    pub fn vwb_read_example(instance: *mut vwb_instance, line: *const c_char, out: *mut *mut vwb_example) -> c_int;
    pub fn vwb_finish_example(instance: *mut vwb_instance, example: *mut vwb_example);

    pub fn vwb_learn(instance: *mut vwb_instance, examples: *const *mut vwb_example, count: usize) -> c_int;
    pub fn vwb_predict(instance: *mut vwb_instance, examples: *const *mut vwb_example, count: usize) -> c_int;

    pub fn vwb_save_model(instance: *mut vwb_instance, path: *const c_char) -> c_int;
    pub fn vwb_run_remaining_passes(instance: *mut vwb_instance) -> c_int;

    pub fn vwb_num_passes(instance: *const vwb_instance) -> u32;
    pub fn vwb_prediction_kind(instance: *const vwb_instance) -> i32;
    pub fn vwb_label_kind(instance: *const vwb_instance) -> i32;
    pub fn vwb_lda(instance: *const vwb_instance) -> u32;

    pub fn vwb_scalar(example: *const vwb_example) -> f32;
    pub fn vwb_scalars(example: *const vwb_example, len: *mut usize) -> *const f32;
    pub fn vwb_multiclass(example: *const vwb_example) -> u32;
    pub fn vwb_multilabels(example: *const vwb_example, len: *mut usize) -> *const u32;
    // vwb_action_score has the layout of ActionScore
    pub fn vwb_action_scores(example: *const vwb_example, len: *mut usize) -> *const ActionScore;
    pub fn vwb_probability(example: *const vwb_example) -> f32;
}
