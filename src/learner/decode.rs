//! Read-only projections from a native example's prediction field to typed results.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::learner::shape::ReturnShape;
use crate::traits::engine::{ActionScore, PredictionView};

/// Decoded prediction, one variant per known return shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value")]
pub enum PredictionResult {
    ActionProbabilities(Vec<ActionScore>),
    ActionScores(Vec<ActionScore>),
    Multiclass(u32),
    Multilabels(Vec<u32>),
    Probability(f32),
    Scalar(f32),
    ScalarArray(Vec<f32>),
}

impl PredictionResult {
    /// Decode `view` with the decoder for `shape`.
    pub fn decode<V: PredictionView + ?Sized>(shape: ReturnShape, view: &V) -> BridgeResult<Self> {
        let result = match shape {
            ReturnShape::ActionProbabilities => PredictionResult::ActionProbabilities(action_scores(view)),
            ReturnShape::ActionScores => PredictionResult::ActionScores(action_scores(view)),
            ReturnShape::Multiclass => PredictionResult::Multiclass(multiclass(view)),
            ReturnShape::Multilabels => PredictionResult::Multilabels(multilabels(view)),
            ReturnShape::Probability => PredictionResult::Probability(probability(view)),
            ReturnShape::Scalar => PredictionResult::Scalar(scalar(view)),
            ReturnShape::ScalarArray => PredictionResult::ScalarArray(scalars(view)),
            ReturnShape::Unknown => return Err(BridgeError::UnknownShape),
        };
        Ok(result)
    }

    pub fn shape(&self) -> ReturnShape {
        match self {
            PredictionResult::ActionProbabilities(_) => ReturnShape::ActionProbabilities,
            PredictionResult::ActionScores(_) => ReturnShape::ActionScores,
            PredictionResult::Multiclass(_) => ReturnShape::Multiclass,
            PredictionResult::Multilabels(_) => ReturnShape::Multilabels,
            PredictionResult::Probability(_) => ReturnShape::Probability,
            PredictionResult::Scalar(_) => ReturnShape::Scalar,
            PredictionResult::ScalarArray(_) => ReturnShape::ScalarArray,
        }
    }

    /// Single floating value for `Scalar` and `Probability` results
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            PredictionResult::Scalar(v) | PredictionResult::Probability(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<u32> {
        match self {
            PredictionResult::Multiclass(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_action_scores(&self) -> Option<&[ActionScore]> {
        match self {
            PredictionResult::ActionProbabilities(a) | PredictionResult::ActionScores(a) => Some(a),
            _ => None,
        }
    }
}

pub fn scalar<V: PredictionView + ?Sized>(view: &V) -> f32 {
    view.scalar()
}

/// One value per topic/component, in engine order
pub fn scalars<V: PredictionView + ?Sized>(view: &V) -> Vec<f32> {
    view.scalars().to_vec()
}

pub fn multiclass<V: PredictionView + ?Sized>(view: &V) -> u32 {
    view.multiclass()
}

pub fn multilabels<V: PredictionView + ?Sized>(view: &V) -> Vec<u32> {
    view.multilabels().to_vec()
}

/// Pairs in the engine's ranking order; not re-sorted by score.
pub fn action_scores<V: PredictionView + ?Sized>(view: &V) -> Vec<ActionScore> {
    view.action_scores().to_vec()
}

pub fn probability<V: PredictionView + ?Sized>(view: &V) -> f32 {
    view.probability()
}
