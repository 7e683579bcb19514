use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::traits::engine::{Introspection, LabelKind, PredictionKind};

/// Structural type of the prediction a learner produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnShape {
    ActionProbabilities,
    ActionScores,
    Multiclass,
    Multilabels,
    Probability,
    Scalar,
    ScalarArray,
    Unknown,
}

impl ReturnShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnShape::ActionProbabilities => "ActionProbabilities",
            ReturnShape::ActionScores => "ActionScores",
            ReturnShape::Multiclass => "Multiclass",
            ReturnShape::Multilabels => "Multilabels",
            ReturnShape::Probability => "Probability",
            ReturnShape::Scalar => "Scalar",
            ReturnShape::ScalarArray => "ScalarArray",
            ReturnShape::Unknown => "Unknown",
        }
    }
}

impl Display for ReturnShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Pick the return shape for a learner configuration.
///
/// An explicit prediction kind wins. Engines that only report a label kind
/// fall back to inferring the shape from it. Never fails: anything
/// unrecognized is `Unknown`.
pub fn resolve(introspection: &Introspection) -> ReturnShape {
    match introspection.prediction_kind {
        Some(kind) => from_prediction_kind(kind),
        None => from_label_kind(introspection.label_kind, introspection.lda_topics),
    }
}

fn from_prediction_kind(kind: PredictionKind) -> ReturnShape {
    match kind {
        PredictionKind::ActionProbabilities => ReturnShape::ActionProbabilities,
        PredictionKind::ActionScores => ReturnShape::ActionScores,
        PredictionKind::Multiclass => ReturnShape::Multiclass,
        PredictionKind::Multilabels => ReturnShape::Multilabels,
        PredictionKind::Probability => ReturnShape::Probability,
        PredictionKind::Scalar => ReturnShape::Scalar,
        PredictionKind::Scalars => ReturnShape::ScalarArray,
        PredictionKind::Other => ReturnShape::Unknown,
    }
}

fn from_label_kind(label: LabelKind, lda_topics: u32) -> ReturnShape {
    match label {
        LabelKind::Simple if lda_topics > 0 => ReturnShape::ScalarArray,
        LabelKind::Simple => ReturnShape::Scalar,
        LabelKind::Multilabel => ReturnShape::Multilabels,
        LabelKind::Multiclass
        | LabelKind::ContextualBandit
        | LabelKind::ContextualBanditEval
        | LabelKind::CostSensitive => ReturnShape::Multiclass,
        LabelKind::Other => ReturnShape::Unknown,
    }
}
