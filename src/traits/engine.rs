use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Failure reported by the native engine, carrying its diagnostic text verbatim.
///
/// This never reaches callers directly: the boundary adapter turns it into
/// exactly one [`BridgeError`](crate::BridgeError) depending on which
/// operation produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFailure {
    pub message: String,
}

impl NativeFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl Display for NativeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.message)
    }
}

/// Prediction kind as reported by engines that expose it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    ActionProbabilities,
    ActionScores,
    Multiclass,
    Multilabels,
    Probability,
    Scalar,
    Scalars,
    /// A kind this bridge has no decoder for (decision scores, PDFs, ...)
    Other,
}

/// Label kind of the example parser, used by older engine generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    Simple,
    Multilabel,
    Multiclass,
    ContextualBandit,
    ContextualBanditEval,
    CostSensitive,
    Other,
}

/// Snapshot of the configuration facts needed to pick a return shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Introspection {
    /// `None` when the engine predates explicit prediction kinds
    pub prediction_kind: Option<PredictionKind>,
    pub label_kind: LabelKind,
    /// Topic count when configured for topic decomposition, otherwise 0
    pub lda_topics: u32,
}

/// One (action, score) entry of a ranking prediction.
///
/// Layout matches the engine's own `action_score` record so slices can be
/// borrowed straight out of native memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionScore {
    pub action: u32,
    pub score: f32,
}

impl ActionScore {
    pub fn new(action: u32, score: f32) -> Self {
        Self { action, score }
    }
}

/// Read-only view of the prediction field of a parsed native example.
///
/// Only the accessor matching the learner's prediction kind carries
/// meaningful data; the others return whatever the engine left there.
pub trait PredictionView {
    fn scalar(&self) -> f32;

    fn scalars(&self) -> &[f32];

    fn multiclass(&self) -> u32;

    fn multilabels(&self) -> &[u32];

    fn action_scores(&self) -> &[ActionScore];

    fn probability(&self) -> f32;
}

/// The surface consumed from the native online-learning engine.
///
/// Implementations are thin: every method maps onto one native routine.
/// Instances are not safe for concurrent use; callers hold `&mut` to the
/// instance for the duration of any mutating call.
pub trait NativeEngine: Send + Sync + 'static {
    /// Native learner instance behind a handle
    type Instance: Send;
    /// Parsed native example
    type Example: PredictionView;

    /// Create a learner from an argv-style vector (argv[0] is the program name).
    fn initialize(&self, args: &[String]) -> Result<Self::Instance, NativeFailure>;

    /// Parse one line of example text with the engine's own parser.
    fn read_example(
        &self,
        instance: &mut Self::Instance,
        line: &str,
    ) -> Result<Self::Example, NativeFailure>;

    /// Predict and update weights. More than one example means a multiline
    /// unit: all but the last are context, the last carries the outcome.
    fn learn(
        &self,
        instance: &mut Self::Instance,
        examples: &mut [Self::Example],
    ) -> Result<(), NativeFailure>;

    /// Predict without touching the weights. Same multiline convention as `learn`.
    fn predict(
        &self,
        instance: &mut Self::Instance,
        examples: &mut [Self::Example],
    ) -> Result<(), NativeFailure>;

    /// Return a parsed example to the engine. Must be called exactly once per example.
    fn finish_example(&self, instance: &mut Self::Instance, example: Self::Example);

    /// Flush accumulated statistics and release the instance.
    fn finish(&self, instance: Self::Instance) -> Result<(), NativeFailure>;

    fn save_model(&self, instance: &mut Self::Instance, path: &Path) -> Result<(), NativeFailure>;

    /// Number of passes the instance was configured with.
    fn num_passes(&self, instance: &Self::Instance) -> u32;

    /// Re-drive the training loop over the configured data source for the
    /// passes that remain. Blocks until done.
    fn drive_remaining_passes(&self, instance: &mut Self::Instance) -> Result<(), NativeFailure>;

    fn introspect(&self, instance: &Self::Instance) -> Introspection;
}
