//! Progressive validation: score every prediction against its label before
//! the learner is updated with it.

pub mod metrics;

use std::collections::BTreeMap;

pub use metrics::{Accuracy, FOneScore, LogLoss, Mae, Mape, Precision, Recall, Rmse};

/// A running score updated one (prediction, label) pair at a time
pub trait ProgressiveValidation: Send {
    fn name(&self) -> &'static str;

    fn bigger_is_better(&self) -> bool;

    fn update(&mut self, prediction: f64, actual: f64);

    fn score(&self) -> f64;
}

/// Several progressive metrics updated together, logged every N examples.
pub struct Metrics {
    metrics: Vec<Box<dyn ProgressiveValidation>>,
    report_every: usize,
    examples: usize,
}

impl Metrics {
    /// `report_every` of 0 disables periodic reports
    pub fn new(report_every: usize, metrics: Vec<Box<dyn ProgressiveValidation>>) -> Self {
        Self {
            metrics,
            report_every,
            examples: 0,
        }
    }

    /// RMSE and MAE
    pub fn regression(report_every: usize) -> Self {
        Self::new(report_every, vec![Box::new(Rmse::new()), Box::new(Mae::new())])
    }

    /// Accuracy and F1 for `1`/`-1` labels
    pub fn zero_one_classification(report_every: usize, decision_threshold: f64) -> Self {
        Self::new(
            report_every,
            vec![
                Box::new(Accuracy::new(decision_threshold)),
                Box::new(FOneScore::new(decision_threshold)),
            ],
        )
    }

    /// Log loss for probability outputs
    pub fn probability_classification(report_every: usize) -> Self {
        Self::new(report_every, vec![Box::new(LogLoss::new())])
    }

    pub fn update(&mut self, prediction: f64, actual: f64) {
        for metric in &mut self.metrics {
            metric.update(prediction, actual);
        }
        self.examples += 1;
        if self.report_every > 0 && self.examples % self.report_every == 0 {
            self.report();
        }
    }

    pub fn examples(&self) -> usize {
        self.examples
    }

    /// Log the current scores
    pub fn report(&self) {
        tracing::info!(examples = self.examples, scores = %self.format_scores(), "progressive validation");
    }

    pub fn format_scores(&self) -> String {
        self.metrics
            .iter()
            .map(|m| format!("{}={:.6}", m.name(), m.score()))
            .collect::<Vec<_>>()
            .join("\t")
    }

    pub fn scores(&self) -> BTreeMap<&'static str, f64> {
        self.metrics.iter().map(|m| (m.name(), m.score())).collect()
    }
}
