use crate::validation::ProgressiveValidation;

// labels above this count as positive
const POSITIVE_EPSILON: f64 = 1e-13;

/// Root mean squared error
#[derive(Debug, Clone, Default)]
pub struct Rmse {
    sum_of_squares: f64,
    count: usize,
}

impl Rmse {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressiveValidation for Rmse {
    fn name(&self) -> &'static str {
        "RMSE"
    }

    fn bigger_is_better(&self) -> bool {
        false
    }

    fn update(&mut self, prediction: f64, actual: f64) {
        self.sum_of_squares += (prediction - actual) * (prediction - actual);
        self.count += 1;
    }

    fn score(&self) -> f64 {
        if self.count == 0 {
            return f64::INFINITY;
        }
        (self.sum_of_squares / self.count as f64).sqrt()
    }
}

/// Mean absolute error
#[derive(Debug, Clone, Default)]
pub struct Mae {
    absolute_error: f64,
    count: usize,
}

impl Mae {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressiveValidation for Mae {
    fn name(&self) -> &'static str {
        "MAE"
    }

    fn bigger_is_better(&self) -> bool {
        false
    }

    fn update(&mut self, prediction: f64, actual: f64) {
        self.absolute_error += (prediction - actual).abs();
        self.count += 1;
    }

    fn score(&self) -> f64 {
        if self.count == 0 {
            return f64::INFINITY;
        }
        self.absolute_error / self.count as f64
    }
}

/// Mean absolute percentage error, in percent. A zero label makes the
/// score infinite.
#[derive(Debug, Clone, Default)]
pub struct Mape {
    absolute_percentage_error: f64,
    count: usize,
}

impl Mape {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressiveValidation for Mape {
    fn name(&self) -> &'static str {
        "MAPE"
    }

    fn bigger_is_better(&self) -> bool {
        false
    }

    fn update(&mut self, prediction: f64, actual: f64) {
        self.absolute_percentage_error += ((prediction - actual) / actual).abs();
        self.count += 1;
    }

    fn score(&self) -> f64 {
        if self.count == 0 {
            return f64::INFINITY;
        }
        100.0 * self.absolute_percentage_error / self.count as f64
    }
}

/// Logarithmic loss of probability predictions; positive labels are `> 0`
#[derive(Debug, Clone, Default)]
pub struct LogLoss {
    log_likelihood: f64,
    count: usize,
}

impl LogLoss {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressiveValidation for LogLoss {
    fn name(&self) -> &'static str {
        "LOG-LOSS"
    }

    fn bigger_is_better(&self) -> bool {
        false
    }

    fn update(&mut self, prediction: f64, actual: f64) {
        let p = prediction.clamp(1e-7, 1.0 - 1e-7);
        self.log_likelihood += if actual > 0.0 { p.ln() } else { (1.0 - p).ln() };
        self.count += 1;
    }

    /// Negative infinity until the first update
    fn score(&self) -> f64 {
        if self.count == 0 {
            return f64::NEG_INFINITY;
        }
        -self.log_likelihood / self.count as f64
    }
}

/// Share of predictions on the correct side of the decision threshold
#[derive(Debug, Clone)]
pub struct Accuracy {
    threshold: f64,
    correct: usize,
    count: usize,
}

impl Accuracy {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            correct: 0,
            count: 0,
        }
    }
}

impl ProgressiveValidation for Accuracy {
    fn name(&self) -> &'static str {
        "ACC"
    }

    fn bigger_is_better(&self) -> bool {
        true
    }

    fn update(&mut self, prediction: f64, actual: f64) {
        let actual_positive = actual > POSITIVE_EPSILON;
        let predicted_positive = prediction > self.threshold;
        if actual_positive == predicted_positive {
            self.correct += 1;
        }
        self.count += 1;
    }

    fn score(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.correct as f64 / self.count as f64
    }
}

/// true positives / (true positives + false positives)
#[derive(Debug, Clone)]
pub struct Precision {
    threshold: f64,
    true_positives: usize,
    false_positives: usize,
}

impl Precision {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            true_positives: 0,
            false_positives: 0,
        }
    }
}

impl ProgressiveValidation for Precision {
    fn name(&self) -> &'static str {
        "Pr"
    }

    fn bigger_is_better(&self) -> bool {
        true
    }

    fn update(&mut self, prediction: f64, actual: f64) {
        if prediction > self.threshold {
            if actual > POSITIVE_EPSILON {
                self.true_positives += 1;
            } else {
                self.false_positives += 1;
            }
        }
    }

    fn score(&self) -> f64 {
        let total = self.true_positives + self.false_positives;
        if total == 0 {
            return 0.0;
        }
        self.true_positives as f64 / total as f64
    }
}

/// true positives / (true positives + false negatives)
#[derive(Debug, Clone)]
pub struct Recall {
    threshold: f64,
    true_positives: usize,
    false_negatives: usize,
}

impl Recall {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            true_positives: 0,
            false_negatives: 0,
        }
    }
}

impl ProgressiveValidation for Recall {
    fn name(&self) -> &'static str {
        "Re"
    }

    fn bigger_is_better(&self) -> bool {
        true
    }

    fn update(&mut self, prediction: f64, actual: f64) {
        if actual > POSITIVE_EPSILON {
            if prediction > self.threshold {
                self.true_positives += 1;
            } else {
                self.false_negatives += 1;
            }
        }
    }

    fn score(&self) -> f64 {
        let total = self.true_positives + self.false_negatives;
        if total == 0 {
            return 0.0;
        }
        self.true_positives as f64 / total as f64
    }
}

/// Harmonic mean of precision and recall
#[derive(Debug, Clone)]
pub struct FOneScore {
    precision: Precision,
    recall: Recall,
}

impl FOneScore {
    pub fn new(threshold: f64) -> Self {
        Self {
            precision: Precision::new(threshold),
            recall: Recall::new(threshold),
        }
    }
}

impl ProgressiveValidation for FOneScore {
    fn name(&self) -> &'static str {
        "F1-SCORE"
    }

    fn bigger_is_better(&self) -> bool {
        true
    }

    fn update(&mut self, prediction: f64, actual: f64) {
        self.precision.update(prediction, actual);
        self.recall.update(prediction, actual);
    }

    fn score(&self) -> f64 {
        let p = self.precision.score();
        let r = self.recall.score();
        if p == 0.0 || r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}
