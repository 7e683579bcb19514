use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

/// Per-learner call statistics
#[derive(Debug)]
pub struct LearnerStats {
    /// Number of predict-only calls
    pub prediction_count: AtomicUsize,
    /// Number of predict-and-learn calls
    pub learn_count: AtomicUsize,
    /// Number of predict/learn calls that failed
    pub failures: AtomicUsize,
    /// Latest predict/learn latency in microseconds
    pub latest_latency_us: AtomicUsize,
    /// Creation timestamp
    pub created_at: SystemTime,
}

impl LearnerStats {
    pub fn new() -> Self {
        Self {
            prediction_count: AtomicUsize::new(0),
            learn_count: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            latest_latency_us: AtomicUsize::new(0),
            created_at: SystemTime::now(),
        }
    }

    /// Record the outcome of one predict/learn call
    pub fn record(&self, learn: bool, succeeded: bool, elapsed: Duration) {
        if !succeeded {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if learn {
            self.learn_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.prediction_count.fetch_add(1, Ordering::Relaxed);
        }
        self.latest_latency_us
            .store(elapsed.as_micros() as usize, Ordering::Relaxed);
    }

    /// Total successful calls
    pub fn total_calls(&self) -> usize {
        self.prediction_count.load(Ordering::Relaxed) + self.learn_count.load(Ordering::Relaxed)
    }

    pub fn format_stats(&self) -> String {
        format!(
            "Predictions: {} | Learned: {} | Failures: {} | Latency: {}μs",
            self.prediction_count.load(Ordering::Relaxed),
            self.learn_count.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
            self.latest_latency_us.load(Ordering::Relaxed),
        )
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or_default()
            .as_secs()
    }
}

impl Default for LearnerStats {
    fn default() -> Self {
        Self::new()
    }
}
