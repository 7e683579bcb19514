//! In-process engine double used by the unit tests.
//!
//! Behaves like a tiny linear online learner over hashed string features,
//! understands a handful of engine options to pick its prediction kind, and
//! keeps counters so tests can check that every parsed example is returned
//! and every instance is finished. Features named `__fail__` and
//! `__panic__` make predict/learn fail or panic.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::traits::engine::{
    ActionScore, Introspection, LabelKind, NativeEngine, NativeFailure, PredictionKind, PredictionView,
};

#[derive(Debug, Default)]
pub struct MockCounters {
    /// Parsed examples not yet returned with `finish_example`
    pub live_examples: AtomicIsize,
    pub instances_created: AtomicUsize,
    pub instances_finished: AtomicUsize,
    pub passes_driven: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    pub counters: Arc<MockCounters>,
}

impl MockEngine {
    pub fn live_examples(&self) -> isize {
        self.counters.live_examples.load(Ordering::SeqCst)
    }

    pub fn instances_finished(&self) -> usize {
        self.counters.instances_finished.load(Ordering::SeqCst)
    }

    pub fn passes_driven(&self) -> usize {
        self.counters.passes_driven.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Scalar,
    Probability,
    Topics(u32),
    Multiclass(u32),
    CostSensitive(u32),
    Multilabels(u32),
    ActionScores,
    ActionProbabilities,
    Structured,
}

#[derive(Debug)]
pub struct MockInstance {
    mode: Mode,
    legacy: bool,
    learning_rate: f32,
    passes: u32,
    weights: HashMap<String, f32>,
    final_regressor: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct MockExample {
    label: Option<f32>,
    features: Vec<(String, f32)>,
    scalar: f32,
    scalars: Vec<f32>,
    class: u32,
    labels: Vec<u32>,
    scores: Vec<ActionScore>,
    prob: f32,
}

impl PredictionView for MockExample {
    fn scalar(&self) -> f32 {
        self.scalar
    }

    fn scalars(&self) -> &[f32] {
        &self.scalars
    }

    fn multiclass(&self) -> u32 {
        self.class
    }

    fn multilabels(&self) -> &[u32] {
        &self.labels
    }

    fn action_scores(&self) -> &[ActionScore] {
        &self.scores
    }

    fn probability(&self) -> f32 {
        self.prob
    }
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, NativeFailure> {
    args.get(i + 1)
        .map(|s| s.as_str())
        .ok_or_else(|| NativeFailure::new(format!("the argument '{}' requires a value", flag)))
}

fn number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T, NativeFailure> {
    raw.parse()
        .map_err(|_| NativeFailure::new(format!("invalid value for '{}': {}", flag, raw)))
}

fn load_weights(path: &str) -> Result<HashMap<String, f32>, NativeFailure> {
    let text = fs::read_to_string(path).map_err(|_| NativeFailure::new(format!("can't open: {}", path)))?;
    serde_json::from_str(&text).map_err(|e| NativeFailure::new(format!("corrupt model file {}: {}", path, e)))
}

fn write_weights(weights: &HashMap<String, f32>, path: &Path) -> Result<(), NativeFailure> {
    let json = serde_json::to_string(weights).map_err(|e| NativeFailure::new(e.to_string()))?;
    fs::write(path, json).map_err(|e| NativeFailure::new(format!("can't open: {}: {}", path.display(), e)))
}

impl MockInstance {
    fn dot(&self, example: &MockExample) -> f32 {
        example
            .features
            .iter()
            .map(|(name, value)| self.weights.get(name).copied().unwrap_or(0.0) * value)
            .sum()
    }

    fn check_faults(example: &MockExample) -> Result<(), NativeFailure> {
        for (name, _) in &example.features {
            if name.ends_with("__panic__") {
                panic!("simulated engine fault");
            }
            if name.ends_with("__fail__") {
                return Err(NativeFailure::new("simulated native failure"));
            }
        }
        Ok(())
    }

    fn predict_all(&self, examples: &mut [MockExample]) -> Result<(), NativeFailure> {
        for example in examples.iter() {
            Self::check_faults(example)?;
        }
        let dots: Vec<f32> = examples.iter().map(|e| self.dot(e)).collect();

        for (example, &dot) in examples.iter_mut().zip(&dots) {
            let n = example.features.len() as u32;
            example.scalar = dot;
            example.prob = 1.0 / (1.0 + (-dot).exp());
            match self.mode {
                Mode::Topics(k) => {
                    example.scalars = (1..=k).map(|i| dot * i as f32 / k as f32).collect();
                }
                Mode::Multiclass(k) | Mode::CostSensitive(k) => example.class = 1 + n % k,
                Mode::Multilabels(k) => example.labels = (0..n.min(k)).collect(),
                _ => {}
            }
        }

        if matches!(self.mode, Mode::ActionScores | Mode::ActionProbabilities) {
            let mut order: Vec<usize> = (0..dots.len()).collect();
            // lowest predicted cost first
            order.sort_by(|&a, &b| dots[a].total_cmp(&dots[b]));
            let uniform = 1.0 / dots.len() as f32;
            let ranking: Vec<ActionScore> = order
                .into_iter()
                .map(|i| {
                    let score = if self.mode == Mode::ActionScores { dots[i] } else { uniform };
                    ActionScore::new(i as u32, score)
                })
                .collect();
            if let Some(last) = examples.last_mut() {
                last.scores = ranking;
            }
        }
        Ok(())
    }

    fn update(&mut self, examples: &[MockExample]) {
        if !matches!(self.mode, Mode::Scalar | Mode::Probability | Mode::Topics(_)) {
            return;
        }
        for example in examples {
            let Some(label) = example.label else { continue };
            let norm: f32 = example.features.iter().map(|(_, v)| v * v).sum();
            if norm == 0.0 {
                continue;
            }
            let step = self.learning_rate * (label - self.dot(example)) / norm;
            for (name, value) in &example.features {
                *self.weights.entry(name.clone()).or_insert(0.0) += step * value;
            }
        }
    }
}

impl NativeEngine for MockEngine {
    type Instance = MockInstance;
    type Example = MockExample;

    fn initialize(&self, args: &[String]) -> Result<MockInstance, NativeFailure> {
        let mut instance = MockInstance {
            mode: Mode::Scalar,
            legacy: false,
            learning_rate: 0.5,
            passes: 1,
            weights: HashMap::new(),
            final_regressor: None,
        };

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut consumed = 1;
            match flag {
                "--quiet" | "--binary" | "--invariant" | "--adaptive" => {}
                "--legacy_api" => instance.legacy = true,
                "--cb_adf" => instance.mode = Mode::ActionScores,
                "--cb_explore_adf" => instance.mode = Mode::ActionProbabilities,
                "--search" => {
                    instance.mode = Mode::Structured;
                    consumed = 2;
                }
                "-l" | "--learning_rate" => {
                    instance.learning_rate = number(value_of(args, i, flag)?, flag)?;
                    consumed = 2;
                }
                "--passes" => {
                    instance.passes = number(value_of(args, i, flag)?, flag)?;
                    consumed = 2;
                }
                "--oaa" => {
                    instance.mode = Mode::Multiclass(number(value_of(args, i, flag)?, flag)?);
                    consumed = 2;
                }
                "--csoaa" => {
                    instance.mode = Mode::CostSensitive(number(value_of(args, i, flag)?, flag)?);
                    consumed = 2;
                }
                "--multilabel_oaa" => {
                    instance.mode = Mode::Multilabels(number(value_of(args, i, flag)?, flag)?);
                    consumed = 2;
                }
                "--lda" => {
                    instance.mode = Mode::Topics(number(value_of(args, i, flag)?, flag)?);
                    consumed = 2;
                }
                "--link" => {
                    if value_of(args, i, flag)? == "logistic" {
                        instance.mode = Mode::Probability;
                    }
                    consumed = 2;
                }
                "--loss_function" | "-d" | "--data" | "--random_seed" | "--l1" | "--l2" | "--bit_precision" | "-b" => {
                    value_of(args, i, flag)?;
                    consumed = 2;
                }
                "-i" | "--initial_regressor" => {
                    instance.weights = load_weights(value_of(args, i, flag)?)?;
                    consumed = 2;
                }
                "-f" | "--final_regressor" => {
                    instance.final_regressor = Some(PathBuf::from(value_of(args, i, flag)?));
                    consumed = 2;
                }
                other => return Err(NativeFailure::new(format!("unrecognised option '{}'", other))),
            }
            i += consumed;
        }

        self.counters.instances_created.fetch_add(1, Ordering::SeqCst);
        Ok(instance)
    }

    fn read_example(&self, instance: &mut MockInstance, line: &str) -> Result<MockExample, NativeFailure> {
        let mut example = MockExample::default();
        let Some((head, body)) = line.split_once('|') else {
            if line.trim().is_empty() {
                self.counters.live_examples.fetch_add(1, Ordering::SeqCst);
                return Ok(example);
            }
            return Err(NativeFailure::new("malformed example: no feature section"));
        };

        if let Some(token) = head.split_whitespace().next() {
            match token.parse::<f32>() {
                Ok(label) => example.label = Some(label),
                Err(_) if matches!(instance.mode, Mode::Scalar | Mode::Probability | Mode::Topics(_)) => {
                    return Err(NativeFailure::new(format!("invalid label '{}'", token)));
                }
                Err(_) => {}
            }
        }

        for segment in body.split('|') {
            let mut tokens = segment.split_whitespace();
            let namespace = if segment.starts_with(char::is_whitespace) {
                ""
            } else {
                tokens.next().unwrap_or("")
            };
            let namespace = namespace.split(':').next().unwrap_or("");
            for token in tokens {
                let (name, value) = match token.split_once(':') {
                    Some((name, raw)) => {
                        let value = raw
                            .parse::<f32>()
                            .map_err(|_| NativeFailure::new(format!("invalid feature value in '{}'", token)))?;
                        (name, value)
                    }
                    None => (token, 1.0),
                };
                example.features.push((format!("{}^{}", namespace, name), value));
            }
        }

        self.counters.live_examples.fetch_add(1, Ordering::SeqCst);
        Ok(example)
    }

    fn learn(&self, instance: &mut MockInstance, examples: &mut [MockExample]) -> Result<(), NativeFailure> {
        instance.predict_all(examples)?;
        instance.update(examples);
        Ok(())
    }

    fn predict(&self, instance: &mut MockInstance, examples: &mut [MockExample]) -> Result<(), NativeFailure> {
        instance.predict_all(examples)
    }

    fn finish_example(&self, _instance: &mut MockInstance, _example: MockExample) {
        self.counters.live_examples.fetch_sub(1, Ordering::SeqCst);
    }

    fn finish(&self, instance: MockInstance) -> Result<(), NativeFailure> {
        self.counters.instances_finished.fetch_add(1, Ordering::SeqCst);
        match &instance.final_regressor {
            Some(path) => write_weights(&instance.weights, path),
            None => Ok(()),
        }
    }

    fn save_model(&self, instance: &mut MockInstance, path: &Path) -> Result<(), NativeFailure> {
        write_weights(&instance.weights, path)
    }

    fn num_passes(&self, instance: &MockInstance) -> u32 {
        instance.passes
    }

    fn drive_remaining_passes(&self, instance: &mut MockInstance) -> Result<(), NativeFailure> {
        let remaining = instance.passes.saturating_sub(1) as usize;
        self.counters.passes_driven.fetch_add(remaining, Ordering::SeqCst);
        Ok(())
    }

    fn introspect(&self, instance: &MockInstance) -> Introspection {
        let (kind, label_kind, lda_topics) = match instance.mode {
            Mode::Scalar => (PredictionKind::Scalar, LabelKind::Simple, 0),
            Mode::Probability => (PredictionKind::Probability, LabelKind::Simple, 0),
            Mode::Topics(k) => (PredictionKind::Scalars, LabelKind::Simple, k),
            Mode::Multiclass(_) => (PredictionKind::Multiclass, LabelKind::Multiclass, 0),
            Mode::CostSensitive(_) => (PredictionKind::Multiclass, LabelKind::CostSensitive, 0),
            Mode::Multilabels(_) => (PredictionKind::Multilabels, LabelKind::Multilabel, 0),
            Mode::ActionScores => (PredictionKind::ActionScores, LabelKind::ContextualBandit, 0),
            Mode::ActionProbabilities => (PredictionKind::ActionProbabilities, LabelKind::ContextualBandit, 0),
            Mode::Structured => (PredictionKind::Other, LabelKind::Other, 0),
        };
        Introspection {
            prediction_kind: if instance.legacy { None } else { Some(kind) },
            label_kind,
            lda_topics,
        }
    }
}
