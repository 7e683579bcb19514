//! Learner configuration: raw argument forms plus a typed options layer that
//! renders to the engine's command-line arguments.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Program name placed in argv[0] when expanding a configuration line
pub const PROGRAM_NAME: &str = "vw";

/// Configuration handed to the engine at initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnerArgs {
    /// Whitespace-delimited options, without a program name
    Line(String),
    /// Pre-split argument vector; argv[0] is the program name
    Argv(Vec<String>),
}

impl LearnerArgs {
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            LearnerArgs::Line(line) => std::iter::once(PROGRAM_NAME.to_string())
                .chain(line.split_whitespace().map(str::to_string))
                .collect(),
            LearnerArgs::Argv(argv) => argv.clone(),
        }
    }
}

impl From<&str> for LearnerArgs {
    fn from(line: &str) -> Self {
        LearnerArgs::Line(line.to_string())
    }
}

impl From<String> for LearnerArgs {
    fn from(line: String) -> Self {
        LearnerArgs::Line(line)
    }
}

impl From<Vec<String>> for LearnerArgs {
    fn from(argv: Vec<String>) -> Self {
        LearnerArgs::Argv(argv)
    }
}

impl From<&[&str]> for LearnerArgs {
    fn from(argv: &[&str]) -> Self {
        LearnerArgs::Argv(argv.iter().map(|s| s.to_string()).collect())
    }
}

impl From<LearnerOptions> for LearnerArgs {
    fn from(options: LearnerOptions) -> Self {
        LearnerArgs::Argv(options.to_args())
    }
}

/// Loss function minimized by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    Squared,
    Classic,
    Hinge,
    Logistic,
    Quantile,
    Poisson,
}

impl Loss {
    fn as_arg(&self) -> &'static str {
        match self {
            Loss::Squared => "squared",
            Loss::Classic => "classic",
            Loss::Hinge => "hinge",
            Loss::Logistic => "logistic",
            Loss::Quantile => "quantile",
            Loss::Poisson => "poisson",
        }
    }
}

/// Link function applied to the raw prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    Identity,
    Logistic,
    Glf1,
    Poisson,
}

impl Link {
    fn as_arg(&self) -> &'static str {
        match self {
            Link::Identity => "identity",
            Link::Logistic => "logistic",
            Link::Glf1 => "glf1",
            Link::Poisson => "poisson",
        }
    }
}

/// Gradient update rule switch. Selecting any subset of adaptive,
/// invariant and normalized turns the others off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRule {
    /// Plain SGD: none of the adaptive, invariant or normalized updates
    Sgd,
    Adaptive,
    Invariant,
    Normalized,
}

impl UpdateRule {
    fn as_arg(&self) -> &'static str {
        match self {
            UpdateRule::Sgd => "--sgd",
            UpdateRule::Adaptive => "--adaptive",
            UpdateRule::Invariant => "--invariant",
            UpdateRule::Normalized => "--normalized",
        }
    }
}

/// Typed learner options, rendered to engine arguments by [`to_args`](Self::to_args)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerOptions {
    pub learning_rate: Option<f64>,
    /// Empty keeps the engine default (adaptive, invariant and normalized)
    pub update_rules: Vec<UpdateRule>,
    pub power_t: Option<f64>,
    pub initial_t: Option<f64>,
    pub l1: Option<f64>,
    pub l2: Option<f64>,
    /// Number of bits in the feature table
    pub bit_precision: Option<u32>,
    pub passes: Option<u32>,
    pub loss: Option<Loss>,
    pub link: Option<Link>,
    /// Quantile for the quantile loss, in (0, 1)
    pub quantile_tau: Option<f64>,
    pub min_prediction: Option<f64>,
    pub max_prediction: Option<f64>,
    /// Drop the constant feature
    pub noconstant: bool,
    /// Initial weight of the constant feature
    pub constant: Option<f64>,
    /// Namespace pairs crossed into quadratic features
    pub quadratic: Vec<(String, String)>,
    pub cubic: Vec<(String, String, String)>,
    /// Free-form interaction specs, e.g. `abc` or `a:b:c`
    pub interactions: Vec<String>,
    /// N-grams per namespace
    pub ngram: Vec<(String, u32)>,
    /// Skip-grams per namespace
    pub skips: Vec<(String, u32)>,
    /// Low-rank quadratic (field-aware) of rank k over the given namespaces
    pub lrqfa: Vec<(String, String, u32)>,
    /// Follow-the-regularized-leader optimization
    pub ftrl: bool,
    /// Model whose non-zero weights select the features to use
    pub feature_mask: Option<PathBuf>,
    /// Predict only; labels are ignored
    pub testonly: bool,
    pub random_seed: Option<u64>,
    /// Model to load weights from
    pub initial_regressor: Option<PathBuf>,
    /// Where the engine writes the model on close
    pub final_regressor: Option<PathBuf>,
    /// Training data source, needed for multi-pass training
    pub data: Option<PathBuf>,
    pub cache_file: Option<PathBuf>,
    /// Human-readable model dump written on close
    pub readable_model: Option<PathBuf>,
    /// Readable model with feature names instead of hashes
    pub invert_hash: Option<PathBuf>,
    /// Suppress the engine's progress output
    pub quiet: bool,
    /// Raw arguments appended verbatim
    pub extra_args: Vec<String>,
}

impl Default for LearnerOptions {
    fn default() -> Self {
        Self {
            learning_rate: None,
            update_rules: Vec::new(),
            power_t: None,
            initial_t: None,
            l1: None,
            l2: None,
            bit_precision: None,
            passes: None,
            loss: None,
            link: None,
            quantile_tau: None,
            min_prediction: None,
            max_prediction: None,
            noconstant: false,
            constant: None,
            quadratic: Vec::new(),
            cubic: Vec::new(),
            interactions: Vec::new(),
            ngram: Vec::new(),
            skips: Vec::new(),
            lrqfa: Vec::new(),
            ftrl: false,
            feature_mask: None,
            testonly: false,
            random_seed: None,
            initial_regressor: None,
            final_regressor: None,
            data: None,
            cache_file: None,
            readable_model: None,
            invert_hash: None,
            quiet: true,
            extra_args: Vec::new(),
        }
    }
}

impl LearnerOptions {
    /// Parse options from a JSON document
    pub fn from_json_str(json: &str) -> BridgeResult<Self> {
        let options: LearnerOptions = serde_json::from_str(json)
            .map_err(|e| BridgeError::Initialization(format!("Invalid learner options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            BridgeError::Initialization(format!("Cannot read options file {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if let Some(rate) = self.learning_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(BridgeError::Initialization(format!("Learning rate must be positive, got {}", rate)));
            }
        }
        for (name, value) in [("l1", self.l1), ("l2", self.l2)] {
            if let Some(v) = value {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(BridgeError::Initialization(format!("{} regularization must be non-negative, got {}", name, v)));
                }
            }
        }
        if let Some(bits) = self.bit_precision {
            if !(1..=32).contains(&bits) {
                return Err(BridgeError::Initialization(format!("Bit precision must be in 1..=32, got {}", bits)));
            }
        }
        if let Some(tau) = self.quantile_tau {
            if !(tau > 0.0 && tau < 1.0) {
                return Err(BridgeError::Initialization(format!("Quantile tau must be in (0, 1), got {}", tau)));
            }
        }
        if let (Some(min), Some(max)) = (self.min_prediction, self.max_prediction) {
            if min > max {
                return Err(BridgeError::Initialization(format!(
                    "Minimum prediction {} is above maximum prediction {}",
                    min, max
                )));
            }
        }
        if self.noconstant && self.constant.is_some() {
            return Err(BridgeError::Initialization(
                "noconstant and constant cannot be combined".to_string(),
            ));
        }
        let namespaces = self
            .quadratic
            .iter()
            .flat_map(|(a, b)| [a, b])
            .chain(self.cubic.iter().flat_map(|(a, b, c)| [a, b, c]))
            .chain(self.ngram.iter().map(|(ns, _)| ns))
            .chain(self.skips.iter().map(|(ns, _)| ns))
            .chain(self.lrqfa.iter().flat_map(|(a, b, _)| [a, b]));
        for namespace in namespaces {
            if namespace.is_empty() || namespace.chars().any(char::is_whitespace) {
                return Err(BridgeError::Initialization(format!("Bad namespace name {:?}", namespace)));
            }
        }
        if self.ngram.iter().any(|(_, n)| *n == 0) {
            return Err(BridgeError::Initialization("N-gram size must be at least 1".to_string()));
        }
        if self.lrqfa.iter().any(|(_, _, k)| *k == 0) {
            return Err(BridgeError::Initialization("lrqfa rank must be at least 1".to_string()));
        }
        if self.passes == Some(0) {
            return Err(BridgeError::Initialization("Number of passes must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Render to an argument vector, program name first
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![PROGRAM_NAME.to_string()];
        let mut push = |flag: &str, value: String| {
            args.push(flag.to_string());
            args.push(value);
        };

        if let Some(v) = self.learning_rate {
            push("--learning_rate", v.to_string());
        }
        if let Some(v) = self.power_t {
            push("--power_t", v.to_string());
        }
        if let Some(v) = self.initial_t {
            push("--initial_t", v.to_string());
        }
        if let Some(v) = self.l1 {
            push("--l1", v.to_string());
        }
        if let Some(v) = self.l2 {
            push("--l2", v.to_string());
        }
        if let Some(v) = self.bit_precision {
            push("--bit_precision", v.to_string());
        }
        if let Some(v) = self.passes {
            push("--passes", v.to_string());
        }
        if let Some(v) = self.loss {
            push("--loss_function", v.as_arg().to_string());
        }
        if let Some(v) = self.link {
            push("--link", v.as_arg().to_string());
        }
        if let Some(v) = self.quantile_tau {
            push("--quantile_tau", v.to_string());
        }
        if let Some(v) = self.min_prediction {
            push("--min_prediction", v.to_string());
        }
        if let Some(v) = self.max_prediction {
            push("--max_prediction", v.to_string());
        }
        if let Some(v) = self.constant {
            push("--constant", v.to_string());
        }
        for (a, b) in &self.quadratic {
            push("--quadratic", format!("{}{}", a, b));
        }
        for (a, b, c) in &self.cubic {
            push("--cubic", format!("{}{}{}", a, b, c));
        }
        for spec in &self.interactions {
            push("--interactions", spec.clone());
        }
        for (ns, n) in &self.ngram {
            push("--ngram", format!("{}{}", ns, n));
        }
        for (ns, n) in &self.skips {
            push("--skips", format!("{}{}", ns, n));
        }
        for (a, b, k) in &self.lrqfa {
            push("--lrqfa", format!("{}{}{}", a, b, k));
        }
        if let Some(p) = &self.feature_mask {
            push("--feature_mask", p.display().to_string());
        }
        if let Some(v) = self.random_seed {
            push("--random_seed", v.to_string());
        }
        if let Some(p) = &self.initial_regressor {
            push("--initial_regressor", p.display().to_string());
        }
        if let Some(p) = &self.final_regressor {
            push("--final_regressor", p.display().to_string());
        }
        if let Some(p) = &self.data {
            push("--data", p.display().to_string());
        }
        if let Some(p) = &self.cache_file {
            push("--cache_file", p.display().to_string());
        }
        if let Some(p) = &self.readable_model {
            push("--readable_model", p.display().to_string());
        }
        if let Some(p) = &self.invert_hash {
            push("--invert_hash", p.display().to_string());
        }
        for rule in &self.update_rules {
            args.push(rule.as_arg().to_string());
        }
        for (flag, on) in [("--noconstant", self.noconstant), ("--ftrl", self.ftrl), ("--testonly", self.testonly)] {
            if on {
                args.push(flag.to_string());
            }
        }
        if self.quiet {
            args.push("--quiet".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Options as one configuration line, without the program name
    pub fn to_line(&self) -> String {
        self.to_args()[1..].join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_is_split_on_whitespace() {
        let args = LearnerArgs::from("  --oaa 3\t--quiet  ");
        assert_eq!(args.to_argv(), vec!["vw", "--oaa", "3", "--quiet"]);

        let args = LearnerArgs::from("");
        assert_eq!(args.to_argv(), vec!["vw"]);
    }

    #[test]
    fn test_argv_passes_through() {
        let argv: &[&str] = &["vw", "--cb", "4"];
        let args = LearnerArgs::from(argv);
        assert_eq!(args.to_argv(), vec!["vw", "--cb", "4"]);
    }

    #[test]
    fn test_options_render_args() {
        let options = LearnerOptions {
            learning_rate: Some(0.5),
            l2: Some(0.001),
            passes: Some(3),
            loss: Some(Loss::Logistic),
            link: Some(Link::Logistic),
            extra_args: vec!["--binary".to_string()],
            ..Default::default()
        };
        assert_eq!(
            options.to_args(),
            vec![
                "vw", "--learning_rate", "0.5", "--l2", "0.001", "--passes", "3",
                "--loss_function", "logistic", "--link", "logistic", "--quiet", "--binary",
            ]
        );
        assert_eq!(options.to_line(), "--learning_rate 0.5 --l2 0.001 --passes 3 --loss_function logistic --link logistic --quiet --binary");
    }

    #[test]
    fn test_update_rules_and_feature_options_render_args() {
        let options = LearnerOptions {
            update_rules: vec![UpdateRule::Adaptive, UpdateRule::Normalized],
            loss: Some(Loss::Quantile),
            quantile_tau: Some(0.25),
            min_prediction: Some(-1.0),
            max_prediction: Some(1.0),
            noconstant: true,
            quadratic: vec![("user".to_string(), "item".to_string())],
            cubic: vec![("a".to_string(), "b".to_string(), "c".to_string())],
            interactions: vec!["abd".to_string()],
            ngram: vec![("t".to_string(), 2)],
            skips: vec![("t".to_string(), 1)],
            lrqfa: vec![("u".to_string(), "i".to_string(), 5)],
            ftrl: true,
            testonly: true,
            quiet: false,
            ..Default::default()
        };
        assert_eq!(
            options.to_args(),
            vec![
                "vw", "--loss_function", "quantile", "--quantile_tau", "0.25",
                "--min_prediction", "-1", "--max_prediction", "1",
                "--quadratic", "useritem", "--cubic", "abc", "--interactions", "abd",
                "--ngram", "t2", "--skips", "t1", "--lrqfa", "ui5",
                "--adaptive", "--normalized", "--noconstant", "--ftrl", "--testonly",
            ]
        );
    }

    #[test]
    fn test_sgd_and_debug_outputs_render_args() {
        let options = LearnerOptions {
            update_rules: vec![UpdateRule::Sgd],
            constant: Some(0.5),
            feature_mask: Some(PathBuf::from("mask.model")),
            readable_model: Some(PathBuf::from("model.txt")),
            invert_hash: Some(PathBuf::from("model.inv")),
            ..Default::default()
        };
        assert_eq!(
            options.to_args(),
            vec![
                "vw", "--constant", "0.5", "--feature_mask", "mask.model",
                "--readable_model", "model.txt", "--invert_hash", "model.inv", "--sgd", "--quiet",
            ]
        );
    }

    #[test]
    fn test_feature_options_validation() {
        let bad = [
            r#"{"quantile_tau": 1.5}"#,
            r#"{"min_prediction": 2.0, "max_prediction": 1.0}"#,
            r#"{"noconstant": true, "constant": 1.0}"#,
            r#"{"quadratic": [["a", ""]]}"#,
            r#"{"ngram": [["t", 0]]}"#,
            r#"{"lrqfa": [["u", "i", 0]]}"#,
        ];
        for json in bad {
            let err = LearnerOptions::from_json_str(json).unwrap_err();
            assert!(matches!(err, BridgeError::Initialization(_)), "accepted {}", json);
        }

        let options = LearnerOptions::from_json_str(
            r#"{"update_rules": ["invariant"], "quadratic": [["a", "b"]], "ngram": [["t", 3]]}"#,
        )
        .unwrap();
        assert_eq!(options.update_rules, vec![UpdateRule::Invariant]);
        assert_eq!(options.to_line(), "--quadratic ab --ngram t3 --invariant --quiet");
    }

    #[test]
    fn test_default_options_are_quiet() {
        assert_eq!(LearnerOptions::default().to_args(), vec!["vw", "--quiet"]);
    }

    #[test]
    fn test_options_from_json() {
        let options = LearnerOptions::from_json_str(
            r#"{"learning_rate": 0.1, "loss": "squared", "quiet": false, "extra_args": ["--oaa", "3"]}"#,
        )
        .unwrap();
        assert_eq!(options.learning_rate, Some(0.1));
        assert_eq!(options.loss, Some(Loss::Squared));
        assert!(!options.quiet);
        assert_eq!(options.to_args(), vec!["vw", "--learning_rate", "0.1", "--loss_function", "squared", "--oaa", "3"]);
    }

    #[test]
    fn test_options_validation() {
        let err = LearnerOptions::from_json_str(r#"{"learning_rate": -1.0}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Initialization(msg) if msg.contains("Learning rate")));

        let err = LearnerOptions::from_json_str(r#"{"l1": -0.5}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Initialization(msg) if msg.contains("l1")));

        let err = LearnerOptions::from_json_str(r#"{"bit_precision": 40}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Initialization(_)));

        let err = LearnerOptions::from_json_str(r#"{"passes": 0}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Initialization(_)));

        let err = LearnerOptions::from_json_str("not json").unwrap_err();
        assert!(matches!(err, BridgeError::Initialization(msg) if msg.contains("Invalid learner options")));
    }

    #[test]
    fn test_options_from_missing_file() {
        let err = LearnerOptions::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, BridgeError::Initialization(msg) if msg.contains("Cannot read options file")));
    }

    #[test]
    fn test_options_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, r#"{"passes": 2, "data": "train.txt"}"#).unwrap();
        let options = LearnerOptions::from_json_file(&path).unwrap();
        assert_eq!(options.passes, Some(2));
        assert_eq!(options.data, Some(PathBuf::from("train.txt")));
    }
}
