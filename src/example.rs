//! Builder for example text in the engine's input format:
//! `[label] [importance] ['tag]|namespace[:weight] feature[:value] ...`

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::{BridgeError, BridgeResult};

fn is_control(c: char) -> bool {
    c.is_whitespace() || c == ':' || c == '|'
}

fn check_name(text: &str, message: impl FnOnce() -> String) -> BridgeResult<()> {
    if text.chars().any(is_control) {
        return Err(BridgeError::ExampleFormat {
            line: text.to_string(),
            message: message(),
        });
    }
    Ok(())
}

fn check_finite(value: f64, what: &str) -> BridgeResult<()> {
    if !value.is_finite() {
        return Err(BridgeError::ExampleFormat {
            line: value.to_string(),
            message: format!("{} must be finite", what),
        });
    }
    Ok(())
}

/// Features of one namespace
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceBuilder {
    name: String,
    weight: Option<f64>,
    features: Vec<String>,
}

impl NamespaceBuilder {
    /// Global scaling of every feature value in this namespace (default 1)
    pub fn weight(&mut self, weight: f64) -> BridgeResult<&mut Self> {
        check_finite(weight, "Namespace weight")?;
        self.weight = Some(weight);
        Ok(self)
    }

    /// Categorical feature such as a user or item id
    pub fn categorical(&mut self, feature: impl Display) -> BridgeResult<&mut Self> {
        let feature = feature.to_string();
        check_name(&feature, || format!("Bad feature name in namespace {}", self.name))?;
        self.features.push(feature);
        Ok(self)
    }

    /// Categorical feature rendered as `sub_namespace=value`
    pub fn categorical_in(&mut self, sub_namespace: &str, value: impl Display) -> BridgeResult<&mut Self> {
        self.categorical(format!("{}={}", sub_namespace, value))
    }

    /// Numerical feature, e.g. a rate or a tf-idf weight
    pub fn numerical(&mut self, name: &str, value: f64) -> BridgeResult<&mut Self> {
        check_name(name, || format!("Bad feature name in namespace {}", self.name))?;
        check_finite(value, "Feature value")?;
        self.features.push(format!("{}:{}", name, value));
        Ok(self)
    }

    /// Raw text; every run of control characters becomes one separator.
    pub fn text(&mut self, text: &str) -> &mut Self {
        let words = text.split(is_control).filter(|w| !w.is_empty());
        self.features.extend(words.map(str::to_string));
        self
    }
}

impl Display for NamespaceBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "|{}", self.name)?;
        if let Some(weight) = self.weight {
            write!(f, ":{}", weight)?;
        }
        for feature in &self.features {
            write!(f, " {}", feature)?;
        }
        Ok(())
    }
}

/// Builds one line of example text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleBuilder {
    label: Option<String>,
    importance: Option<f64>,
    tag: Option<String>,
    namespaces: Vec<NamespaceBuilder>,
    skip_namespace_check: bool,
}

impl ExampleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow several namespaces sharing a first character. Options that
    /// select namespaces (interactions, `--keep`, ...) only look at the
    /// first character, so by default this is rejected.
    pub fn without_namespace_check() -> Self {
        Self {
            skip_namespace_check: true,
            ..Self::default()
        }
    }

    pub fn label(&mut self, label: f64) -> BridgeResult<&mut Self> {
        check_finite(label, "Label")?;
        self.label = Some(label.to_string());
        Ok(self)
    }

    /// `1` / `-1` labels as used with logistic and hinge loss
    pub fn binary_label(&mut self, positive: bool) -> &mut Self {
        self.label = Some(if positive { "1" } else { "-1" }.to_string());
        self
    }

    /// Label text used verbatim, e.g. multiclass or bandit labels
    pub fn label_text(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    /// Without a label the engine only predicts
    pub fn omit_label(&mut self) -> &mut Self {
        self.label = None;
        self
    }

    /// Numeric value of the label, if it has one
    pub fn label_value(&self) -> Option<f64> {
        self.label.as_deref().and_then(|l| l.parse().ok())
    }

    /// Relative importance of this example (default 1)
    pub fn importance(&mut self, importance: f64) -> BridgeResult<&mut Self> {
        check_finite(importance, "Example importance")?;
        self.importance = Some(importance);
        Ok(self)
    }

    /// Identifier reported back with predictions; need not be unique
    pub fn tag(&mut self, tag: &str) -> BridgeResult<&mut Self> {
        check_name(tag, || "Incorrect tag".to_string())?;
        self.tag = Some(tag.to_string());
        Ok(self)
    }

    pub fn tag_value(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Start a namespace and return it for adding features.
    pub fn namespace(&mut self, name: &str) -> BridgeResult<&mut NamespaceBuilder> {
        let Some(first) = name.chars().next() else {
            return Err(BridgeError::ExampleFormat {
                line: String::new(),
                message: "Namespace should not be empty".to_string(),
            });
        };
        check_name(name, || "Bad namespace name".to_string())?;
        if !self.skip_namespace_check {
            let taken: HashSet<char> = self
                .namespaces
                .iter()
                .filter_map(|ns| ns.name.chars().next())
                .collect();
            if taken.contains(&first) {
                let clash = self
                    .namespaces
                    .iter()
                    .find(|ns| ns.name.starts_with(first))
                    .map(|ns| ns.name.clone())
                    .unwrap_or_default();
                return Err(BridgeError::ExampleFormat {
                    line: name.to_string(),
                    message: format!(
                        "Namespaces must start with unique characters; {} and {} both start with '{}'",
                        name, clash, first
                    ),
                });
            }
        }
        self.namespaces.push(NamespaceBuilder {
            name: name.to_string(),
            weight: None,
            features: Vec::new(),
        });
        let last = self.namespaces.len() - 1;
        Ok(&mut self.namespaces[last])
    }

    pub fn build(&self) -> String {
        self.to_string()
    }
}

impl Display for ExampleBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(label) = &self.label {
            f.write_str(label)?;
        }
        f.write_str(" ")?;
        if let Some(importance) = self.importance {
            write!(f, "{} ", importance)?;
        }
        if let Some(tag) = &self.tag {
            write!(f, "'{}", tag)?;
        }
        for (i, namespace) in self.namespaces.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", namespace)?;
        }
        Ok(())
    }
}
