use std::borrow::Cow;

use crate::error::{BridgeError, BridgeResult};

/// Ordered, non-empty lines of example text that form one prediction unit.
///
/// Position encodes candidate identity, so lines are kept exactly in the
/// order given. The last line carries the outcome decision; everything
/// before it is context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleGroup<'a> {
    lines: Vec<Cow<'a, str>>,
}

impl<'a> ExampleGroup<'a> {
    /// Build a group from lines, failing with `EmptyGroup` on empty input.
    pub fn new<I, S>(lines: I) -> BridgeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'a, str>>,
    {
        let lines: Vec<Cow<'a, str>> = lines.into_iter().map(Into::into).collect();
        if lines.is_empty() {
            return Err(BridgeError::EmptyGroup);
        }
        Ok(Self { lines })
    }

    /// A group of one line; behaves exactly like a single example.
    pub fn single(line: impl Into<Cow<'a, str>>) -> Self {
        Self {
            lines: vec![line.into()],
        }
    }

    /// Append a candidate or label line at the end of the group.
    pub fn push(&mut self, line: impl Into<Cow<'a, str>>) {
        self.lines.push(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    // Never true: construction rejects empty input.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_multiline(&self) -> bool {
        self.lines.len() > 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.as_ref())
    }

    /// Context lines (all but the last)
    pub fn context(&self) -> impl Iterator<Item = &str> {
        let n = self.lines.len() - 1;
        self.iter().take(n)
    }

    /// The line the outcome decision is made for
    pub fn outcome(&self) -> &str {
        // non-empty by construction
        self.lines[self.lines.len() - 1].as_ref()
    }

    pub fn into_owned(self) -> ExampleGroup<'static> {
        ExampleGroup {
            lines: self.lines.into_iter().map(|l| Cow::Owned(l.into_owned())).collect(),
        }
    }
}

impl<'a> From<&'a str> for ExampleGroup<'a> {
    fn from(line: &'a str) -> Self {
        ExampleGroup::single(line)
    }
}

impl From<String> for ExampleGroup<'static> {
    fn from(line: String) -> Self {
        ExampleGroup::single(line)
    }
}
