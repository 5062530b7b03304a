//! Read-transform-write pipeline over a single file.

use crate::rules::{self, apply_rules, LoadError, PatternRule, ResultText, RuleError, RuleSet};
use crate::text::{load_text, save_text, SaveOutcome, SourceText, TextError};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error(transparent)]
    Text(#[from] TextError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Applies an ordered list of [`PatternRule`]s to one file.
#[derive(Debug, Clone)]
pub struct TextPatcher {
    rules: Vec<PatternRule>,
}

/// A file's text before and after the rules ran. Nothing written yet.
#[derive(Debug, Clone)]
pub struct Preview {
    pub source: SourceText,
    pub result: ResultText,
}

impl TextPatcher {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    pub fn from_rule_set(rule_set: &RuleSet) -> Result<Self, PatchError> {
        Ok(Self::new(rules::compile(rule_set)?))
    }

    /// Patcher for the embedded `remove-tabs-wrapper` rule set.
    pub fn builtin() -> Result<Self, PatchError> {
        Self::from_rule_set(&rules::builtin()?)
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Load `path` and run the rules without touching the file.
    pub fn preview(&self, path: impl AsRef<Path>) -> Result<Preview, PatchError> {
        let source = load_text(path)?;
        let result = apply_rules(&source, &self.rules);
        Ok(Preview { source, result })
    }

    /// Load, transform and write back `path`.
    pub fn patch(&self, path: impl AsRef<Path>) -> Result<(ResultText, SaveOutcome), PatchError> {
        let path = path.as_ref();
        let Preview { result, .. } = self.preview(path)?;
        let outcome = save_text(path, &result)?;
        Ok((result, outcome))
    }
}
