use crate::rules::schema::{RuleSet, ValidationError};
use thiserror::Error;

/// The `remove-tabs-wrapper` rule set, compiled into the binary.
pub const BUILTIN_RULES: &str = include_str!("../../rules/remove-tabs-wrapper.toml");

/// The embedded rule set failed to parse or validate.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("built-in rule set is not valid TOML: {0}")]
    Toml(#[from] toml_edit::de::Error),

    #[error("built-in rule set is invalid: {0}")]
    Validation(#[from] ValidationError),
}

/// Parse and validate the embedded rule set.
pub fn builtin() -> Result<RuleSet, LoadError> {
    parse(BUILTIN_RULES)
}

fn parse(input: &str) -> Result<RuleSet, LoadError> {
    let rule_set: RuleSet = toml_edit::de::from_str(input)?;
    rule_set.validate()?;
    Ok(rule_set)
}
