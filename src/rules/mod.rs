pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{
    apply_rules, compile, PatternRule, ResultText, RuleError, RuleOutcome, TransformReport,
};
pub use loader::{builtin, LoadError, BUILTIN_RULES};
pub use schema::{
    RuleDefinition, RuleMeta, RuleSet, ValidationError, ValidationIssue, DEFAULT_TARGET,
};
