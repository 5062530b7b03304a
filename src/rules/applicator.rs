//! Rule applicator - runs an ordered list of pattern rules over a text
//!
//! Each rule sees the output of the previous one. A rule whose pattern is
//! not found leaves the text alone; that is recorded in the report, never
//! raised as an error.

use crate::rules::schema::{RuleDefinition, RuleSet};
use crate::text::SourceText;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{id}' has an invalid pattern: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled match-and-replace rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    id: String,
    regex: Regex,
    replacement: String,
}

impl PatternRule {
    pub fn new(
        id: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        let regex = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
            id: id.clone(),
            source,
        })?;
        Ok(Self {
            id,
            regex,
            replacement: replacement.into(),
        })
    }

    pub fn from_definition(definition: &RuleDefinition) -> Result<Self, RuleError> {
        Self::new(
            definition.id.clone(),
            &definition.pattern,
            definition.replacement.clone(),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Replace every match in `text`, returning the new text and the match count.
    pub fn apply<'t>(&self, text: &'t str) -> (Cow<'t, str>, usize) {
        let mut count = 0;
        let replaced = self.regex.replace_all(text, |caps: &Captures<'_>| {
            count += 1;
            let mut expanded = String::new();
            caps.expand(&self.replacement, &mut expanded);
            expanded
        });
        (replaced, count)
    }
}

/// Compile every rule of a rule set, in order.
pub fn compile(rule_set: &RuleSet) -> Result<Vec<PatternRule>, RuleError> {
    rule_set
        .rules
        .iter()
        .map(PatternRule::from_definition)
        .collect()
}

/// What one rule did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub id: String,
    pub replacements: usize,
}

impl RuleOutcome {
    pub fn matched(&self) -> bool {
        self.replacements > 0
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.replacements {
            0 => write!(f, "{}: no match", self.id),
            1 => write!(f, "{}: 1 replacement", self.id),
            n => write!(f, "{}: {} replacements", self.id, n),
        }
    }
}

/// Per-rule outcomes, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub outcomes: Vec<RuleOutcome>,
}

impl TransformReport {
    pub fn all_matched(&self) -> bool {
        self.outcomes.iter().all(RuleOutcome::matched)
    }

    pub fn any_matched(&self) -> bool {
        self.outcomes.iter().any(RuleOutcome::matched)
    }

    /// Ids of rules that found nothing to replace.
    pub fn unmatched(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| !o.matched())
            .map(|o| o.id.as_str())
    }
}

/// Text produced by running the rules over a [`SourceText`].
///
/// Remembers where the source came from so it can only be written back there.
#[derive(Debug, Clone)]
pub struct ResultText {
    origin: PathBuf,
    origin_hash: u64,
    content: String,
    changed: bool,
    report: TransformReport,
}

impl ResultText {
    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn origin_hash(&self) -> u64 {
        self.origin_hash
    }

    /// Whether the text differs from the source.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn report(&self) -> &TransformReport {
        &self.report
    }

    pub fn into_string(self) -> String {
        self.content
    }
}

/// Apply `rules` in order, each to the output of the previous one.
pub fn apply_rules(text: &SourceText, rules: &[PatternRule]) -> ResultText {
    let mut current = text.as_str().to_owned();
    let mut outcomes = Vec::with_capacity(rules.len());

    for rule in rules {
        let (replaced, count) = rule.apply(&current);
        let replaced = match replaced {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(next) = replaced {
            current = next;
        }

        if count == 0 {
            warn!(
                rule = rule.id(),
                path = %text.path().display(),
                "pattern matched nothing, text left unchanged"
            );
        } else {
            debug!(rule = rule.id(), replacements = count, "rule applied");
        }

        outcomes.push(RuleOutcome {
            id: rule.id().to_string(),
            replacements: count,
        });
    }

    let changed = current != text.as_str();

    ResultText {
        origin: text.path().to_path_buf(),
        origin_hash: text.hash(),
        content: current,
        changed,
        report: TransformReport { outcomes },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::loader::builtin;

    const OPENING: &str = "fields: [\n\t\t{\n\t\t\ttype: 'tabs',\n\t\t\ttabs: [\n\t\t\t\t{\n\t\t\t\t\tlabel: 'Contenu',\n\t\t\t\t\tfields: [";
    const CLOSING: &str = "\t\t\t\t\t},\n\t\t\t\t],\n\t\t\t},\n\t\t],\n\t},\n\t],\n}";
    const SHORT_CLOSING: &str = "\t},\n\t],\n}";
    const BODY: &str = "\n\t{\n\t\tname: 'hero',\n\t\ttype: 'text',\n";

    fn builtin_rules() -> Vec<PatternRule> {
        compile(&builtin().unwrap()).unwrap()
    }

    fn source(content: &str) -> SourceText {
        SourceText::new("src/globals/Landing.ts", content)
    }

    #[test]
    fn strips_wrapper_and_keeps_body() {
        let input = format!("export const Landing = {{\n\t{OPENING}{BODY}{CLOSING}");
        let result = apply_rules(&source(&input), &builtin_rules());

        assert_eq!(
            result.as_str(),
            format!("export const Landing = {{\n\tfields: [{BODY}{SHORT_CLOSING}")
        );
        assert!(result.is_changed());
        assert!(result.report().all_matched());
    }

    #[test]
    fn trailing_newline_is_preserved() {
        let input = format!("{OPENING}{BODY}{CLOSING}\n");
        let result = apply_rules(&source(&input), &builtin_rules());
        assert_eq!(result.as_str(), format!("fields: [{BODY}{SHORT_CLOSING}\n"));
    }

    #[test]
    fn blank_lines_after_closing_still_match() {
        let input = format!("{OPENING}\n\tx\n{CLOSING}\n\n");
        let result = apply_rules(&source(&input), &builtin_rules());

        assert_eq!(result.as_str(), format!("fields: [\n\tx\n{SHORT_CLOSING}\n\n"));
        assert!(result.report().all_matched());
    }

    #[test]
    fn second_run_is_a_no_op() {
        let input = format!("{OPENING}{BODY}{CLOSING}\n");
        let first = apply_rules(&source(&input), &builtin_rules());
        let second = apply_rules(&source(first.as_str()), &builtin_rules());

        assert_eq!(second.as_str(), first.as_str());
        assert!(!second.is_changed());
        assert!(!second.report().any_matched());
    }

    #[test]
    fn missing_opening_leaves_opening_untouched() {
        let input = format!("fields: [{BODY}{CLOSING}");
        let result = apply_rules(&source(&input), &builtin_rules());

        assert_eq!(result.as_str(), format!("fields: [{BODY}{SHORT_CLOSING}"));
        let unmatched: Vec<_> = result.report().unmatched().collect();
        assert_eq!(unmatched, ["strip-tabs-opening"]);
    }

    #[test]
    fn missing_closing_leaves_closing_untouched() {
        let input = format!("{OPENING}{BODY}\t}},\n\t],\n}}\n");
        let result = apply_rules(&source(&input), &builtin_rules());

        assert_eq!(result.as_str(), format!("fields: [{BODY}\t}},\n\t],\n}}\n"));
        let unmatched: Vec<_> = result.report().unmatched().collect();
        assert_eq!(unmatched, ["strip-tabs-closing"]);
    }

    #[test]
    fn closing_is_anchored_to_end_of_text() {
        let input = format!("{OPENING}{BODY}{CLOSING}\n// trailing comment\n");
        let result = apply_rules(&source(&input), &builtin_rules());

        assert!(result.as_str().contains(CLOSING));
        assert_eq!(result.report().outcomes[1].replacements, 0);
    }

    #[test]
    fn reindented_input_does_not_match() {
        let spaced = OPENING.replace('\t', "  ");
        let input = format!("{spaced}{BODY}");
        let result = apply_rules(&source(&input), &builtin_rules());

        assert_eq!(result.as_str(), input);
        assert!(!result.is_changed());
    }

    #[test]
    fn rules_run_in_order_on_previous_output() {
        let rules = vec![
            PatternRule::new("a-to-b", "a", "b").unwrap(),
            PatternRule::new("b-to-c", "b", "c").unwrap(),
        ];
        let result = apply_rules(&source("aab"), &rules);

        assert_eq!(result.as_str(), "ccc");
        assert_eq!(
            result.report().outcomes,
            vec![
                RuleOutcome {
                    id: "a-to-b".into(),
                    replacements: 2,
                },
                RuleOutcome {
                    id: "b-to-c".into(),
                    replacements: 3,
                },
            ]
        );
    }

    #[test]
    fn replacement_expands_named_captures() {
        let rule = PatternRule::new("swap", r"(?P<k>\w+)=(?P<v>\w+)", "${v}=${k}").unwrap();
        let (out, count) = rule.apply("a=1 b=2");
        assert_eq!(out, "1=a 2=b");
        assert_eq!(count, 2);
    }

    #[test]
    fn invalid_pattern_names_the_rule() {
        let err = PatternRule::new("broken", "(", "").unwrap_err();
        assert!(err.to_string().starts_with("rule 'broken' has an invalid pattern"));
    }

    #[test]
    fn result_remembers_origin() {
        let text = source("abc");
        let result = apply_rules(&text, &[]);
        assert_eq!(result.origin(), Path::new("src/globals/Landing.ts"));
        assert_eq!(result.origin_hash(), text.hash());
        assert_eq!(result.into_string(), "abc");
    }

    #[test]
    fn outcome_display() {
        let outcome = RuleOutcome {
            id: "strip-tabs-opening".into(),
            replacements: 0,
        };
        assert_eq!(outcome.to_string(), "strip-tabs-opening: no match");
        let outcome = RuleOutcome {
            id: "x".into(),
            replacements: 1,
        };
        assert_eq!(outcome.to_string(), "x: 1 replacement");
    }
}
