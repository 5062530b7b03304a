//! Landing Untab: strips the tabs wrapper from a Payload CMS Landing global
//!
//! A one-shot patcher that reads `src/globals/Landing.ts`, collapses the
//! single-tab `Contenu` wrapper around its fields with two ordered regex
//! rules, and writes the result back in place.
//!
//! # Architecture
//!
//! The flow is linear: [`load_text`] takes a [`SourceText`] snapshot,
//! [`apply_rules`] runs each [`PatternRule`] over the output of the previous
//! one and yields a [`ResultText`], and [`save_text`] writes that back to the
//! path it came from. [`TextPatcher`] bundles the three steps.
//!
//! Rules are plain text layouts, not a parse of the TypeScript. A rule whose
//! pattern is absent leaves the text untouched and shows up as unmatched in
//! the [`TransformReport`]; it is never an error.
//!
//! # Safety
//!
//! - Atomic writes (tempfile + fsync + rename), original permissions kept
//! - Write refused if the file changed since it was read
//! - Missing files are reported, never created
//! - Targets confined to the project root, away from `node_modules` and friends
//!
//! # Example
//!
//! ```no_run
//! use landing_untab::TextPatcher;
//!
//! let patcher = TextPatcher::builtin()?;
//! let (result, _) = patcher.patch("src/globals/Landing.ts")?;
//! for outcome in &result.report().outcomes {
//!     println!("{outcome}");
//! }
//! # Ok::<(), landing_untab::PatchError>(())
//! ```

pub mod logging;
pub mod patcher;
pub mod project;
pub mod rules;
pub mod safety;
pub mod text;

// Re-exports
pub use patcher::{PatchError, Preview, TextPatcher};
pub use project::{ProjectError, ProjectRoot, RootSource};
pub use rules::{
    apply_rules, LoadError, PatternRule, ResultText, RuleError, RuleOutcome, RuleSet,
    TransformReport,
};
pub use safety::{ProjectGuard, SafetyError};
pub use text::{load_text, save_text, SaveOutcome, SourceText, TextError};
