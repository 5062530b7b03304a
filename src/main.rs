use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use landing_untab::project::{self, ProjectRoot};
use landing_untab::rules::{self, RuleSet};
use landing_untab::{logging, save_text, ProjectGuard, SaveOutcome, TextPatcher};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "landing-untab")]
#[command(about = "Strip the tabs wrapper from the Payload Landing global", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log rule outcomes and file I/O to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Default)]
struct TargetArgs {
    /// Path to the Payload project root (auto-detected if not specified)
    #[arg(short, long)]
    project: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove the tabs wrapper (default)
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Dry run - show what would be changed without modifying the file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Exit with status 1 if any rule matched nothing
        #[arg(long)]
        strict: bool,
    },

    /// Report whether the wrapper is still present, without writing
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List the rules that would be applied
    Rules,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Apply {
        target: TargetArgs::default(),
        dry_run: false,
        diff: false,
        strict: false,
    });

    match command {
        Commands::Apply {
            target,
            dry_run,
            diff,
            strict,
        } => cmd_apply(target, dry_run, diff, strict),

        Commands::Check { target } => cmd_check(target),

        Commands::Rules => cmd_rules(),
    }
}

/// Helper: Parse the embedded rule set
fn load_rule_set() -> Result<RuleSet> {
    rules::builtin().context("cannot load the embedded rule set")
}

/// Everything a command needs to know about the file it works on
struct Target {
    root: ProjectRoot,
    guard: ProjectGuard,
    file: PathBuf,
    rule_set: RuleSet,
    patcher: TextPatcher,
}

fn resolve_target(args: TargetArgs) -> Result<Target> {
    let root = project::resolve(args.project.as_deref())?;
    let guard = ProjectGuard::new(&root.path)
        .with_context(|| format!("cannot open project root {}", root.path.display()))?;
    let rule_set = load_rule_set()?;
    let patcher = TextPatcher::from_rule_set(&rule_set)?;
    let file = root.path.join(rule_set.target());

    Ok(Target {
        root,
        guard,
        file,
        rule_set,
        patcher,
    })
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn cmd_apply(args: TargetArgs, dry_run: bool, show_diff: bool, strict: bool) -> Result<()> {
    let target = resolve_target(args)?;
    tracing::debug!(
        root = %target.root.path.display(),
        source = %target.root.source,
        file = %target.file.display(),
        "resolved target"
    );

    // 1. Read and transform
    let preview = target
        .patcher
        .preview(&target.file)
        .with_context(|| format!("cannot patch {}", target.file.display()))?;
    target.guard.validate_path(preview.source.path())?;

    let result = preview.result;
    let report = result.report();
    let name = file_name(&target.file);

    for id in report.unmatched() {
        eprintln!(
            "{} {}: pattern not found in {}",
            "⊙".yellow(),
            id,
            name
        );
    }

    // 2. Nothing matched: say so instead of claiming success
    if !result.is_changed() {
        println!(
            "{} No tabs wrapper found in {} (already removed or formatted differently); file left untouched",
            "⊙".yellow(),
            name
        );
        if strict {
            std::process::exit(1);
        }
        return Ok(());
    }

    if show_diff {
        display_diff(&target.file, preview.source.as_str(), result.as_str());
        println!();
    }

    // 3. Write back
    if dry_run {
        println!("{}", "[DRY RUN - file not modified]".cyan());
        for outcome in &report.outcomes {
            println!("  {}", outcome);
        }
    } else {
        target.guard.revalidate(result.origin())?;
        let outcome = save_text(result.origin(), &result)
            .with_context(|| format!("cannot write {}", target.file.display()))?;
        if let SaveOutcome::Written { bytes, .. } = outcome {
            tracing::debug!(bytes, "saved");
        }

        let summary = target
            .rule_set
            .meta
            .summary
            .as_deref()
            .unwrap_or("patched");
        println!("✅ Successfully {} from {}", summary, name);
        if let Some(follow_up) = &target.rule_set.meta.follow_up {
            println!("🔄 Regenerate Payload types with: {}", follow_up);
        }
    }

    if strict && !report.all_matched() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(args: TargetArgs) -> Result<()> {
    let target = resolve_target(args)?;

    println!("{}", "Tabs Wrapper Status".bold());
    println!(
        "Project: {} ({})",
        target.root.path.display(),
        target.root.source
    );
    println!("File: {}", target.file.display());
    println!();

    let preview = target
        .patcher
        .preview(&target.file)
        .with_context(|| format!("cannot read {}", target.file.display()))?;
    let report = preview.result.report();

    for outcome in &report.outcomes {
        if outcome.matched() {
            println!(
                "{} {}: would apply ({} match{})",
                "✗".red(),
                outcome.id,
                outcome.replacements,
                if outcome.replacements == 1 { "" } else { "es" }
            );
        } else {
            println!("{} {}: nothing to do", "✓".green(), outcome.id);
        }
    }

    println!();
    if preview.result.is_changed() {
        println!("{}", "Wrapper still present - run `landing-untab apply`".yellow());
        std::process::exit(1);
    }

    println!("{}", "Clean: no tabs wrapper found".green());
    Ok(())
}

fn cmd_rules() -> Result<()> {
    let rule_set = load_rule_set()?;

    println!(
        "{} ({} rules, target {})",
        rule_set.meta.name.bold(),
        rule_set.rules.len(),
        rule_set.target()
    );
    if let Some(description) = &rule_set.meta.description {
        println!("{}", description.dimmed());
    }
    println!();

    for (idx, rule) in rule_set.rules.iter().enumerate() {
        println!("{}. {}", idx + 1, rule.id.bold());
        if let Some(description) = &rule.description {
            println!("   {}", description);
        }
        println!("   pattern:     {}", rule.pattern.dimmed());
        println!("   replacement: {:?}", rule.replacement);
    }

    Ok(())
}
