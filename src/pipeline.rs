//! Pipeline entry points.
//!
//! Each flavor walks a source root, rewrites every accepted file with one
//! rule set, and mirrors the result under a destination root. The barrel
//! regenerator works on a single file instead and lives in [`crate::barrel`].

use std::path::Path;
use std::sync::Mutex;

use dualgen_core::config::Config;
use dualgen_core::error::{DualgenError, DualgenResult};
use dualgen_core::output::{FileAction, RunReport};
use dualgen_core::types::Warning;
use dualgen_core::walk::{resolve_path, walk_tree, FileJob, UnmatchedPolicy, WalkOptions};
use dualgen_cst::visitor::{rewrite_module, RewriteContext, RuleSet};
use dualgen_cst::{parse_module, prettify_error, Codegen, CodegenState, Dialect};

use crate::barrel::BarrelOptions;
use crate::rules::{annotation_rules, async_removal_rules, enum_rules, AnnotationOptions};

pub use crate::barrel::regenerate_barrel;

/// Derive the blocking variant of the tree at `src` into `dst`.
///
/// Files without a recognized extension are not mirrored.
pub fn remove_async(src: &Path, dst: &Path, exclude: &[String]) -> DualgenResult<RunReport> {
    let options = walk_options(exclude, UnmatchedPolicy::Skip)?;
    run_flavor("sync", src, dst, &options, &async_removal_rules())
}

/// Project the tree at `src` into Flow-annotated files under `dst`.
///
/// Every other file is copied byte-for-byte.
pub fn project_annotations(
    src: &Path,
    dst: &Path,
    exclude: &[String],
    options: &AnnotationOptions,
) -> DualgenResult<RunReport> {
    let walk = walk_options(exclude, UnmatchedPolicy::Copy)?;
    run_flavor(
        "annotations",
        src,
        dst,
        &walk,
        &annotation_rules(options.clone()),
    )
}

/// Rewrite `...Enum` declarations in the tree at `src` into literal-tagged
/// values plus union aliases under `dst`.
pub fn synthesize_enum_unions(
    src: &Path,
    dst: &Path,
    exclude: &[String],
) -> DualgenResult<RunReport> {
    let options = walk_options(exclude, UnmatchedPolicy::Skip)?;
    run_flavor("enums", src, dst, &options, &enum_rules())
}

/// Run every job configured in `config`: sync, annotations, enums, then
/// barrels. Stops at the first error.
pub fn run_config(config: &Config) -> DualgenResult<Vec<RunReport>> {
    if config.is_empty() {
        return Err(DualgenError::invalid_args("config does not define any job"));
    }

    let mut reports = Vec::new();
    if let Some(job) = &config.sync {
        reports.push(remove_async(&job.source, &job.destination, &job.exclude)?);
    }
    if let Some(job) = &config.annotations {
        reports.push(project_annotations(
            &job.source,
            &job.destination,
            &job.exclude,
            &AnnotationOptions::from(job),
        )?);
    }
    if let Some(job) = &config.enums {
        reports.push(synthesize_enum_unions(
            &job.source,
            &job.destination,
            &job.exclude,
        )?);
    }
    for job in &config.barrels {
        reports.push(regenerate_barrel(
            &job.target,
            &job.source,
            &BarrelOptions::from(job),
        )?);
    }
    Ok(reports)
}

// ============================================================================
// Shared walk
// ============================================================================

fn walk_options(exclude: &[String], unmatched: UnmatchedPolicy) -> DualgenResult<WalkOptions> {
    WalkOptions::for_extensions(&Dialect::all_extensions())
        .unmatched(unmatched)
        .exclude_globs(exclude)
}

fn run_flavor(
    flavor: &str,
    src: &Path,
    dst: &Path,
    options: &WalkOptions,
    rules: &RuleSet,
) -> DualgenResult<RunReport> {
    let source = resolve_path(src)?;
    let destination = resolve_path(dst)?;
    if destination.starts_with(&source) {
        return Err(DualgenError::invalid_args(format!(
            "destination {} is the source directory or inside it: {}",
            dst.display(),
            src.display()
        )));
    }

    let collected: Mutex<Vec<Warning>> = Mutex::new(Vec::new());
    let files = walk_tree(src, dst, options, |job, text| {
        let (output, warnings) = rewrite_file(job, text, rules)?;
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        collected
            .lock()
            .map_err(|_| DualgenError::internal("warning list lock poisoned"))?
            .extend(warnings);
        Ok(output)
    })?;

    let mut warnings = collected
        .into_inner()
        .map_err(|_| DualgenError::internal("warning list lock poisoned"))?;
    warnings.sort_by(|a, b| {
        let key = |w: &Warning| {
            w.location
                .as_ref()
                .map(|l| (l.file.clone(), l.line, l.col))
        };
        key(a).cmp(&key(b))
    });

    let report = RunReport::new(flavor, files, warnings);
    tracing::info!(
        flavor,
        written = report.count(FileAction::Written),
        unchanged = report.count(FileAction::Unchanged),
        copied = report.count(FileAction::Copied),
        warnings = report.warnings.len(),
        "run complete"
    );
    Ok(report)
}

/// Parse, rewrite and serialize one file.
fn rewrite_file(
    job: &FileJob,
    text: &str,
    rules: &RuleSet,
) -> DualgenResult<(String, Vec<Warning>)> {
    let file = job.relative_path.as_str();
    let dialect = Dialect::from_path(&job.source_path).ok_or_else(|| {
        DualgenError::internal(format!("no dialect for accepted file {}", file))
    })?;

    let module = parse_module(text, dialect).map_err(|e| {
        tracing::error!("\n{}", prettify_error(&e, text, file));
        e.into_parse_error(file, text)
    })?;
    let mut ctx = RewriteContext::new(file, text, dialect);
    let module = rewrite_module(module, rules, &mut ctx)?;

    let mut state = CodegenState::default();
    module.codegen(&mut state);
    tracing::debug!(path = file, rules = rules.name(), "rewrote file");
    Ok((state.to_string(), ctx.into_warnings()))
}
