//! Tree walking: mirror a source root into a destination root.
//!
//! The walker enumerates every regular file under a source root in a stable
//! order (file names sorted at each directory level), pairs each file with its
//! path relative to the root, and writes the transformed result to the same
//! relative path under the destination root.
//!
//! - Files whose extension is accepted are read, transformed, and written.
//! - Other files are skipped or copied byte-for-byte ([`UnmatchedPolicy`]).
//! - Jobs run in parallel; output never depends on processing order.
//! - The first failure in traversal order aborts the run. Nothing is rolled
//!   back: a rerun is idempotent and repairs partial output.
//! - Destination files whose content would not change are left untouched.

use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{DualgenError, DualgenResult};
use crate::output::{content_hash, FileAction, FileRecord};

/// Directories never entered by the walker.
const DEFAULT_EXCLUDE_DIRS: &[&str] = &[".git", ".hg", ".svn", "node_modules"];

/// What to do with files whose extension the active rule set does not accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedPolicy {
    /// Leave them out of the destination tree.
    #[default]
    Skip,
    /// Copy them byte-for-byte.
    Copy,
}

/// Configuration for one walk.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Accepted file extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Policy for files with other extensions.
    pub unmatched: UnmatchedPolicy,
    /// Files matching these globs (relative to the source root) are ignored entirely.
    pub exclude: Option<GlobSet>,
    /// Process files sequentially (useful for debugging).
    pub sequential: bool,
}

impl WalkOptions {
    /// Accept the given extensions, skipping everything else.
    pub fn for_extensions(extensions: &[&str]) -> Self {
        WalkOptions {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Set the policy for non-matching files.
    pub fn unmatched(mut self, policy: UnmatchedPolicy) -> Self {
        self.unmatched = policy;
        self
    }

    /// Exclude files matching any of `patterns`.
    pub fn exclude_globs(mut self, patterns: &[String]) -> DualgenResult<Self> {
        if patterns.is_empty() {
            return Ok(self);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                DualgenError::invalid_args(format!("invalid exclude glob '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| DualgenError::invalid_args(format!("invalid exclude globs: {}", e)))?;
        self.exclude = Some(set);
        Ok(self)
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|accepted| accepted == ext))
    }

    fn is_excluded(&self, relative_path: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|set| set.is_match(relative_path))
    }
}

/// One unit of work: a source file and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    /// Absolute (or caller-relative) path of the source file.
    pub source_path: PathBuf,
    /// Path relative to the source root, forward slashes.
    pub relative_path: String,
    /// Destination path (`destination_root/relative_path`).
    pub destination_path: PathBuf,
    /// Whether the active rule set accepts this file.
    pub accepted: bool,
}

fn is_default_excluded(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => DEFAULT_EXCLUDE_DIRS
            .iter()
            .any(|excluded| name.to_string_lossy() == *excluded),
        _ => false,
    })
}

/// Enumerate the jobs for a walk in stable traversal order.
pub fn collect_jobs(
    source_root: &Path,
    destination_root: &Path,
    options: &WalkOptions,
) -> DualgenResult<Vec<FileJob>> {
    if !source_root.is_dir() {
        return Err(DualgenError::invalid_args(format!(
            "source root is not a directory: {}",
            source_root.display()
        )));
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(source_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.path()
                .strip_prefix(source_root)
                .map(|rel| !is_default_excluded(rel))
                .unwrap_or(true)
        })
    {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source_root.to_path_buf());
            DualgenError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let full_path = entry.path();
        let relative = full_path
            .strip_prefix(source_root)
            .map_err(|e| DualgenError::internal(e.to_string()))?;
        let relative_str = relative
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");

        if options.is_excluded(&relative_str) {
            tracing::debug!(path = %relative_str, "excluded by glob");
            continue;
        }

        let accepted = options.accepts(full_path);
        if !accepted && options.unmatched == UnmatchedPolicy::Skip {
            continue;
        }

        jobs.push(FileJob {
            source_path: full_path.to_path_buf(),
            destination_path: destination_root.join(relative),
            relative_path: relative_str,
            accepted,
        });
    }
    Ok(jobs)
}

/// Write `bytes` to `path` unless the file already holds exactly those bytes.
///
/// Missing parent directories are created; a directory created concurrently
/// by another job is not an error. Returns `true` when the file was written.
pub fn write_if_changed(path: &Path, bytes: &[u8]) -> DualgenResult<bool> {
    if let Ok(existing) = fs::read(path) {
        if existing == bytes {
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| DualgenError::io(parent, e))?;
        }
    }
    fs::write(path, bytes).map_err(|e| DualgenError::io(path, e))?;
    Ok(true)
}

/// Absolute form of `path`, with symlinks and `..` resolved as far as the path exists.
///
/// Components past the deepest existing ancestor are appended lexically, so a
/// destination that is yet to be created still resolves.
pub fn resolve_path(path: &Path) -> DualgenResult<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| DualgenError::io(path, e))?;
    let components: Vec<Component> = absolute.components().collect();
    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        let Ok(mut resolved) = fs::canonicalize(&prefix) else {
            continue;
        };
        for component in &components[split..] {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::Normal(name) => resolved.push(name),
                _ => {}
            }
        }
        return Ok(resolved);
    }
    Ok(absolute)
}

fn run_job<F>(job: &FileJob, transform: &F) -> DualgenResult<FileRecord>
where
    F: Fn(&FileJob, &str) -> DualgenResult<String> + Sync,
{
    if !job.accepted {
        let bytes = fs::read(&job.source_path).map_err(|e| DualgenError::io(&job.source_path, e))?;
        let written = write_if_changed(&job.destination_path, &bytes)?;
        return Ok(FileRecord {
            path: job.relative_path.clone(),
            action: if written {
                FileAction::Copied
            } else {
                FileAction::Unchanged
            },
            sha256: Some(content_hash(&bytes)),
        });
    }

    let text = fs::read_to_string(&job.source_path)
        .map_err(|e| DualgenError::io(&job.source_path, e))?;
    let output = transform(job, &text)?;
    let written = write_if_changed(&job.destination_path, output.as_bytes())?;
    tracing::debug!(path = %job.relative_path, written, "processed file");

    Ok(FileRecord {
        path: job.relative_path.clone(),
        action: if written {
            FileAction::Written
        } else {
            FileAction::Unchanged
        },
        sha256: Some(content_hash(output.as_bytes())),
    })
}

/// Walk `source_root`, transform accepted files, and mirror them under `destination_root`.
///
/// Returns one record per processed file, in traversal order.
pub fn walk_tree<F>(
    source_root: &Path,
    destination_root: &Path,
    options: &WalkOptions,
    transform: F,
) -> DualgenResult<Vec<FileRecord>>
where
    F: Fn(&FileJob, &str) -> DualgenResult<String> + Sync,
{
    let jobs = collect_jobs(source_root, destination_root, options)?;
    tracing::info!(
        source = %source_root.display(),
        destination = %destination_root.display(),
        files = jobs.len(),
        "walking source tree"
    );

    let results: Vec<DualgenResult<FileRecord>> = if options.sequential {
        jobs.iter().map(|job| run_job(job, &transform)).collect()
    } else {
        jobs.par_iter().map(|job| run_job(job, &transform)).collect()
    };

    results.into_iter().collect()
}

// ============================================================================
// Tests
// ============================================================================
