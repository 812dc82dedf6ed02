//! Barrel regeneration.
//!
//! A barrel is an aggregating export file split by a marker line into two
//! halves with separate owners:
//!
//! - the **prefix** above the marker is written by hand and reproduced
//!   byte-for-byte;
//! - everything after the marker is owned by the generator and rebuilt from
//!   an [`ExportManifest`] on every run.
//!
//! The manifest comes from two naming conventions: every source file under an
//! `enums/` directory exports a name derived from its file name, and every
//! other source file whose first top-level class is `class <Name>` exports
//! `<Name>`. Names already imported by the prefix, internal classes and the
//! core driver class are left out.
//!
//! Output is sorted, so regenerating an unchanged tree reproduces the file
//! byte-for-byte and the file is not rewritten.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

use dualgen_core::config::{default_driver_class, default_internal_prefix, BarrelJobConfig};
use dualgen_core::error::{DualgenError, DualgenResult};
use dualgen_core::output::{content_hash, FileAction, FileRecord, RunReport};
use dualgen_core::types::{Warning, WarningCode};
use dualgen_core::walk::{collect_jobs, resolve_path, write_if_changed, WalkOptions};
use dualgen_cst::visitor::{walk_node, VisitResult, Visitor};
use dualgen_cst::{imported_bindings, parse_module, Dialect, Node, NodeKind};

/// The line separating hand-authored content from generated content.
pub const MARKER: &str = "// BEGIN_GENERATED_CODE";

/// Directory whose files are exported as enumerations.
pub const ENUMS_DIR: &str = "enums";

static CLASS_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)")
        .unwrap()
});

// ============================================================================
// Options
// ============================================================================

/// Naming conventions for one barrel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrelOptions {
    /// Classes whose names start with this prefix are internal.
    pub internal_prefix: String,
    /// The core driver class, always imported by hand.
    pub driver_class: String,
}

impl Default for BarrelOptions {
    fn default() -> Self {
        BarrelOptions {
            internal_prefix: default_internal_prefix(),
            driver_class: default_driver_class(),
        }
    }
}

impl From<&BarrelJobConfig> for BarrelOptions {
    fn from(job: &BarrelJobConfig) -> Self {
        BarrelOptions {
            internal_prefix: job.internal_prefix.clone(),
            driver_class: job.driver_class.clone(),
        }
    }
}

impl BarrelOptions {
    fn is_excluded(&self, name: &str) -> bool {
        (!self.internal_prefix.is_empty() && name.starts_with(&self.internal_prefix))
            || name == self.driver_class
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// One exported symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Exported symbol name.
    pub name: String,
    /// Import specifier relative to the barrel (`./enums/log-source`).
    pub specifier: String,
    /// Source file path relative to the scanned directory.
    pub source: String,
}

impl ManifestEntry {
    /// The generated import line.
    pub fn import_line(&self) -> String {
        format!("import {} from '{}';", self.name, self.specifier)
    }
}

/// Exported symbols keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportManifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl ExportManifest {
    /// Add an entry. A second entry with the same name is a collision.
    pub fn insert(&mut self, entry: ManifestEntry) -> DualgenResult<()> {
        if let Some(existing) = self.entries.get(&entry.name) {
            return Err(DualgenError::NameCollision {
                name: entry.name,
                first: existing.source.clone(),
                second: entry.source,
            });
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Exported names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The generated half of the barrel, starting with the marker line.
    pub fn render(&self) -> String {
        let mut imports: Vec<String> = self.entries().map(ManifestEntry::import_line).collect();
        imports.sort();

        let mut out = String::from(MARKER);
        out.push('\n');
        for line in imports {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
        out.push_str("export {\n");
        for name in self.names() {
            out.push_str("  ");
            out.push_str(name);
            out.push_str(",\n");
        }
        out.push_str("};\n");
        out
    }
}

/// Scan `source_dir` for exported enumerations and classes.
///
/// `target` is excluded from the scan and import specifiers are relative to
/// its directory. Names in `imported` are skipped.
pub fn build_manifest(
    target: &Path,
    source_dir: &Path,
    options: &BarrelOptions,
    imported: &BTreeSet<String>,
) -> DualgenResult<ExportManifest> {
    // Specifiers are computed lexically, so both sides must be spelled the same way.
    let target = resolve_path(target)?;
    let source_dir = resolve_path(source_dir)?;
    let walk = WalkOptions::for_extensions(&Dialect::all_extensions());
    let base = target.parent().unwrap_or_else(|| Path::new(""));
    let mut manifest = ExportManifest::default();

    for job in collect_jobs(&source_dir, &source_dir, &walk)? {
        if job.relative_path.ends_with(".d.ts") || same_file(&job.source_path, &target) {
            continue;
        }

        let name = if in_enums_dir(&job.relative_path) {
            let stem = job
                .source_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            pascal_case(stem)
        } else {
            let text = fs::read_to_string(&job.source_path)
                .map_err(|e| DualgenError::io(&job.source_path, e))?;
            match leading_class(&text) {
                Some(name) => name.to_string(),
                None => continue,
            }
        };

        if name.is_empty() || imported.contains(&name) || options.is_excluded(&name) {
            tracing::debug!(name = %name, path = %job.relative_path, "not exported");
            continue;
        }
        manifest.insert(ManifestEntry {
            specifier: relative_specifier(base, &job.source_path),
            source: job.relative_path,
            name,
        })?;
    }
    Ok(manifest)
}

// ============================================================================
// Regeneration
// ============================================================================

/// Regenerate the marker-delimited region of `target` from `source_dir`.
///
/// A target without the marker is left untouched and reported with a
/// `missing-marker` warning.
pub fn regenerate_barrel(
    target: &Path,
    source_dir: &Path,
    options: &BarrelOptions,
) -> DualgenResult<RunReport> {
    let label = target.display().to_string();
    let text = fs::read_to_string(target).map_err(|e| DualgenError::io(target, e))?;

    let Some(prefix) = split_at_marker(&text) else {
        let warning = Warning::new(
            WarningCode::MissingMarker,
            format!("{} has no `{}` line; left unchanged", label, MARKER),
        );
        tracing::warn!("{}", warning);
        let record = FileRecord {
            path: label,
            action: FileAction::Unchanged,
            sha256: Some(content_hash(text.as_bytes())),
        };
        return Ok(RunReport::new("barrel", vec![record], vec![warning]));
    };

    let dialect = Dialect::from_path(target).unwrap_or(Dialect::Typed);
    let imported = prefix_bindings(prefix, &label, dialect)?;
    let manifest = build_manifest(target, source_dir, options, &imported)?;

    let output = format!("{}{}", prefix, manifest.render());
    let written = write_if_changed(target, output.as_bytes())?;
    tracing::info!(
        target = %label,
        exports = manifest.len(),
        written,
        "regenerated barrel"
    );

    let record = FileRecord {
        path: label,
        action: if written {
            FileAction::Written
        } else {
            FileAction::Unchanged
        },
        sha256: Some(content_hash(output.as_bytes())),
    };
    Ok(RunReport::new("barrel", vec![record], Vec::new()))
}

/// The hand-authored text before the marker line, if the marker is present.
pub fn split_at_marker(text: &str) -> Option<&str> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end() == MARKER {
            return Some(&text[..offset]);
        }
        offset += line.len();
    }
    None
}

/// Names bound by the import declarations of `prefix`.
pub fn prefix_bindings(
    prefix: &str,
    file: &str,
    dialect: Dialect,
) -> DualgenResult<BTreeSet<String>> {
    let module = parse_module(prefix, dialect).map_err(|e| e.into_parse_error(file, prefix))?;
    let mut collector = ImportCollector::default();
    walk_node(&mut collector, &module);
    Ok(collector.names)
}

#[derive(Default)]
struct ImportCollector {
    names: BTreeSet<String>,
}

impl Visitor for ImportCollector {
    fn visit_node(&mut self, node: &Node) -> VisitResult {
        match node.kind {
            NodeKind::Module => VisitResult::Continue,
            NodeKind::ImportDeclaration { .. } | NodeKind::ImportEquals { .. } => {
                self.names.extend(imported_bindings(node));
                VisitResult::SkipChildren
            }
            _ => VisitResult::SkipChildren,
        }
    }
}

// ============================================================================
// Naming conventions
// ============================================================================

/// `log-source` to `LogSource`.
pub fn pascal_case(stem: &str) -> String {
    stem.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Name of the first top-level `class` declared in `text`.
pub fn leading_class(text: &str) -> Option<&str> {
    CLASS_DECLARATION
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn in_enums_dir(relative_path: &str) -> bool {
    let mut parts: Vec<&str> = relative_path.split('/').collect();
    parts.pop();
    parts.contains(&ENUMS_DIR)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Import specifier for `file` as seen from `from_dir`, without extension.
pub fn relative_specifier(from_dir: &Path, file: &Path) -> String {
    let normal = |p: &Path| -> Vec<String> {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect()
    };
    let from = normal(from_dir);
    let to = normal(&file.with_extension(""));
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = Vec::new();
    if common == from.len() {
        parts.push(".".to_string());
    } else {
        parts.extend((common..from.len()).map(|_| "..".to_string()));
    }
    parts.extend(to[common..].iter().cloned());
    parts.join("/")
}
