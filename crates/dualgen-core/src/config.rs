//! Configuration handling for dualgen (`dualgen.toml`).
//!
//! Every section is optional. Relative paths are resolved against the
//! directory containing the config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DualgenError, DualgenResult};

/// Default config file name looked up by `dualgen build`.
pub const CONFIG_FILE_NAME: &str = "dualgen.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Async-removal job.
    #[serde(default)]
    pub sync: Option<TreeJobConfig>,

    /// Annotation-projection job.
    #[serde(default)]
    pub annotations: Option<AnnotationJobConfig>,

    /// Enumeration-to-union job.
    #[serde(default)]
    pub enums: Option<TreeJobConfig>,

    /// Barrel regeneration jobs.
    #[serde(default, rename = "barrel")]
    pub barrels: Vec<BarrelJobConfig>,
}

/// A source-root to destination-root job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TreeJobConfig {
    /// Source root.
    pub source: PathBuf,
    /// Destination root.
    pub destination: PathBuf,
    /// Globs (relative to the source root) to ignore.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Annotation-projection job settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnnotationJobConfig {
    /// Source root.
    pub source: PathBuf,
    /// Destination root.
    pub destination: PathBuf,
    /// Globs (relative to the source root) to ignore.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Directive line prefixed to every projected file.
    #[serde(default = "default_directive")]
    pub directive: String,
    /// Comment line inserted before suppressed imports.
    #[serde(default = "default_suppression_comment")]
    pub suppression_comment: String,
    /// Import specifiers whose declarations the target checker rejects.
    #[serde(default = "default_suppressed_imports")]
    pub suppressed_imports: Vec<String>,
}

/// Barrel regeneration job settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BarrelJobConfig {
    /// The aggregating export file.
    pub target: PathBuf,
    /// Directory scanned for classes and enums.
    pub source: PathBuf,
    /// Classes whose names start with this prefix are internal.
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,
    /// The core driver class, always imported by hand.
    #[serde(default = "default_driver_class")]
    pub driver_class: String,
}

/// Default Flow directive.
pub fn default_directive() -> String {
    "// @flow".to_string()
}

/// Default Flow suppression comment.
pub fn default_suppression_comment() -> String {
    "// $FlowFixMe".to_string()
}

/// Default suppressed cross-package import.
pub fn default_suppressed_imports() -> Vec<String> {
    vec!["webdriver-async".to_string()]
}

/// Default internal class prefix.
pub fn default_internal_prefix() -> String {
    "Base".to_string()
}

/// Default core driver class name.
pub fn default_driver_class() -> String {
    "Driver".to_string()
}

impl Config {
    /// Parse config text. `path` is only used for error messages.
    pub fn parse(text: &str, path: &Path) -> DualgenResult<Self> {
        toml::from_str(text).map_err(|e| DualgenError::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Load a config file and resolve its relative paths against its directory.
    pub fn load(path: &Path) -> DualgenResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| DualgenError::io(path, e))?;
        let mut config = Config::parse(&text, path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        Ok(config)
    }

    /// Whether no job is configured.
    pub fn is_empty(&self) -> bool {
        self.sync.is_none()
            && self.annotations.is_none()
            && self.enums.is_none()
            && self.barrels.is_empty()
    }

    /// Make every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(job) = &mut self.sync {
            resolve(&mut job.source);
            resolve(&mut job.destination);
        }
        if let Some(job) = &mut self.enums {
            resolve(&mut job.source);
            resolve(&mut job.destination);
        }
        if let Some(job) = &mut self.annotations {
            resolve(&mut job.source);
            resolve(&mut job.destination);
        }
        for job in &mut self.barrels {
            resolve(&mut job.target);
            resolve(&mut job.source);
        }
    }
}
