//! Project manifest (`apiforge.yaml`).
//!
//! ```yaml
//! locales: [en, nl]
//! output: gen/http
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::locale::LocaleSet;

/// File name looked up in the working directory when no manifest is given.
pub const MANIFEST_FILE: &str = "apiforge.yaml";

/// Output directory used when neither the CLI nor the manifest sets one.
pub const DEFAULT_OUTPUT_DIR: &str = "gen/http";

/// A project manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    /// Locale codes, default locale first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locales: Vec<String>,

    /// Output directory, relative to the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl ProjectManifest {
    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Manifest(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content, path)
    }

    /// Parse a manifest from YAML content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty file is an empty manifest
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| {
            ConfigError::Manifest(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load `apiforge.yaml` from `dir` if present.
    pub fn discover(dir: &Path) -> Result<Option<(Self, PathBuf)>, ConfigError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(|manifest| Some((manifest, path)))
    }

    /// Output directory declared by the manifest, resolved against
    /// `base_path` when relative.
    pub fn output_dir(&self, base_path: &Path) -> Option<PathBuf> {
        self.output.as_ref().map(|output| {
            if output.is_absolute() {
                output.clone()
            } else {
                base_path.join(output)
            }
        })
    }
}

/// Pick the locale set: an explicit list (CLI flag or environment) wins over
/// the manifest. Having neither is an error.
pub fn resolve_locales(
    explicit: Option<&str>,
    manifest: Option<&ProjectManifest>,
) -> Result<LocaleSet, ConfigError> {
    if let Some(list) = explicit {
        return LocaleSet::parse(list);
    }
    match manifest {
        Some(manifest) => LocaleSet::new(&manifest.locales),
        None => Err(ConfigError::MissingLocales),
    }
}
