//! Locale fan-out.
//!
//! Assembles one document per configured locale. Passes share the design
//! read-only and run on a dedicated rayon pool; results come back in locale
//! order whatever order the passes finish in.

use std::path::{Path, PathBuf};

use apiforge_design::Design;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::assemble::assemble;
use crate::document::Document;
use crate::error::{CompileError, ConfigError};
use crate::locale::LocaleSet;

/// File stem of the default locale's documents.
pub const OUTPUT_STEM: &str = "openapi";

/// A document encoded in both output formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPair {
    pub json: String,
    pub yaml: String,
}

/// Outcome of one locale pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleOutput {
    pub locale: String,
    /// `openapi` for the default locale, `openapi_<locale>` otherwise.
    pub stem: String,
    /// `Ok(None)` when the design exposes no HTTP route.
    pub result: Result<Option<DocumentPair>, CompileError>,
}

impl LocaleOutput {
    pub fn json_file_name(&self) -> String {
        format!("{}.json", self.stem)
    }

    pub fn yaml_file_name(&self) -> String {
        format!("{}.yaml", self.stem)
    }
}

/// A file the CLI should write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Output stem of the locale at `index` in the locale set.
pub fn output_stem(index: usize, locale: &str) -> String {
    if index == 0 {
        OUTPUT_STEM.to_string()
    } else {
        format!("{}_{}", OUTPUT_STEM, locale)
    }
}

/// Encode a document as JSON and YAML.
pub fn encode(document: &Document) -> DocumentPair {
    // Documents hold only strings, maps and JSON values; encoding cannot fail.
    let json = serde_json::to_string_pretty(document).expect("openapi: JSON encoding failed");
    let yaml = serde_yaml::to_string(document).expect("openapi: YAML encoding failed");
    DocumentPair { json, yaml }
}

/// Assemble and encode the document of one locale.
pub fn generate_locale(design: &Design, index: usize, locale: &str) -> LocaleOutput {
    let result = assemble(design, locale).map(|document| document.as_ref().map(encode));
    match &result {
        Ok(Some(_)) => debug!(locale, "locale pass completed"),
        Ok(None) => debug!(locale, "locale pass produced no document"),
        Err(err) => warn!(locale, error = %err, "locale pass failed"),
    }
    LocaleOutput {
        locale: locale.to_string(),
        stem: output_stem(index, locale),
        result,
    }
}

/// Run one pass per locale on a pool sized to the locale count.
pub fn run(locales: &LocaleSet, design: &Design) -> Result<Vec<LocaleOutput>, ConfigError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(locales.len())
        .thread_name(|i| format!("apiforge-locale-{}", i))
        .build()
        .map_err(|e| ConfigError::WorkerPool(e.to_string()))?;

    info!(
        api = %design.api.name,
        locales = %locales,
        "generating documents"
    );

    let indexed: Vec<(usize, &str)> = locales.iter().enumerate().collect();
    let outputs = pool.install(|| {
        indexed
            .into_par_iter()
            .map(|(index, locale)| generate_locale(design, index, locale))
            .collect()
    });
    Ok(outputs)
}

/// Files to write under `dir`, in locale order.
///
/// Fails with the first failed pass so that a partial set of documents is
/// never written. Passes without a document contribute no file.
pub fn output_files(outputs: &[LocaleOutput], dir: &Path) -> Result<Vec<GeneratedFile>, CompileError> {
    let mut files = Vec::with_capacity(outputs.len() * 2);
    for output in outputs {
        match &output.result {
            Err(err) => return Err(err.clone()),
            Ok(None) => {}
            Ok(Some(pair)) => {
                files.push(GeneratedFile {
                    path: dir.join(output.json_file_name()),
                    contents: pair.json.clone(),
                });
                files.push(GeneratedFile {
                    path: dir.join(output.yaml_file_name()),
                    contents: pair.yaml.clone(),
                });
            }
        }
    }
    Ok(files)
}
