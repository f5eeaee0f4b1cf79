//! Compiles apiforge designs into OpenAPI 3.0 documents.
//!
//! Assembles one document per configured locale, classifies payload
//! attributes into path and query parameters, resolves the security in
//! effect for each operation and encodes the result as JSON and YAML.

pub mod assemble;
pub mod document;
pub mod error;
pub mod generate;
pub mod locale;
pub mod manifest;
pub mod params;
pub mod security;

pub use assemble::{assemble, DEFAULT_VERSION};
pub use document::{Document, Operation, Parameter, ParameterLocation, PathItem, OPENAPI_VERSION};
pub use error::{CompileError, ConfigError};
pub use generate::{
    encode, generate_locale, output_files, output_stem, run, DocumentPair, GeneratedFile,
    LocaleOutput, OUTPUT_STEM,
};
pub use locale::LocaleSet;
pub use manifest::{resolve_locales, ProjectManifest, DEFAULT_OUTPUT_DIR, MANIFEST_FILE};
pub use params::classify;
pub use security::{resolve_security, EffectiveSecurity, ReferencedSchemes};
