//! apiforge CLI.
//!
//! Generates OpenAPI documents from design files, one pair of JSON and YAML
//! documents per configured locale.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use apiforge_compiler::{
    assemble, output_files, resolve_locales, run, CompileError, ConfigError, GeneratedFile,
    ProjectManifest, DEFAULT_OUTPUT_DIR,
};
use apiforge_design::{parse_design_file, DesignErrors};
use apiforge_telemetry::{
    log_assembly_failed, log_design_invalid, log_document_skipped, log_file_written,
    log_generation_completed, log_generation_started, log_locale_completed, LogFormat, Telemetry,
    TelemetryConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "apiforge",
    about = "Generate OpenAPI documents from API designs",
    version
)]
struct Cli {
    /// Log level (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log format (pretty or json).
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate OpenAPI documents for every configured locale.
    ///
    /// The default locale is written to openapi.json and openapi.yaml, every
    /// other locale L to openapi_L.json and openapi_L.yaml.
    Generate {
        /// Design file (YAML or JSON).
        #[arg(short, long)]
        design: PathBuf,

        /// Project manifest. Defaults to ./apiforge.yaml when present.
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Comma-separated locale codes, default locale first.
        #[arg(short, long, env = "APIFORGE_LOCALES")]
        locales: Option<String>,

        /// Output directory (default: gen/http).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate design file(s) without writing documents.
    ///
    /// Reports usage errors (E2xxx) and structural errors (E3xxx).
    Validate {
        /// Design file(s) (YAML or JSON).
        #[arg(short, long, required = true, num_args = 1..)]
        design: Vec<PathBuf>,

        /// Output format (text or json).
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Failures of the `generate` command.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Design(DesignErrors),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CliError {
    /// One line per problem, without the `error:` prefix.
    fn lines(&self) -> Vec<String> {
        match self {
            CliError::Design(errors) => errors.iter().map(|e| e.to_string()).collect(),
            other => vec![other.to_string()],
        }
    }
}

/// Validation issue for output.
#[derive(Debug, Serialize)]
struct ValidationIssue {
    code: String,
    message: String,
}

/// Validation result for a single design file.
#[derive(Debug, Serialize)]
struct ValidationResult {
    file: String,
    valid: bool,
    errors: Vec<ValidationIssue>,
}

/// Load the manifest given on the command line, or discover one in `cwd`.
///
/// Returns the manifest and the directory its relative paths resolve against.
fn load_manifest(
    explicit: Option<&Path>,
    cwd: &Path,
) -> Result<(Option<ProjectManifest>, PathBuf), ConfigError> {
    match explicit {
        Some(path) => {
            let manifest = ProjectManifest::load(path)?;
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf());
            Ok((Some(manifest), base))
        }
        None => match ProjectManifest::discover(cwd)? {
            Some((manifest, _)) => Ok((Some(manifest), cwd.to_path_buf())),
            None => Ok((None, cwd.to_path_buf())),
        },
    }
}

/// Output directory: command line, then manifest, then the default.
fn output_dir(
    explicit: Option<&Path>,
    manifest: Option<&ProjectManifest>,
    manifest_dir: &Path,
) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| manifest.and_then(|m| m.output_dir(manifest_dir)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

fn write_files(files: &[GeneratedFile]) -> Result<(), CliError> {
    for file in files {
        if let Some(parent) = file.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CliError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&file.path, &file.contents).map_err(|source| CliError::Write {
            path: file.path.clone(),
            source,
        })?;
        log_file_written!(path = %file.path.display(), bytes = file.contents.len());
    }
    Ok(())
}

/// Run every locale pass, then write all documents or none.
fn generate(
    design_path: &Path,
    manifest_path: Option<&Path>,
    locales: Option<&str>,
    output: Option<&Path>,
) -> Result<Vec<PathBuf>, CliError> {
    let cwd = std::env::current_dir().map_err(ConfigError::from)?;
    let (manifest, manifest_dir) = load_manifest(manifest_path, &cwd)?;
    let locales = resolve_locales(locales, manifest.as_ref())?;
    let output_dir = output_dir(output, manifest.as_ref(), &manifest_dir);

    let design = parse_design_file(design_path).map_err(|errors| {
        log_design_invalid!(design = %design_path.display(), errors = errors.len());
        CliError::Design(errors)
    })?;

    log_generation_started!(
        design = %design_path.display(),
        locales = %locales,
        output = %output_dir.display()
    );

    let outputs = run(&locales, &design)?;
    for output in &outputs {
        match &output.result {
            Ok(Some(_)) => log_locale_completed!(locale = %output.locale, stem = %output.stem),
            Ok(None) => log_document_skipped!(locale = %output.locale, "design has no HTTP routes"),
            Err(err) => log_assembly_failed!(locale = %output.locale, error = %err),
        }
    }

    let files = output_files(&outputs, &output_dir)?;
    write_files(&files)?;
    log_generation_completed!(files = files.len());

    Ok(files.into_iter().map(|f| f.path).collect())
}

fn run_generate(
    design: &Path,
    manifest: Option<&Path>,
    locales: Option<&str>,
    output: Option<&Path>,
) -> ExitCode {
    match generate(design, manifest, locales, output) {
        Ok(paths) if paths.is_empty() => {
            eprintln!("warning: design has no HTTP routes, no document generated");
            ExitCode::SUCCESS
        }
        Ok(paths) => {
            for path in &paths {
                eprintln!("wrote {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            for line in e.lines() {
                eprintln!("error: {}", line);
            }
            ExitCode::from(1)
        }
    }
}

/// Evaluate a design and assemble it once to surface structural errors.
fn validate_design(path: &Path) -> ValidationResult {
    let errors = match parse_design_file(path) {
        Err(errors) => errors
            .iter()
            .map(|e| ValidationIssue {
                code: e.code().to_string(),
                message: e.to_string(),
            })
            .collect(),
        // Structural errors do not depend on the locale
        Ok(design) => match assemble(&design, "") {
            Ok(_) => Vec::new(),
            Err(e) => vec![ValidationIssue {
                code: e.code().to_string(),
                message: e.to_string(),
            }],
        },
    };

    ValidationResult {
        file: path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    }
}

fn run_validate(designs: &[PathBuf], output_format: &str) -> ExitCode {
    let results: Vec<ValidationResult> = designs.iter().map(|p| validate_design(p)).collect();
    let has_errors = results.iter().any(|r| !r.valid);

    if output_format == "json" {
        let output = serde_json::json!({
            "results": results,
            "summary": {
                "total": results.len(),
                "valid": results.iter().filter(|r| r.valid).count(),
                "invalid": results.iter().filter(|r| !r.valid).count(),
            }
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).expect("validation report is valid JSON")
        );
    } else {
        for result in &results {
            if result.valid {
                eprintln!("✓ {} is valid", result.file);
            } else {
                eprintln!("✗ {} has {} error(s)", result.file, result.errors.len());
            }
            for err in &result.errors {
                eprintln!("  {}", err.message);
            }
        }

        let valid_count = results.iter().filter(|r| r.valid).count();
        let total = results.len();
        eprintln!();
        eprintln!(
            "validated {} design(s): {} valid, {} invalid",
            total,
            valid_count,
            total - valid_count
        );
    }

    if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(log_format) = LogFormat::parse(&cli.log_format) else {
        eprintln!(
            "error: invalid log format '{}' (expected pretty or json)",
            cli.log_format
        );
        return ExitCode::from(1);
    };
    let config = TelemetryConfig::new()
        .with_log_level(&cli.log_level)
        .with_log_format(log_format);
    if let Err(e) = Telemetry::init(config) {
        eprintln!("error: {}", e);
        return ExitCode::from(1);
    }

    match cli.command {
        Commands::Generate {
            design,
            manifest,
            locales,
            output,
        } => run_generate(
            &design,
            manifest.as_deref(),
            locales.as_deref(),
            output.as_deref(),
        ),
        Commands::Validate { design, format } => run_validate(&design, &format),
    }
}
