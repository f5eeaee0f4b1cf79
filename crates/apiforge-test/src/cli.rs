//! CLI regression tests for the `apiforge` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes, output file names and the documents themselves.
//!
//! Run with: `cargo test -p apiforge-test`

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `apiforge` binary, isolated
/// from the caller's locale and log settings.
fn apiforge() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("apiforge")
        .expect("apiforge binary not found, run `cargo build -p apiforge` first");
    cmd.env_remove("APIFORGE_LOCALES").env_remove("RUST_LOG");
    cmd
}

/// Absolute path to the shared test fixtures directory.
fn fixtures() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/apiforge-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates/")
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
}

fn read_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("read generated json");
    serde_json::from_str(&content).expect("generated json parses")
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// apiforge generate
// ---------------------------------------------------------------------------

#[test]
fn generate_writes_one_pair_per_locale() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "--locales", "en,nl", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(contains("openapi_nl.yaml"));

    assert_eq!(
        file_names(&out),
        vec![
            "openapi.json",
            "openapi.yaml",
            "openapi_nl.json",
            "openapi_nl.yaml"
        ]
    );

    let en = read_json(&out.join("openapi.json"));
    assert_eq!(en["openapi"], "3.0.0");
    assert_eq!(en["info"]["title"], "Calculator API");
    assert_eq!(en["info"]["version"], "1.0");

    let nl = read_json(&out.join("openapi_nl.json"));
    assert_eq!(nl["info"]["title"], "Rekenmachine API");
    assert_eq!(
        nl["paths"]["/add/{x}"]["get"]["description"],
        "Tel twee getallen op"
    );

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(out.join("openapi.yaml")).unwrap())
            .unwrap();
    assert_eq!(yaml["info"]["title"], serde_yaml::Value::from("Calculator API"));
}

#[test]
fn generate_classifies_parameters_and_security() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "-l", "en", "-d"])
        .arg(fixtures().join("calc.yaml"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let doc = read_json(&out.join("openapi.json"));
    let add = &doc["paths"]["/add/{x}"]["get"];
    assert_eq!(add["operationId"], "calc#add");

    let params = add["parameters"].as_array().unwrap();
    assert_eq!(params.len(), 2, "security attributes are not parameters");
    assert_eq!(params[0]["name"], "x");
    assert_eq!(params[0]["in"], "path");
    assert_eq!(params[0]["required"], true);
    assert_eq!(params[1]["name"], "y");
    assert_eq!(params[1]["in"], "query");
    assert_eq!(params[1]["required"], false);

    // Bearer schemes take no scope list; JWT scopes are described instead
    assert_eq!(add["security"], serde_json::json!([{ "jwt": [] }]));
    assert_eq!(doc["paths"]["/health"]["get"]["security"], serde_json::json!([]));

    let sum = &doc["paths"]["/sum"]["post"];
    assert_eq!(sum["parameters"][0]["schema"]["type"], "array");
    assert_eq!(sum["parameters"][0]["explode"], true);

    // Only referenced schemes are rendered
    let schemes = doc["components"]["securitySchemes"].as_object().unwrap();
    assert!(schemes.contains_key("jwt"));
    assert!(!schemes.contains_key("basic"));
    assert_eq!(schemes["jwt"]["scheme"], "bearer");
    let description = schemes["jwt"]["description"].as_str().unwrap();
    assert!(description.contains("`calc:write`: no description"));
    assert!(description.contains("**Required security scopes**: `calc:read`"));

    let servers = doc["servers"].as_array().unwrap();
    assert_eq!(servers[0]["url"], "http://localhost:8000");
    assert_eq!(servers[1]["url"], "https://calc.example.com");
}

#[test]
fn generate_reads_locales_from_environment() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");

    apiforge()
        .current_dir(tmp.path())
        .env("APIFORGE_LOCALES", "nl,en")
        .args(["generate", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    // The first locale owns the unsuffixed file names
    assert_eq!(
        file_names(&out),
        vec![
            "openapi.json",
            "openapi.yaml",
            "openapi_en.json",
            "openapi_en.yaml"
        ]
    );
    assert_eq!(
        read_json(&out.join("openapi.json"))["info"]["title"],
        "Rekenmachine API"
    );
}

#[test]
fn generate_uses_manifest_locales_and_output() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("apiforge.yaml"),
        "locales: [en, nl]\noutput: docs/api\n",
    )
    .unwrap();

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .assert()
        .success();

    let out = tmp.path().join("docs/api");
    assert_eq!(file_names(&out).len(), 4);
    assert!(out.join("openapi_nl.json").is_file());
}

#[test]
fn generate_defaults_to_gen_http() {
    let tmp = TempDir::new().unwrap();

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "--locales", "en", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .assert()
        .success();

    assert!(tmp.path().join("gen/http/openapi.json").is_file());
    assert!(tmp.path().join("gen/http/openapi.yaml").is_file());
}

#[test]
fn generate_without_locales_exits_one() {
    let tmp = TempDir::new().unwrap();

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E4001"));

    assert!(!tmp.path().join("gen").exists());
}

#[test]
fn generate_rejects_locale_outside_output_dir() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "--locales", "en,../escape", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .arg("--output")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E4004"));

    assert!(!out.exists());
}

#[test]
fn generate_conflicting_routes_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "--locales", "en,nl", "--design"])
        .arg(fixtures().join("conflict.yaml"))
        .arg("--output")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E3001"));

    assert!(!out.exists());
}

#[test]
fn generate_invalid_design_reports_every_error() {
    let tmp = TempDir::new().unwrap();

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "--locales", "en", "--design"])
        .arg(fixtures().join("invalid-usage.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2002"))
        .stderr(contains("/items/{id"));
}

#[test]
fn generate_design_without_routes_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");

    apiforge()
        .current_dir(tmp.path())
        .args(["generate", "--locales", "en", "--design"])
        .arg(fixtures().join("no-routes.yaml"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(contains("no HTTP routes"));

    assert!(!out.exists());
}

#[test]
fn generate_nonexistent_design_exits_one() {
    let tmp = TempDir::new().unwrap();

    apiforge()
        .current_dir(tmp.path())
        .args([
            "generate",
            "--locales",
            "en",
            "--design",
            "this-file-does-not-exist.yaml",
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn generate_missing_design_flag_exits_two() {
    apiforge()
        .args(["generate", "--locales", "en"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn generate_rejects_unknown_log_format() {
    let tmp = TempDir::new().unwrap();

    apiforge()
        .current_dir(tmp.path())
        .args(["--log-format", "xml", "generate", "--locales", "en", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("invalid log format"));
}

// ---------------------------------------------------------------------------
// apiforge validate
// ---------------------------------------------------------------------------

#[test]
fn validate_valid_design_exits_zero() {
    apiforge()
        .args(["validate", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .assert()
        .success()
        .stderr(contains("1 valid, 0 invalid"));
}

#[test]
fn validate_parse_error_exits_one() {
    apiforge()
        .args(["validate", "--design"])
        .arg(fixtures().join("invalid-parse-error.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2014"));
}

#[test]
fn validate_missing_file_exits_one() {
    apiforge()
        .args(["validate", "--design", "this-file-does-not-exist.yaml"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn validate_routing_conflict_exits_one() {
    apiforge()
        .args(["validate", "--design"])
        .arg(fixtures().join("conflict.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E3001"));
}

#[test]
fn validate_json_format_outputs_valid_json() {
    let output = apiforge()
        .args(["validate", "--format", "json", "--design"])
        .arg(fixtures().join("calc.yaml"))
        .arg(fixtures().join("invalid-usage.yaml"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["summary"]["total"], 2);
    assert_eq!(report["summary"]["valid"], 1);
    assert_eq!(report["summary"]["invalid"], 1);
    assert_eq!(report["results"][0]["valid"], true);

    let codes: Vec<&str> = report["results"][1]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["code"].as_str())
        .collect();
    assert!(codes.contains(&"E2002"), "codes: {:?}", codes);
    assert!(codes.len() > 1, "errors are batched: {:?}", codes);
}

#[test]
fn validate_missing_design_flag_exits_two() {
    apiforge().arg("validate").assert().failure().code(2);
}
