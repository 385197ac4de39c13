use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const DIST: &str = "\
#krakenv:environments=local,prod
# Database
DB_HOST=localhost #prompt:Host?|string
DB_PORT= #prompt:Port?|int;min:1;max:65535
APP_ENV=local #prompt:Environment?|enum;options:local,prod
";

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    for (name, content) in files {
        fs::write(dir.path().join(name), content).expect("write fixture");
    }
    dir
}

#[test]
fn validate_passes_for_valid_target() {
    let dir = workspace(&[
        (".env.dist", DIST),
        (".env", "DB_HOST=db\nDB_PORT=5432\nAPP_ENV=prod\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).arg("validate").arg(".env");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("VALIDATION PASSED: .env"));
}

#[test]
fn validate_reports_each_failure() {
    let dir = workspace(&[
        (".env.dist", DIST),
        (".env", "DB_HOST=db\nDB_PORT=99999\nAPP_ENV=staging\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).arg("validate").arg(".env");

    let output_pred = predicate::str::contains("VALIDATION FAILED: .env")
        .and(predicate::str::contains("value 99999 exceeds maximum 65535"))
        .and(predicate::str::contains("not in allowed options: local,prod"))
        .and(predicate::str::contains("Found 2 error(s)"));

    cmd.assert().code(1).stdout(output_pred);
}

#[test]
fn validate_strict_flags_unannotated_variables() {
    let dir = workspace(&[
        ("template.env", "PLAIN=x\n"),
        (".env", "PLAIN=y\n"),
    ]);

    let mut lenient = cargo_bin_cmd!("krakenv");
    lenient
        .current_dir(dir.path())
        .args(["validate", ".env", "--dist", "template.env"]);
    lenient.assert().success();

    let mut strict = cargo_bin_cmd!("krakenv");
    strict
        .current_dir(dir.path())
        .args(["validate", ".env", "--dist", "template.env", "--strict"]);
    strict
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Variable has no annotation"));
}

#[test]
fn missing_file_exits_with_input_error() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).args(["validate", "absent.env"]);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read absent.env"));
}

#[test]
fn inspect_prints_json() {
    let dir = workspace(&[
        (".env.dist", DIST),
        (".env", "DB_HOST=db\nLEGACY=1\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["inspect", ".env", "--format", "json"]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).expect("JSON report");
    assert_eq!(json["missing"][0]["name"], "DB_PORT");
    assert_eq!(json["missing"][1]["name"], "APP_ENV");
    assert_eq!(json["extra"][0]["name"], "LEGACY");
    assert_eq!(json["invalid"].as_array().map(Vec::len), Some(0));
}

#[test]
fn inspect_format_comes_from_settings_file() {
    let dir = workspace(&[
        (".env.dist", DIST),
        (".env", "DB_HOST=db\n"),
        (".krakenv.toml", "[inspect]\nformat = \"json\"\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).args(["inspect", ".env"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn config_flag_sets_dist_path() {
    let dir = workspace(&[
        ("shared.dist", "TOKEN= #prompt:Token?|string;minlen:8\n"),
        (".env", "TOKEN=short\n"),
        ("krakenv.toml", "dist_path = \"shared.dist\"\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["--config", "krakenv.toml", "validate", ".env"]);

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("length 5 is below minimum 8"));
}

#[test]
fn check_reports_annotation_problems() {
    let dir = workspace(&[(
        ".env.dist",
        "db_host=x\nDB_PORT= #prompt:Port?\nDB_PORT=1\n",
    )]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).arg("check");

    let output_pred = predicate::str::contains("Line 1: db_host")
        .and(predicate::str::contains("missing type separator"))
        .and(predicate::str::contains("Variable already defined on line 2"));

    cmd.assert().code(1).stdout(output_pred);
}

#[test]
fn check_passes_clean_distributable() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).arg("check");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("VALIDATION PASSED: .env.dist"));
}

#[test]
fn generate_writes_target_file() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["generate", ".env", "--set", "DB_PORT=5432"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 variable(s) to .env"));

    let written = fs::read_to_string(dir.path().join(".env")).expect("generated file");
    assert_eq!(
        written,
        "#krakenv:environments=local,prod\n\n# Database\nDB_HOST=localhost\nDB_PORT=5432\nAPP_ENV=local\n"
    );
}

#[test]
fn generate_keeps_existing_values_and_lists_pending() {
    let dir = workspace(&[
        (".env.dist", DIST),
        (".env", "DB_HOST=db.internal\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["generate", ".env", "--stdout", "--keep-annotations", "--force"]);

    let output_pred = predicate::str::contains("DB_HOST=db.internal #prompt:Host?|string")
        .and(predicate::str::contains("DB_PORT= #prompt:Port?|int;min:1;max:65535"));

    cmd.assert()
        .success()
        .stdout(output_pred)
        .stderr(predicate::str::contains("1 variable(s) still need a value: DB_PORT"));
}

#[test]
fn generate_rejects_invalid_values() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["generate", ".env", "--set", "DB_PORT=http"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("expected integer, got \"http\""));
    assert!(!dir.path().join(".env").exists());
}

#[test]
fn generate_rejects_malformed_set() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["generate", ".env", "--set", "DB_PORT"]);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn generate_refuses_unresolved_required_values() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).args(["generate", ".env"]);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains(
            "the following variables require values: DB_PORT",
        ));
    assert!(!dir.path().join(".env").exists());
}

#[test]
fn generate_all_writes_one_file_per_environment() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["generate", "--all", "--set", "DB_PORT=5432"]);

    cmd.assert().success().stdout(
        predicate::str::contains("to .env.local").and(predicate::str::contains("to .env.prod")),
    );

    for name in [".env.local", ".env.prod"] {
        let written = fs::read_to_string(dir.path().join(name)).expect("generated file");
        assert!(written.contains("DB_PORT=5432\n"), "{name}: {written}");
    }
}

#[test]
fn init_writes_config_block_and_header() {
    let dir = workspace(&[]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["init", "--environments", "local,staging", "--template"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("✓ Created .env.dist"))
        .stdout(predicate::str::contains("krakenv add").not());

    let written = fs::read_to_string(dir.path().join(".env.dist")).expect("created file");
    assert!(written.starts_with("#krakenv:environments=local,staging\n#krakenv:strict=false\n\n#"));
    assert!(written.contains("# Add your variables below:\n"));
}

#[test]
fn init_refuses_existing_file_without_force() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut refused = cargo_bin_cmd!("krakenv");
    refused.current_dir(dir.path()).arg("init");
    refused
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(
        fs::read_to_string(dir.path().join(".env.dist")).expect("dist"),
        DIST
    );

    let mut forced = cargo_bin_cmd!("krakenv");
    forced.current_dir(dir.path()).args(["init", "--force"]);
    forced
        .assert()
        .success()
        .stdout(predicate::str::contains("krakenv add VAR_NAME"));
    assert!(fs::read_to_string(dir.path().join(".env.dist"))
        .expect("dist")
        .starts_with("#krakenv:environments=local\n"));
}

#[test]
fn add_appends_annotated_variable() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).args([
        "add",
        "MAX_CONNECTIONS",
        "--type",
        "int",
        "--prompt",
        "Max connections?",
        "--default",
        "10",
        "--min",
        "1",
        "--max",
        "100",
        "--pattern",
        "^x$",
    ]);

    let line = "MAX_CONNECTIONS=10 #prompt:Max connections?|int;min:1;max:100";
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(format!("✓ Added: {line}")));

    let written = fs::read_to_string(dir.path().join(".env.dist")).expect("dist");
    assert_eq!(written, format!("{DIST}{line}\n"));
}

#[test]
fn add_rejects_duplicates_and_invalid_names() {
    let dir = workspace(&[(".env.dist", DIST)]);

    let mut duplicate = cargo_bin_cmd!("krakenv");
    duplicate
        .current_dir(dir.path())
        .args(["add", "DB_HOST", "--optional"]);
    duplicate
        .assert()
        .code(2)
        .stderr(predicate::str::contains("variable DB_HOST already exists in .env.dist"));

    let mut invalid = cargo_bin_cmd!("krakenv");
    invalid.current_dir(dir.path()).args(["add", "db-host"]);
    invalid.assert().code(1);

    assert_eq!(
        fs::read_to_string(dir.path().join(".env.dist")).expect("dist"),
        DIST
    );
}

#[test]
fn add_requires_existing_distributable() {
    let dir = workspace(&[]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).args(["add", "API_KEY", "--secret"]);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("run 'krakenv init'"));
}

#[test]
fn inspect_sync_fills_defaults() {
    let dir = workspace(&[
        (
            ".env.dist",
            "HOST=localhost #prompt:Host?|string\nDEBUG= #prompt:Debug?|boolean;optional\n",
        ),
        (".env", "LEGACY=1\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).args(["inspect", ".env", "--sync"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("✓ Synced 2 variable(s) in .env"));
    assert_eq!(
        fs::read_to_string(dir.path().join(".env")).expect("synced file"),
        "LEGACY=1\nHOST=localhost\nDEBUG=\n"
    );
}

#[test]
fn inspect_sync_refuses_required_without_default() {
    let dir = workspace(&[(".env.dist", DIST), (".env", "DB_HOST=db\n")]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path()).args(["inspect", ".env", "--sync"]);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("require values: DB_PORT"));
    assert_eq!(
        fs::read_to_string(dir.path().join(".env")).expect("target"),
        "DB_HOST=db\n"
    );
}

#[test]
fn check_notes_declared_dist_path() {
    let dir = workspace(&[(
        "template.env",
        "#krakenv:distPath=config/.env.dist\nA=1\n",
    )]);

    let mut cmd = cargo_bin_cmd!("krakenv");
    cmd.current_dir(dir.path())
        .args(["check", "--dist", "template.env"]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "Note: template.env declares distPath=config/.env.dist",
        ));
}
