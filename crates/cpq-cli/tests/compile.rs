use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;

fn write_source(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn compiles_a_program_to_qud() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "sum.ou", "x : int;\n{\n    x = 5 + 1;\n    output(x);\n}\n");

    let mut cmd = Command::cargo_bin("cpq").unwrap();
    cmd.arg(&input);
    cmd.assert().success().stdout(predicate::str::is_empty());

    let qud = std::fs::read_to_string(dir.path().join("sum.qud")).unwrap();
    assert!(qud.starts_with("IADD $t1 5 1\nIASN x $t1\nIPRT x\nHALT\n"));
    // All labels must be resolved away.
    assert!(!qud.contains('@'));
}

#[test]
fn resolves_jump_targets_to_line_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(
        &dir,
        "loop.ou",
        "x : int; { while (0 == 1) { input(x); break; } }",
    );

    let mut cmd = Command::cargo_bin("cpq").unwrap();
    cmd.arg(&input);
    cmd.assert().success();

    let qud = std::fs::read_to_string(dir.path().join("loop.qud")).unwrap();
    // The loop exit points at line 6, which is the HALT appended by the
    // driver.
    assert!(qud.starts_with("IEQL $t1 0 1\nJMPZ 6 $t1\nIINP x\nJUMP 6\nJUMP 1\nHALT\n"));
}

#[test]
fn rejects_wrong_extension() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "prog.cpl", "{ }");

    let mut cmd = Command::cargo_bin("cpq").unwrap();
    cmd.arg(&input);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("extension must be .ou"));
}

#[test]
fn rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("cpq").unwrap();
    cmd.arg(dir.path().join("missing.ou"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Cannot open input CPL file."));
}

#[test]
fn rejects_missing_argument() {
    let mut cmd = Command::cargo_bin("cpq").unwrap();
    cmd.assert().failure();
}

#[test]
fn reports_parse_errors_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "bad.ou", "x : kk; { }");

    let mut cmd = Command::cargo_bin("cpq").unwrap();
    cmd.arg(&input);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("ParseError"));
    assert!(!dir.path().join("bad.qud").exists());
}

#[test]
fn reports_codegen_errors_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "undef.ou", "{ x = 1; }");

    let mut cmd = Command::cargo_bin("cpq").unwrap();
    cmd.arg(&input);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("CodegenError"))
        .stderr(predicate::str::contains("Undefined variable x."));
    assert!(!dir.path().join("undef.qud").exists());
}

#[test]
fn signature_line_follows_halt() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "sig.ou", "{ output(1); }");

    let mut cmd = Command::cargo_bin("cpq").unwrap();
    cmd.arg(&input);
    cmd.assert().success();

    let qud = std::fs::read_to_string(dir.path().join("sig.qud")).unwrap();
    let lines: Vec<&str> = qud.lines().collect();
    assert_eq!(lines[0], "IPRT 1");
    assert_eq!(lines[1], "HALT");
    assert!(lines[2].starts_with("cpq "));
}
