use std::path::Path;
use std::process::{Command, Output};

use py2exe_contracts::PY2EXE_REPORT_SCHEMA_VERSION;

fn py2exe(dir: &Path, args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_py2exe");
    Command::new(bin)
        .args(args)
        .current_dir(dir)
        .env("TMPDIR", dir)
        .env_remove("PY2EXE_KEEP_C")
        .output()
        .expect("run py2exe")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn no_arguments_prints_usage_and_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = py2exe(tmp.path(), &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("Usage:"), "stdout={}", stdout(&out));
}

#[test]
fn too_many_arguments_prints_usage_and_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = py2exe(tmp.path(), &["a.py", "a", "b"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("Usage:"), "stdout={}", stdout(&out));
}

#[test]
fn help_exits_0() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = py2exe(tmp.path(), &["--help"]);
    assert!(out.status.success());
}

#[test]
fn missing_input_exits_1_without_output() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = py2exe(tmp.path(), &["missing.py"]);

    assert_eq!(out.status.code(), Some(1));
    let text = stdout(&out);
    assert!(text.contains("'missing.py' not found"), "stdout={text}");
    assert!(!tmp.path().join("missing").exists());
}

#[test]
fn missing_interpreter_exits_1_with_hint() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::write(tmp.path().join("s.py"), "print(1)\n").expect("write script");
    let out = py2exe(
        tmp.path(),
        &["s.py", "--python", "/nonexistent/py2exe-test/python3"],
    );

    assert_eq!(out.status.code(), Some(1));
    let text = stdout(&out);
    assert!(text.contains("--python"), "stdout={text}");
    assert!(!tmp.path().join("s").exists());
}

#[test]
fn report_json_describes_failures() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = py2exe(tmp.path(), &["missing.py", "--report-json"]);
    assert_eq!(out.status.code(), Some(1));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse report json");
    assert_eq!(
        v.get("schema_version").and_then(|s| s.as_str()),
        Some(PY2EXE_REPORT_SCHEMA_VERSION)
    );
    assert_eq!(v.get("ok").and_then(|b| b.as_bool()), Some(false));
    assert_eq!(v.get("exit_code").and_then(|n| n.as_u64()), Some(1));
    assert_eq!(v.get("output").and_then(|s| s.as_str()), Some("missing"));
    let err = v.get("error").expect("error object");
    assert_eq!(
        err.get("kind").and_then(|s| s.as_str()),
        Some("input-not-found")
    );
    assert_eq!(
        err.get("step").and_then(|s| s.as_str()),
        Some("verify-input-exists")
    );
}

#[cfg(unix)]
#[test]
fn failing_compiler_exits_1_and_cleans_up() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::write(tmp.path().join("s.py"), "print(1)\n").expect("write script");
    let out = py2exe(
        tmp.path(),
        &["s.py", "app", "--python", "/bin/sh", "--cc", "false"],
    );

    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("C toolchain failed"), "stdout={}", stdout(&out));

    let mut names: Vec<String> = std::fs::read_dir(tmp.path())
        .expect("read_dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["s.py".to_string()]);
}

#[cfg(unix)]
#[test]
fn empty_compiler_output_is_reported_and_removed() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::write(tmp.path().join("s.py"), "print(1)\n").expect("write script");
    let out = py2exe(
        tmp.path(),
        &["s.py", "app", "--python", "/bin/sh", "--cc", "true"],
    );

    assert_eq!(out.status.code(), Some(1));
    let text = stdout(&out);
    assert!(text.contains("failed to create executable 'app' (empty)"), "stdout={text}");
    assert!(!tmp.path().join("app").exists());
}
