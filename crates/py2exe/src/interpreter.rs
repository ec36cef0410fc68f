use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, ConvertErrorKind};

pub const ENV_PYTHON: &str = "PY2EXE_PYTHON";

const DEFAULT_CANDIDATES: &[&str] = &["python3", "python"];

/// How to locate the interpreter the produced executable will invoke.
#[derive(Debug, Clone, Default)]
pub struct InterpreterSpec {
    /// Explicit interpreter (`--python`): a path, or a bare name looked up on `PATH`.
    pub explicit: Option<OsString>,
}

impl InterpreterSpec {
    pub fn explicit(value: impl Into<OsString>) -> Self {
        Self {
            explicit: Some(value.into()),
        }
    }
}

/// Resolves the interpreter to an absolute path.
///
/// Order: explicit value, then `PY2EXE_PYTHON`, then `python3`/`python` on `PATH`.
pub fn resolve_interpreter(spec: &InterpreterSpec) -> Result<PathBuf, ConvertError> {
    let requested = spec
        .explicit
        .clone()
        .or_else(|| std::env::var_os(ENV_PYTHON).filter(|v| !v.is_empty()));

    let found = match &requested {
        Some(raw) => resolve_executable(raw),
        None => DEFAULT_CANDIDATES
            .iter()
            .find_map(|c| resolve_executable(&OsString::from(c))),
    };

    let Some(found) = found else {
        let what = match &requested {
            Some(raw) => format!("python interpreter {:?} not found", raw),
            None => format!(
                "python interpreter not found on PATH (looked for {})",
                DEFAULT_CANDIDATES.join(", ")
            ),
        };
        return Err(ConvertError::new(
            ConvertErrorKind::InterpreterNotFound,
            format!("{what} (hint: install python3, pass --python <PATH>, or set {ENV_PYTHON})"),
        ));
    };

    // Symlinks are kept as-is: a virtualenv's `bin/python` must not be resolved
    // to the base interpreter.
    if found.is_absolute() {
        return Ok(found);
    }
    let cwd = std::env::current_dir().map_err(|err| {
        ConvertError::new(
            ConvertErrorKind::InterpreterNotFound,
            format!("resolve interpreter path {}: {err}", found.display()),
        )
    })?;
    Ok(cwd.join(found))
}

fn resolve_executable(bin: &OsString) -> Option<PathBuf> {
    let bin_path = PathBuf::from(bin);
    if bin_path.components().count() > 1 {
        return if is_executable(&bin_path) {
            Some(bin_path)
        } else {
            None
        };
    }

    let path_env = std::env::var_os("PATH")?;
    for p in std::env::split_paths(&path_env) {
        let cand = p.join(&bin_path);
        if is_executable(&cand) {
            return Some(cand);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        match std::fs::metadata(path) {
            Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
            Err(_) => false,
        }
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn write_exe(dir: &Path, name: &str, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt as _;
        let path = dir.join(name);
        std::fs::write(&path, b"#!/bin/sh\n").expect("write exe");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).expect("chmod");
        path
    }

    #[cfg(unix)]
    #[test]
    fn explicit_path_is_kept_without_resolving_symlinks() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let exe = write_exe(tmp.path(), "python3.99", 0o755);
        let link = tmp.path().join("python");
        std::os::unix::fs::symlink(&exe, &link).expect("symlink");

        let got = resolve_interpreter(&InterpreterSpec::explicit(&link)).expect("resolve");
        assert!(got.is_absolute());
        assert_eq!(got, link);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_explicit_path_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let exe = write_exe(tmp.path(), "notexec", 0o644);

        let err = resolve_interpreter(&InterpreterSpec::explicit(exe)).expect_err("must fail");
        assert_eq!(err.kind, ConvertErrorKind::InterpreterNotFound);
        assert!(err.message.contains("--python"), "message={}", err.message);
    }

    #[test]
    fn missing_explicit_path_is_interpreter_not_found() {
        let err = resolve_interpreter(&InterpreterSpec::explicit(
            "/nonexistent/py2exe-test/python3",
        ))
        .expect_err("must fail");
        assert_eq!(err.kind, ConvertErrorKind::InterpreterNotFound);
    }

    #[cfg(unix)]
    #[test]
    fn bare_name_is_searched_on_path() {
        let found = resolve_executable(&OsString::from("sh")).expect("sh on PATH");
        assert!(found.ends_with("sh"));
        assert!(resolve_executable(&OsString::from("py2exe-definitely-missing-bin")).is_none());
    }
}
