use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::ValueEnum;
use py2exe_contracts::BUILD_TEMP_PREFIX;

pub const ENV_CC: &str = "PY2EXE_CC";
pub const ENV_CC_ARGS: &str = "PY2EXE_CC_ARGS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[clap(rename_all = "kebab_case")]
pub enum CcProfile {
    #[default]
    Default,
    Size,
}

const CC_PROFILE_SIZE_MACOS: &[&str] = &["-Os", "-Wl,-dead_strip", "-Wl,-x"];
const CC_PROFILE_SIZE_LINUX: &[&str] = &[
    "-Os",
    "-ffunction-sections",
    "-fdata-sections",
    "-Wl,--gc-sections",
    "-Wl,--strip-all",
];
const CC_PROFILE_SIZE_FALLBACK: &[&str] = &["-Os"];

fn cc_profile_flags(profile: CcProfile) -> &'static [&'static str] {
    match profile {
        CcProfile::Default => &[],
        CcProfile::Size => {
            if cfg!(target_os = "macos") {
                CC_PROFILE_SIZE_MACOS
            } else if cfg!(target_os = "linux") {
                CC_PROFILE_SIZE_LINUX
            } else {
                CC_PROFILE_SIZE_FALLBACK
            }
        }
    }
}

fn merge_cc_args(existing: &str, flags: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    for tok in existing.split_whitespace().chain(flags.iter().copied()) {
        let t = tok.trim();
        if t.is_empty() {
            continue;
        }
        if seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }

    out
}

/// C toolchain used to build the launcher.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub cc: OsString,
    /// Passed after the fixed `-O2`, in order.
    pub cc_args: Vec<String>,
}

impl ToolchainConfig {
    /// Reads `PY2EXE_CC` / `PY2EXE_CC_ARGS` and appends the profile flags.
    pub fn from_env(cc: Option<OsString>, profile: CcProfile) -> Self {
        let cc = cc
            .or_else(|| std::env::var_os(ENV_CC).filter(|v| !v.is_empty()))
            .unwrap_or_else(|| OsStr::new("cc").to_os_string());
        let existing = std::env::var(ENV_CC_ARGS).unwrap_or_default();
        Self {
            cc,
            cc_args: merge_cc_args(&existing, cc_profile_flags(profile)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolchainOutput {
    pub ok: bool,
    pub exit_status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exe_path: Option<PathBuf>,
}

/// Compiles `c_source_path` into an executable at `out_path` (mode 0755).
///
/// The compiler writes to a staging file beside `out_path` that is renamed into
/// place only on success, so a failed build never leaves a partial artifact.
pub fn compile_wrapper(
    c_source_path: &Path,
    out_path: &Path,
    config: &ToolchainConfig,
) -> Result<ToolchainOutput> {
    let out_dir = match out_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{BUILD_TEMP_PREFIX}"))
        .tempfile_in(out_dir)
        .with_context(|| format!("create staging file in {}", out_dir.display()))?
        .into_temp_path();

    let mut cmd = Command::new(&config.cc);
    cmd.arg("-O2");
    cmd.arg("-o");
    cmd.arg(&*staging);
    cmd.arg(c_source_path);
    for a in &config.cc_args {
        cmd.arg(a);
    }

    let out = cmd
        .output()
        .with_context(|| format!("invoke cc: {:?}", config.cc))?;
    let exit_status = out.status.code().unwrap_or(1);
    let ok = out.status.success();

    if !ok {
        let mut diag = Vec::new();
        diag.extend_from_slice(b"--- py2exe cc invocation ---\n");
        diag.extend_from_slice(format!("cc: {}\n", config.cc.to_string_lossy()).as_bytes());
        if !config.cc_args.is_empty() {
            diag.extend_from_slice(b"\n--- cc args ---\n");
            diag.extend_from_slice(config.cc_args.join(" ").as_bytes());
            diag.extend_from_slice(b"\n");
        }
        diag.extend_from_slice(b"\n--- tmp paths ---\n");
        diag.extend_from_slice(format!("src: {}\n", c_source_path.display()).as_bytes());
        diag.extend_from_slice(format!("exe: {}\n", staging.display()).as_bytes());
        if !out.stderr.is_empty() {
            diag.extend_from_slice(b"\n--- cc stderr ---\n");
            diag.extend_from_slice(&tail_truncate(&out.stderr, 4000));
        }
        return Ok(ToolchainOutput {
            ok,
            exit_status,
            stdout: out.stdout,
            stderr: diag,
            exe_path: None,
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(&*staging, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("chmod 0755: {}", staging.display()))?;
    }
    staging.persist(out_path).with_context(|| {
        format!("move compiled artifact into place: {}", out_path.display())
    })?;

    Ok(ToolchainOutput {
        ok,
        exit_status,
        stdout: out.stdout,
        stderr: out.stderr,
        exe_path: Some(out_path.to_path_buf()),
    })
}

fn tail_truncate(b: &[u8], limit: usize) -> Vec<u8> {
    if b.len() <= limit {
        return b.to_vec();
    }
    let start = b.len() - limit;
    let mut out = Vec::new();
    out.extend_from_slice(b"...<truncated>...\n");
    out.extend_from_slice(&b[start..]);
    out
}
