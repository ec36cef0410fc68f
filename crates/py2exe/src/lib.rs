//! Turns an interpreted script into a native executable.
//!
//! The script is embedded as a C string literal in a small launcher, which is then
//! compiled with the host C toolchain. At run time the launcher writes the script
//! to a temporary file and runs the interpreter on it.

use std::path::{Path, PathBuf};

pub mod convert;
pub mod error;
pub mod escape;
pub mod interpreter;
pub mod toolchain;
pub mod wrapper;

pub use convert::{convert, convert_with_events, ConvertEvent, ConvertOptions, ConvertOutput};
pub use error::{ConvertError, ConvertErrorKind, ConvertStep};
pub use escape::{escape_bytes, EscapedLiteral};
pub use interpreter::{resolve_interpreter, InterpreterSpec};
pub use toolchain::{compile_wrapper, CcProfile, ToolchainConfig, ToolchainOutput};
pub use wrapper::{generate_wrapper, WrapperSource};

pub const ENV_KEEP_C: &str = "PY2EXE_KEEP_C";

const SCRIPT_EXT: &str = ".py";

/// Default output path: `input` with a trailing `.py` removed.
///
/// The input is returned unchanged when it has no `.py` suffix or when stripping
/// would leave an empty name or a directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let raw = input.as_os_str().as_encoded_bytes();
    let Some(stem) = raw.strip_suffix(SCRIPT_EXT.as_bytes()) else {
        return input.to_path_buf();
    };
    if stem.is_empty() || stem.ends_with(b"/") {
        return input.to_path_buf();
    }
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt as _;
        PathBuf::from(std::ffi::OsStr::from_bytes(stem))
    }
    #[cfg(not(unix))]
    {
        PathBuf::from(String::from_utf8_lossy(stem).into_owned())
    }
}

/// `PY2EXE_KEEP_C` is set to something other than empty/`0`/`false`/`no`/`off`.
pub fn keep_c_from_env() -> bool {
    std::env::var(ENV_KEEP_C)
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            !(v.is_empty() || v == "0" || v == "false" || v == "no" || v == "off")
        })
        .unwrap_or(false)
}
