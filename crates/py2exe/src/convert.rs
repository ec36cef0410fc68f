use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use py2exe_contracts::BUILD_TEMP_PREFIX;
use sha2::{Digest, Sha256};

use crate::error::{ConvertError, ConvertErrorKind};
use crate::escape::escape_bytes;
use crate::interpreter::{resolve_interpreter, InterpreterSpec};
use crate::toolchain::{compile_wrapper, ToolchainConfig};
use crate::wrapper::generate_wrapper;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub interpreter: InterpreterSpec,
    pub toolchain: ToolchainConfig,
    /// Also write the generated launcher source here.
    pub keep_c: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ConvertOutput {
    pub artifact: PathBuf,
    pub artifact_size: u64,
    pub interpreter: PathBuf,
    pub script_size: usize,
    pub script_sha256: String,
    pub escaped_size: usize,
    pub wrapper_c_size: usize,
    pub cc_stdout: Vec<u8>,
    pub cc_stderr: Vec<u8>,
}

/// Progress notifications emitted while converting.
#[derive(Debug, Clone, Copy)]
pub enum ConvertEvent<'a> {
    InterpreterResolved { path: &'a Path },
    SourceRead { bytes: usize },
    Compiling { cc: &'a OsStr },
}

pub fn convert(options: &ConvertOptions) -> Result<ConvertOutput, ConvertError> {
    convert_with_events(options, |_| {})
}

/// Runs the whole pipeline, stopping at the first failing step.
///
/// On error no artifact exists at `options.output` and every temporary file has
/// been removed.
pub fn convert_with_events<F>(
    options: &ConvertOptions,
    mut on_event: F,
) -> Result<ConvertOutput, ConvertError>
where
    F: FnMut(ConvertEvent<'_>),
{
    let input = options.input.as_path();
    let output = options.output.as_path();

    verify_input_exists(input)?;

    let interpreter = resolve_interpreter(&options.interpreter)?;
    on_event(ConvertEvent::InterpreterResolved { path: &interpreter });

    let source = read_source(input)?;
    let script_size = source.len();
    on_event(ConvertEvent::SourceRead { bytes: script_size });
    let script_sha256 = sha256_hex(&source);

    let escaped = escape_bytes(&source)?;
    drop(source);

    let mut c_file = tempfile::Builder::new()
        .prefix(BUILD_TEMP_PREFIX)
        .suffix(".c")
        .tempfile()
        .map_err(|err| {
            ConvertError::new(
                ConvertErrorKind::TempFileFailure,
                format!("cannot create temporary C file: {err}"),
            )
        })?;

    let script_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    let wrapper = generate_wrapper(&escaped, &script_name, &interpreter);
    let escaped_size = escaped.len();
    drop(escaped);

    let c_path = c_file.path().to_path_buf();
    c_file
        .write_all(wrapper.as_str().as_bytes())
        .and_then(|()| c_file.flush())
        .map_err(|err| {
            ConvertError::new(
                ConvertErrorKind::GenerationFailure,
                format!("write C wrapper {}: {err}", c_path.display()),
            )
        })?;
    if let Some(keep) = &options.keep_c {
        std::fs::write(keep, wrapper.as_str().as_bytes()).map_err(|err| {
            ConvertError::new(
                ConvertErrorKind::GenerationFailure,
                format!("write C wrapper copy {}: {err}", keep.display()),
            )
        })?;
    }

    on_event(ConvertEvent::Compiling {
        cc: &options.toolchain.cc,
    });
    let tool = compile_wrapper(&c_path, output, &options.toolchain).map_err(|err| {
        ConvertError::new(ConvertErrorKind::CompileFailure, format!("{err:#}"))
    })?;
    if !tool.ok {
        let mut err = ConvertError::new(
            ConvertErrorKind::CompileFailure,
            format!("C toolchain failed (exit={})", tool.exit_status),
        );
        err.stderr = tool.stderr;
        return Err(err);
    }

    let artifact_size = verify_artifact(output)?;

    Ok(ConvertOutput {
        artifact: output.to_path_buf(),
        artifact_size,
        interpreter,
        script_size,
        script_sha256,
        escaped_size,
        wrapper_c_size: wrapper.len(),
        cc_stdout: tool.stdout,
        cc_stderr: tool.stderr,
    })
}

fn verify_input_exists(input: &Path) -> Result<(), ConvertError> {
    match std::fs::metadata(input) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConvertError::new(
            ConvertErrorKind::InputNotFound,
            format!("python script '{}' not found", input.display()),
        )),
        Err(err) => Err(ConvertError::new(
            ConvertErrorKind::InputNotFound,
            format!("python script '{}' not accessible: {err}", input.display()),
        )),
    }
}

fn read_source(input: &Path) -> Result<Vec<u8>, ConvertError> {
    let read_err = |err: std::io::Error| {
        ConvertError::new(
            ConvertErrorKind::ReadFailure,
            format!("cannot open file '{}': {err}", input.display()),
        )
    };
    let mut file = std::fs::File::open(input).map_err(read_err)?;
    let expected = file.metadata().map_err(read_err)?.len();
    let expected = usize::try_from(expected).map_err(|_| {
        ConvertError::new(
            ConvertErrorKind::AllocationFailure,
            format!("'{}' is too large ({expected} bytes)", input.display()),
        )
    })?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(expected).map_err(|err| {
        ConvertError::new(
            ConvertErrorKind::AllocationFailure,
            format!("cannot allocate {expected} bytes for '{}': {err}", input.display()),
        )
    })?;
    file.read_to_end(&mut buf).map_err(read_err)?;
    if buf.len() < expected {
        return Err(ConvertError::new(
            ConvertErrorKind::ReadFailure,
            format!(
                "failed to read entire file '{}' (read {} of {expected} bytes)",
                input.display(),
                buf.len()
            ),
        ));
    }
    Ok(buf)
}

fn verify_artifact(output: &Path) -> Result<u64, ConvertError> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        Ok(meta) => {
            if meta.is_file() {
                let _ = std::fs::remove_file(output);
            }
            Err(ConvertError::new(
                ConvertErrorKind::ArtifactMissing,
                format!("failed to create executable '{}' (empty)", output.display()),
            ))
        }
        Err(err) => Err(ConvertError::new(
            ConvertErrorKind::ArtifactMissing,
            format!("failed to create executable '{}': {err}", output.display()),
        )),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push(nybble_to_hex((b >> 4) & 0x0f));
        out.push(nybble_to_hex(b & 0x0f));
    }
    out
}

fn nybble_to_hex(n: u8) -> char {
    match n {
        0..=9 => (b'0' + n) as char,
        10..=15 => (b'a' + (n - 10)) as char,
        _ => '0',
    }
}
