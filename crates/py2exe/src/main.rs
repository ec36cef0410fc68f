use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use base64::Engine;
use clap::Parser;
use py2exe::{
    convert_with_events, default_output_path, keep_c_from_env, CcProfile, ConvertError,
    ConvertEvent, ConvertOptions, ConvertOutput, InterpreterSpec, ToolchainConfig,
};
use py2exe_contracts::PY2EXE_REPORT_SCHEMA_VERSION;

#[derive(Parser)]
#[command(name = "py2exe", version)]
#[command(about = "Convert a Python 3 script into a standalone executable.", long_about = None)]
struct Cli {
    /// Python 3 script to convert.
    script: PathBuf,

    /// Output executable (defaults to the script name without `.py`).
    output: Option<PathBuf>,

    /// Interpreter the executable will run (path or name on PATH).
    #[arg(long, value_name = "PATH")]
    python: Option<PathBuf>,

    /// C compiler (defaults to $PY2EXE_CC, then `cc`).
    #[arg(long, value_name = "PROG")]
    cc: Option<String>,

    #[arg(long, value_enum, default_value_t = CcProfile::Default)]
    cc_profile: CcProfile,

    /// Also write the generated C launcher to this path.
    #[arg(long, value_name = "PATH")]
    emit_c: Option<PathBuf>,

    /// Print a JSON report instead of status lines.
    #[arg(long)]
    report_json: bool,
}

fn main() -> ExitCode {
    let handle = std::thread::Builder::new()
        .name("py2exe".to_string())
        .spawn(run);

    match handle {
        Ok(handle) => match handle.join() {
            Ok(code) => code,
            Err(panic) => {
                if let Some(message) = panic.downcast_ref::<&str>() {
                    println!("❌ py2exe panicked: {message}");
                } else if let Some(message) = panic.downcast_ref::<String>() {
                    println!("❌ py2exe panicked: {message}");
                } else {
                    println!("❌ py2exe panicked");
                }
                ExitCode::from(1)
            }
        },
        Err(err) => {
            println!("failed to spawn py2exe thread: {err}");
            run()
        }
    }
}

fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                return ExitCode::SUCCESS;
            }
            print_usage(&program_name());
            println!("{}", err.render());
            return ExitCode::from(1);
        }
    };

    match try_main(cli) {
        Ok(code) => code,
        Err(err) => {
            println!("❌ Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn try_main(cli: Cli) -> Result<ExitCode> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.script));

    let keep_c = cli.emit_c.clone().or_else(|| {
        keep_c_from_env().then(|| {
            let mut p = output.clone().into_os_string();
            p.push(".c");
            PathBuf::from(p)
        })
    });

    let options = ConvertOptions {
        input: cli.script.clone(),
        output: output.clone(),
        interpreter: InterpreterSpec {
            explicit: cli.python.clone().map(PathBuf::into_os_string),
        },
        toolchain: ToolchainConfig::from_env(cli.cc.clone().map(Into::into), cli.cc_profile),
        keep_c,
    };

    if cli.report_json {
        let result = convert_with_events(&options, |_| {});
        let ok = result.is_ok();
        println!("{}", serde_json::to_string_pretty(&report_json(&options, &result))?);
        return Ok(exit_code(ok));
    }

    println!("🎯 Input:  {}", options.input.display());
    println!("🎯 Output: {}", options.output.display());
    println!();
    println!("🐍 Converting '{}' to executable...", options.input.display());

    let result = convert_with_events(&options, |event| match event {
        ConvertEvent::InterpreterResolved { path } => {
            println!("🐍 Interpreter: {}", path.display())
        }
        ConvertEvent::SourceRead { bytes } => println!("📊 Script size: {bytes} bytes"),
        ConvertEvent::Compiling { .. } => println!("🔨 Compiling executable..."),
    });

    match result {
        Ok(out) => {
            println!(
                "✅ Successfully created '{}' ({} bytes)",
                out.artifact.display(),
                out.artifact_size
            );
            println!();
            println!("🎉 Conversion completed successfully!");
            println!("💡 You can now run the executable directly:");
            println!("   {}", run_hint(&out.artifact));
            Ok(exit_code(true))
        }
        Err(err) => {
            print_failure(&err);
            Ok(exit_code(false))
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn print_failure(err: &ConvertError) {
    println!("❌ Error: {}", err.message);
    if !err.stderr.is_empty() {
        let stderr = String::from_utf8_lossy(&err.stderr);
        println!("{}", stderr.trim_end());
    }
}

fn report_json(
    options: &ConvertOptions,
    result: &Result<ConvertOutput, ConvertError>,
) -> serde_json::Value {
    let b64 = base64::engine::general_purpose::STANDARD;
    match result {
        Ok(out) => serde_json::json!({
            "schema_version": PY2EXE_REPORT_SCHEMA_VERSION,
            "ok": true,
            "exit_code": 0,
            "input": options.input.display().to_string(),
            "output": out.artifact.display().to_string(),
            "interpreter": out.interpreter.display().to_string(),
            "script_size": out.script_size,
            "script_sha256": out.script_sha256,
            "escaped_size": out.escaped_size,
            "wrapper_c_size": out.wrapper_c_size,
            "artifact_size": out.artifact_size,
            "error": serde_json::Value::Null,
            "cc_stdout_b64": b64.encode(&out.cc_stdout),
            "cc_stderr_b64": b64.encode(&out.cc_stderr),
        }),
        Err(err) => serde_json::json!({
            "schema_version": PY2EXE_REPORT_SCHEMA_VERSION,
            "ok": false,
            "exit_code": 1,
            "input": options.input.display().to_string(),
            "output": options.output.display().to_string(),
            "interpreter": serde_json::Value::Null,
            "script_size": serde_json::Value::Null,
            "script_sha256": serde_json::Value::Null,
            "escaped_size": serde_json::Value::Null,
            "wrapper_c_size": serde_json::Value::Null,
            "artifact_size": serde_json::Value::Null,
            "error": {
                "kind": err.kind,
                "step": err.kind.step(),
                "message": err.message,
            },
            "cc_stdout_b64": "",
            "cc_stderr_b64": b64.encode(&err.stderr),
        }),
    }
}

fn run_hint(artifact: &Path) -> String {
    let mut components = artifact.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => format!("./{}", artifact.display()),
        _ => artifact.display().to_string(),
    }
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(|a| PathBuf::from(a).display().to_string())
        .unwrap_or_else(|| "py2exe".to_string())
}

fn print_usage(program: &str) {
    println!("🐍 Python to Executable Converter");
    println!("Usage: {program} <python_script.py> [output_executable] [options]");
    println!();
    println!("Converts a Python 3 script into a standalone executable file");
    println!();
    println!("Parameters:");
    println!("  python_script     - Path to Python 3 script (.py file)");
    println!("  output_executable - Optional output executable name");
    println!("                      (defaults to script name without .py)");
    println!();
    println!("Options:");
    println!("  --python <PATH>   Interpreter to embed (default: python3 on PATH, or $PY2EXE_PYTHON)");
    println!("  --cc <PROG>       C compiler (default: $PY2EXE_CC, then cc)");
    println!("  --cc-profile <P>  default | size");
    println!("  --emit-c <PATH>   Keep the generated C launcher");
    println!("  --report-json     Print a JSON report");
    println!();
    println!("Examples:");
    println!("  {program} hello.py");
    println!("  {program} script.py myapp");
    println!("  {program} ~/projects/calculator.py ~/bin/calc");
    println!();
    println!("Notes:");
    println!("  • Requires a C compiler at build time");
    println!("  • The Python interpreter must exist where the executable runs");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_hint_prefixes_bare_names() {
        assert_eq!(run_hint(Path::new("hello")), "./hello");
        assert_eq!(run_hint(Path::new("bin/hello")), "bin/hello");
        assert_eq!(run_hint(Path::new("/tmp/hello")), "/tmp/hello");
        assert_eq!(run_hint(Path::new("./hello")), "./hello");
    }

    #[test]
    fn cli_accepts_one_or_two_positionals() {
        assert!(Cli::try_parse_from(["py2exe"]).is_err());
        assert!(Cli::try_parse_from(["py2exe", "a.py"]).is_ok());
        let cli = Cli::try_parse_from(["py2exe", "a.py", "app", "--cc-profile", "size"])
            .expect("parse");
        assert_eq!(cli.output, Some(PathBuf::from("app")));
        assert_eq!(cli.cc_profile, CcProfile::Size);
        assert!(Cli::try_parse_from(["py2exe", "a.py", "app", "extra"]).is_err());
    }
}
