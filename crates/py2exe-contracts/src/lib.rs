//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable output.

pub const PY2EXE_REPORT_SCHEMA_VERSION: &str = "py2exe.report@0.1.0";

/// Prefix of the generated C source created while compiling (`py2exe_XXXXXX.c`).
pub const BUILD_TEMP_PREFIX: &str = "py2exe_";

/// Prefix of the script file a produced executable writes at run time
/// (`pyexe_<script>_XXXXXX`).
pub const RUNTIME_TEMP_PREFIX: &str = "pyexe_";
