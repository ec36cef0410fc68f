use serde::Serialize;

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvertStep {
    VerifyInputExists,
    VerifyInterpreterExists,
    ReadSource,
    Escape,
    AllocateTempSourceFile,
    GenerateWrapper,
    Compile,
    VerifyArtifact,
}

impl ConvertStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ConvertStep::VerifyInputExists => "verify-input-exists",
            ConvertStep::VerifyInterpreterExists => "verify-interpreter-exists",
            ConvertStep::ReadSource => "read-source",
            ConvertStep::Escape => "escape",
            ConvertStep::AllocateTempSourceFile => "allocate-temp-source-file",
            ConvertStep::GenerateWrapper => "generate-wrapper",
            ConvertStep::Compile => "compile",
            ConvertStep::VerifyArtifact => "verify-artifact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvertErrorKind {
    InputNotFound,
    InterpreterNotFound,
    ReadFailure,
    AllocationFailure,
    EscapeFailure,
    TempFileFailure,
    GenerationFailure,
    CompileFailure,
    ArtifactMissing,
}

impl ConvertErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConvertErrorKind::InputNotFound => "input-not-found",
            ConvertErrorKind::InterpreterNotFound => "interpreter-not-found",
            ConvertErrorKind::ReadFailure => "read-failure",
            ConvertErrorKind::AllocationFailure => "allocation-failure",
            ConvertErrorKind::EscapeFailure => "escape-failure",
            ConvertErrorKind::TempFileFailure => "temp-file-failure",
            ConvertErrorKind::GenerationFailure => "generation-failure",
            ConvertErrorKind::CompileFailure => "compile-failure",
            ConvertErrorKind::ArtifactMissing => "artifact-missing",
        }
    }

    /// The pipeline state this kind of failure terminates.
    pub fn step(self) -> ConvertStep {
        match self {
            ConvertErrorKind::InputNotFound => ConvertStep::VerifyInputExists,
            ConvertErrorKind::InterpreterNotFound => ConvertStep::VerifyInterpreterExists,
            ConvertErrorKind::ReadFailure | ConvertErrorKind::AllocationFailure => {
                ConvertStep::ReadSource
            }
            ConvertErrorKind::EscapeFailure => ConvertStep::Escape,
            ConvertErrorKind::TempFileFailure => ConvertStep::AllocateTempSourceFile,
            ConvertErrorKind::GenerationFailure => ConvertStep::GenerateWrapper,
            ConvertErrorKind::CompileFailure => ConvertStep::Compile,
            ConvertErrorKind::ArtifactMissing => ConvertStep::VerifyArtifact,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertError {
    pub kind: ConvertErrorKind,
    pub message: String,
    /// Captured compiler diagnostics for `CompileFailure`; empty otherwise.
    pub stderr: Vec<u8>,
}

impl ConvertError {
    pub fn new(kind: ConvertErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
            stderr: Vec::new(),
        }
    }
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ConvertError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_their_step() {
        assert_eq!(
            ConvertErrorKind::AllocationFailure.step(),
            ConvertStep::ReadSource
        );
        assert_eq!(
            ConvertErrorKind::ArtifactMissing.step().as_str(),
            "verify-artifact"
        );
    }

    #[test]
    fn serializes_kebab_case() {
        let v = serde_json::to_value(ConvertErrorKind::TempFileFailure).expect("serialize");
        assert_eq!(v, serde_json::json!("temp-file-failure"));
        let v = serde_json::to_value(ConvertStep::AllocateTempSourceFile).expect("serialize");
        assert_eq!(v, serde_json::json!("allocate-temp-source-file"));
    }

    #[test]
    fn display_includes_kind_tag() {
        let err = ConvertError::new(ConvertErrorKind::InputNotFound, "missing: a.py".to_string());
        assert_eq!(err.to_string(), "[input-not-found] missing: a.py");
    }
}
