//! Process exit codes for the promforge CLI.
//!
//! Scripts drive promforge in CI, so each fatal error class maps to a stable
//! code. The mapping lives here, next to the taxonomy it mirrors, and is
//! covered by tests so a new [`ForgeError`] variant cannot silently change an
//! existing code.

use crate::error::{ForgeError, ValidationError};

/// Named exit codes.
pub mod codes {
    /// Pipeline completed and returned a result bundle.
    pub const SUCCESS: i32 = 0;
    /// Unclassified failure (I/O, research, test harness, internal).
    pub const GENERAL: i32 = 1;
    /// CLI arguments or configuration rejected before the run started.
    pub const CONFIG: i32 = 2;
    /// A provider API key environment variable is missing.
    pub const API_KEY: i32 = 3;
    /// Metric validation or the fix loop exhausted its attempt budget.
    pub const VALIDATION: i32 = 10;
    /// The LLM provider failed after the bounded retry budget.
    pub const LLM_FAILURE: i32 = 70;
}

/// Map a fatal pipeline error to its process exit code.
#[must_use]
pub fn error_to_exit_code(err: &ForgeError) -> i32 {
    match err {
        ForgeError::Config(_) => codes::CONFIG,
        ForgeError::ApiKey { .. } => codes::API_KEY,
        ForgeError::Validation(_) => codes::VALIDATION,
        ForgeError::Llm(_) => codes::LLM_FAILURE,
        ForgeError::Research(_)
        | ForgeError::CodeGeneration(_)
        | ForgeError::Testing(_)
        | ForgeError::Io { .. }
        | ForgeError::Internal(_) => codes::GENERAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodeGenerationError, ConfigError, LlmError, ResearchError};
    use std::path::PathBuf;

    #[test]
    fn config_errors_map_to_config_code() {
        let err = ForgeError::Config(ConfigError::MissingExporterPath);
        assert_eq!(error_to_exit_code(&err), codes::CONFIG);
    }

    #[test]
    fn api_key_errors_map_to_api_key_code() {
        let err = ForgeError::ApiKey {
            provider: "openai".into(),
            env_var: "OPENAI_API_KEY".into(),
        };
        assert_eq!(error_to_exit_code(&err), codes::API_KEY);
    }

    #[test]
    fn validation_errors_map_to_validation_code() {
        let schema = ForgeError::Validation(ValidationError::MetricName { name: "9x".into() });
        assert_eq!(error_to_exit_code(&schema), codes::VALIDATION);

        let exhausted = ForgeError::Validation(ValidationError::Unresolved { attempts: 3 });
        assert_eq!(error_to_exit_code(&exhausted), codes::VALIDATION);
    }

    #[test]
    fn llm_errors_map_to_llm_code() {
        let err = ForgeError::Llm(LlmError::ProviderOutage("502".into()));
        assert_eq!(error_to_exit_code(&err), codes::LLM_FAILURE);
    }

    #[test]
    fn remaining_classes_map_to_general() {
        let research = ForgeError::Research(ResearchError::NoExistingSources {
            path: PathBuf::from("/tmp/empty"),
        });
        assert_eq!(error_to_exit_code(&research), codes::GENERAL);

        let env = ForgeError::CodeGeneration(CodeGenerationError::EnvironmentSetup {
            reason: "go not found".into(),
        });
        assert_eq!(error_to_exit_code(&env), codes::GENERAL);

        let io = ForgeError::io(
            "out/exporter.go",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(error_to_exit_code(&io), codes::GENERAL);
    }
}
