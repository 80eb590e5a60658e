//! External-tool validation of generated Go sources.

use std::path::Path;

use tracing::debug;

use crate::config::{ToolSpec, ToolchainConfig};
use crate::error::ForgeError;
use crate::runner::{CommandSpec, run_command};
use crate::types::{CodeArtifact, ValidatedCodeArtifact};
use crate::workspace::Workspace;

pub struct ValidationAgent {
    workspace: Workspace,
    toolchain: ToolchainConfig,
}

impl ValidationAgent {
    pub fn new(workspace: Workspace, toolchain: ToolchainConfig) -> Self {
        Self {
            workspace,
            toolchain,
        }
    }

    /// Run the tool sequence over every file of the artifact.
    ///
    /// Files are written under the workspace first so the tools see real
    /// paths. When any check fails the written files are removed again, so a
    /// failed pass leaves no partial sources behind. `formatted_code`
    /// carries the re-read content of the last file, picking up in-place
    /// rewrites by the formatter.
    pub async fn validate(
        &self,
        artifact: &CodeArtifact,
    ) -> Result<ValidatedCodeArtifact, ForgeError> {
        let mut validated = ValidatedCodeArtifact {
            files: artifact.files.clone(),
            validation_errors: Vec::new(),
            formatted_code: None,
        };
        let mut written = Vec::new();

        let outcome = self
            .check_files(artifact, &mut validated, &mut written)
            .await;

        if !validated.validation_errors.is_empty() {
            for rel in &written {
                self.workspace.remove_file(rel);
            }
        }
        outcome?;

        debug!(
            files = artifact.len(),
            errors = validated.validation_errors.len(),
            "validation pass complete"
        );
        Ok(validated)
    }

    async fn check_files(
        &self,
        artifact: &CodeArtifact,
        validated: &mut ValidatedCodeArtifact,
        written: &mut Vec<String>,
    ) -> Result<(), ForgeError> {
        for (rel, content) in &artifact.files {
            let path = self.workspace.write_text(rel, content)?;
            written.push(rel.clone());

            let (ok, output) = self.run_tool(&self.toolchain.format, &path).await;
            if !ok {
                validated
                    .validation_errors
                    .push(format!("Format errors in {rel}:\n{output}"));
            }

            let (ok, output) = self.run_tool(&self.toolchain.vet, &path).await;
            if !ok {
                validated
                    .validation_errors
                    .push(format!("Vet errors in {rel}:\n{output}"));
            }

            // Lint findings count regardless of exit status.
            let (_, output) = self.run_tool(&self.toolchain.lint, &path).await;
            if !output.trim().is_empty() {
                validated
                    .validation_errors
                    .push(format!("Lint warnings in {rel}:\n{output}"));
            }

            let (ok, output) = self.run_tool(&self.toolchain.security, &path).await;
            if !ok {
                validated
                    .validation_errors
                    .push(format!("Security issues in {rel}:\n{output}"));
            }

            validated.formatted_code = Some(self.workspace.read_to_string(rel)?);
        }
        Ok(())
    }

    /// Run one tool against one file. Launch failures and timeouts are
    /// reported as tool failures with the error text as output, never as
    /// pipeline errors.
    async fn run_tool(&self, tool: &ToolSpec, file: &Path) -> (bool, String) {
        let spec = CommandSpec::new(&tool.command)
            .args(&tool.args)
            .arg(file)
            .cwd(self.workspace.root());
        match run_command(&spec, self.toolchain.tool_timeout).await {
            Ok(output) => (output.success(), output.combined()),
            Err(e) => (false, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> ToolSpec {
        ToolSpec::new("true", &[])
    }

    fn agent_with(toolchain: ToolchainConfig, root: &Path) -> ValidationAgent {
        let workspace = Workspace::new(root);
        workspace.prepare().unwrap();
        ValidationAgent::new(workspace, toolchain)
    }

    fn all_quiet() -> ToolchainConfig {
        ToolchainConfig {
            format: quiet(),
            vet: quiet(),
            lint: quiet(),
            security: quiet(),
            ..ToolchainConfig::default()
        }
    }

    fn artifact() -> CodeArtifact {
        CodeArtifact::from_files(std::collections::BTreeMap::from([
            (
                "cmd/main.go".to_string(),
                "package main\n\nfunc main() {}\n".to_string(),
            ),
            ("exporter.go".to_string(), "package main\n".to_string()),
        ]))
    }

    #[tokio::test]
    async fn clean_pass_keeps_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent_with(all_quiet(), dir.path());

        let validated = agent.validate(&artifact()).await.unwrap();

        assert!(validated.is_valid());
        assert!(dir.path().join("cmd/main.go").is_file());
        assert!(dir.path().join("exporter.go").is_file());
        // Last file in iteration order is re-read into the formatted slot.
        assert_eq!(validated.formatted_code.as_deref(), Some("package main\n"));
    }

    #[tokio::test]
    async fn failed_pass_removes_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = ToolchainConfig {
            vet: ToolSpec::new("false", &[]),
            ..all_quiet()
        };
        let agent = agent_with(toolchain, dir.path());

        let validated = agent.validate(&artifact()).await.unwrap();

        assert_eq!(validated.validation_errors.len(), 2);
        assert!(
            validated.validation_errors[0].starts_with("Vet errors in cmd/main.go:"),
            "got: {}",
            validated.validation_errors[0]
        );
        assert!(!dir.path().join("cmd/main.go").exists());
        assert!(!dir.path().join("exporter.go").exists());
        // The artifact content itself is untouched.
        assert_eq!(validated.files.len(), 2);
    }

    #[tokio::test]
    async fn error_entries_follow_the_tool_order() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = ToolchainConfig {
            format: ToolSpec::new("false", &[]),
            vet: ToolSpec::new("false", &[]),
            ..all_quiet()
        };
        let agent = agent_with(toolchain, dir.path());

        let validated = agent
            .validate(&CodeArtifact::single("exporter.go", "package main\n"))
            .await
            .unwrap();

        assert_eq!(validated.validation_errors.len(), 2);
        assert!(validated.validation_errors[0].starts_with("Format errors in exporter.go:"));
        assert!(validated.validation_errors[1].starts_with("Vet errors in exporter.go:"));
    }

    #[tokio::test]
    async fn lint_output_counts_even_with_exit_zero() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = ToolchainConfig {
            lint: ToolSpec::new("echo", &["shadowed variable"]),
            ..all_quiet()
        };
        let agent = agent_with(toolchain, dir.path());

        let validated = agent
            .validate(&CodeArtifact::single("exporter.go", "package main\n"))
            .await
            .unwrap();

        assert_eq!(validated.validation_errors.len(), 1);
        assert!(validated.validation_errors[0].starts_with("Lint warnings in exporter.go:"));
        assert!(validated.validation_errors[0].contains("shadowed variable"));
    }

    #[tokio::test]
    async fn missing_tool_reports_as_failure_output() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = ToolchainConfig {
            security: ToolSpec::new("promforge-no-such-tool", &[]),
            ..all_quiet()
        };
        let agent = agent_with(toolchain, dir.path());

        let validated = agent
            .validate(&CodeArtifact::single("exporter.go", "package main\n"))
            .await
            .unwrap();

        assert_eq!(validated.validation_errors.len(), 1);
        assert!(validated.validation_errors[0].starts_with("Security issues in exporter.go:"));
        assert!(validated.validation_errors[0].contains("failed to launch"));
    }
}
