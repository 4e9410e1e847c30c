//! External mermaid renderer (`mmdc`) invocation.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::ValidationResult;

/// Failures of the renderer process itself, as opposed to a diagram it rejected.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to launch renderer {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer timed out after {0} seconds")]
    Timeout(u64),

    #[error("renderer exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to an installed renderer, obtained from [`MermaidRenderer::detect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MermaidRenderer {
    command: String,
    timeout: Duration,
}

impl MermaidRenderer {
    /// Build a handle without probing. Prefer [`detect`](Self::detect).
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Probe `<command> --version` once. `None` when the renderer cannot be
    /// launched, exits non-zero, or does not answer within `timeout`.
    pub async fn detect(command: &str, timeout: Duration) -> Option<Self> {
        let child = Command::new(command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(c) => c,
            Err(e) => {
                info!(renderer = %command, error = %e, "Mermaid renderer not found; using structural validation");
                return None;
            }
        };

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                info!(renderer = %command, version = %version, "Mermaid renderer detected");
                Some(Self::new(command, timeout))
            }
            Ok(Ok(output)) => {
                info!(
                    renderer = %command,
                    exit_code = output.status.code().unwrap_or(-1),
                    "Mermaid renderer probe failed; using structural validation"
                );
                None
            }
            Ok(Err(e)) => {
                info!(renderer = %command, error = %e, "Mermaid renderer probe failed; using structural validation");
                None
            }
            Err(_) => {
                warn!(renderer = %command, timeout_secs = timeout.as_secs(), "Mermaid renderer probe timed out");
                None
            }
        }
    }

    /// Render `code` to a scratch SVG. Exit code 0 is valid; otherwise the
    /// renderer's stderr becomes the error text.
    ///
    /// The scratch directory is owned by this call and removed afterwards.
    pub async fn check(&self, code: &str) -> Result<ValidationResult, RenderError> {
        let dir = tempfile::Builder::new().prefix("blueprint-mmd-").tempdir()?;
        let input = dir.path().join("diagram.mmd");
        let output = dir.path().join("diagram.svg");

        let result = match tokio::fs::write(&input, code).await {
            Ok(()) => self.run(&input, &output).await,
            Err(e) => Err(RenderError::Io(e)),
        };

        let dir_path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            warn!(path = %dir_path.display(), error = %e, "Failed to remove renderer scratch directory");
        }

        let output = result?;
        if output.status.success() {
            return Ok(ValidationResult::ok());
        }
        Ok(ValidationResult::invalid(failure_text(&output)))
    }

    /// Render `code` to `output_path`; the extension (`.png`, `.svg`) picks the format.
    pub async fn render_to(&self, code: &str, output_path: &Path) -> Result<(), RenderError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let input = tempfile::Builder::new()
            .prefix("blueprint-")
            .suffix(".mmd")
            .tempfile()?;
        tokio::fs::write(input.path(), code).await?;

        let output = self.run(input.path(), output_path).await;

        let input_path = input.path().to_path_buf();
        if let Err(e) = input.close() {
            warn!(path = %input_path.display(), error = %e, "Failed to remove renderer input file");
        }

        let output = output?;
        if output.status.success() {
            return Ok(());
        }
        Err(RenderError::Failed {
            code: output.status.code().unwrap_or(-1),
            stderr: failure_text(&output),
        })
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<Output, RenderError> {
        let start = Instant::now();
        let child = Command::new(&self.command)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("-b")
            .arg("transparent")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout.as_secs()))??;

        debug!(
            renderer = %self.command,
            exit_code = output.status.code().unwrap_or(-1),
            duration_ms = start.elapsed().as_millis() as u64,
            "Renderer finished"
        );
        Ok(output)
    }
}

fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!(
            "Renderer exited with code {}",
            output.status.code().unwrap_or(-1)
        )
    } else {
        stderr
    }
}
