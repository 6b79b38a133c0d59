//! HTML to PDF rendering.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::error::{Error, Result};

/// Converts an HTML document into a PDF file.
#[async_trait]
pub trait PdfRenderer: Send + Sync + fmt::Debug {
    /// Render `html` and write the PDF to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or takes too long.
    async fn render(&self, html: &str, output: &Path) -> Result<()>;
}

/// Renders through an external `wkhtmltopdf`-compatible program.
///
/// The program is invoked as `<program> <args...> - <output>` with the HTML
/// on stdin.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    /// Create a renderer for `program` with no extra arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Append arguments placed before the input and output operands.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// A `wkhtmltopdf` invocation using the configured page layout.
    #[must_use]
    pub fn from_config(config: &ExportConfig) -> Self {
        let margin = format!("{}mm", config.margin_mm);
        let mut args = vec![
            "--quiet".to_string(),
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--page-size".to_string(),
            config.page_size.clone(),
        ];
        for side in ["top", "right", "bottom", "left"] {
            args.push(format!("--margin-{side}"));
            args.push(margin.clone());
        }
        Self::new(config.renderer_command.clone(), config.render_timeout()).with_args(args)
    }

    /// The program that will be run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments placed before the operands.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    async fn run(&self, html: &str, output: &Path) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("-")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::render_failed(format!("failed to start {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::internal("renderer stdin was not captured"))?;
        let input = html.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let result = child.wait_with_output().await?;
        if let Ok(Err(e)) = writer.await {
            warn!("Renderer closed its input early: {}", e);
        }

        if !result.status.success() {
            return Err(Error::render_failed(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PdfRenderer for CommandRenderer {
    async fn render(&self, html: &str, output: &Path) -> Result<()> {
        debug!("Rendering {} bytes of HTML with {}", html.len(), self.program);
        match tokio::time::timeout(self.timeout, self.run(html, output)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                operation: format!("rendering PDF with {}", self.program),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_builds_wkhtmltopdf_args() {
        let config = ExportConfig {
            page_size: "Letter".to_string(),
            margin_mm: 15,
            ..ExportConfig::default()
        };
        let renderer = CommandRenderer::from_config(&config);

        assert_eq!(renderer.program(), "wkhtmltopdf");
        let args = renderer.args().join(" ");
        assert!(args.contains("--page-size Letter"));
        assert!(args.contains("--margin-top 15mm"));
        assert!(args.contains("--margin-left 15mm"));
        assert!(args.contains("--encoding utf-8"));
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let renderer = CommandRenderer::new("atareport-no-such-renderer", Duration::from_secs(5));

        let err = renderer
            .render("<html></html>", &temp_dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RenderFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdin_is_written_to_output() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let output = temp_dir.path().join("out.pdf");
        // `sh -c SCRIPT NAME - OUTPUT` makes the output path `$2`.
        let renderer = CommandRenderer::new("sh", Duration::from_secs(5))
            .with_args(["-c", "cat > \"$2\"", "render"]);

        renderer.render("<p>ok</p>", &output).await.unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "<p>ok</p>");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let renderer = CommandRenderer::new("sh", Duration::from_secs(5))
            .with_args(["-c", "cat > /dev/null; echo broken >&2; exit 3", "render"]);

        let err = renderer
            .render("<p/>", &temp_dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_renderer_times_out() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let renderer = CommandRenderer::new("sh", Duration::from_millis(100))
            .with_args(["-c", "sleep 5", "render"]);

        let err = renderer
            .render("<p/>", &temp_dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }
}
