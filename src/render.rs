//! Proposal document rendering.
//!
//! Rendering shells out to a markdown-to-PDF compiler (`pandoc` by
//! default, `NEXUS_PDF_COMPILER` to override) rather than linking a PDF
//! library. The proposal markdown is written to a scratch dir, compiled,
//! and the artifact moved into the configured document directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document compiler exited with {status}: {stderr}")]
    CompilerFailed { status: String, stderr: String },

    #[error("Document compiler produced no output file")]
    MissingOutput,
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Metadata for a rendered artifact, recorded on the documents table.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub storage_path: PathBuf,
    pub byte_size: i64,
}

/// Replace `{{name}}` placeholders from the substitution map. Unknown
/// placeholders are left untouched so a bad template is visible in the
/// output rather than silently blanked.
pub fn substitute_placeholders(markdown: &str, values: &HashMap<String, String>) -> String {
    let re = Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap();
    re.replace_all(markdown, |caps: &regex::Captures<'_>| {
        match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    compiler: String,
    output_dir: PathBuf,
}

impl DocumentRenderer {
    pub fn new(compiler: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            compiler: compiler.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Compile markdown into `<file_stem>.pdf` under the document dir.
    pub async fn render_pdf(&self, markdown: &str, file_stem: &str) -> RenderResult<RenderedDocument> {
        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("input.md");
        let compiled_path = scratch.path().join("output.pdf");
        tokio::fs::write(&input_path, markdown).await?;

        let output = self.invoke_compiler(&input_path, &compiled_path).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!("Document compiler failed: {} {}", output.status, stderr);
            return Err(RenderError::CompilerFailed {
                status: output.status.to_string(),
                stderr,
            });
        }
        if !compiled_path.exists() {
            return Err(RenderError::MissingOutput);
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let file_name = format!("{}.pdf", file_stem);
        let storage_path = self.output_dir.join(&file_name);
        // Copy rather than rename: the scratch dir may be on another mount.
        tokio::fs::copy(&compiled_path, &storage_path).await?;
        let byte_size = tokio::fs::metadata(&storage_path).await?.len() as i64;

        info!(
            "Rendered document {} ({} bytes) via {}",
            storage_path.display(),
            byte_size,
            self.compiler
        );
        Ok(RenderedDocument {
            file_name,
            storage_path,
            byte_size,
        })
    }

    async fn invoke_compiler(
        &self,
        input: &Path,
        output: &Path,
    ) -> std::io::Result<std::process::Output> {
        debug!(
            "Invoking document compiler: {} {} -o {}",
            self.compiler,
            input.display(),
            output.display()
        );
        Command::new(&self.compiler)
            .arg(input)
            .arg("-o")
            .arg(output)
            .output()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_substituted() {
        let mut values = HashMap::new();
        values.insert("client_name".to_string(), "Acme Corp".to_string());
        values.insert("plan".to_string(), "Growth".to_string());
        let out = substitute_placeholders(
            "Dear {{client_name}}, your plan is {{ plan }}.",
            &values,
        );
        assert_eq!(out, "Dear Acme Corp, your plan is Growth.");
    }

    #[test]
    fn unknown_placeholders_are_preserved() {
        let values = HashMap::new();
        let out = substitute_placeholders("Hello {{missing}}", &values);
        assert_eq!(out, "Hello {{missing}}");
    }

    #[tokio::test]
    async fn missing_compiler_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = DocumentRenderer::new("/nonexistent/pdf-compiler", dir.path());
        let result = renderer.render_pdf("# Hi", "test").await;
        assert!(matches!(result, Err(RenderError::Io(_))));
    }

    // Integration test - requires the real compiler on PATH
    #[tokio::test]
    #[ignore = "Requires pandoc with a PDF engine installed"]
    async fn renders_a_real_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = DocumentRenderer::new("pandoc", dir.path());
        let doc = renderer
            .render_pdf("# Proposal\n\nHello.", "sample")
            .await
            .unwrap();
        assert!(doc.byte_size > 0);
        assert!(doc.storage_path.exists());
    }
}
