//! Runtime configuration.
//!
//! All settings come from the environment (loaded via dotenvy in the server
//! binary) with development defaults. The pipeline step catalog may be
//! overridden by a YAML file; otherwise the compiled-in catalog is used.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::pipeline::StepCatalog;

/// Service configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Listen port for the HTTP server.
    pub port: u16,
    /// Optional path to a YAML step catalog overriding the default.
    pub step_catalog_path: Option<PathBuf>,
    /// Shell command used to compile proposal markdown into PDF.
    pub pdf_compiler: String,
    /// Directory rendered documents are stored in.
    pub document_dir: PathBuf,
    /// Base URL of the secret vault.
    pub vault_addr: String,
    /// Vault access token.
    pub vault_token: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost:5432/nexus".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .unwrap_or(3000);
        let step_catalog_path = std::env::var("NEXUS_STEP_CATALOG").ok().map(PathBuf::from);
        let pdf_compiler =
            std::env::var("NEXUS_PDF_COMPILER").unwrap_or_else(|_| "pandoc".to_string());
        let document_dir = PathBuf::from(
            std::env::var("NEXUS_DOCUMENT_DIR").unwrap_or_else(|_| "documents".to_string()),
        );
        let vault_addr =
            std::env::var("VAULT_ADDR").unwrap_or_else(|_| "http://127.0.0.1:8200".to_string());
        let vault_token = std::env::var("VAULT_TOKEN").unwrap_or_default();

        Self {
            database_url,
            port,
            step_catalog_path,
            pdf_compiler,
            document_dir,
            vault_addr,
            vault_token,
        }
    }

    /// Load the step catalog, falling back to the compiled-in default when
    /// no override file is configured.
    pub fn load_step_catalog(&self) -> Result<StepCatalog> {
        match &self.step_catalog_path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read step catalog {}", path.display()))?;
                StepCatalog::from_yaml(&yaml)
                    .with_context(|| format!("Invalid step catalog {}", path.display()))
            }
            None => Ok(StepCatalog::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_with_catalog(path: Option<PathBuf>) -> AppConfig {
        AppConfig {
            database_url: "postgresql://localhost:5432/nexus".to_string(),
            port: 3000,
            step_catalog_path: path,
            pdf_compiler: "pandoc".to_string(),
            document_dir: PathBuf::from("documents"),
            vault_addr: "http://127.0.0.1:8200".to_string(),
            vault_token: String::new(),
        }
    }

    #[test]
    fn default_catalog_when_no_override() {
        let config = config_with_catalog(None);
        let catalog = config.load_step_catalog().unwrap();
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn catalog_override_is_loaded_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "steps:\n  - step_order: 1\n    step_name: intake\n  - step_order: 2\n    step_name: review"
        )
        .unwrap();
        let config = config_with_catalog(Some(file.path().to_path_buf()));
        let catalog = config.load_step_catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.steps()[0].step_name, "intake");
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let config = config_with_catalog(Some(PathBuf::from("/nonexistent/steps.yaml")));
        assert!(config.load_step_catalog().is_err());
    }
}
