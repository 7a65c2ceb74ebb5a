//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione della pipeline di trasformazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di una esecuzione
//! - Fornisce validazione dei parametri prima che qualsiasi stage parta
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Applica gli override da variabili d'ambiente (`TMDB_API_KEY`, `TOOLS_DIR`)
//!
//! ## Parametri di configurazione:
//! - `output_dir`: Directory di output (default: None = accanto al sorgente)
//! - `uploads_dir`: Base per risolvere `customTitle` (default: "uploads")
//! - `probe_failure`: Politica se ffprobe fallisce (default: abort)
//! - `metadata_source`: Da dove arrivano i metadati (default: auto)
//! - `tmdb_api_key`: Chiave API del catalogo (mai serializzata)
//! - `tmdb_language`: Lingua per il catalogo (default: "en-US")
//! - `tools_dir`: Directory con i tool bundled (Electron)
//! - `fail_on_existing_output`: Rifiuta di sovrascrivere un output esistente
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     output_dir: Some("/tmp/out".into()),
//!     probe_failure: ProbeFailurePolicy::AssumeDefault,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::PipelineError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do when the source cannot be probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailurePolicy {
    /// Stop the run with a `ProbeFailure`
    #[default]
    Abort,
    /// Continue as if the source were 1920x1080 with an unknown frame rate
    AssumeDefault,
}

/// Which metadata source the run should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSourceKind {
    /// Inline fields if any, else catalog lookup when possible, else nothing
    #[default]
    Auto,
    /// Never tag
    None,
    /// Only the fields supplied in the invocation record
    Inline,
    /// Resolve the catalog id through the external catalog
    Lookup,
}

/// Configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output directory for transcoded files (None = next to the source)
    pub output_dir: Option<PathBuf>,
    /// Directory `customTitle` is resolved against
    pub uploads_dir: PathBuf,
    /// Probe failure policy
    pub probe_failure: ProbeFailurePolicy,
    /// Metadata source selection
    pub metadata_source: MetadataSourceKind,
    /// TMDB API key
    #[serde(skip_serializing)]
    pub tmdb_api_key: Option<String>,
    /// TMDB response language
    pub tmdb_language: String,
    /// Bundled tools directory
    pub tools_dir: Option<PathBuf>,
    /// Refuse to overwrite a destination that already exists
    pub fail_on_existing_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: None,
            uploads_dir: PathBuf::from("uploads"),
            probe_failure: ProbeFailurePolicy::Abort,
            metadata_source: MetadataSourceKind::Auto,
            tmdb_api_key: None,
            tmdb_language: "en-US".to_string(),
            tools_dir: None,
            fail_on_existing_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(ref output_dir) = self.output_dir {
            if output_dir.as_os_str().is_empty() {
                return Err(PipelineError::InvalidInput("output directory is empty".into()));
            }
            if output_dir.exists() && !output_dir.is_dir() {
                return Err(PipelineError::InvalidInput(format!(
                    "output path is not a directory: {}",
                    output_dir.display()
                )));
            }
        }

        if self.tmdb_language.trim().is_empty() {
            return Err(PipelineError::InvalidInput("TMDB language must not be empty".into()));
        }

        if let Some(ref key) = self.tmdb_api_key {
            if key.trim().is_empty() {
                return Err(PipelineError::InvalidInput("TMDB API key must not be blank".into()));
            }
        }

        Ok(())
    }

    /// Apply `TMDB_API_KEY` and `TOOLS_DIR` over the file values
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("TMDB_API_KEY").ok(),
            std::env::var_os("TOOLS_DIR").map(PathBuf::from),
        )
    }

    /// Non-empty values replace the current ones
    pub fn with_overrides(mut self, tmdb_api_key: Option<String>, tools_dir: Option<PathBuf>) -> Self {
        if let Some(key) = tmdb_api_key.filter(|k| !k.trim().is_empty()) {
            self.tmdb_api_key = Some(key);
        }
        if let Some(dir) = tools_dir.filter(|d| !d.as_os_str().is_empty()) {
            self.tools_dir = Some(dir);
        }
        self
    }

    /// Default location of the config file (`<config dir>/transform-movie/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("transform-movie").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
