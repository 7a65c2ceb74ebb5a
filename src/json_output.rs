//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per il chiamante (Electron/API).
//!
//! ## Responsabilità:
//! - Converte l'esito della pipeline in un unico documento JSON su stdout
//! - `success` + `output_path` + `message` (successo) oppure `error` (fallimento)
//! - Riporta lo stage raggiunto, se il file è stato taggato e l'exit code
//!
//! ## Esempio:
//! ```json
//! {"success":false,"output_path":"out/movie.apple.mp4","error":"metadata tagging failed: ...",
//!  "stage":"tagging_metadata","tagged":false,"exit_code":7}
//! ```

use crate::error::PipelineError;
use crate::pipeline::{PipelineOutcome, PipelineStage};
use serde::Serialize;
use std::path::PathBuf;

const SUCCESS_MESSAGE: &str = "Processing completed successfully";

/// Result record written to stdout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `done`, or the stage that failed
    pub stage: String,
    pub tagged: bool,
    pub exit_code: i32,
}

impl PipelineResult {
    /// Result for a failure that happened before the pipeline started
    pub fn failure(error: &PipelineError) -> Self {
        Self {
            success: false,
            output_path: None,
            message: None,
            error: Some(error.to_string()),
            stage: PipelineStage::Idle.to_string(),
            tagged: false,
            exit_code: error.exit_code(),
        }
    }

    /// Emette il risultato JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }
}

impl From<&PipelineOutcome> for PipelineResult {
    fn from(outcome: &PipelineOutcome) -> Self {
        match outcome.error {
            None => Self {
                success: true,
                output_path: outcome.output_path.clone(),
                message: Some(SUCCESS_MESSAGE.to_string()),
                error: None,
                stage: PipelineStage::Done.to_string(),
                tagged: outcome.tagged,
                exit_code: 0,
            },
            Some(ref error) => Self {
                success: false,
                output_path: outcome.output_path.clone(),
                message: None,
                error: Some(error.to_string()),
                stage: outcome
                    .failed_stage
                    .unwrap_or(PipelineStage::Failed)
                    .to_string(),
                tagged: false,
                exit_code: error.exit_code(),
            },
        }
    }
}
