//! # Error Types Module
//!
//! Questo modulo definisce la tassonomia degli errori della pipeline.
//!
//! ## Responsabilità:
//! - Definisce `PipelineError` per categorizzare ogni fallimento possibile
//! - Mappa ogni categoria su un exit code fisso per i chiamanti script
//! - Conserva l'output diagnostico dei tool esterni nel messaggio
//!
//! ## Exit code:
//! | code | categoria |
//! |------|-----------|
//! | 0 | successo |
//! | 1 | errore I/O inatteso |
//! | 2 | `InvalidInput` |
//! | 3 | `DependencyMissing` |
//! | 4 | `InputNotFound` |
//! | 5 | `ProbeFailure` |
//! | 6 | `TranscodeFailure` |
//! | 7 | `MetadataFailure` (output non taggato disponibile) |
//! | 8 | `OutputExists` |

use std::path::PathBuf;

/// Failures that end a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("missing required tools: {}", .0.join(", "))]
    DependencyMissing(Vec<String>),

    #[error("input not found")]
    InputNotFound(PathBuf),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("probe failed: {0}")]
    ProbeFailure(String),

    #[error("transcode failed: {0}")]
    TranscodeFailure(String),

    #[error("metadata tagging failed: {0}")]
    MetadataFailure(String),

    #[error("output already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Process exit status reported to scripting callers
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::InvalidInput(_) => 2,
            Self::DependencyMissing(_) => 3,
            Self::InputNotFound(_) => 4,
            Self::ProbeFailure(_) => 5,
            Self::TranscodeFailure(_) => 6,
            Self::MetadataFailure(_) => 7,
            Self::OutputExists(_) => 8,
        }
    }

    /// True when the run still left a usable, untagged output file behind
    pub fn is_partial_success(&self) -> bool {
        matches!(self, Self::MetadataFailure(_))
    }
}

/// Errors raised while invoking an external tool, before any exit status exists
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("{0} not found; is it installed and in PATH?")]
    NotFound(String),

    #[error("failed to execute {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}
