//! # Pipeline Orchestrator
//!
//! Orchestratore che esegue gli stage in sequenza e produce un unico esito.
//!
//! ## Stati:
//! `Idle -> Probing -> Transcoding -> TaggingMetadata -> {Done | Failed}`
//!
//! `Failed` è raggiungibile da ogni stato non terminale. Non ci sono retry né
//! resume: una esecuzione fallita va rilanciata da capo dal chiamante.
//!
//! ## Responsabilità:
//! - Verifica che il sorgente esista prima di invocare qualsiasi tool
//! - Deriva il path di output e crea la directory di output
//! - Probe -> preset -> HandBrake -> metadati (inline/catalogo) -> remux
//! - Registra quale stage è fallito e se esiste già un output utilizzabile

use crate::catalog::CatalogSource;
use crate::config::Config;
use crate::error::PipelineError;
use crate::metadata::MetadataMerger;
use crate::movie::{MetadataSource, MovieRecord};
use crate::path_resolver::PathResolver;
use crate::preset::preset_name;
use crate::probe::{ProbeResult, Prober};
use crate::tool_runner::ToolRunner;
use crate::transcoder::Transcoder;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Probing,
    Transcoding,
    TaggingMetadata,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Allowed transitions of the state machine
    pub fn can_advance_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (Idle, Probing) | (Probing, Transcoding) | (Transcoding, TaggingMetadata) | (TaggingMetadata, Done) => {
                true
            }
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::Transcoding => "transcoding",
            Self::TaggingMetadata => "tagging_metadata",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcode job
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub source: PathBuf,
    pub metadata: MetadataSource,
}

/// Everything a finished run knows
#[derive(Debug)]
pub struct PipelineOutcome {
    /// `Done` or `Failed`
    pub state: PipelineStage,
    /// Stage that was running when the run failed
    pub failed_stage: Option<PipelineStage>,
    /// Usable output file, tagged or not
    pub output_path: Option<PathBuf>,
    pub probe: Option<ProbeResult>,
    pub preset: Option<String>,
    pub tagged: bool,
    pub error: Option<PipelineError>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.state == PipelineStage::Done
    }

    /// 0 on success, the error's fixed code otherwise
    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map(PipelineError::exit_code).unwrap_or(0)
    }
}

/// Tracks the current stage and the partial results of a run
struct RunTracker {
    stage: PipelineStage,
    output_path: Option<PathBuf>,
    probe: Option<ProbeResult>,
    preset: Option<String>,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Idle,
            output_path: None,
            probe: None,
            preset: None,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "invalid transition {} -> {}",
            self.stage,
            next
        );
        debug!("Stage {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(self, error: PipelineError) -> PipelineOutcome {
        error!("❌ Pipeline failed while {}: {}", self.stage, error);
        let output_path = if error.is_partial_success() {
            self.output_path
        } else {
            None
        };
        PipelineOutcome {
            state: PipelineStage::Failed,
            failed_stage: Some(self.stage),
            output_path,
            probe: self.probe,
            preset: self.preset,
            tagged: false,
            error: Some(error),
        }
    }

    fn done(mut self, tagged: bool) -> PipelineOutcome {
        self.advance(PipelineStage::Done);
        PipelineOutcome {
            state: PipelineStage::Done,
            failed_stage: None,
            output_path: self.output_path,
            probe: self.probe,
            preset: self.preset,
            tagged,
            error: None,
        }
    }
}

/// Sequential transcode + tag pipeline
pub struct Pipeline<'a> {
    runner: &'a dyn ToolRunner,
    catalog: Option<&'a dyn CatalogSource>,
    config: &'a Config,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(runner: &'a dyn ToolRunner, config: &'a Config) -> Self {
        Self {
            runner,
            catalog: None,
            config,
            show_progress: false,
        }
    }

    /// Catalog used for [`MetadataSource::ExternalLookup`]
    pub fn with_catalog(mut self, catalog: &'a dyn CatalogSource) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run every stage; never retries
    pub async fn run(&self, request: &PipelineRequest) -> PipelineOutcome {
        let mut run = RunTracker::new();
        let source = request.source.as_path();
        info!("Processing video: {}", source.display());

        // Idle: validate before any tool runs
        let output_path = match self.prepare(source).await {
            Ok(path) => path,
            Err(e) => return run.fail(e),
        };
        info!("Output file: {}", output_path.display());

        run.advance(PipelineStage::Probing);
        let probe = match Prober::new(self.runner, self.config.probe_failure).probe(source).await {
            Ok(probe) => probe,
            Err(e) => return run.fail(e),
        };
        let preset = preset_name(&probe.label);
        info!("Using HandBrake preset: {}", preset);
        run.probe = Some(probe);
        run.preset = Some(preset.clone());

        run.advance(PipelineStage::Transcoding);
        if let Err(e) = PathResolver::ensure_parent_dirs(&output_path).await {
            return run.fail(PipelineError::Io(std::io::Error::other(e.to_string())));
        }
        let transcoder = Transcoder::new(self.runner).with_progress(self.show_progress);
        if let Err(e) = transcoder.transcode(source, &output_path, &preset).await {
            return run.fail(e);
        }
        run.output_path = Some(output_path.clone());

        run.advance(PipelineStage::TaggingMetadata);
        let record = self.resolve_metadata(&request.metadata, source).await;
        let merger = MetadataMerger::new(self.runner).with_progress(self.show_progress);
        let tagged = match merger.merge(&output_path, &record).await {
            Ok(tagged) => tagged,
            Err(e) => {
                warn!("Untagged output kept at {}", output_path.display());
                return run.fail(e);
            }
        };

        info!("✅ Processing completed successfully: {}", output_path.display());
        run.done(tagged)
    }

    async fn prepare(&self, source: &Path) -> Result<PathBuf, PipelineError> {
        let metadata = match tokio::fs::metadata(source).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!("Video file not found: {}", source.display());
                return Err(PipelineError::InputNotFound(source.to_path_buf()));
            }
            Err(e) => return Err(PipelineError::Io(e)),
        };
        if !metadata.is_file() {
            return Err(PipelineError::InvalidInput(format!(
                "source is not a file: {}",
                source.display()
            )));
        }

        let output_path = PathResolver::get_output_path(source, self.config.output_dir.as_deref())
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        if self.config.fail_on_existing_output && output_path.exists() {
            return Err(PipelineError::OutputExists(output_path));
        }
        if output_path.exists() {
            warn!("Overwriting existing output: {}", output_path.display());
        }

        Ok(output_path)
    }

    async fn resolve_metadata(&self, source: &MetadataSource, video: &Path) -> MovieRecord {
        match source {
            MetadataSource::None => MovieRecord::default(),
            MetadataSource::Inline(record) => record.clone(),
            MetadataSource::ExternalLookup(catalog_id) => {
                info!("TMDB ID: {}", catalog_id);
                let mut record = match self.catalog {
                    Some(catalog) => catalog.lookup(catalog_id).await,
                    None => {
                        warn!("No catalog configured, skipping lookup for {}", catalog_id);
                        MovieRecord::default()
                    }
                };
                record.source = Some(video.to_path_buf());
                record
            }
        }
    }
}
