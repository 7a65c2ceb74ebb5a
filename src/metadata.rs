//! # Metadata Merger
//!
//! Questo modulo inserisce i tag descrittivi nel file transcodificato.
//!
//! ## Pipeline:
//! 1. Costruisce la mappa dei tag dai soli campi non vuoti del record
//! 2. Crea un file temporaneo fratello (stessa directory, stesso filesystem)
//! 3. ffmpeg copia tutti gli stream senza ricodifica aggiungendo i tag
//! 4. Successo: il temporaneo sostituisce l'originale con un rename atomico
//! 5. Fallimento: il temporaneo viene eliminato, l'originale resta intatto
//!
//! ## Mappatura campi:
//! - `title` -> `title`
//! - `year` -> `year`
//! - `genre` -> `genre`
//! - `director` -> `director`
//! - `plot` -> `comment`
//! - `actors` -> `artist`

use crate::error::PipelineError;
use crate::movie::MovieRecord;
use crate::progress::StageSpinner;
use crate::tool_resolver::FFMPEG;
use crate::tool_runner::ToolRunner;
use std::path::Path;
use tracing::{debug, error, info};

/// Ordered `(tag, value)` pairs for the remux
pub type TagMap = Vec<(&'static str, String)>;

/// Tags for the non-empty fields of `movie`
pub fn build_tags(movie: &MovieRecord) -> TagMap {
    let fields: [(&'static str, &Option<String>); 6] = [
        ("title", &movie.title),
        ("year", &movie.year),
        ("genre", &movie.genre),
        ("director", &movie.director),
        ("comment", &movie.plot),
        ("artist", &movie.actors),
    ];

    fields
        .into_iter()
        .filter_map(|(tag, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (tag, v.to_string()))
        })
        .collect()
}

/// Embeds tags through an ffmpeg stream-copy remux
pub struct MetadataMerger<'a> {
    runner: &'a dyn ToolRunner,
    show_progress: bool,
}

impl<'a> MetadataMerger<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self {
            runner,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Tag `video_path` in place, returning false when there was nothing to write
    pub async fn merge(&self, video_path: &Path, movie: &MovieRecord) -> Result<bool, PipelineError> {
        let tags = build_tags(movie);
        if tags.is_empty() {
            info!("No metadata to embed, keeping untagged output");
            return Ok(false);
        }

        info!("📝 Adding {} metadata tags to {}", tags.len(), video_path.display());

        let parent = video_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Removed on drop unless persisted
        let temp_file = tempfile::Builder::new()
            .prefix(&format!(".{}.", stem))
            .suffix(".meta.mp4")
            .tempfile_in(parent)
            .map_err(|e| PipelineError::MetadataFailure(format!("failed to create temporary file: {}", e)))?;
        let temp_path = temp_file.path().to_path_buf();

        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            video_path.display().to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
        ];
        for (tag, value) in &tags {
            args.push("-metadata".to_string());
            args.push(format!("{}={}", tag, value));
        }
        args.push(temp_path.display().to_string());

        let spinner = if self.show_progress {
            StageSpinner::start("🔄 Embedding metadata")
        } else {
            StageSpinner::hidden()
        };

        let output = self.runner.run(FFMPEG, &args).await.map_err(|e| {
            spinner.abandon();
            PipelineError::MetadataFailure(e.to_string())
        })?;

        if !output.success() {
            spinner.abandon();
            error!("❌ Failed to add metadata: {}", output.diagnostics());
            return Err(PipelineError::MetadataFailure(format!(
                "{} exited with {}: {}",
                FFMPEG,
                output.exit_code,
                output.diagnostics()
            )));
        }

        // tempfile creates 0600 files; keep the transcode's permissions
        if let Ok(metadata) = tokio::fs::metadata(video_path).await {
            if let Err(e) = tokio::fs::set_permissions(&temp_path, metadata.permissions()).await {
                debug!("Could not copy permissions to {}: {}", temp_path.display(), e);
            }
        }

        temp_file.persist(video_path).map_err(|e| {
            spinner.abandon();
            PipelineError::MetadataFailure(format!(
                "failed to replace {}: {}",
                video_path.display(),
                e.error
            ))
        })?;

        spinner.finish("✅ Metadata embedded");
        debug!("Replaced {} with tagged remux", video_path.display());
        info!("Metadata added successfully");
        Ok(true)
    }
}
