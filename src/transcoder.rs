//! # Transcoder Module
//!
//! Converte il sorgente in MP4 compatibile Apple con HandBrakeCLI.
//!
//! ## Responsabilità:
//! - Invoca `HandBrakeCLI -i <src> -o <tmp> --preset "<preset>"`
//! - Tratta ogni exit code diverso da zero come `TranscodeFailure`, con stderr
//! - Scrive in un file temporaneo fratello e lo rinomina sull'output solo a
//!   conversione riuscita: un output precedente sopravvive a un fallimento
//! - Non modifica né rimuove mai il file sorgente

use crate::error::PipelineError;
use crate::progress::StageSpinner;
use crate::tool_resolver::HANDBRAKE;
use crate::tool_runner::ToolRunner;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Runs the HandBrake encode
pub struct Transcoder<'a> {
    runner: &'a dyn ToolRunner,
    show_progress: bool,
}

impl<'a> Transcoder<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self {
            runner,
            show_progress: false,
        }
    }

    /// Draw a spinner on stderr while the encoder runs
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Encode `input_path` into `output_path` using `preset`
    ///
    /// HandBrake writes into a hidden sibling file that replaces `output_path`
    /// only after a clean exit, so a previous output survives a failed run.
    pub async fn transcode(
        &self,
        input_path: &Path,
        output_path: &Path,
        preset: &str,
    ) -> Result<(), PipelineError> {
        info!("🎬 Converting video with preset: {}", preset);
        debug!("{} -> {}", input_path.display(), output_path.display());

        let parent = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Removed on drop unless persisted
        let temp_file = tempfile::Builder::new()
            .prefix(&format!(".{}.", stem))
            .suffix(".encode.mp4")
            .tempfile_in(parent)
            .map_err(|e| PipelineError::TranscodeFailure(format!("failed to create temporary file: {}", e)))?;
        let temp_path = temp_file.path().to_path_buf();

        let args = vec![
            "-i".to_string(),
            input_path.display().to_string(),
            "-o".to_string(),
            temp_path.display().to_string(),
            "--preset".to_string(),
            preset.to_string(),
        ];

        let spinner = if self.show_progress {
            StageSpinner::start(&format!("🔄 HandBrake: {}", preset))
        } else {
            StageSpinner::hidden()
        };

        let output = match self.runner.run(HANDBRAKE, &args).await {
            Ok(output) => output,
            Err(e) => {
                spinner.abandon();
                return Err(PipelineError::TranscodeFailure(e.to_string()));
            }
        };

        if !output.success() {
            spinner.abandon();
            error!("❌ HandBrake conversion failed: {}", output.diagnostics());
            return Err(PipelineError::TranscodeFailure(format!(
                "{} exited with {}: {}",
                HANDBRAKE,
                output.exit_code,
                output.diagnostics()
            )));
        }

        let encoded_len = tokio::fs::metadata(&temp_path).await.map(|m| m.len()).unwrap_or(0);
        if encoded_len == 0 {
            spinner.abandon();
            return Err(PipelineError::TranscodeFailure(format!(
                "{} reported success but produced no output for {}",
                HANDBRAKE,
                output_path.display()
            )));
        }

        Self::copy_permissions(output_path, &temp_path).await;

        temp_file.persist(output_path).map_err(|e| {
            spinner.abandon();
            PipelineError::TranscodeFailure(format!(
                "failed to move encode to {}: {}",
                output_path.display(),
                e.error
            ))
        })?;

        spinner.finish(&format!("✅ Conversion completed in {:.1}s", spinner.elapsed().as_secs_f64()));
        info!("HandBrake conversion successful: {}", output_path.display());
        Ok(())
    }

    /// tempfile creates 0600 files; reuse the replaced output's mode, else 0644
    async fn copy_permissions(output_path: &Path, temp_path: &Path) {
        let permissions = match tokio::fs::metadata(output_path).await {
            Ok(metadata) => Some(metadata.permissions()),
            Err(_) => new_output_permissions(),
        };
        if let Some(permissions) = permissions {
            if let Err(e) = tokio::fs::set_permissions(temp_path, permissions).await {
                warn!("Could not set permissions on {}: {}", temp_path.display(), e);
            }
        }
    }
}

#[cfg(unix)]
fn new_output_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_output_permissions() -> Option<std::fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_runner::fake::{FakeResponse, FakeToolRunner};
    use tempfile::TempDir;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_transcode_arguments() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("movie.mkv");
        let dst = temp_dir.path().join("movie.apple.mp4");
        std::fs::write(&src, b"source").unwrap();

        let runner = FakeToolRunner::new().respond(HANDBRAKE, FakeResponse::ok("").writing(b"encoded"));
        Transcoder::new(&runner)
            .transcode(&src, &dst, "Apple 4K Surround")
            .await
            .unwrap();

        let args = &runner.calls_to(HANDBRAKE)[0];
        assert_eq!(args.len(), 6);
        assert_eq!(&args[..2], ["-i".to_string(), src.display().to_string()]);
        assert_eq!(args[2], "-o");
        assert_eq!(&args[4..], ["--preset".to_string(), "Apple 4K Surround".to_string()]);

        // Encoder writes next to the destination, never to it
        let target = Path::new(&args[3]);
        assert_ne!(target, dst.as_path());
        assert_eq!(target.parent(), dst.parent());

        assert_eq!(std::fs::read(&dst).unwrap(), b"encoded");
        assert_eq!(std::fs::read(&src).unwrap(), b"source");
        assert_eq!(dir_entries(temp_dir.path()), vec!["movie.apple.mp4", "movie.mkv"]);
    }

    #[tokio::test]
    async fn test_transcode_failure_keeps_source_and_leaves_no_partial() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("movie.mkv");
        let dst = temp_dir.path().join("movie.apple.mp4");
        std::fs::write(&src, b"source").unwrap();

        let runner = FakeToolRunner::new().respond(
            HANDBRAKE,
            FakeResponse::fail(3, "Encode failed (error 3)").writing(b"half"),
        );
        let err = Transcoder::new(&runner)
            .transcode(&src, &dst, "Apple 1080p30 Surround")
            .await
            .unwrap_err();

        match err {
            PipelineError::TranscodeFailure(msg) => assert!(msg.contains("Encode failed (error 3)")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!dst.exists());
        assert_eq!(std::fs::read(&src).unwrap(), b"source");
        assert_eq!(dir_entries(temp_dir.path()), vec!["movie.mkv"]);
    }

    #[tokio::test]
    async fn test_failed_encode_keeps_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("movie.mkv");
        let dst = temp_dir.path().join("movie.apple.mp4");
        std::fs::write(&src, b"source").unwrap();
        std::fs::write(&dst, b"previous good encode").unwrap();

        let runner = FakeToolRunner::new().respond(HANDBRAKE, FakeResponse::fail(3, "Encode failed").writing(b"half"));
        let err = Transcoder::new(&runner)
            .transcode(&src, &dst, "Apple 4K Surround")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::TranscodeFailure(_)));
        assert_eq!(std::fs::read(&dst).unwrap(), b"previous good encode");
        assert_eq!(dir_entries(temp_dir.path()), vec!["movie.apple.mp4", "movie.mkv"]);
    }

    #[tokio::test]
    async fn test_successful_encode_replaces_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("movie.mkv");
        let dst = temp_dir.path().join("movie.apple.mp4");
        std::fs::write(&src, b"source").unwrap();
        std::fs::write(&dst, b"stale").unwrap();

        let runner = FakeToolRunner::new().respond(HANDBRAKE, FakeResponse::ok("").writing(b"fresh"));
        Transcoder::new(&runner)
            .transcode(&src, &dst, "Apple 720p Surround")
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), b"fresh");
        assert_eq!(dir_entries(temp_dir.path()), vec!["movie.apple.mp4", "movie.mkv"]);
    }

    #[tokio::test]
    async fn test_success_without_output_is_failure() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("movie.mkv");
        let dst = temp_dir.path().join("movie.apple.mp4");

        let runner = FakeToolRunner::new().respond(HANDBRAKE, FakeResponse::ok("No title found"));
        let err = Transcoder::new(&runner)
            .transcode(&src, &dst, "Apple 720p Surround")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::TranscodeFailure(_)));
        assert!(!dst.exists());
        assert!(dir_entries(temp_dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_new_output_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("movie.mkv");
        let dst = temp_dir.path().join("movie.apple.mp4");
        std::fs::write(&src, b"source").unwrap();

        let runner = FakeToolRunner::new().respond(HANDBRAKE, FakeResponse::ok("").writing(b"encoded"));
        Transcoder::new(&runner)
            .transcode(&src, &dst, "Apple 4K Surround")
            .await
            .unwrap();

        let mode = std::fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
