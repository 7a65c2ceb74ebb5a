//! # Path Resolution Module
//!
//! Centralizza il calcolo del path di output del file transcodificato.
//! Il nome è sempre `<stem>` del sorgente + suffisso fisso `.apple.mp4`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed suffix replacing the source extension
pub const OUTPUT_SUFFIX: &str = ".apple.mp4";

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Destination for `input_path`: inside `output_dir` when given, else next to the source
    pub fn get_output_path(input_path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
        let file_stem = input_path
            .file_stem()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", input_path.display()))?
            .to_string_lossy();
        let filename = format!("{}{}", file_stem, OUTPUT_SUFFIX);

        let result = match output_dir {
            Some(dir) => dir.join(filename),
            None => input_path.with_file_name(filename),
        };
        debug!("Resolved output path: {} -> {}", input_path.display(), result.display());

        Ok(result)
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow::anyhow!("Failed to create parent directories for {}: {}", path.display(), e)
            })?;
        }
        Ok(())
    }
}
