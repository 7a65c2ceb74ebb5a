//! # Resolution Prober
//!
//! Questo modulo analizza le proprietà dello stream video con ffprobe.
//!
//! ## Responsabilità:
//! - Invoca ffprobe sul primo stream video (width, height, r_frame_rate)
//! - Calcola l'etichetta di risoluzione in stile Apple (es. "4K", "1080p60")
//! - Applica la politica configurata quando il probe fallisce
//!
//! ## Algoritmo etichetta:
//! 1. width >= 3840 -> "4K"
//! 2. height >= 1080 -> "1080p"
//! 3. height >= 720 -> "720p"
//! 4. altrimenti "{height}p"
//!
//! Suffisso frame rate: fps > 50 -> "60", fps > 25 -> "30", altrimenti niente.
//! Un frame rate non interpretabile non aggiunge suffisso.

use crate::config::ProbeFailurePolicy;
use crate::error::PipelineError;
use crate::tool_resolver::FFPROBE;
use crate::tool_runner::ToolRunner;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Rational frame rate as reported by ffprobe (`num/den`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u64,
    pub den: u64,
}

impl FrameRate {
    pub fn fps(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl FromStr for FrameRate {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = s.trim().split_once('/').ok_or(())?;
        let num = num.trim().parse::<u64>().map_err(|_| ())?;
        let den = den.trim().parse::<u64>().map_err(|_| ())?;
        if den == 0 {
            return Err(());
        }
        Ok(Self { num, den })
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Probed stream properties
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    /// None when ffprobe gave no usable ratio
    pub frame_rate: Option<FrameRate>,
    pub label: String,
}

impl ProbeResult {
    pub fn new(width: u32, height: u32, frame_rate: Option<FrameRate>) -> Self {
        Self {
            width,
            height,
            frame_rate,
            label: resolution_label(width, height, frame_rate),
        }
    }

    /// Substitute used by [`ProbeFailurePolicy::AssumeDefault`]
    pub fn assumed_default() -> Self {
        Self::new(1920, 1080, None)
    }
}

/// Apple-style resolution label for the given stream geometry
pub fn resolution_label(width: u32, height: u32, frame_rate: Option<FrameRate>) -> String {
    let mut label = if width >= 3840 {
        "4K".to_string()
    } else if height >= 1080 {
        "1080p".to_string()
    } else if height >= 720 {
        "720p".to_string()
    } else {
        format!("{}p", height)
    };

    if let Some(rate) = frame_rate {
        let fps = rate.fps();
        if fps > 50.0 {
            label.push_str("60");
        } else if fps > 25.0 {
            label.push_str("30");
        }
    }

    label
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

/// Parse `ffprobe -of json` output for the first video stream
pub fn parse_ffprobe_output(stdout: &str) -> Result<ProbeResult, PipelineError> {
    let output: FfprobeOutput = serde_json::from_str(stdout)
        .map_err(|e| PipelineError::ProbeFailure(format!("malformed ffprobe output: {}", e)))?;

    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::ProbeFailure("no video stream found".into()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(PipelineError::ProbeFailure(
                "video stream has no dimensions".into(),
            ))
        }
    };

    let frame_rate = stream.r_frame_rate.as_deref().and_then(|r| r.parse().ok());
    if frame_rate.is_none() {
        debug!("Unparsable frame rate {:?}, no suffix", stream.r_frame_rate);
    }

    Ok(ProbeResult::new(width, height, frame_rate))
}

/// Inspects source files with ffprobe
pub struct Prober<'a> {
    runner: &'a dyn ToolRunner,
    policy: ProbeFailurePolicy,
}

impl<'a> Prober<'a> {
    pub fn new(runner: &'a dyn ToolRunner, policy: ProbeFailurePolicy) -> Self {
        Self { runner, policy }
    }

    /// Probe `video_path`, falling back per policy
    pub async fn probe(&self, video_path: &Path) -> Result<ProbeResult, PipelineError> {
        info!("🔍 Detecting resolution for: {}", video_path.display());

        match self.probe_strict(video_path).await {
            Ok(result) => {
                info!(
                    "Detected resolution: {} ({}x{}, {})",
                    result.label,
                    result.width,
                    result.height,
                    result
                        .frame_rate
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "unknown rate".to_string())
                );
                Ok(result)
            }
            Err(e) if self.policy == ProbeFailurePolicy::AssumeDefault => {
                warn!("{}; using default resolution: 1080p", e);
                Ok(ProbeResult::assumed_default())
            }
            Err(e) => Err(e),
        }
    }

    async fn probe_strict(&self, video_path: &Path) -> Result<ProbeResult, PipelineError> {
        let args: Vec<String> = [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "json",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(video_path.display().to_string()))
        .collect();

        let output = self
            .runner
            .run(FFPROBE, &args)
            .await
            .map_err(|e| PipelineError::ProbeFailure(e.to_string()))?;

        if !output.success() {
            return Err(PipelineError::ProbeFailure(format!(
                "ffprobe exited with {}: {}",
                output.exit_code,
                output.diagnostics()
            )));
        }

        parse_ffprobe_output(&output.stdout)
    }
}
