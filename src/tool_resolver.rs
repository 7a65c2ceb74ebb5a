//! # Tool Path Resolver
//!
//! Finds the external tools the pipeline shells out to:
//! - Bundled with the Electron app (`ELECTRON_RESOURCES_PATH/tools`)
//! - An explicit tools directory (`tools_dir` config or `TOOLS_DIR`)
//! - System-installed tools on `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// HandBrake command line encoder
pub const HANDBRAKE: &str = "HandBrakeCLI";
/// Remuxer used to embed metadata
pub const FFMPEG: &str = "ffmpeg";
/// Stream inspector
pub const FFPROBE: &str = "ffprobe";

/// Tools every run needs
pub const REQUIRED_TOOLS: &[&str] = &[HANDBRAKE, FFMPEG, FFPROBE];

/// Tool path resolver for different deployment environments
#[derive(Debug, Clone, Default)]
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a resolver, using `tools_dir` when given or detecting the Electron layout
    pub fn new(tools_dir: Option<PathBuf>) -> Self {
        let tools_dir = tools_dir
            .filter(|dir| dir.is_dir())
            .or_else(Self::detect_bundled_tools_dir);
        debug!("Tools directory: {:?}", tools_dir);
        Self { tools_dir }
    }

    /// Resolver that only looks at `PATH`
    pub fn system_only() -> Self {
        Self { tools_dir: None }
    }

    fn detect_bundled_tools_dir() -> Option<PathBuf> {
        if let Ok(resources_path) = env::var("ELECTRON_RESOURCES_PATH") {
            let tools_path = PathBuf::from(resources_path).join("tools");
            if tools_path.is_dir() {
                debug!("Found tools directory via ELECTRON_RESOURCES_PATH: {:?}", tools_path);
                return Some(tools_path);
            }
        }

        if let Ok(exe_path) = env::current_exe() {
            if let Some(app_dir) = exe_path.parent() {
                let candidates = [
                    app_dir.join("resources").join("tools"),
                    app_dir.join("resources").join("app").join("tools"),
                    app_dir.join("tools"),
                ];
                if let Some(found) = candidates.into_iter().find(|p| p.is_dir()) {
                    debug!("Found bundled tools directory: {:?}", found);
                    return Some(found);
                }
            }
        }

        None
    }

    /// Resolve the path to a specific tool, bundled copy first
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            if let Some(bundled) = Self::bundled_tool_path(tools_dir, tool_name) {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled);
                return Some(bundled);
            }
        }

        match which::which(tool_name) {
            Ok(path) => {
                debug!("Using system tool: {} -> {:?}", tool_name, path);
                Some(path)
            }
            Err(_) => {
                debug!("Tool not found: {}", tool_name);
                None
            }
        }
    }

    /// `tools/<platform>/<tool>[.exe]` or `tools/<platform>/<tool>/<tool>[.exe]`
    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> Option<PathBuf> {
        let platform = match env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let file_name = format!("{}{}", tool_name, env::consts::EXE_SUFFIX);

        let direct_path = tools_dir.join(platform).join(&file_name);
        let subfolder_path = tools_dir.join(platform).join(tool_name).join(&file_name);

        [direct_path, subfolder_path].into_iter().find(|p| p.is_file())
    }

    /// Installation hint for a missing tool
    pub fn install_hint(tool_name: &str) -> String {
        if cfg!(target_os = "linux") {
            match tool_name {
                HANDBRAKE => "sudo apt-get install handbrake-cli".to_string(),
                FFMPEG | FFPROBE => "sudo apt-get install ffmpeg".to_string(),
                _ => format!("sudo apt-get install {}", tool_name),
            }
        } else if cfg!(target_os = "macos") {
            match tool_name {
                HANDBRAKE => "brew install handbrake".to_string(),
                FFMPEG | FFPROBE => "brew install ffmpeg".to_string(),
                _ => format!("brew install {}", tool_name),
            }
        } else {
            format!("install {} or bundle it with the application", tool_name)
        }
    }
}
