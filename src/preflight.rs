//! Dependency pre-flight check, run once before any stage.

use crate::error::PipelineError;
use crate::tool_resolver::{ToolPathResolver, REQUIRED_TOOLS};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// A tool that was found
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedTool {
    pub name: String,
    pub path: PathBuf,
}

/// Outcome of the pre-flight check
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub success: bool,
    pub missing: Vec<String>,
    pub tools: Vec<ResolvedTool>,
}

impl DependencyReport {
    /// Resolve every required tool without executing any of them
    pub fn check(resolver: &ToolPathResolver) -> Self {
        Self::check_tools(resolver, REQUIRED_TOOLS)
    }

    pub fn check_tools(resolver: &ToolPathResolver, required: &[&str]) -> Self {
        let mut missing = Vec::new();
        let mut tools = Vec::new();

        for &name in required {
            match resolver.resolve_tool(name) {
                Some(path) => tools.push(ResolvedTool {
                    name: name.to_string(),
                    path,
                }),
                None => missing.push(name.to_string()),
            }
        }

        if missing.is_empty() {
            info!("✅ All required tools found: {}", required.join(", "));
        } else {
            for tool in &missing {
                error!(
                    "❌ Missing required tool: {} (install with: {})",
                    tool,
                    ToolPathResolver::install_hint(tool)
                );
            }
        }

        Self {
            success: missing.is_empty(),
            missing,
            tools,
        }
    }

    pub fn into_result(self) -> Result<Vec<ResolvedTool>, PipelineError> {
        if self.success {
            Ok(self.tools)
        } else {
            Err(PipelineError::DependencyMissing(self.missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tools_are_listed() {
        let resolver = ToolPathResolver::system_only();
        let report = DependencyReport::check_tools(&resolver, &["nonexistent_tool_a", "nonexistent_tool_b"]);
        assert!(!report.success);
        assert_eq!(report.missing, vec!["nonexistent_tool_a", "nonexistent_tool_b"]);
        assert!(report.tools.is_empty());

        match report.into_result() {
            Err(PipelineError::DependencyMissing(missing)) => assert_eq!(missing.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_empty_requirement_passes() {
        let report = DependencyReport::check_tools(&ToolPathResolver::system_only(), &[]);
        assert!(report.success);
        assert!(report.into_result().unwrap().is_empty());
    }

    #[test]
    fn test_report_serializes_missing() {
        let report = DependencyReport::check_tools(&ToolPathResolver::system_only(), &["nonexistent_tool_a"]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["missing"][0], "nonexistent_tool_a");
    }
}
