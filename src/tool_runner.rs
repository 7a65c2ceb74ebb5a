//! # External Tool Runner
//!
//! Unico punto in cui la pipeline esegue processi esterni.
//!
//! ## Responsabilità:
//! - Definisce il trait `ToolRunner` (nome tool + argomenti -> stdout, stderr, exit code)
//! - `SystemToolRunner`: risolve il binario con `ToolPathResolver` e lo esegue con tokio
//! - Nei test, `FakeToolRunner` sostituisce i binari reali con risposte scriptate
//!
//! Un exit code diverso da zero NON è un errore a questo livello: è il chiamante
//! (prober, transcoder, merger) a decidere cosa significa.

use crate::error::ToolError;
use crate::tool_resolver::ToolPathResolver;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Output captured from a finished tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, -1 when the process was killed by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The tool's diagnostics: stderr, or stdout when stderr is empty
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Capability to run an external tool to completion
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `tool` with `args`, blocking this task until it exits
    async fn run(&self, tool: &str, args: &[String]) -> Result<ToolOutput, ToolError>;
}

/// Runs real binaries found by a [`ToolPathResolver`]
#[derive(Debug, Clone)]
pub struct SystemToolRunner {
    resolver: ToolPathResolver,
}

impl SystemToolRunner {
    pub fn new(resolver: ToolPathResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, tool: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
        let program = self
            .resolver
            .resolve_tool(tool)
            .ok_or_else(|| ToolError::NotFound(tool.to_string()))?;

        debug!("Running {} {}", program.display(), args.join(" "));
        let start_time = std::time::Instant::now();

        let output = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(
            "{} exited with {} after {:.1}s",
            tool,
            exit_code,
            start_time.elapsed().as_secs_f64()
        );

        Ok(ToolOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// One scripted reply
    #[derive(Debug, Clone, Default)]
    pub struct FakeResponse {
        pub output: ToolOutput,
        /// Bytes written to the invocation's output path before replying
        pub writes: Option<Vec<u8>>,
        /// Reply with "not found" instead of running
        pub missing: bool,
    }

    impl FakeResponse {
        pub fn ok(stdout: &str) -> Self {
            Self {
                output: ToolOutput {
                    exit_code: 0,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
                ..Default::default()
            }
        }

        pub fn fail(exit_code: i32, stderr: &str) -> Self {
            Self {
                output: ToolOutput {
                    exit_code,
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
                ..Default::default()
            }
        }

        pub fn writing(mut self, bytes: &[u8]) -> Self {
            self.writes = Some(bytes.to_vec());
            self
        }
    }

    /// Records every call and replies from a per-tool queue
    #[derive(Debug, Default)]
    pub struct FakeToolRunner {
        responses: Mutex<HashMap<String, VecDeque<FakeResponse>>>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeToolRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, tool: &str, response: FakeResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(tool.to_string())
                .or_default()
                .push_back(response);
            self
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, tool: &str) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter(|(name, _)| name == tool)
                .map(|(_, args)| args)
                .collect()
        }

        /// Value after `-o`, otherwise the last argument
        fn output_path(args: &[String]) -> Option<PathBuf> {
            args.iter()
                .position(|a| a == "-o")
                .and_then(|i| args.get(i + 1))
                .or_else(|| args.last())
                .map(PathBuf::from)
        }
    }

    #[async_trait]
    impl ToolRunner for FakeToolRunner {
        async fn run(&self, tool: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
            self.calls
                .lock()
                .unwrap()
                .push((tool.to_string(), args.to_vec()));

            let response = self
                .responses
                .lock()
                .unwrap()
                .get_mut(tool)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| FakeResponse::fail(127, "no scripted response"));

            if response.missing {
                return Err(ToolError::NotFound(tool.to_string()));
            }
            if let (Some(bytes), Some(path)) = (&response.writes, Self::output_path(args)) {
                std::fs::write(path, bytes).expect("fake tool failed to write output");
            }
            Ok(response.output)
        }
    }
}
