//! Mermaid CLI backend
//!
//! Renders each diagram by running `mmdc` (from `@mermaid-js/mermaid-cli`)
//! as a child process inside the scratch directory. The child is the
//! isolated page: it is killed when its job times out and reaped before
//! the job returns, so no process outlives a render call.

use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::backend::{RenderBackend, RenderJob};
use crate::error::{DiagramError, Result};

/// Default program name looked up on `PATH`
pub const DEFAULT_MMDC: &str = "mmdc";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Backend driving the mermaid-cli executable
#[derive(Debug, Clone)]
pub struct MermaidCliBackend {
    program: PathBuf,
    puppeteer_config: Option<PathBuf>,
    version: Option<String>,
}

impl Default for MermaidCliBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MermaidCliBackend {
    /// Use `mmdc` from `PATH`
    pub fn new() -> Self {
        Self::with_program(DEFAULT_MMDC)
    }

    /// Use a specific mmdc executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            puppeteer_config: None,
            version: None,
        }
    }

    /// Pass a puppeteer config file (`-p`), e.g. to disable the sandbox
    pub fn with_puppeteer_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.puppeteer_config = Some(path.into());
        self
    }

    /// Version reported by mmdc once started
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Kills and reaps the child unless it already exited
struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            let _ = self.0.kill();
            let _ = self.0.wait();
        }
    }
}

impl RenderBackend for MermaidCliBackend {
    fn name(&self) -> &'static str {
        "mermaid-cli"
    }

    fn start(&mut self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                DiagramError::BackendUnavailable(format!(
                    "cannot run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(DiagramError::BackendUnavailable(format!(
                "{} --version exited with {}",
                self.program.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        log::debug!("Started mermaid-cli {}", version);
        self.version = Some(version);
        Ok(())
    }

    fn render_svg(&mut self, job: &RenderJob<'_>) -> Result<String> {
        let input = job.scratch.join(format!("{}.mmd", job.id));
        let output = job.scratch.join(format!("{}.svg", job.id));
        let config = job.scratch.join(format!("{}.json", job.id));
        // A file, not a pipe: a chatty child cannot block on a full buffer
        let log = job.scratch.join(format!("{}.log", job.id));

        fs::write(&input, job.source)?;
        // Plain SVG text labels; resvg does not render foreignObject
        let config_json = json!({
            "theme": job.theme.as_str(),
            "flowchart": { "htmlLabels": false },
            "class": { "htmlLabels": false },
        });
        fs::write(&config, config_json.to_string())?;

        let mut command = Command::new(&self.program);
        command
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-t")
            .arg(job.theme.as_str())
            .arg("-b")
            .arg(job.background)
            .arg("-c")
            .arg(&config)
            .arg("-q")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(File::create(&log)?);
        if let Some(ref puppeteer) = self.puppeteer_config {
            command.arg("-p").arg(puppeteer);
        }

        let mut child = ChildGuard(command.spawn()?);
        let deadline = Instant::now() + job.timeout;

        let status = loop {
            if let Some(status) = child.0.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                log::warn!("mmdc exceeded {:?} for diagram {}", job.timeout, job.id);
                return Err(DiagramError::Timeout(job.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let stderr = fs::read_to_string(&log).unwrap_or_default();
            return Err(DiagramError::RenderFailed(format!(
                "mmdc exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        let svg = fs::read_to_string(&output).map_err(|e| {
            DiagramError::RenderFailed(format!("mmdc produced no SVG: {}", e))
        })?;
        if !svg.contains("<svg") {
            return Err(DiagramError::RenderFailed(
                "mmdc output is not an SVG document".to_string(),
            ));
        }
        Ok(svg)
    }

    fn shutdown(&mut self) {
        if self.version.take().is_some() {
            log::debug!("Stopped mermaid-cli backend");
        }
    }
}
