//! Diagram renderer
//!
//! [`DiagramRenderer`] owns the backend lifecycle for one conversion call:
//!
//! ```text
//! Idle -> Ready -> (per diagram: render -> rendered | failed) ... -> TornDown
//!   \-> Unavailable (start failed) ------------------------------> TornDown
//! ```
//!
//! The backend starts lazily on the first diagram, is reused for the
//! rest, and is shut down when the call ends on every exit path. The
//! scratch directory is emptied at the same point.

use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::backend::{RenderBackend, RenderJob};
use crate::cancel::CancellationToken;
use crate::error::{DiagramError, Result};
use crate::fence::{find_mermaid_blocks, splice, DiagramBlock};
use crate::raster::{rasterize, RasterLimits, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH};
use crate::scratch::ScratchDir;
use crate::types::{diagram_file_name, MermaidTheme, ProcessedDiagram, RasterImage};

/// Creates a fresh backend for each session
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn RenderBackend> + Send + Sync>;

/// Factory cloning a prototype backend
pub fn factory_of<B>(prototype: B) -> BackendFactory
where
    B: RenderBackend + Clone + Sync + 'static,
{
    Arc::new(move || Box::new(prototype.clone()) as Box<dyn RenderBackend>)
}

/// Renderer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Mermaid theme
    pub theme: MermaidTheme,
    /// Per-diagram timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum raster width
    pub max_width: u32,
    /// Maximum raster height
    pub max_height: u32,
    /// Background colour; the theme's default when unset
    pub background: Option<String>,
    /// Diagrams rendered at once; 1 keeps rendering strictly sequential
    pub concurrency: usize,
    /// Where the per-run scratch directory is created; the system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: MermaidTheme::Default,
            timeout_ms: 30_000,
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            background: None,
            concurrency: 1,
            scratch_dir: None,
        }
    }
}

impl RenderConfig {
    /// Per-diagram timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn background(&self) -> String {
        self.background
            .clone()
            .unwrap_or_else(|| self.theme.background().to_string())
    }

    fn limits(&self) -> RasterLimits {
        RasterLimits {
            max_width: self.max_width,
            max_height: self.max_height,
            background: Some(self.background()),
        }
    }
}

/// Output of [`DiagramRenderer::process_content`]
#[derive(Debug, Clone, Default)]
pub struct ProcessedContent {
    /// Input text with rendered blocks replaced by embed references
    pub text: String,
    /// Successfully rendered diagrams, in document order
    pub diagrams: Vec<ProcessedDiagram>,
    /// One message per block that kept its original text
    pub warnings: Vec<String>,
    /// Number of diagram blocks found
    pub blocks_found: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum SessionState {
    Idle,
    Ready,
    Unavailable(String),
    TornDown,
}

/// One backend instance and its lifecycle state
struct Session {
    backend: Box<dyn RenderBackend>,
    state: SessionState,
}

impl Session {
    fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self {
            backend,
            state: SessionState::Idle,
        }
    }

    fn ensure_started(&mut self) -> Result<()> {
        match &self.state {
            SessionState::Ready => Ok(()),
            SessionState::Unavailable(reason) => {
                Err(DiagramError::BackendUnavailable(reason.clone()))
            }
            SessionState::TornDown => Err(DiagramError::BackendUnavailable(
                "backend already torn down".to_string(),
            )),
            SessionState::Idle => {
                log::debug!("Starting {} backend", self.backend.name());
                let started = catch_unwind(AssertUnwindSafe(|| self.backend.start()))
                    .unwrap_or_else(|_| {
                        Err(DiagramError::Panic("backend panicked on start".to_string()))
                    });
                match started {
                    Ok(()) => {
                        self.state = SessionState::Ready;
                        Ok(())
                    }
                    Err(e) => {
                        log::warn!("{} backend failed to start: {}", self.backend.name(), e);
                        self.state = SessionState::Unavailable(e.to_string());
                        Err(e)
                    }
                }
            }
        }
    }

    fn render_svg(&mut self, job: &RenderJob<'_>) -> Result<String> {
        self.ensure_started()?;
        let began = Instant::now();
        let svg = catch_unwind(AssertUnwindSafe(|| self.backend.render_svg(job)))
            .map_err(|payload| DiagramError::Panic(panic_message(payload.as_ref())))??;
        if began.elapsed() > job.timeout {
            return Err(DiagramError::Timeout(job.timeout));
        }
        Ok(svg)
    }

    fn teardown(&mut self) {
        match self.state {
            SessionState::Idle => self.state = SessionState::TornDown,
            SessionState::TornDown => {}
            SessionState::Ready | SessionState::Unavailable(_) => {
                let backend = &mut self.backend;
                if catch_unwind(AssertUnwindSafe(|| backend.shutdown())).is_err() {
                    log::warn!("{} backend panicked during shutdown", backend.name());
                }
                log::debug!("Tore down {} backend", backend.name());
                self.state = SessionState::TornDown;
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Stable id for the `index`-th block: position plus a source hash prefix
pub fn diagram_id(index: usize, source: &str) -> String {
    let hash = format!("{:x}", Sha256::digest(source.as_bytes()));
    format!("{}-{}", index + 1, &hash[..8])
}

struct Job<'a> {
    id: String,
    block: &'a DiagramBlock,
}

/// Renders mermaid blocks through a disposable backend
pub struct DiagramRenderer {
    factory: BackendFactory,
    config: RenderConfig,
    cancel: CancellationToken,
}

impl DiagramRenderer {
    /// Create a renderer drawing backends from `factory`
    pub fn new(factory: BackendFactory, config: RenderConfig) -> Self {
        Self {
            factory,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token` between diagrams
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Current settings
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a single diagram source in its own session
    pub fn render(&self, source: &str) -> Result<RasterImage> {
        let scratch = self.open_scratch()?;
        let _guard = scratch.guard();
        let mut session = Session::new((self.factory)());
        let result = self.render_job(&mut session, &diagram_id(0, source), source, scratch.path());
        session.teardown();
        result
    }

    /// Replace every mermaid block in `text` that renders with an embed
    /// reference. Blocks that fail stay byte-identical and add a warning.
    pub fn process_content(&self, text: &str) -> ProcessedContent {
        let blocks = find_mermaid_blocks(text);
        let mut content = ProcessedContent {
            text: text.to_string(),
            blocks_found: blocks.len(),
            ..Default::default()
        };
        if blocks.is_empty() {
            return content;
        }

        let scratch = match self.open_scratch() {
            Ok(scratch) => scratch,
            Err(e) => {
                log::warn!("Cannot create diagram scratch directory: {}", e);
                content.warnings = blocks
                    .iter()
                    .map(|b| block_warning(b, &e))
                    .collect();
                return content;
            }
        };
        let _guard = scratch.guard();

        let jobs: Vec<Job<'_>> = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| Job {
                id: diagram_id(i, &block.source),
                block,
            })
            .collect();

        let outcomes = if self.config.concurrency > 1 && jobs.len() > 1 {
            self.render_concurrent(&jobs, scratch.path())
        } else {
            self.render_sequential(&jobs, scratch.path())
        };

        let mut replacements = Vec::new();
        for (job, outcome) in jobs.iter().zip(outcomes) {
            match outcome {
                Ok(image) => {
                    let diagram = ProcessedDiagram {
                        id: job.id.clone(),
                        source_code: job.block.source.clone(),
                        image_bytes: image.bytes,
                        format: image.format,
                        dimensions: image.dimensions,
                    };
                    replacements.push((job.block, diagram.embed_reference()));
                    content.diagrams.push(diagram);
                }
                Err(e) => {
                    log::warn!("Diagram {} failed: {}", job.id, e);
                    content.warnings.push(block_warning(job.block, &e));
                }
            }
        }

        content.text = splice(text, &replacements);
        content
    }

    fn open_scratch(&self) -> Result<ScratchDir> {
        let scratch = match self.config.scratch_dir {
            Some(ref path) => ScratchDir::at(path)?,
            None => ScratchDir::temporary()?,
        };
        Ok(scratch)
    }

    fn render_sequential(&self, jobs: &[Job<'_>], scratch: &Path) -> Vec<Result<RasterImage>> {
        let mut session = Session::new((self.factory)());
        let outcomes = jobs
            .iter()
            .map(|job| self.render_job(&mut session, &job.id, &job.block.source, scratch))
            .collect();
        session.teardown();
        outcomes
    }

    fn render_concurrent(&self, jobs: &[Job<'_>], scratch: &Path) -> Vec<Result<RasterImage>> {
        let workers = self.config.concurrency.min(jobs.len());
        let mut outcomes: Vec<Option<Result<RasterImage>>> = jobs.iter().map(|_| None).collect();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    scope.spawn(move || {
                        let mut session = Session::new((self.factory)());
                        let done: Vec<_> = (worker..jobs.len())
                            .step_by(workers)
                            .map(|i| {
                                let job = &jobs[i];
                                (
                                    i,
                                    self.render_job(&mut session, &job.id, &job.block.source, scratch),
                                )
                            })
                            .collect();
                        session.teardown();
                        done
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (i, outcome) in done {
                            outcomes[i] = Some(outcome);
                        }
                    }
                    Err(_) => log::warn!("Diagram render worker panicked"),
                }
            }
        });

        outcomes
            .into_iter()
            .map(|o| {
                o.unwrap_or_else(|| Err(DiagramError::Panic("render worker panicked".to_string())))
            })
            .collect()
    }

    fn render_job(
        &self,
        session: &mut Session,
        id: &str,
        source: &str,
        scratch: &Path,
    ) -> Result<RasterImage> {
        if self.cancel.is_cancelled() {
            return Err(DiagramError::Cancelled);
        }
        if source.trim().is_empty() {
            return Err(DiagramError::InvalidSource("empty diagram".to_string()));
        }

        let background = self.config.background();
        let job = RenderJob {
            id,
            source,
            theme: self.config.theme,
            background: &background,
            timeout: self.config.timeout(),
            scratch,
        };
        let svg = session.render_svg(&job)?;
        let image = rasterize(&svg, &self.config.limits())?;
        fs::write(scratch.join(diagram_file_name(id)), &image.bytes)?;
        Ok(image)
    }
}

fn block_warning(block: &DiagramBlock, error: &dyn std::fmt::Display) -> String {
    format!(
        "Mermaid diagram at line {} was not rendered: {}",
        block.line, error
    )
}
