//! Render backend trait
//!
//! A backend turns mermaid source into SVG markup. Backends wrap
//! disposable external resources (a child process, an HTTP client), so
//! the trait makes their lifecycle explicit:
//!
//! 1. [`RenderBackend::start`] runs once, lazily, before the first job.
//! 2. [`RenderBackend::render_svg`] runs once per diagram, each call in an
//!    isolated page that is closed before the call returns.
//! 3. [`RenderBackend::shutdown`] runs exactly once per session in which
//!    `start` was attempted, on every exit path, including after a failed
//!    `start` or a panic in `render_svg`. It must release every process,
//!    socket and file the backend holds, and must not fail.

use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::types::MermaidTheme;

/// One diagram to render
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    /// Diagram id, usable as a file stem inside `scratch`
    pub id: &'a str,
    /// Mermaid source
    pub source: &'a str,
    /// Theme passed to mermaid
    pub theme: MermaidTheme,
    /// Background colour (CSS)
    pub background: &'a str,
    /// Upper bound on the time this job may take
    pub timeout: Duration,
    /// Directory for intermediate files, emptied by the session
    pub scratch: &'a Path,
}

/// Trait for mermaid rendering backends
///
/// Backends must be `Send` so bounded-concurrency workers can each own one.
pub trait RenderBackend: Send {
    /// Human-readable name of this backend
    fn name(&self) -> &'static str;

    /// Bring the backend up
    fn start(&mut self) -> Result<()>;

    /// Render one diagram to SVG markup
    fn render_svg(&mut self, job: &RenderJob<'_>) -> Result<String>;

    /// Release all external resources
    fn shutdown(&mut self);
}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn render_svg(&mut self, job: &RenderJob<'_>) -> Result<String> {
        (**self).render_svg(job)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// Prefix mermaid source with an init directive selecting `theme`.
///
/// Used by backends that cannot pass the theme out of band.
pub fn with_theme_directive(source: &str, theme: MermaidTheme) -> String {
    if source.trim_start().starts_with("%%{") {
        return source.to_string();
    }
    format!(
        "%%{{init: {{\"theme\": \"{}\", \"flowchart\": {{\"htmlLabels\": false}}}}}}%%\n{}",
        theme.as_str(),
        source
    )
}
