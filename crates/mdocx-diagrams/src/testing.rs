//! Scriptable in-process backend for tests
//!
//! [`FakeBackend`] records lifecycle calls in a shared [`BackendLog`] so
//! tests can assert that sessions start lazily and always tear down.

use std::fs;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::backend::{RenderBackend, RenderJob};
use crate::error::{DiagramError, Result};
use crate::renderer::BackendFactory;

/// Lifecycle counters shared by every clone of a [`FakeBackend`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendLog {
    pub starts: usize,
    pub renders: usize,
    pub shutdowns: usize,
}

impl BackendLog {
    /// Backends started and not yet shut down
    pub fn live(&self) -> isize {
        self.starts as isize - self.shutdowns as isize
    }
}

/// Backend that draws a fixed rectangle for every diagram
#[derive(Debug, Clone)]
pub struct FakeBackend {
    log: Arc<Mutex<BackendLog>>,
    fail_marker: Option<String>,
    panic_marker: Option<String>,
    unavailable: bool,
    delay: Option<Duration>,
    size: (u32, u32),
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// Backend that renders everything
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(BackendLog::default())),
            fail_marker: None,
            panic_marker: None,
            unavailable: false,
            delay: None,
            size: (400, 200),
        }
    }

    /// Fail any diagram whose source contains `marker`
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Panic on any diagram whose source contains `marker`
    pub fn panicking_on(mut self, marker: impl Into<String>) -> Self {
        self.panic_marker = Some(marker.into());
        self
    }

    /// Refuse to start
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Sleep before returning each diagram
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Size of the drawn rectangle
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Snapshot of the lifecycle counters
    pub fn log(&self) -> BackendLog {
        self.lock().clone()
    }

    /// Factory handing out clones that share this backend's log
    pub fn factory(&self) -> BackendFactory {
        let prototype = self.clone();
        Arc::new(move || Box::new(prototype.clone()) as Box<dyn RenderBackend>)
    }

    fn lock(&self) -> MutexGuard<'_, BackendLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RenderBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn start(&mut self) -> Result<()> {
        self.lock().starts += 1;
        if self.unavailable {
            return Err(DiagramError::BackendUnavailable(
                "fake backend disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn render_svg(&mut self, job: &RenderJob<'_>) -> Result<String> {
        self.lock().renders += 1;
        fs::write(job.scratch.join(format!("{}.svg", job.id)), job.source)?;

        if let Some(ref marker) = self.panic_marker {
            if job.source.contains(marker.as_str()) {
                panic!("fake backend asked to panic");
            }
        }
        if let Some(ref marker) = self.fail_marker {
            if job.source.contains(marker.as_str()) {
                return Err(DiagramError::RenderFailed(format!(
                    "syntax error in diagram {}",
                    job.id
                )));
            }
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        let (w, h) = self.size;
        Ok(format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect x="0" y="0" width="{w}" height="{h}" fill="#8ab4f8"/></svg>"##
        ))
    }

    fn shutdown(&mut self) {
        self.lock().shutdowns += 1;
    }
}
