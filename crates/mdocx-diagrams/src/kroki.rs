//! Kroki backend
//!
//! Renders mermaid through a [Kroki](https://kroki.io) server. The HTTP
//! client is the disposable resource: it is built in `start` and dropped
//! in `shutdown`.

use std::io::Write;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use reqwest::blocking::Client;

use crate::backend::{with_theme_directive, RenderBackend, RenderJob};
use crate::error::{DiagramError, Result};
use crate::types::MermaidTheme;

/// Default Kroki server URL
pub const DEFAULT_KROKI_URL: &str = "https://kroki.io";

/// Backend posting mermaid source to a Kroki server
#[derive(Debug)]
pub struct KrokiBackend {
    base_url: String,
    client: Option<Client>,
    connect_timeout: Duration,
}

impl Default for KrokiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KrokiBackend {
    /// Use the public Kroki server
    pub fn new() -> Self {
        Self::with_url(DEFAULT_KROKI_URL)
    }

    /// Use a custom Kroki server
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET URL that renders `source` as SVG, for linking instead of embedding
    pub fn diagram_url(&self, source: &str, theme: MermaidTheme) -> Result<String> {
        let encoded = encode_source(&with_theme_directive(source, theme))?;
        Ok(format!("{}/mermaid/svg/{}", self.base_url, encoded))
    }
}

/// Deflate + URL-safe base64, the encoding Kroki GET URLs use
pub fn encode_source(source: &str) -> Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

impl RenderBackend for KrokiBackend {
    fn name(&self) -> &'static str {
        "kroki"
    }

    fn start(&mut self) -> Result<()> {
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| DiagramError::BackendUnavailable(e.to_string()))?;
        self.client = Some(client);
        log::debug!("Kroki backend ready at {}", self.base_url);
        Ok(())
    }

    fn render_svg(&mut self, job: &RenderJob<'_>) -> Result<String> {
        let client = self.client.as_ref().ok_or_else(|| {
            DiagramError::BackendUnavailable("Kroki backend not started".to_string())
        })?;

        let url = format!("{}/mermaid/svg", self.base_url);
        let response = client
            .post(&url)
            .timeout(job.timeout)
            .header("Content-Type", "text/plain")
            .body(with_theme_directive(job.source, job.theme))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    DiagramError::Timeout(job.timeout)
                } else {
                    DiagramError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DiagramError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text()?)
    }

    fn shutdown(&mut self) {
        if self.client.take().is_some() {
            log::debug!("Kroki backend released");
        }
    }
}
