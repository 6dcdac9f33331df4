//! # mdocx-diagrams
//!
//! Mermaid diagram rendering for mdocx.
//!
//! Diagram blocks are rendered to SVG by a disposable backend (the
//! `mmdc` command line tool, or a [Kroki](https://kroki.io) server),
//! rasterized to PNG with resvg, and bounded to 800x600 pixels.
//!
//! ## Example
//!
//! ```no_run
//! use mdocx_diagrams::{factory_of, DiagramRenderer, MermaidCliBackend, RenderConfig};
//!
//! let renderer = DiagramRenderer::new(
//!     factory_of(MermaidCliBackend::new()),
//!     RenderConfig::default(),
//! );
//! let content = renderer.process_content("```mermaid\ngraph TD; A-->B;\n```\n");
//! for diagram in &content.diagrams {
//!     println!("{} -> {} bytes", diagram.file_name(), diagram.image_bytes.len());
//! }
//! ```

pub mod backend;
pub mod cancel;
pub mod error;
pub mod fence;
#[cfg(feature = "kroki")]
pub mod kroki;
pub mod mmdc;
pub mod raster;
pub mod renderer;
pub mod retry;
pub mod scratch;
pub mod testing;
pub mod types;

pub use backend::{RenderBackend, RenderJob};
pub use cancel::CancellationToken;
pub use error::{DiagramError, Result};
pub use fence::{find_mermaid_blocks, DiagramBlock};
#[cfg(feature = "kroki")]
pub use kroki::{KrokiBackend, DEFAULT_KROKI_URL};
pub use mmdc::MermaidCliBackend;
pub use raster::{rasterize, RasterLimits};
pub use renderer::{factory_of, BackendFactory, DiagramRenderer, ProcessedContent, RenderConfig};
pub use retry::{RetryPolicy, RetryingBackend};
pub use scratch::ScratchDir;
pub use types::{
    diagram_file_name, diagram_id_from_file_name, Dimensions, ImageFormat, MermaidTheme,
    ProcessedDiagram, RasterImage,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
