//! RFox Markup Renderer
//!
//! Renders a declarative tree of [`Node`]s into HTML bytes while interning
//! inline style declarations into generated class names and a single
//! stylesheet.
//!
//! # Features
//!
//! - **Escaping**: text and attribute values are escaped through a byte
//!   lookup table; unescaped runs are copied in bulk
//! - **Style interning**: repeated declarations share one class name and one
//!   stylesheet rule per render
//! - **Two-phase documents**: the body is rendered first so the stylesheet can
//!   be placed in `<head>`
//! - **Streaming** (`stream` feature, default): chunked delivery from a
//!   blocking worker, or a backpressured async render that never runs more
//!   than one chunk ahead of its consumer
//!
//! # Example
//!
//! ```
//! use rfmarkup::{Document, Node, RenderConfig, StyleEntry};
//!
//! # fn main() -> rfmarkup::Result<()> {
//! let doc = Document::new(
//!     Node::element("title", "Hello"),
//!     Node::element("div", "hi").style(StyleEntry::new("color", "red")),
//! );
//! let html = doc.render_to_string(&RenderConfig::default())?;
//! assert!(html.contains(r#"<div class="color-0">hi</div>"#));
//! assert!(html.contains("<style>.color-0{color:red}</style>"));
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod document;
pub mod error;
pub mod escape;
pub mod node;
pub mod output;
pub mod render;
pub mod style;

// Chunking is always available; the async stream adapters need `stream`
pub mod stream;

pub use context::RenderContext;
pub use document::{Document, RenderedDocument, StylePlacement, DOCTYPE};
pub use error::{Error, Result};
pub use node::{AttributeMap, Conditional, Element, Node};
pub use output::Output;
pub use render::{render, render_fragment, render_fragment_string, render_fragment_with_styles};
pub use stream::{ChunkBuffer, DEFAULT_CHUNK_SIZE};
pub use style::{intern_class_name, render_stylesheet};
pub use style::{ClassNaming, StyleEntry, StyleKey, StyleMap};

#[cfg(feature = "stream")]
pub use stream::{
    stream_backpressured, stream_chunked, stream_fragment_backpressured, stream_fragment_chunked,
    BackpressuredStream, ChunkStream,
};

/// Configuration for a render
///
/// Shared read-only by every render call that uses it. The defaults produce
/// compact output with no whitespace between tags:
/// - `indentation` and `newline` are empty
/// - class names are sequential (`color-0`, `color-1`, ...)
/// - the stylesheet goes into `<head>`
///
/// # Examples
///
/// ```
/// let cfg = rfmarkup::RenderConfig::default();
/// assert!(cfg.newline.is_empty());
/// assert_eq!(cfg.chunk_size, 4096);
///
/// let pretty = rfmarkup::RenderConfig {
///     force_important: true,
///     ..rfmarkup::RenderConfig::pretty()
/// };
/// assert_eq!(pretty.indentation, "  ");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// One indentation step, written once per nesting level after a newline
    pub indentation: String,
    /// Written before block-level tags; empty disables line breaks entirely
    pub newline: String,
    /// Append `!important` to every generated declaration
    pub force_important: bool,
    /// Initial capacity of batch output buffers, in bytes
    pub reserved_capacity: usize,
    /// Chunk size for the streaming renderers, in bytes
    pub chunk_size: usize,
    /// How generated class names are minted
    pub class_naming: ClassNaming,
    /// Where full documents place their `<style>` element
    pub style_placement: StylePlacement,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indentation: String::new(),
            newline: String::new(),
            force_important: false,
            reserved_capacity: 1024,
            chunk_size: DEFAULT_CHUNK_SIZE,
            class_naming: ClassNaming::default(),
            style_placement: StylePlacement::default(),
        }
    }
}

impl RenderConfig {
    /// Two-space indentation with `\n` line breaks.
    pub fn pretty() -> Self {
        Self {
            indentation: "  ".to_string(),
            newline: "\n".to_string(),
            ..Default::default()
        }
    }

    /// Whether line breaks and indentation are emitted at all.
    pub fn is_pretty(&self) -> bool {
        !self.newline.is_empty()
    }
}
