//! Full-document assembly.
//!
//! Class names and stylesheet rules are a side effect of rendering, so the
//! stylesheet is only complete once the body has been rendered. Two
//! placements are supported:
//!
//! - [`StylePlacement::Head`]: the body is rendered first into a scratch
//!   buffer with its own context, its rules are harvested, and then the
//!   document is written with `<style>` inside `<head>`.
//! - [`StylePlacement::BodyEnd`]: the document is written top to bottom and
//!   `<style>` goes at the end of `<body>`. Nothing has to be buffered, which
//!   is what lets the streaming renderers start sending the body right away.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::context::RenderContext;
use crate::error::{decode_utf8, Result};
use crate::escape::escape_attribute;
use crate::node::{AttributeMap, Node};
use crate::output::Output;
use crate::render::render;
use crate::stream::chunk::ChunkBuffer;
use crate::style::{render_stylesheet, StyleMap};
use crate::RenderConfig;

pub const DOCTYPE: &[u8] = b"<!doctype html>";

/// Where the generated `<style>` element goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StylePlacement {
    /// Inside `<head>`; requires the body to be buffered
    #[default]
    Head,
    /// At the end of `<body>`; allows progressive output
    BodyEnd,
}

/// A complete HTML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub head: Node,
    #[serde(default)]
    pub body: Node,
    /// Attributes of the `<html>` element
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub html_attributes: AttributeMap,
}

/// Output of [`Document::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    /// Stylesheet text as embedded in the document (without the `<style>` tag)
    pub stylesheet: String,
    pub styles: StyleMap,
}

impl RenderedDocument {
    pub fn into_string(self) -> Result<String> {
        decode_utf8(self.bytes)
    }
}

impl Document {
    pub fn new(head: impl Into<Node>, body: impl Into<Node>) -> Self {
        Self {
            head: head.into(),
            body: body.into(),
            html_attributes: AttributeMap::new(),
        }
    }

    /// Set `<html lang="...">`.
    pub fn lang(self, lang: impl Into<String>) -> Self {
        self.html_attribute("lang", lang)
    }

    pub fn html_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.html_attributes.set(name, value);
        self
    }

    /// Render into a new buffer.
    pub fn render(&self, config: &RenderConfig) -> RenderedDocument {
        let mut bytes = Vec::with_capacity(config.reserved_capacity);
        let styles = self.render_into(&mut bytes, config);
        let stylesheet = render_stylesheet(&styles, config, "");
        RenderedDocument {
            bytes,
            stylesheet,
            styles,
        }
    }

    pub fn render_to_string(&self, config: &RenderConfig) -> Result<String> {
        self.render(config).into_string()
    }

    /// Render into any sink, returning the style rules that were emitted.
    pub fn render_into(&self, out: &mut impl Output, config: &RenderConfig) -> StyleMap {
        let mut ctx = RenderContext::new(config);
        match config.style_placement {
            StylePlacement::Head => {
                let mut scratch = RenderContext::new(config).with_depth(2);
                let mut body = Vec::with_capacity(config.reserved_capacity);
                render(&self.body, &mut body, &mut scratch);
                debug!(
                    "body rendered: {} bytes, {} style rules",
                    body.len(),
                    scratch.styles().len()
                );
                ctx.absorb(scratch);

                open_document(&self.html_attributes, out, &mut ctx);
                render(&self.head, out, &mut ctx);
                write_style_block(out, &ctx);
                close_head_open_body(out, &mut ctx);
                out.write_bytes(&body);
                close_document(out, &mut ctx);
            }
            StylePlacement::BodyEnd => {
                open_document(&self.html_attributes, out, &mut ctx);
                render(&self.head, out, &mut ctx);
                close_head_open_body(out, &mut ctx);
                render(&self.body, out, &mut ctx);
                write_style_block(out, &ctx);
                close_document(out, &mut ctx);
            }
        }
        debug!("document rendered with {} style rules", ctx.styles().len());
        ctx.into_styles()
    }

    /// Render through a [`ChunkBuffer`], handing `chunk_size`-byte slices to
    /// `emit` as they fill up. The concatenated chunks equal
    /// [`Document::render`]'s bytes.
    pub fn render_chunked<F: FnMut(&[u8])>(&self, config: &RenderConfig, emit: F) -> StyleMap {
        let mut sink = ChunkBuffer::new(config.chunk_size, emit);
        let styles = self.render_into(&mut sink, config);
        sink.flush_remaining();
        styles
    }
}

fn open_tag(tag: &str, out: &mut impl Output, ctx: &RenderContext<'_>) {
    ctx.line_break(out);
    out.write_byte(b'<');
    out.write_str(tag);
    out.write_byte(b'>');
}

fn close_tag(tag: &str, out: &mut impl Output, ctx: &RenderContext<'_>) {
    ctx.line_break(out);
    out.write_bytes(b"</");
    out.write_str(tag);
    out.write_byte(b'>');
}

/// `<!doctype html><html ...><head>`, leaving the context two levels deep.
pub(crate) fn open_document(
    html_attributes: &AttributeMap,
    out: &mut impl Output,
    ctx: &mut RenderContext<'_>,
) {
    out.write_bytes(DOCTYPE);
    ctx.line_break(out);
    out.write_bytes(b"<html");
    for (name, value) in html_attributes.iter() {
        out.write_byte(b' ');
        out.write_str(name);
        if !value.is_empty() {
            out.write_bytes(b"=\"");
            escape_attribute(value.as_bytes(), out);
            out.write_byte(b'"');
        }
    }
    out.write_byte(b'>');
    ctx.push_indentation();
    open_tag("head", out, ctx);
    ctx.push_indentation();
}

pub(crate) fn close_head_open_body(out: &mut impl Output, ctx: &mut RenderContext<'_>) {
    ctx.pop_indentation();
    close_tag("head", out, ctx);
    open_tag("body", out, ctx);
    ctx.push_indentation();
}

pub(crate) fn close_document(out: &mut impl Output, ctx: &mut RenderContext<'_>) {
    ctx.pop_indentation();
    close_tag("body", out, ctx);
    ctx.pop_indentation();
    close_tag("html", out, ctx);
}

/// `<style>` element holding every rule collected so far; nothing when there
/// are no rules.
pub(crate) fn write_style_block(out: &mut impl Output, ctx: &RenderContext<'_>) {
    if ctx.styles().is_empty() {
        return;
    }
    let config = ctx.config();
    let outer = ctx.current_indentation();
    let mut rule_indent = String::with_capacity(outer.len() + config.indentation.len());
    rule_indent.push_str(outer);
    rule_indent.push_str(&config.indentation);

    open_tag("style", out, ctx);
    out.write_str(&render_stylesheet(ctx.styles(), config, &rule_indent));
    close_tag("style", out, ctx);
}
