//! Backpressured rendering over a bounded channel.
//!
//! The async renderer mirrors [`crate::render::render`] node for node but
//! writes into a [`ChannelWriter`] and awaits after every element boundary
//! and leaf. Whenever a full chunk is buffered the send suspends until the
//! consumer has taken the previous one, so the producer can never run more
//! than one chunk ahead of the consumer.

use futures::future::BoxFuture;
use log::{debug, trace};
use tokio::sync::mpsc;

use crate::context::RenderContext;
use crate::document::{
    close_document, close_head_open_body, open_document, write_style_block, Document,
};
use crate::escape::escape_text;
use crate::node::{Conditional, Node};
use crate::output::Output;
use crate::render::{begin_decoration, begin_element, end_element};
use crate::style::StyleMap;
use crate::{RenderConfig, StylePlacement};

/// The receiving side went away; the render stops without reporting an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cancelled;

enum Sink {
    Channel(mpsc::Sender<Vec<u8>>),
    /// Collects chunks locally, yielding to the runtime after each one
    Buffer(Vec<u8>),
}

/// Sink that buffers at most one chunk plus the last write before sending.
pub(crate) struct ChannelWriter {
    buf: Vec<u8>,
    chunk_size: usize,
    sink: Sink,
    chunks_sent: usize,
    peak_buffered: usize,
}

impl ChannelWriter {
    pub(crate) fn new(tx: mpsc::Sender<Vec<u8>>, chunk_size: usize) -> Self {
        Self::with_sink(Sink::Channel(tx), chunk_size)
    }

    /// A writer that keeps its output instead of sending it, for renders that
    /// must finish before anything can be sent. It still suspends after every
    /// chunk so the task stays cancellable.
    pub(crate) fn buffering(chunk_size: usize) -> Self {
        Self::with_sink(Sink::Buffer(Vec::new()), chunk_size)
    }

    fn with_sink(sink: Sink, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            buf: Vec::with_capacity(chunk_size.saturating_mul(2)),
            chunk_size,
            sink,
            chunks_sent: 0,
            peak_buffered: 0,
        }
    }

    /// Largest number of bytes held at once.
    pub(crate) fn peak_buffered(&self) -> usize {
        self.peak_buffered
    }

    async fn emit(&mut self, chunk: Vec<u8>) -> Result<(), Cancelled> {
        match &mut self.sink {
            Sink::Channel(tx) => tx.send(chunk).await.map_err(|_| Cancelled)?,
            Sink::Buffer(collected) => {
                collected.extend_from_slice(&chunk);
                tokio::task::yield_now().await;
            }
        }
        self.chunks_sent += 1;
        Ok(())
    }

    /// Send every complete chunk, waiting for the consumer between sends.
    pub(crate) async fn flush_ready(&mut self) -> Result<(), Cancelled> {
        if self.buf.len() < self.chunk_size {
            return Ok(());
        }
        let mut offset = 0;
        while self.buf.len() - offset >= self.chunk_size {
            let chunk = self.buf[offset..offset + self.chunk_size].to_vec();
            offset += self.chunk_size;
            self.emit(chunk).await?;
        }
        self.buf.drain(..offset);
        trace!("sent {} chunks so far, {} bytes buffered", self.chunks_sent, self.buf.len());
        Ok(())
    }

    /// Write a leaf's bytes at most one chunk at a time, so a single large
    /// text or raw node never sits in memory whole.
    pub(crate) async fn write_paced(
        &mut self,
        bytes: &[u8],
        escape: bool,
    ) -> Result<(), Cancelled> {
        for piece in bytes.chunks(self.chunk_size) {
            if escape {
                escape_text(piece, self);
            } else {
                self.write_bytes(piece);
            }
            self.flush_ready().await?;
        }
        Ok(())
    }

    /// Send the final partial chunk.
    pub(crate) async fn finish(&mut self) -> Result<usize, Cancelled> {
        self.flush_ready().await?;
        if !self.buf.is_empty() {
            let tail = std::mem::take(&mut self.buf);
            self.emit(tail).await?;
        }
        Ok(self.chunks_sent)
    }

    /// Everything written to a [`ChannelWriter::buffering`] writer.
    pub(crate) async fn into_buffered(mut self) -> Result<Vec<u8>, Cancelled> {
        self.finish().await?;
        match self.sink {
            Sink::Buffer(collected) => Ok(collected),
            Sink::Channel(_) => Ok(Vec::new()),
        }
    }
}

impl Output for ChannelWriter {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.peak_buffered = self.peak_buffered.max(self.buf.len());
    }
}

/// Suspension-capable counterpart of [`render`].
pub(crate) fn render_async<'a, 'c: 'a>(
    node: &'a Node,
    out: &'a mut ChannelWriter,
    ctx: &'a mut RenderContext<'c>,
) -> BoxFuture<'a, Result<(), Cancelled>> {
    Box::pin(async move {
        match node {
            Node::Element(element) => {
                let scope = begin_element(element, out, ctx);
                out.flush_ready().await?;
                if let Some(child) = scope.child(element) {
                    render_async(child, out, ctx).await?;
                }
                end_element(element, scope, out, ctx);
            }
            Node::Text(text) => out.write_paced(text.as_bytes(), true).await?,
            Node::Raw(bytes) => out.write_paced(bytes, false).await?,
            Node::Attributes { .. } | Node::Styled { .. } => {
                let (inner, saved) = begin_decoration(node, ctx);
                render_async(inner, out, ctx).await?;
                ctx.attributes = saved;
            }
            Node::Array(items) => {
                for item in items {
                    render_async(item, out, ctx).await?;
                }
            }
            Node::Tuple(items) => {
                let saved = ctx.attributes.clone();
                for item in items {
                    render_async(item, out, ctx).await?;
                    if ctx.attributes != saved {
                        ctx.attributes.clone_from(&saved);
                    }
                }
            }
            Node::Conditional(Conditional::First(inner) | Conditional::Second(inner)) => {
                render_async(inner, out, ctx).await?;
            }
            Node::Empty => {}
        }
        out.flush_ready().await
    })
}

/// Style block written in chunk-sized pieces.
async fn write_style_block_async(
    out: &mut ChannelWriter,
    ctx: &RenderContext<'_>,
) -> Result<(), Cancelled> {
    let mut block = Vec::new();
    write_style_block(&mut block, ctx);
    out.write_paced(&block, false).await
}

/// Write a whole document through the channel.
///
/// With [`StylePlacement::BodyEnd`] the body streams while it is traversed.
/// With [`StylePlacement::Head`] the body has to be rendered into a scratch
/// buffer first (the stylesheet precedes it), after which the document is
/// sent chunk by chunk. The scratch render yields after every chunk.
pub(crate) async fn render_document_async(
    document: &Document,
    out: &mut ChannelWriter,
    config: &RenderConfig,
) -> Result<StyleMap, Cancelled> {
    let mut ctx = RenderContext::new(config);
    match config.style_placement {
        StylePlacement::Head => {
            // The body has to be complete before `<head>` can be closed. Render
            // it through a buffering writer so the task keeps yielding (and
            // can be aborted) while it runs.
            let mut scratch = RenderContext::new(config).with_depth(2);
            let mut body_out = ChannelWriter::buffering(out.chunk_size);
            let body = &document.body;
            render_async(body, &mut body_out, &mut scratch).await?;
            let body = body_out.into_buffered().await?;
            ctx.absorb(scratch);

            open_document(&document.html_attributes, out, &mut ctx);
            render_async(&document.head, out, &mut ctx).await?;
            write_style_block_async(out, &ctx).await?;
            close_head_open_body(out, &mut ctx);
            out.write_paced(&body, false).await?;
            close_document(out, &mut ctx);
        }
        StylePlacement::BodyEnd => {
            open_document(&document.html_attributes, out, &mut ctx);
            render_async(&document.head, out, &mut ctx).await?;
            close_head_open_body(out, &mut ctx);
            render_async(&document.body, out, &mut ctx).await?;
            write_style_block_async(out, &ctx).await?;
            close_document(out, &mut ctx);
        }
    }
    let chunks = out.finish().await?;
    debug!(
        "streamed document in {} chunks with {} style rules",
        chunks,
        ctx.styles().len()
    );
    Ok(ctx.into_styles())
}

/// Stream a fragment through the channel.
pub(crate) async fn render_fragment_async(
    node: &Node,
    out: &mut ChannelWriter,
    config: &RenderConfig,
) -> Result<StyleMap, Cancelled> {
    let mut ctx = RenderContext::new(config);
    render_async(node, out, &mut ctx).await?;
    let chunks = out.finish().await?;
    debug!("streamed fragment in {} chunks", chunks);
    Ok(ctx.into_styles())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_fragment;
    use crate::style::StyleEntry;

    async fn collect(mut rx: mpsc::Receiver<Vec<u8>>) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn async_fragment_matches_sync_render() {
        let config = RenderConfig {
            chunk_size: 5,
            ..RenderConfig::pretty()
        };
        let node = Node::element(
            "ul",
            Node::array((0..20).map(|i| {
                Node::element("li", format!("item {i} <"))
                    .style(StyleEntry::new("color", if i % 2 == 0 { "red" } else { "blue" }))
            })),
        );
        let (tx, rx) = mpsc::channel(1);
        let consumer = tokio::spawn(collect(rx));
        let mut out = ChannelWriter::new(tx, config.chunk_size);
        let styles = render_fragment_async(&node, &mut out, &config).await.unwrap();
        drop(out);
        let chunks = consumer.await.unwrap();

        assert_eq!(styles.len(), 2);
        assert!(chunks[..chunks.len() - 1].iter().all(|c| c.len() == 5));
        assert_eq!(chunks.concat(), render_fragment(&node, &config));
    }

    #[tokio::test]
    async fn closed_receiver_cancels() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut out = ChannelWriter::new(tx, 2);
        let node = Node::element("p", "long enough to need a send");
        let res = render_fragment_async(&node, &mut out, &RenderConfig::default()).await;
        assert_eq!(res.unwrap_err(), Cancelled);
    }

    #[tokio::test]
    async fn large_leaf_is_written_a_chunk_at_a_time() {
        let config = RenderConfig {
            chunk_size: 64,
            ..Default::default()
        };
        let node = Node::element("p", "x".repeat(1_000_000));
        let (tx, _rx) = mpsc::channel(1);
        let mut out = ChannelWriter::new(tx, config.chunk_size);

        // Nobody reads: the producer parks on the second send.
        let parked = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            render_fragment_async(&node, &mut out, &config),
        )
        .await;
        assert!(parked.is_err());
        let peak = out.peak_buffered();
        assert!(peak < 2 * 64, "held {} bytes", peak);
    }

    #[tokio::test]
    async fn escaped_and_raw_leaves_stay_bounded_while_draining() {
        let config = RenderConfig {
            chunk_size: 64,
            ..Default::default()
        };
        let text = Node::text("a<b ".repeat(50_000));
        let raw = Node::raw(vec![b'r'; 100_000]);
        let node = Node::element("div", (text, raw));
        let (tx, rx) = mpsc::channel(1);
        let consumer = tokio::spawn(collect(rx));
        let mut out = ChannelWriter::new(tx, config.chunk_size);
        render_fragment_async(&node, &mut out, &config).await.unwrap();
        let peak = out.peak_buffered();
        drop(out);
        let chunks = consumer.await.unwrap();

        assert_eq!(chunks.concat(), render_fragment(&node, &config));
        // One partial chunk plus one escaped piece ("<" grows to "&lt;").
        assert!(peak < 64 + 64 * 4, "held {} bytes", peak);
    }

    #[tokio::test]
    async fn buffering_writer_collects_everything() {
        let node = Node::element("p", "y".repeat(1_000));
        let config = RenderConfig::default();
        let mut ctx = RenderContext::new(&config);
        let mut out = ChannelWriter::buffering(32);
        render_async(&node, &mut out, &mut ctx).await.unwrap();
        assert!(out.peak_buffered() < 64);
        let bytes = out.into_buffered().await.unwrap();
        assert_eq!(bytes, render_fragment(&node, &config));
    }
}
