//! Streaming delivery of rendered output.
//!
//! Two mechanisms, with different guarantees:
//!
//! - **Chunked** ([`stream_chunked`]): the ordinary synchronous renderer runs
//!   on a blocking worker and writes through a [`ChunkBuffer`] whose chunks
//!   are forwarded to an unbounded channel. Output starts flowing before the
//!   render finishes, but a slow consumer lets chunks pile up in the channel.
//! - **Backpressured** ([`stream_backpressured`]): an async renderer runs as a
//!   task and sends each chunk over a channel with capacity one. The task is
//!   suspended until the consumer takes the chunk, so memory stays bounded by
//!   the chunk size for the whole render. Dropping the stream aborts the task.

pub mod chunk;

#[cfg(feature = "stream")]
mod channel;

pub use chunk::{ChunkBuffer, DEFAULT_CHUNK_SIZE};

#[cfg(feature = "stream")]
pub use self::streams::*;

#[cfg(feature = "stream")]
mod streams {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures::Stream;
    use log::debug;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};

    use super::channel::{render_document_async, render_fragment_async, ChannelWriter};
    use super::chunk::ChunkBuffer;
    use crate::context::RenderContext;
    use crate::document::Document;
    use crate::node::Node;
    use crate::render::render;
    use crate::RenderConfig;

    /// Chunks produced by [`stream_chunked`].
    ///
    /// The render runs to completion on a blocking worker even if this stream
    /// is dropped early; chunks sent after that are discarded.
    pub struct ChunkStream {
        inner: UnboundedReceiverStream<Vec<u8>>,
        _worker: JoinHandle<()>,
    }

    impl Stream for ChunkStream {
        type Item = Vec<u8>;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Pin::new(&mut self.get_mut().inner).poll_next(cx)
        }
    }

    /// Chunks produced by [`stream_backpressured`]. Dropping it cancels the
    /// render task.
    pub struct BackpressuredStream {
        inner: ReceiverStream<Vec<u8>>,
        task: JoinHandle<()>,
    }

    impl BackpressuredStream {
        /// Whether the producer task has finished (completed or cancelled).
        pub fn is_finished(&self) -> bool {
            self.task.is_finished()
        }
    }

    impl Stream for BackpressuredStream {
        type Item = Vec<u8>;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Pin::new(&mut self.get_mut().inner).poll_next(cx)
        }
    }

    impl Drop for BackpressuredStream {
        fn drop(&mut self) {
            if !self.task.is_finished() {
                debug!("backpressured stream dropped; aborting render task");
                self.task.abort();
            }
        }
    }

    fn spawn_chunked<R>(config: RenderConfig, render_with: R) -> ChunkStream
    where
        R: FnOnce(&mut ChunkBuffer<Box<dyn FnMut(&[u8]) + Send>>, &RenderConfig) + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let worker = tokio::task::spawn_blocking(move || {
            let emit: Box<dyn FnMut(&[u8]) + Send> = Box::new(move |chunk: &[u8]| {
                if tx.send(chunk.to_vec()).is_err() {
                    // Consumer is gone; the render still runs to completion.
                    log::trace!("dropping chunk of {} bytes", chunk.len());
                }
            });
            let mut sink = ChunkBuffer::new(config.chunk_size, emit);
            render_with(&mut sink, &config);
            sink.flush_remaining();
            debug!("chunked render finished: {} chunks", sink.chunks_emitted());
        });
        ChunkStream {
            inner: UnboundedReceiverStream::new(rx),
            _worker: worker,
        }
    }

    /// Render a document on a blocking worker, streaming `config.chunk_size`
    /// chunks as they fill. Must be called from within a tokio runtime.
    pub fn stream_chunked(document: Document, config: RenderConfig) -> ChunkStream {
        spawn_chunked(config, move |sink, config| {
            document.render_into(sink, config);
        })
    }

    /// Fragment variant of [`stream_chunked`].
    pub fn stream_fragment_chunked(node: Node, config: RenderConfig) -> ChunkStream {
        spawn_chunked(config, move |sink, config| {
            let mut ctx = RenderContext::new(config);
            render(&node, sink, &mut ctx);
        })
    }

    /// Render a document as an async task with real backpressure. Must be
    /// called from within a tokio runtime.
    pub fn stream_backpressured(document: Document, config: RenderConfig) -> BackpressuredStream {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(1);
        let task = tokio::spawn(async move {
            let mut out = ChannelWriter::new(tx, config.chunk_size);
            if render_document_async(&document, &mut out, &config).await.is_err() {
                debug!("stream consumer went away; document render cancelled");
            }
        });
        BackpressuredStream {
            inner: ReceiverStream::new(rx),
            task,
        }
    }

    /// Fragment variant of [`stream_backpressured`].
    pub fn stream_fragment_backpressured(node: Node, config: RenderConfig) -> BackpressuredStream {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(1);
        let task = tokio::spawn(async move {
            let mut out = ChannelWriter::new(tx, config.chunk_size);
            if render_fragment_async(&node, &mut out, &config).await.is_err() {
                debug!("stream consumer went away; fragment render cancelled");
            }
        });
        BackpressuredStream {
            inner: ReceiverStream::new(rx),
            task,
        }
    }

    #[cfg(test)]
    mod tests {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        use futures::StreamExt;

        use super::*;

        struct SetOnDrop(Arc<AtomicBool>);

        impl Drop for SetOnDrop {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        #[tokio::test]
        async fn dropping_stream_aborts_pending_send() {
            let dropped = Arc::new(AtomicBool::new(false));
            let (tx, rx) = mpsc::channel::<Vec<u8>>(1);
            let guard = SetOnDrop(dropped.clone());
            let task = tokio::spawn(async move {
                let _guard = guard;
                loop {
                    if tx.send(vec![0u8; 8]).await.is_err() {
                        break;
                    }
                }
            });
            let mut stream = BackpressuredStream {
                inner: ReceiverStream::new(rx),
                task,
            };
            assert_eq!(stream.next().await, Some(vec![0u8; 8]));
            assert!(!stream.is_finished());

            drop(stream);
            for _ in 0..10 {
                if dropped.load(Ordering::SeqCst) {
                    break;
                }
                tokio::task::yield_now().await;
            }
            assert!(dropped.load(Ordering::SeqCst));
        }

        #[tokio::test]
        async fn fragment_stream_respects_chunk_size() {
            let config = RenderConfig {
                chunk_size: 3,
                ..Default::default()
            };
            let node = Node::element("p", "hello world");
            let chunks: Vec<Vec<u8>> = stream_fragment_backpressured(node, config).collect().await;
            assert_eq!(chunks.concat(), b"<p>hello world</p>".to_vec());
            assert!(chunks.iter().all(|c| c.len() <= 3));
        }
    }
}
