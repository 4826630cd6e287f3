//! Fixed-size chunking sink.

use log::trace;

use crate::output::Output;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Accumulates written bytes and hands complete `chunk_size`-byte slices to a
/// callback, keeping only the remainder buffered.
///
/// Each flush walks the buffer with an offset and removes the emitted prefix
/// with a single `drain`, so flushing stays linear in the bytes written.
pub struct ChunkBuffer<F: FnMut(&[u8])> {
    buf: Vec<u8>,
    chunk_size: usize,
    emit: F,
    chunks_emitted: usize,
}

impl<F: FnMut(&[u8])> ChunkBuffer<F> {
    /// A `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize, emit: F) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            buf: Vec::with_capacity(chunk_size.saturating_mul(2)),
            chunk_size,
            emit,
            chunks_emitted: 0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes written but not yet emitted.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn chunks_emitted(&self) -> usize {
        self.chunks_emitted
    }

    fn flush_full_chunks(&mut self) {
        let mut offset = 0;
        while self.buf.len() - offset >= self.chunk_size {
            (self.emit)(&self.buf[offset..offset + self.chunk_size]);
            offset += self.chunk_size;
            self.chunks_emitted += 1;
        }
        if offset > 0 {
            self.buf.drain(..offset);
            trace!("flushed {} bytes, {} buffered", offset, self.buf.len());
        }
    }

    /// Emit whatever is left, even if shorter than a full chunk.
    pub fn flush_remaining(&mut self) {
        self.flush_full_chunks();
        if !self.buf.is_empty() {
            (self.emit)(&self.buf);
            self.chunks_emitted += 1;
            self.buf.clear();
        }
    }
}

impl<F: FnMut(&[u8])> Output for ChunkBuffer<F> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() >= self.chunk_size {
            self.flush_full_chunks();
        }
    }
}
