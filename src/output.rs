/// Byte sinks the renderer writes into.
///
/// The renderer never needs to read back what it wrote, so a sink only has to
/// accept bytes. `Vec<u8>` is the batch sink; the streaming module provides
/// chunking sinks on top of the same trait.
pub trait Output {
    /// Append a run of bytes.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Append a single byte.
    fn write_byte(&mut self, byte: u8) {
        self.write_bytes(&[byte]);
    }

    /// Append UTF-8 text.
    fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

impl Output for Vec<u8> {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

impl<O: Output + ?Sized> Output for &mut O {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) {
        (**self).write_bytes(bytes);
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_appends() {
        let mut buf = Vec::new();
        buf.write_str("<p");
        buf.write_byte(b'>');
        buf.write_bytes(b"x");
        assert_eq!(buf, b"<p>x");
    }
}
