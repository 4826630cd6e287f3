//! Error types for the markup renderer

use thiserror::Error;

/// Result type alias for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing rendered output.
///
/// Rendering itself is infallible: every node shape has a defined output.
/// The only failure point is turning the finished byte stream into text,
/// which can fail when `Raw` content injected bytes that are not UTF-8.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Rendered bytes could not be decoded as text
    #[error("Decoding failed: {0}")]
    DecodingError(String),
}

/// Decode rendered bytes as UTF-8 text.
pub fn decode_utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| {
        Error::DecodingError(format!(
            "rendered output is not valid UTF-8 (valid up to byte {}): {}",
            e.utf8_error().valid_up_to(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_utf8() {
        let s = decode_utf8("héllo".as_bytes().to_vec()).unwrap();
        assert_eq!(s, "héllo");
    }

    #[test]
    fn decode_reports_offset_of_invalid_bytes() {
        let err = decode_utf8(vec![b'<', b'p', b'>', 0xff]).unwrap_err();
        let Error::DecodingError(msg) = err;
        assert!(msg.contains("valid up to byte 3"), "{}", msg);
    }
}
