//! Byte-level HTML escaping for text content and attribute values.
//!
//! Text content escapes `&`, `<` and `>`. Attribute values additionally
//! escape both quote characters. All other bytes, including multi-byte UTF-8
//! sequences, pass through untouched, so escaping works directly on bytes.

use crate::output::Output;

const fn byte_table(special: &[u8]) -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < special.len() {
        table[special[i] as usize] = true;
        i += 1;
    }
    table
}

static TEXT_SPECIAL: [bool; 256] = byte_table(b"&<>");
static ATTRIBUTE_SPECIAL: [bool; 256] = byte_table(b"&<>\"'");

#[inline]
fn entity(byte: u8) -> &'static [u8] {
    match byte {
        b'&' => b"&amp;",
        b'<' => b"&lt;",
        b'>' => b"&gt;",
        b'"' => b"&quot;",
        b'\'' => b"&#39;",
        _ => unreachable!("byte {byte:#04x} has no entity"),
    }
}

/// Copy `bytes` to `out`, substituting entities for every byte flagged in
/// `table`. Unescaped runs are copied in bulk.
fn escape_with(table: &[bool; 256], bytes: &[u8], out: &mut impl Output) {
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if table[b as usize] {
            if start < i {
                out.write_bytes(&bytes[start..i]);
            }
            out.write_bytes(entity(b));
            start = i + 1;
        }
    }
    if start < bytes.len() {
        out.write_bytes(&bytes[start..]);
    }
}

/// Escape text content.
pub fn escape_text(bytes: &[u8], out: &mut impl Output) {
    escape_with(&TEXT_SPECIAL, bytes, out);
}

/// Whether an attribute value contains any byte that must be escaped.
#[inline]
pub fn attribute_needs_escaping(bytes: &[u8]) -> bool {
    bytes.iter().any(|&b| ATTRIBUTE_SPECIAL[b as usize])
}

/// Escape an attribute value.
///
/// Values with nothing to escape are copied in one write; this is the common
/// case for class lists, ids and URLs.
pub fn escape_attribute(bytes: &[u8], out: &mut impl Output) {
    if !attribute_needs_escaping(bytes) {
        out.write_bytes(bytes);
        return;
    }
    escape_attribute_slow(bytes, out);
}

/// Per-byte attribute escaping, bypassing the bulk-copy check.
pub fn escape_attribute_slow(bytes: &[u8], out: &mut impl Output) {
    escape_with(&ATTRIBUTE_SPECIAL, bytes, out);
}

/// Convenience wrapper returning escaped text as a `String`.
pub fn escape_text_string(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    escape_text(s.as_bytes(), &mut out);
    // Only ASCII bytes are replaced, with ASCII entities.
    String::from_utf8(out).unwrap_or_default()
}
