//! Canonical JSON encoding shared with the ledger.
//!
//! The ledger recomputes agreement identifiers from the bytes it receives, so
//! the encoding here is part of the wire contract and must not drift:
//!
//! - compact output, no whitespace between tokens;
//! - object keys in struct declaration order (serde's default for derived
//!   `Serialize`), never sorted or reordered;
//! - standard JSON escapes for `"`, `\` and control characters;
//! - additionally `<`, `>`, `&`, U+2028 and U+2029 are written as `\u003c`,
//!   `\u003e`, `\u0026`, `\u2028` and `\u2029`, matching the ledger's
//!   serializer.
//!
//! Everything else is emitted as raw UTF-8.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Compact formatter applying the ledger's extra string escapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerFormatter;

impl Formatter for LedgerFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(&fragment.as_bytes()[start..i])?;
            writer.write_all(escaped.as_bytes())?;
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serialize `value` to canonical JSON bytes.
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, LedgerFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(buf)
}

/// Serialize `value` to a canonical JSON string.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = to_canonical_vec(value)?;
    // The formatter only ever writes ASCII escapes or fragments of valid `str`s.
    String::from_utf8(bytes).map_err(|e| Error::Encode(e.to_string()))
}
