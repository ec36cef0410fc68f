//! Escaping arbitrary bytes for a double-quoted C string literal.
//!
//! The output is printable ASCII only and never contains a raw newline, carriage
//! return, tab, backslash, double quote or NUL. Every byte expands to at most four
//! output characters.

use crate::error::{ConvertError, ConvertErrorKind};

/// Script bytes escaped for embedding between double quotes in C source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapedLiteral(String);

impl EscapedLiteral {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn escape_bytes(bytes: &[u8]) -> Result<EscapedLiteral, ConvertError> {
    let mut out = String::new();
    reserve(&mut out, bytes.len())?;
    for (i, &b) in bytes.iter().enumerate() {
        reserve(&mut out, 4)?;
        push_escaped(&mut out, b, bytes.get(i + 1).copied());
    }
    Ok(EscapedLiteral(out))
}

/// Escapes short byte strings (file names, paths) with the same policy as
/// [`escape_bytes`].
pub fn escape_to_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for (i, &b) in bytes.iter().enumerate() {
        push_escaped(&mut out, b, bytes.get(i + 1).copied());
    }
    out
}

fn reserve(out: &mut String, additional: usize) -> Result<(), ConvertError> {
    out.try_reserve(additional).map_err(|err| {
        ConvertError::new(
            ConvertErrorKind::EscapeFailure,
            format!("failed to grow escape buffer by {additional} bytes: {err}"),
        )
    })
}

fn push_escaped(out: &mut String, b: u8, next: Option<u8>) {
    match b {
        b'\n' => out.push_str("\\n"),
        b'\r' => out.push_str("\\r"),
        b'\t' => out.push_str("\\t"),
        b'\\' => out.push_str("\\\\"),
        b'"' => out.push_str("\\\""),
        // `\0` followed by an octal digit would be read as a longer octal escape.
        0 if matches!(next, Some(b'0'..=b'7')) => out.push_str("\\000"),
        0 => out.push_str("\\0"),
        0x20..=0x7E => out.push(b as char),
        _ => push_octal(out, b),
    }
}

fn push_octal(out: &mut String, b: u8) {
    out.push('\\');
    out.push((b'0' + (b >> 6)) as char);
    out.push((b'0' + ((b >> 3) & 0o7)) as char);
    out.push((b'0' + (b & 0o7)) as char);
}
