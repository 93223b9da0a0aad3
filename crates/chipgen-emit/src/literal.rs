//! Zig string literal safety.
//!
//! Database values are embedded in `"..."` literals. A quote, a backslash, or
//! a control character (including newline) would change or break the literal,
//! so each value passes through a [`LiteralPolicy`] first.

use std::borrow::Cow;
use std::fmt::Write as _;

use chipgen_core::LiteralPolicy;

use crate::error::{EmitError, Result};

/// The first character of `value` that cannot appear unescaped in a Zig string literal.
pub fn first_unsafe_char(value: &str) -> Option<char> {
    value
        .chars()
        .find(|&c| c == '"' || c == '\\' || c.is_control())
}

/// Escape `value` for a Zig string literal.
pub fn escape_zig(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(out, "\\x{byte:02x}");
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Render the body of a string literal for `value` under `policy`.
///
/// `chip` and `field` only label errors and warnings.
pub fn literal_body<'a>(
    policy: LiteralPolicy,
    chip: &str,
    field: &str,
    value: &'a str,
) -> Result<Cow<'a, str>> {
    let Some(found) = first_unsafe_char(value) else {
        return Ok(Cow::Borrowed(value));
    };
    match policy {
        LiteralPolicy::Reject => Err(EmitError::UnsafeLiteral {
            chip: chip.into(),
            field: field.into(),
            found,
        }),
        LiteralPolicy::Escape => Ok(Cow::Owned(escape_zig(value))),
        LiteralPolicy::Verbatim => {
            tracing::warn!(chip, field, ?found, "emitting value that breaks string literal syntax");
            Ok(Cow::Borrowed(value))
        }
    }
}
