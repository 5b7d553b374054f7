//! Recovery pass for responses with unescaped control characters.
//!
//! Some daemons emit tracker announce/scrape URLs and last-result messages
//! verbatim, including raw control characters that strict JSON forbids. The
//! parser here tries the strict path first and, on failure, percent-encodes
//! every string literal that fails to round-trip, re-parses, and finally
//! percent-decodes exactly the values it repaired so callers always see the
//! original text.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{RpcError, RpcResult};

/// Parse a response body, tolerating unescaped control characters inside
/// string literals.
///
/// # Errors
///
/// Returns [`RpcError::Parse`] when the body fails strict parsing and the
/// repair pass cannot make it parse either.
pub fn parse(body: &str) -> RpcResult<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(value),
        Err(strict_failure) => {
            let (repaired, markers) = encode_broken_literals(body);
            if markers.is_empty() {
                return Err(RpcError::Parse {
                    source: strict_failure,
                });
            }
            let mut value: Value = serde_json::from_str(&repaired)
                .map_err(|source| RpcError::Parse { source })?;
            decode_marked(&mut value, &markers);
            Ok(value)
        }
    }
}

/// Rewrite string literals containing raw control characters, returning the
/// repaired document and the parsed form of every literal that was touched.
fn encode_broken_literals(body: &str) -> (String, HashSet<String>) {
    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len());
    let mut markers = HashSet::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'"' {
            // Outside a literal; copy the full UTF-8 character.
            let ch_len = utf8_len(bytes[i]);
            out.push_str(&body[i..i + ch_len]);
            i += ch_len;
            continue;
        }
        let start = i + 1;
        let mut j = start;
        let mut broken = false;
        while j < bytes.len() {
            match bytes[j] {
                b'\\' => j += 2,
                b'"' => break,
                control if control < 0x20 => {
                    broken = true;
                    j += 1;
                }
                _ => j += 1,
            }
        }
        if j >= bytes.len() {
            // Unterminated literal; leave it for the parser to reject.
            out.push_str(&body[i..]);
            break;
        }
        let raw = &body[start..j];
        out.push('"');
        if broken {
            let encoded = percent_encode(raw);
            if let Ok(parsed) = serde_json::from_str::<String>(&format!("\"{encoded}\"")) {
                markers.insert(parsed);
            }
            out.push_str(&encoded);
        } else {
            out.push_str(raw);
        }
        out.push('"');
        i = j + 1;
    }
    (out, markers)
}

const fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

/// Percent-encode control bytes and `%` itself so the decode step is
/// lossless; all other bytes pass through untouched.
fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for &byte in raw.as_bytes() {
        if byte < 0x20 || byte == b'%' {
            out.push_str(&format!("%{byte:02X}"));
        } else {
            // Multi-byte sequences survive byte-wise because only ASCII
            // bytes are rewritten.
            out.push(byte as char);
        }
    }
    out
}

fn percent_decode(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_value),
                bytes.get(i + 2).copied().and_then(hex_value),
            )
        {
            out.push(hi * 16 + lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn decode_marked(value: &mut Value, markers: &HashSet<String>) {
    match value {
        Value::String(text) => {
            if markers.contains(text.as_str()) {
                *text = percent_decode(text);
            }
        }
        Value::Array(items) => {
            for item in items {
                decode_marked(item, markers);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                decode_marked(item, markers);
            }
        }
        _ => {}
    }
}
