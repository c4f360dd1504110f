//! JSON Pointer utilities (RFC 6901)
//!
//! Pointers are the only identity used across the graph and the IR:
//! - `#` is the document root
//! - segments escape `~` as `~0` and `/` as `~1`
//! - references coming from upstream bundlers may also be percent-encoded,
//!   so every read of a `$ref` goes through [`decode_uri`] once

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

use crate::error::{IrError, Result};

/// One step of a path into a JSON document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Object member name
    Name(String),
    /// Array index
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Segment {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Escape a single segment for use inside a pointer.
pub fn encode_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Split a pointer into unescaped segments. `#` and `""` yield an empty path.
pub fn pointer_to_path(pointer: &str) -> Vec<String> {
    let mut clean = pointer.trim();
    if let Some(rest) = clean.strip_prefix('#') {
        clean = rest;
    }
    if let Some(rest) = clean.strip_prefix('/') {
        clean = rest;
    }
    if clean.is_empty() {
        return Vec::new();
    }
    clean
        .split('/')
        .map(|part| part.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Join segments into a canonical pointer.
pub fn path_to_pointer(path: &[Segment]) -> String {
    let mut pointer = String::from("#");
    for segment in path {
        pointer.push('/');
        pointer.push_str(&encode_segment(&segment.to_string()));
    }
    pointer
}

/// Pointer of a direct child of `parent`.
pub fn child_pointer(parent: &str, segment: &Segment) -> String {
    format!("{}/{}", parent, encode_segment(&segment.to_string()))
}

/// Canonical form: leading `#`, no repeated or trailing slashes.
pub fn normalize_pointer(pointer: &str) -> String {
    let trimmed = pointer.trim();
    let mut normalized = String::with_capacity(trimmed.len() + 1);
    if !trimmed.starts_with('#') {
        normalized.push('#');
    }
    let mut previous_slash = false;
    for ch in trimmed.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(ch);
    }
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Characters `decodeURI` leaves escaped.
const URI_RESERVED: &[u8] = b";/?:@&=+$,#";

/// Percent-decode everything except URI-reserved characters.
///
/// Malformed escapes or sequences that are not UTF-8 leave the input as is.
pub fn decode_uri(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            decoded.push(bytes[i]);
            i += 1;
            continue;
        }
        let escape = bytes
            .get(i + 1)
            .zip(bytes.get(i + 2))
            .and_then(|(&hi, &lo)| Some(hex_value(hi)? * 16 + hex_value(lo)?));
        let Some(byte) = escape else {
            return Cow::Borrowed(input);
        };
        if URI_RESERVED.contains(&byte) {
            decoded.extend_from_slice(&bytes[i..i + 3]);
        } else {
            decoded.push(byte);
        }
        i += 3;
    }

    match String::from_utf8(decoded) {
        Ok(s) => Cow::Owned(s),
        Err(_) => Cow::Borrowed(input),
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decode a `$ref` and bring it into canonical pointer form.
pub fn canonical_ref(reference: &str) -> String {
    let decoded = decode_uri(reference);
    let segments: Vec<Segment> = pointer_to_path(&decoded)
        .into_iter()
        .map(Segment::Name)
        .collect();
    path_to_pointer(&segments)
}

/// Reusable component name from a `$ref` (last segment, decoded).
pub fn ref_to_name(reference: &str) -> String {
    let path = pointer_to_path(reference);
    let name = path.last().map(String::as_str).unwrap_or_default();
    decode_uri(name).into_owned()
}

/// Whether `reference` names a whole reusable component.
///
/// - 3.x: `#/components/{type}/{name}`
/// - 2.0: `#/definitions/{name}`
///
/// Deeper pointers have no registered component and get inlined.
pub fn is_top_level_component(reference: &str) -> bool {
    let path = pointer_to_path(reference);
    match path.first().map(String::as_str) {
        Some("components") => path.len() == 3,
        Some("definitions") => path.len() == 2,
        _ => false,
    }
}

/// Walk `reference` through `root`.
pub fn resolve<'a>(root: &'a Value, reference: &str) -> Result<&'a Value> {
    let decoded = decode_uri(reference);
    let mut current = root;
    for part in pointer_to_path(&decoded) {
        let next = match current {
            Value::Object(map) => map.get(&part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| IrError::ReferenceNotFound(reference.to_string()))?;
    }
    Ok(current)
}
