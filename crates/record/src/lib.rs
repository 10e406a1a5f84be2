//! # Record — field-versioned records and their merge algebra
//!
//! A record is an ordered mapping of field names to versioned values. Each
//! field carries its own monotonic version, and concurrent or repeated
//! updates to the same record are reconciled per field: the higher version
//! wins, and equal versions are broken in favour of the newer write.
//!
//! ## Textual form
//!
//! ```text
//! {address@2:"Wonderland" name:"Alice" note:"has spaces"}
//! ```
//!
//! Fields are separated by a single space and rendered in ascending name
//! order. The `@ver` suffix is omitted when the version is 1 (the default).
//! Quotes are stripped on parse and values are always re-quoted on
//! serialization, so quoted values — spaces and braces included — survive
//! a round trip byte for byte.
//!
//! ## Leniency
//!
//! Parsing never fails. A malformed fragment (missing colon, unterminated
//! quote, version overflow) contributes nothing and the scanner moves on to
//! the next field, so bad input degrades to a smaller — possibly empty —
//! field set.

use std::collections::BTreeMap;
use std::fmt;

/// The implicit version of a field written without an `@ver` suffix.
pub const DEFAULT_VERSION: u32 = 1;

/// A single field's state: its per-field version and its value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub version: u32,
    pub value: String,
}

impl FieldValue {
    pub fn new(version: u32, value: impl Into<String>) -> Self {
        Self {
            version,
            value: value.into(),
        }
    }
}

/// An ordered mapping of field names to [`FieldValue`]s.
///
/// The map is kept sorted by field name so that serialization is
/// deterministic and ascending, which in turn keeps SST payloads and WAL
/// entries byte-stable for identical logical content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the textual record form, with or without the outer braces.
    ///
    /// Field names match `[A-Za-z0-9_]+`. A value is either a double-quoted
    /// string (quotes stripped, no escape processing) or a bare run of
    /// characters up to whitespace or `}`. Duplicate field names within one
    /// input: the last occurrence wins.
    pub fn parse(input: &str) -> Record {
        let mut content = input.trim();
        if let Some(stripped) = content.strip_prefix('{') {
            content = stripped.strip_suffix('}').unwrap_or(stripped);
        }

        let bytes = content.as_bytes();
        let mut fields = BTreeMap::new();
        let mut pos = 0;
        while pos < bytes.len() {
            if bytes[pos] == b' ' {
                pos += 1;
                continue;
            }
            match parse_field(content, pos) {
                Some((name, fv, next)) => {
                    fields.insert(name, fv);
                    pos = next;
                }
                // Malformed fragment: resume at the next space, if any.
                None => match bytes[pos..].iter().position(|&b| b == b' ') {
                    Some(off) => pos += off + 1,
                    None => break,
                },
            }
        }

        Record { fields }
    }

    /// Version-dominant merge with `newer` as the right operand.
    ///
    /// Fields present on only one side are copied. Fields present on both
    /// keep the strictly greater version; when the versions are equal the
    /// right operand (`newer`) wins, so callers must put the more recent
    /// write on the right.
    ///
    /// Idempotent, associative, and commutative whenever no versions tie.
    pub fn merge(&mut self, newer: &Record) {
        for (name, fv) in &newer.fields {
            match self.fields.get(name) {
                Some(existing) if existing.version > fv.version => {}
                _ => {
                    self.fields.insert(name.clone(), fv.clone());
                }
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, fv: FieldValue) {
        self.fields.insert(name.into(), fv);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Iterates fields in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The serialized field list without the outer braces.
    ///
    /// This is the form stored in SST payload blocks; [`fmt::Display`]
    /// wraps it in braces for the wire and the WAL.
    #[must_use]
    pub fn body(&self) -> String {
        let mut out = String::new();
        for (name, fv) in &self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(name);
            if fv.version != DEFAULT_VERSION {
                out.push('@');
                out.push_str(&fv.version.to_string());
            }
            out.push(':');
            out.push('"');
            out.push_str(&fv.value);
            out.push('"');
        }
        out
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.body())
    }
}

/// A record bound to its key, in the WAL entry form `{@<id> <record>}`.
///
/// The key is treated as an opaque printable byte string; uniqueness and
/// shape are the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedRecord {
    pub key: String,
    pub fields: Record,
}

impl KeyedRecord {
    pub fn new(key: impl Into<String>, fields: Record) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }

    /// Parses one WAL entry line. The record part may be brace-wrapped
    /// (`{@id {f:v}}`) or bare (`{@id f:v}`).
    pub fn parse(line: &str) -> Option<KeyedRecord> {
        let inner = line
            .trim_end_matches('\n')
            .strip_prefix("{@")?
            .strip_suffix('}')?;
        let (key, rest) = inner.split_once(' ')?;
        if key.is_empty() {
            return None;
        }
        Some(KeyedRecord {
            key: key.to_string(),
            fields: Record::parse(rest),
        })
    }
}

impl fmt::Display for KeyedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{@{} {}}}", self.key, self.fields)
    }
}

/// Scans one `field[@ver]:value` triple starting at `pos`.
///
/// Returns the parsed field and the position just past it, or `None` when
/// the fragment is malformed.
fn parse_field(content: &str, mut pos: usize) -> Option<(String, FieldValue, usize)> {
    let bytes = content.as_bytes();

    let name_start = pos;
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
        pos += 1;
    }
    if pos == name_start {
        return None;
    }
    let name = content[name_start..pos].to_string();

    let mut version = DEFAULT_VERSION;
    if pos < bytes.len() && bytes[pos] == b'@' {
        pos += 1;
        let ver_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == ver_start {
            return None;
        }
        version = content[ver_start..pos].parse().ok()?;
    }

    if pos >= bytes.len() || bytes[pos] != b':' {
        return None;
    }
    pos += 1;

    let value = if pos < bytes.len() && bytes[pos] == b'"' {
        pos += 1;
        let val_start = pos;
        while pos < bytes.len() && bytes[pos] != b'"' {
            pos += 1;
        }
        if pos >= bytes.len() {
            // Unterminated quote: the rest of the input is unusable.
            return None;
        }
        let val = content[val_start..pos].to_string();
        pos += 1;
        val
    } else {
        let val_start = pos;
        while pos < bytes.len() && bytes[pos] != b' ' && bytes[pos] != b'}' {
            pos += 1;
        }
        if pos == val_start {
            return None;
        }
        content[val_start..pos].to_string()
    };

    Some((name, FieldValue { version, value }, pos))
}

#[cfg(test)]
mod tests;
