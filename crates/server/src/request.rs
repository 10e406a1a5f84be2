//! Request classification and response status bytes.
//!
//! A frame is a single read of up to [`FRAME_SIZE`] bytes, interpreted
//! best-effort as one request:
//!
//! ```text
//! {<record>}            create — server allocates the id
//! {@<id> <record>}      update — record part brace-wrapped or bare
//! <uuid>                read   — bare 36-byte UUID, no braces
//! ```
//!
//! Anything else — unbalanced braces, a read id of the wrong shape, or an
//! embedded newline (which must never reach the WAL) — is malformed.

use record::Record;

/// Maximum request frame size; one `read` per frame.
pub const FRAME_SIZE: usize = 1024;

/// Canonical UUID string length (`8-4-4-4-12`).
pub const ID_LEN: usize = 36;

/// Single-byte response statuses (ASCII digits, no newline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Read of an id nothing has ever been written to.
    UnknownId,
    /// Malformed frame or unparseable id.
    Malformed,
    /// Structurally valid request whose execution failed downstream.
    Rejected,
}

impl Status {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::UnknownId => "0",
            Status::Malformed => "1",
            Status::Rejected => "2",
        }
    }
}

/// One classified request frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Create(Record),
    Update { id: String, fields: Record },
    Read { id: String },
}

/// Classifies a raw frame; `None` means malformed.
#[must_use]
pub fn classify(frame: &[u8]) -> Option<Request> {
    let text = std::str::from_utf8(frame).ok()?;
    if text.contains('\n') {
        return None;
    }

    if let Some(inner) = text.strip_prefix("{@") {
        let inner = inner.strip_suffix('}')?;
        let (id, record_part) = inner.split_once(' ')?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        return Some(Request::Update {
            id: id.to_string(),
            fields: Record::parse(record_part),
        });
    }

    if text.starts_with('{') {
        text.strip_suffix('}')?;
        return Some(Request::Create(Record::parse(text)));
    }

    if is_uuid(text) {
        return Some(Request::Read {
            id: text.to_string(),
        });
    }
    None
}

/// Canonical UUID shape: 36 bytes, hyphens at 8/13/18/23, hex elsewhere.
fn is_uuid(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != ID_LEN {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ID: &str = "6e88d1ce-ddd4-4a97-8e96-29a00adfc8a1";

    #[test]
    fn create_frame() {
        let req = classify(br#"{name:"Alice"}"#).unwrap();
        match req {
            Request::Create(fields) => {
                assert_eq!(fields.get("name").unwrap().value, "Alice");
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn update_frame_with_bare_fields() {
        let frame = format!("{{@{SAMPLE_ID} address@2:\"Wonderland\"}}");
        let req = classify(frame.as_bytes()).unwrap();
        match req {
            Request::Update { id, fields } => {
                assert_eq!(id, SAMPLE_ID);
                assert_eq!(fields.get("address").unwrap().version, 2);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn update_frame_with_braced_record() {
        let frame = format!("{{@{SAMPLE_ID} {{a:1 b:2}}}}");
        let req = classify(frame.as_bytes()).unwrap();
        match req {
            Request::Update { fields, .. } => assert_eq!(fields.len(), 2),
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn read_frame_is_a_bare_uuid() {
        let req = classify(SAMPLE_ID.as_bytes()).unwrap();
        assert_eq!(
            req,
            Request::Read {
                id: SAMPLE_ID.to_string()
            }
        );
    }

    #[test]
    fn missing_close_brace_is_malformed() {
        assert!(classify(br#"{name:"Alice""#).is_none());
    }

    #[test]
    fn read_id_of_the_wrong_shape_is_malformed() {
        assert!(classify(b"not-a-uuid").is_none());
        assert!(classify(b"6e88d1ce").is_none());
        // Right length, wrong hyphen placement.
        assert!(classify(b"6e88d1cedddd44a978e9629a00adfc8a1--x").is_none());
    }

    #[test]
    fn embedded_newline_is_malformed() {
        assert!(classify(b"{a:1\n}").is_none());
        let frame = format!("{SAMPLE_ID}\n");
        assert!(classify(frame.as_bytes()).is_none());
    }

    #[test]
    fn update_without_id_is_malformed() {
        assert!(classify(b"{@ x:1}").is_none());
        assert!(classify(b"{@}").is_none());
    }

    #[test]
    fn empty_create_record_is_accepted() {
        assert_eq!(classify(b"{}").unwrap(), Request::Create(Record::new()));
    }
}
