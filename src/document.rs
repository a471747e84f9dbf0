//! The shared document buffer and operation semantics: the part of the
//! system both a server-side apply pipeline and (aspirationally) a client
//! would need to agree on. See `OperationKind` for the three operation
//! shapes this server accepts.

use serde::{Deserialize, Serialize};

/// A mutable sequence of UTF-16 code units, matching a JavaScript string's
/// indexing semantics (operation positions are indices into that
/// sequence, not byte offsets and not Unicode scalar values).
#[derive(Debug, Clone, Default)]
pub struct Document {
    units: Vec<u16>,
}

impl Document {
    pub fn new(initial: &str) -> Self {
        Self {
            units: initial.encode_utf16().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn text(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    fn insert(&mut self, position: usize, content: &str) {
        let encoded: Vec<u16> = content.encode_utf16().collect();
        self.units.splice(position..position, encoded);
    }

    fn delete(&mut self, position: usize, length: usize) {
        self.units.drain(position..position + length);
    }
}

/// A tagged operation against a `Document`. `id` is an opaque string
/// assigned by the originator; `user_id`, `timestamp`, and `room_id` are
/// filled in by the server once the operation is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationKind {
    Insert { position: u32, content: String },
    Delete { position: u32, length: u32 },
    Retain { position: u32, length: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(flatten)]
    pub kind: OperationKind,
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub room_id: String,
}

/// A historical entry: an applied operation plus the time it was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub operation: Operation,
    pub applied_at: i64,
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid operation")]
    Invalid,
}

/// The result of a successful `apply`.
#[derive(Debug, Clone, Copy)]
pub struct ApplyOutcome {
    pub previous_length: usize,
    pub new_length: usize,
}

impl Operation {
    /// Pure predicate over `doc`: checks bounds without mutating `doc` or
    /// `self`.
    pub fn validate(&self, doc: &Document) -> Result<(), ValidationError> {
        let len = doc.len();
        match &self.kind {
            OperationKind::Insert { position, content } => {
                if *position as usize > len {
                    return Err(ValidationError::Invalid);
                }
                if content.is_empty() {
                    return Err(ValidationError::Invalid);
                }
            }
            OperationKind::Delete { position, length } => {
                if *position as usize > len {
                    return Err(ValidationError::Invalid);
                }
                if *length == 0 {
                    return Err(ValidationError::Invalid);
                }
                if *position as usize + *length as usize > len {
                    return Err(ValidationError::Invalid);
                }
            }
            OperationKind::Retain { position, length } => {
                if *position as usize > len {
                    return Err(ValidationError::Invalid);
                }
                if *length == 0 {
                    return Err(ValidationError::Invalid);
                }
            }
        }
        Ok(())
    }

    /// Apply `self` to `doc`. Caller must have already called `validate`
    /// against the same `doc` state; this does not re-validate. `retain`
    /// leaves the document untouched (it is a cursor-positioning no-op).
    pub fn apply(&self, doc: &mut Document) -> ApplyOutcome {
        let previous_length = doc.len();
        match &self.kind {
            OperationKind::Insert { position, content } => {
                doc.insert(*position as usize, content);
            }
            OperationKind::Delete { position, length } => {
                doc.delete(*position as usize, *length as usize);
            }
            OperationKind::Retain { .. } => {}
        }
        ApplyOutcome {
            previous_length,
            new_length: doc.len(),
        }
    }
}
