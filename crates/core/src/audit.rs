//! Audit trail carried by every entity: who last edited it, and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::PersonId;

/// Last-edited metadata. Re-stamped by every successful mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    last_edited_by: PersonId,
    last_edited_when: DateTime<Utc>,
}

impl AuditStamp {
    /// Stamp an edit made now by `editor`.
    pub fn now(editor: PersonId) -> Self {
        Self::at(editor, Utc::now())
    }

    /// Stamp with an explicit time (used when restoring stored records).
    pub fn at(editor: PersonId, when: DateTime<Utc>) -> Self {
        Self {
            last_edited_by: editor,
            last_edited_when: when,
        }
    }

    pub fn last_edited_by(&self) -> PersonId {
        self.last_edited_by
    }

    pub fn last_edited_when(&self) -> DateTime<Utc> {
        self.last_edited_when
    }

    pub fn touch(&mut self, editor: PersonId) {
        *self = Self::now(editor);
    }
}
