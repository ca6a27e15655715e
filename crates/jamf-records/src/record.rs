//! # Records
//!
//! A [`Record`] is one server-side entity: an id, a display name, and up to
//! two copies of its body.
//!
//! | Copy      | Meaning                                                       |
//! |-----------|---------------------------------------------------------------|
//! | `cached`  | last body the server confirmed; only replaced on fetch/save   |
//! | `working` | the copy edits go to; starts as a deep copy of `cached`       |
//!
//! Both are `None` until the body is first needed, because a listing only
//! carries ids and names. Fetching a few thousand computers one by one is
//! slow, so nothing loads a body unless asked.
//!
//! ## States
//!
//! ```text
//! Listed ──load──▶ Synced ◀──save── Modified
//!                    │  ──edit──▶     │
//!                    └──delete/gone──▶ Detached ◀──┘
//! ```
//!
//! Mutating operations live on [`crate::records::RecordHandle`], which keeps
//! the parent collection's indices in step.

use crate::path::PathQuery;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RecordId)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Known from the listing; body not fetched yet
    Listed,
    /// Working copy equals the cached copy
    Synced,
    /// Working copy has unsaved edits
    Modified,
    /// Deleted, or found missing on the server
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    name: String,
    cached: Option<Value>,
    working: Option<Value>,
    detached: bool,
}

impl Record {
    pub(crate) fn listed(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cached: None,
            working: None,
            detached: false,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RecordState {
        if self.detached {
            RecordState::Detached
        } else if self.cached.is_none() {
            RecordState::Listed
        } else if self.is_modified() {
            RecordState::Modified
        } else {
            RecordState::Synced
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }

    /// True when the working copy differs from the cached copy.
    pub fn is_modified(&self) -> bool {
        self.working != self.cached
    }

    pub fn cached(&self) -> Option<&Value> {
        self.cached.as_ref()
    }

    pub fn working(&self) -> Option<&Value> {
        self.working.as_ref()
    }

    /// Evaluate a query against the working copy; empty when not loaded.
    pub fn get_path(&self, query: &PathQuery) -> Vec<&Value> {
        self.working
            .as_ref()
            .map(|data| query.select(data))
            .unwrap_or_default()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Replace both copies with freshly fetched data.
    pub(crate) fn load(&mut self, data: Value) {
        self.cached = Some(data.clone());
        self.working = Some(data);
    }

    pub(crate) fn working_mut(&mut self) -> Option<&mut Value> {
        self.working.as_mut()
    }

    /// Discard local edits.
    pub(crate) fn revert(&mut self) {
        self.working = self.cached.clone();
    }

    pub(crate) fn detach(mut self) -> Self {
        self.detached = true;
        self
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Make every string in `data` safe to send as XML 1.0 text.
///
/// Line endings become `\n`; control characters other than tab and newline
/// are dropped, as are the non-characters U+FFFE and U+FFFF.
pub fn encode_text(data: &mut Value) {
    data.for_each_string_mut(&mut |s: &mut String| {
        if s.chars().any(needs_encoding) {
            *s = s
                .replace("\r\n", "\n")
                .replace('\r', "\n")
                .chars()
                .filter(|c| allowed_in_xml(*c))
                .collect();
        }
    });
}

fn needs_encoding(c: char) -> bool {
    c == '\r' || !allowed_in_xml(c)
}

fn allowed_in_xml(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{FFFE}' | '\u{FFFF}' => false,
        c => c >= ' ',
    }
}
