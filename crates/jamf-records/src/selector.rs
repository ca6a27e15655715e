//! Selecting records by id or name, and reporting batch deletes.

use crate::error::JamfError;
use crate::record::{Record, RecordId};
use std::fmt;

/// How a caller refers to a record.
///
/// Strings made of digits (or `-1`) are read as ids, matching how ids are
/// typed on a command line. Use [`RecordSelector::name`] for a record whose
/// name happens to be numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordSelector {
    Id(RecordId),
    Name(String),
}

impl RecordSelector {
    pub fn parse(text: &str) -> Self {
        let digits = text.strip_prefix('-').unwrap_or(text);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = text.parse() {
                return RecordSelector::Id(id);
            }
        }
        RecordSelector::Name(text.to_string())
    }

    pub fn name(name: impl Into<String>) -> Self {
        RecordSelector::Name(name.into())
    }
}

impl fmt::Display for RecordSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSelector::Id(id) => write!(f, "id {}", id),
            RecordSelector::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

impl From<RecordId> for RecordSelector {
    fn from(id: RecordId) -> Self {
        RecordSelector::Id(id)
    }
}

impl From<i64> for RecordSelector {
    fn from(id: i64) -> Self {
        RecordSelector::Id(RecordId(id))
    }
}

impl From<&str> for RecordSelector {
    fn from(text: &str) -> Self {
        RecordSelector::parse(text)
    }
}

impl From<String> for RecordSelector {
    fn from(text: String) -> Self {
        RecordSelector::parse(&text)
    }
}

impl From<&Record> for RecordSelector {
    fn from(record: &Record) -> Self {
        RecordSelector::Id(record.id())
    }
}

/// Result of deleting one target in a batch.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub selector: RecordSelector,
    pub result: Result<RecordId, JamfError>,
}

/// Per-target results of [`crate::records::Records::delete`], in input order.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub outcomes: Vec<DeleteOutcome>,
}

impl DeleteReport {
    pub fn succeeded(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().copied())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&RecordSelector, &JamfError)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            Ok(_) => None,
            Err(err) => Some((&outcome.selector, err)),
        })
    }

    /// True when every target was deleted.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
