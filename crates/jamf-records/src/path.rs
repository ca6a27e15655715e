//! # Path Queries
//!
//! A path query walks a record body one segment at a time:
//!
//! ```text
//! general/name
//! location/[building==BIOL]
//! scope/computer_groups/computer_group/[name==Lab Macs]/id
//! ```
//!
//! ## Segments
//!
//! | Segment        | On a map                          | On a list                                 |
//! |----------------|-----------------------------------|-------------------------------------------|
//! | `key`          | descend into `key`                | apply to every element, flatten results   |
//! | `[key==value]` | keep the map if `key` == `value`  | keep elements whose `key` == `value`      |
//!
//! Filters on a map exist because the server collapses one-element lists
//! into a bare element; a filter behaves the same either way. Comparisons use
//! [`Value::as_text`], so `[is_smart==true]` matches a boolean or the string.
//!
//! Evaluation never fails: missing keys and shape mismatches just select
//! nothing. Only *parsing* fails, with [`JamfError::InvalidPath`].

use crate::error::{JamfError, Result};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Filter { key: String, value: String },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Filter { key, value } => write!(f, "[{}=={}]", key, value),
        }
    }
}

impl Segment {
    fn filter_matches(key: &str, expected: &str, node: &Value) -> bool {
        node.get(key)
            .and_then(Value::as_text)
            .is_some_and(|text| text == expected)
    }

    fn step<'a>(&self, node: &'a Value, out: &mut Vec<&'a Value>) {
        match (self, node) {
            (Segment::Key(key), Value::Map(map)) => {
                if let Some(child) = map.get(key) {
                    out.push(child);
                }
            }
            (Segment::Key(_), Value::List(items)) => {
                for item in items {
                    self.step(item, out);
                }
            }
            (Segment::Filter { key, value }, Value::List(items)) => {
                out.extend(
                    items
                        .iter()
                        .filter(|item| Self::filter_matches(key, value, item)),
                );
            }
            (Segment::Filter { key, value }, Value::Map(_)) => {
                if Self::filter_matches(key, value, node) {
                    out.push(node);
                }
            }
            _ => {}
        }
    }

    fn step_mut<'a>(&self, node: &'a mut Value, out: &mut Vec<&'a mut Value>) {
        match self {
            Segment::Key(key) => match node {
                Value::Map(map) => {
                    if let Some(child) = map.get_mut(key) {
                        out.push(child);
                    }
                }
                Value::List(items) => {
                    for item in items.iter_mut() {
                        self.step_mut(item, out);
                    }
                }
                _ => {}
            },
            Segment::Filter { key, value } => match node {
                Value::List(items) => {
                    for item in items.iter_mut() {
                        if Self::filter_matches(key, value, item) {
                            out.push(item);
                        }
                    }
                }
                other => {
                    if Self::filter_matches(key, value, other) {
                        out.push(other);
                    }
                }
            },
        }
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    raw: String,
    segments: Vec<Segment>,
}

impl PathQuery {
    pub fn parse(raw: &str) -> Result<Self> {
        raw.parse()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// All values the query reaches, in document order.
    pub fn select<'a>(&self, data: &'a Value) -> Vec<&'a Value> {
        self.segments.iter().fold(vec![data], |current, segment| {
            let mut next = Vec::new();
            for node in current {
                segment.step(node, &mut next);
            }
            next
        })
    }

    /// True when at least one value is selected.
    pub fn matches(&self, data: &Value) -> bool {
        !self.select(data).is_empty()
    }

    /// Replace the value at every location the query reaches.
    ///
    /// The final segment must be a plain key, and it must already exist in
    /// at least one selected parent. Returns the number of replaced values.
    pub fn set(&self, data: &mut Value, value: &Value) -> Result<usize> {
        let Some((leaf, parents)) = self.segments.split_last() else {
            return Err(JamfError::invalid_path(&self.raw, "", "empty path"));
        };
        let Segment::Key(leaf_key) = leaf else {
            return Err(JamfError::invalid_path(
                &self.raw,
                leaf.to_string(),
                "cannot assign to a filter",
            ));
        };

        let written: usize = Self::walk_mut(parents, data)
            .into_iter()
            .map(|parent| Self::assign(parent, leaf_key, value))
            .sum();

        if written == 0 {
            return Err(JamfError::invalid_path(
                &self.raw,
                leaf_key.as_str(),
                "no existing value to replace",
            ));
        }
        Ok(written)
    }

    fn walk_mut<'a>(segments: &[Segment], data: &'a mut Value) -> Vec<&'a mut Value> {
        let mut current = vec![data];
        for segment in segments {
            let mut next = Vec::new();
            for node in current {
                segment.step_mut(node, &mut next);
            }
            current = next;
        }
        current
    }

    fn assign(node: &mut Value, key: &str, value: &Value) -> usize {
        match node {
            Value::Map(map) => match map.get_mut(key) {
                Some(slot) => {
                    *slot = value.clone();
                    1
                }
                None => 0,
            },
            Value::List(items) => items
                .iter_mut()
                .map(|item| Self::assign(item, key, value))
                .sum(),
            _ => 0,
        }
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PathQuery {
    type Err = JamfError;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(JamfError::invalid_path(raw, "", "empty path"));
        }

        let segments = split_segments(raw, trimmed)?
            .into_iter()
            .map(|part| parse_segment(raw, part))
            .collect::<Result<Vec<_>>>()?;

        Ok(PathQuery {
            raw: raw.to_string(),
            segments,
        })
    }
}

/// Split on `/`, except inside brackets (filter values may contain slashes).
fn split_segments<'a>(raw: &str, path: &'a str) -> Result<Vec<&'a str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_bracket = false;

    for (i, c) in path.char_indices() {
        match c {
            '[' if !in_bracket => in_bracket = true,
            ']' if in_bracket => in_bracket = false,
            '/' if !in_bracket => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_bracket {
        return Err(JamfError::invalid_path(
            raw,
            &path[start..],
            "unterminated `[`",
        ));
    }
    parts.push(&path[start..]);
    Ok(parts)
}

fn parse_segment(raw: &str, part: &str) -> Result<Segment> {
    if part.is_empty() {
        return Err(JamfError::invalid_path(raw, part, "empty segment"));
    }

    let Some(inner) = part.strip_prefix('[') else {
        if part.contains(['[', ']']) {
            return Err(JamfError::invalid_path(raw, part, "unexpected bracket"));
        }
        return Ok(Segment::Key(part.to_string()));
    };

    let inner = inner
        .strip_suffix(']')
        .ok_or_else(|| JamfError::invalid_path(raw, part, "filter must end with `]`"))?;
    if inner.contains(['[', ']']) {
        return Err(JamfError::invalid_path(raw, part, "nested brackets"));
    }
    let (key, value) = inner
        .split_once("==")
        .ok_or_else(|| JamfError::invalid_path(raw, part, "filter needs `key==value`"))?;
    if key.is_empty() {
        return Err(JamfError::invalid_path(raw, part, "filter key is empty"));
    }

    Ok(Segment::Filter {
        key: key.to_string(),
        value: value.to_string(),
    })
}
