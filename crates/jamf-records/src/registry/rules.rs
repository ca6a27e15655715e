//! Save rules: per-type fixups for data the server echoes back but refuses
//! to accept unchanged.
//!
//! They run on the outgoing copy only. The working and cached copies never
//! see them.

use crate::value::Value;

/// A constant a rule compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Null,
    Text(&'static str),
    Int(i64),
}

impl Literal {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Literal::Null => value.is_null(),
            Literal::Text(text) => value.as_str() == Some(*text),
            Literal::Int(n) => matches!(value, Value::Number(_)) && value.as_i64() == Some(*n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveRule {
    /// Remove `path` when it holds exactly `value`.
    DropIf { path: &'static str, value: Literal },

    /// Write `value` at `path` when the path is absent.
    DefaultIfMissing {
        path: &'static str,
        value: &'static str,
    },

    /// When `guard` exists and differs from `unless`, overwrite each of
    /// `resets` that is present with its replacement.
    ResetUnless {
        guard: &'static str,
        unless: &'static str,
        resets: &'static [(&'static str, &'static str)],
    },
}

impl SaveRule {
    /// Apply the rule in place. Returns true when the data changed.
    pub fn apply(&self, data: &mut Value) -> bool {
        match *self {
            SaveRule::DropIf { path, value } => {
                if data.lookup(path).is_some_and(|v| value.matches(v)) {
                    data.remove_at(path).is_some()
                } else {
                    false
                }
            }
            SaveRule::DefaultIfMissing { path, value } => {
                if data.lookup(path).is_some() {
                    return false;
                }
                match path.rsplit_once('/') {
                    Some((parent, _)) if data.lookup(parent).and_then(Value::as_map).is_none() => {
                        false
                    }
                    _ => data.insert_at(path, value.into()).is_ok(),
                }
            }
            SaveRule::ResetUnless {
                guard,
                unless,
                resets,
            } => {
                let guarded = data
                    .lookup(guard)
                    .is_some_and(|v| v.as_text().as_deref() != Some(unless));
                if !guarded {
                    return false;
                }
                let mut changed = false;
                for (path, replacement) in resets {
                    if let Some(slot) = data.lookup_mut(path) {
                        *slot = Value::from(*replacement);
                        changed = true;
                    }
                }
                changed
            }
        }
    }
}

/// Run every rule in order; true when any of them changed the data.
pub fn apply_all(rules: &[SaveRule], data: &mut Value) -> bool {
    rules
        .iter()
        .fold(false, |changed, rule| rule.apply(data) || changed)
}
