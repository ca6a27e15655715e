//! Ingestion: turning decoded server documents into canonical shapes.
//!
//! The Classic API is XML. After decoding, a repeated element with a single
//! occurrence looks exactly like a plain child, and an empty list looks like
//! an empty string. The server marks some lists with a `size` sibling:
//!
//! ```text
//! <computers><size>1</size><computer>...</computer></computers>
//! ```
//!
//! Everything that enters a cache passes through here first, so the rest of
//! the crate can rely on lists being lists.

use crate::error::{JamfError, Result};
use crate::record::RecordId;
use crate::registry::TypeDescriptor;
use crate::value::Value;

const SIZE: &str = "size";

/// Id and display name of every entry in a listing document.
pub fn listing_entries(desc: &TypeDescriptor, raw: &Value) -> Result<Vec<(RecordId, String)>> {
    let body = raw.get(desc.plural()).ok_or_else(|| {
        JamfError::ApiSurprise(format!(
            "{} listing has no `{}` element",
            desc.name(),
            desc.plural()
        ))
    })?;

    let entries: Vec<&Value> = match body {
        Value::List(items) => items.iter().collect(),
        Value::Map(map) if map.contains_key(SIZE) => {
            if body.get(SIZE).and_then(Value::as_i64) == Some(0) {
                Vec::new()
            } else {
                map.get(desc.singular()).map(as_items).unwrap_or_default()
            }
        }
        Value::Map(map) if map.is_empty() => Vec::new(),
        Value::Map(map) => match map.get(desc.singular()) {
            Some(child) => as_items(child),
            None => vec![body],
        },
        other if other.is_blank() => Vec::new(),
        other => {
            return Err(JamfError::ApiSurprise(format!(
                "{} listing is neither a list nor a map: {:?}",
                desc.name(),
                other
            )))
        }
    };

    entries
        .into_iter()
        .map(|entry| {
            let id = entry
                .get("id")
                .and_then(Value::as_i64)
                .map(RecordId)
                .ok_or_else(|| {
                    JamfError::ApiSurprise(format!(
                        "{} listing entry without a usable id: {:?}",
                        desc.name(),
                        entry
                    ))
                })?;
            let name = entry
                .get(desc.listing_name_key())
                .and_then(Value::as_text)
                .unwrap_or_default();
            Ok((id, name))
        })
        .collect()
}

fn as_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::List(items) => items.iter().collect(),
        blank if blank.is_blank() => Vec::new(),
        single => vec![single],
    }
}

/// The full body of one record, in canonical shape.
pub fn record_data(desc: &TypeDescriptor, raw: Value) -> Result<Value> {
    let Value::Map(mut map) = raw else {
        return Err(JamfError::ApiSurprise(format!(
            "{} record document is not a map",
            desc.name()
        )));
    };
    let mut data = map.shift_remove(desc.singular()).ok_or_else(|| {
        JamfError::ApiSurprise(format!(
            "{} record document has no `{}` element",
            desc.name(),
            desc.singular()
        ))
    })?;
    if !matches!(data, Value::Map(_)) {
        return Err(JamfError::ApiSurprise(format!(
            "{} record body is not a map",
            desc.name()
        )));
    }

    expand_sized_lists(&mut data);
    for path in desc.array_paths() {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        force_array(&mut data, &parts);
    }
    Ok(data)
}

/// The id a create response reports for the new record.
pub fn created_id(desc: &TypeDescriptor, response: &Value) -> Result<RecordId> {
    desc.create_response_keys()
        .find_map(|key| response.get(key))
        .and_then(|body| body.get("id"))
        .and_then(Value::as_i64)
        .map(RecordId)
        .ok_or_else(|| {
            JamfError::ApiSurprise(format!(
                "{} create response carries no id: {:?}",
                desc.name(),
                response
            ))
        })
}

/// Apply the `size` heuristic everywhere: a map holding only `size` and one
/// child describes a list of that child.
fn expand_sized_lists(node: &mut Value) {
    match node {
        Value::Map(map) => {
            if map.len() == 2 && map.contains_key(SIZE) {
                let size = map.get(SIZE).and_then(Value::as_i64);
                if let Some((_, child)) = map.iter_mut().find(|(key, _)| key.as_str() != SIZE) {
                    match size {
                        Some(0) if child.is_blank() => *child = Value::List(Vec::new()),
                        Some(n) if n > 0 && matches!(child, Value::Map(_)) => {
                            let single = std::mem::take(child);
                            *child = Value::List(vec![single]);
                        }
                        _ => {}
                    }
                }
            }
            map.values_mut().for_each(expand_sized_lists);
        }
        Value::List(items) => items.iter_mut().for_each(expand_sized_lists),
        _ => {}
    }
}

/// Make the value at `parts` a list, mapping over lists met on the way.
fn force_array(node: &mut Value, parts: &[&str]) {
    let Some((first, rest)) = parts.split_first() else {
        return;
    };
    match node {
        Value::List(items) => items.iter_mut().for_each(|item| force_array(item, parts)),
        Value::Map(map) => {
            let Some(child) = map.get_mut(*first) else {
                return;
            };
            if rest.is_empty() {
                match child {
                    Value::List(_) => {}
                    blank if blank.is_blank() => *blank = Value::List(Vec::new()),
                    single => {
                        let value = std::mem::take(single);
                        *single = Value::List(vec![value]);
                    }
                }
            } else {
                force_array(child, rest);
            }
        }
        _ => {}
    }
}
