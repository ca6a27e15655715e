//! Filling in a new record.
//!
//! The server rejects creates that lack certain fields, and most types need
//! at least a unique name. [`build`] takes whatever the caller supplied and
//! completes it from the type's [`FieldSpec`] list.

use super::TypeDescriptor;
use crate::error::{JamfError, Result};
use crate::value::Value;
use rand::Rng;
use uuid::Uuid;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Shapes of generated placeholder values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomKind {
    /// Seven characters of `A-Z0-9`
    Name,
    /// Upper-case v4 UUID
    Uuid,
    /// `NN.NN.NN`
    SemVer,
    /// One letter followed by eleven of `A-Z0-9`
    SerialNumber,
}

impl RandomKind {
    pub fn generate(self) -> String {
        let mut rng = rand::thread_rng();
        match self {
            RandomKind::Name => pick(&mut rng, ALPHANUMERIC, 7),
            RandomKind::Uuid => Uuid::new_v4().to_string().to_uppercase(),
            RandomKind::SemVer => format!(
                "{:02}.{:02}.{:02}",
                rng.gen_range(0..100),
                rng.gen_range(0..100),
                rng.gen_range(0..100)
            ),
            RandomKind::SerialNumber => {
                let mut serial = pick(&mut rng, UPPERCASE, 1);
                serial.push_str(&pick(&mut rng, ALPHANUMERIC, 11));
                serial
            }
        }
    }
}

fn pick(rng: &mut impl Rng, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Default for a field the caller did not supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Random(RandomKind),
    Text(&'static str),
    Int(i64),
    Bool(bool),
    EmptyList,
    /// Same value as another, already filled, path
    CopyOf(&'static str),
    /// No default: the caller must supply it
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub path: &'static str,
    pub default: FieldDefault,
}

impl FieldSpec {
    pub const fn new(path: &'static str, default: FieldDefault) -> Self {
        Self { path, default }
    }

    pub const fn random(path: &'static str, kind: RandomKind) -> Self {
        Self::new(path, FieldDefault::Random(kind))
    }

    pub const fn text(path: &'static str, text: &'static str) -> Self {
        Self::new(path, FieldDefault::Text(text))
    }

    pub const fn required(path: &'static str) -> Self {
        Self::new(path, FieldDefault::Required)
    }
}

/// Complete `initial` into a record body the server will accept.
///
/// Supplied values always win. The name (unless the server assigns it) gets
/// a random value first, then each field default is applied in table order.
pub fn build(desc: &TypeDescriptor, initial: Option<Value>) -> Result<Value> {
    let mut data = match initial {
        None | Some(Value::Null) => Value::map(),
        Some(value @ Value::Map(_)) => value,
        Some(_) => {
            return Err(JamfError::InvalidData(format!(
                "new {} data must be a map",
                desc.name()
            )))
        }
    };

    if !desc.spec().server_named && is_unset(&data, desc.name_path()) {
        data.insert_at(desc.name_path(), RandomKind::Name.generate().into())?;
    }

    for field in desc.spec().fields {
        if !is_unset(&data, field.path) {
            continue;
        }
        let value = match field.default {
            FieldDefault::Random(kind) => kind.generate().into(),
            FieldDefault::Text(text) => text.into(),
            FieldDefault::Int(n) => n.into(),
            FieldDefault::Bool(b) => b.into(),
            FieldDefault::EmptyList => Value::List(Vec::new()),
            FieldDefault::CopyOf(source) => data.lookup(source).cloned().unwrap_or_default(),
            FieldDefault::Required => {
                return Err(JamfError::MissingField {
                    type_name: desc.name().to_string(),
                    path: field.path.to_string(),
                })
            }
        };
        data.insert_at(field.path, value)?;
    }

    Ok(data)
}

fn is_unset(data: &Value, path: &str) -> bool {
    data.lookup(path).map_or(true, Value::is_null)
}
