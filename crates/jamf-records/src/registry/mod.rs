//! # Type Registry
//!
//! Every Jamf record type behaves the same way modulo a handful of facts:
//! its document keys, where the name lives, which children the server
//! sometimes collapses, what a new record needs, and which operations the
//! server allows. Those facts are data, kept in one const table
//! ([`types::TYPES`]) so the rest of the crate can stay generic.
//!
//! | Piece          | Module      | Holds                                          |
//! |----------------|-------------|------------------------------------------------|
//! | [`TypeSpec`]   | this module | static facts for one type                      |
//! | [`FieldSpec`]  | [`stub`]    | defaults used to fill in a new record           |
//! | [`SaveRule`]   | [`rules`]   | fixups applied to outgoing data before update   |
//! | [`TypeDescriptor`] | this module | a spec plus configured extra array paths   |
//!
//! Adding a type means adding one entry to the table.

pub mod rules;
pub mod stub;
pub mod types;

pub use rules::{Literal, SaveRule};
pub use stub::{FieldDefault, FieldSpec, RandomKind};

use crate::config::RecordsConfig;
use crate::error::{JamfError, Result};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// A server-side mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Which mutations the server offers for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operations {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Operations {
    pub const ALL: Operations = Operations {
        create: true,
        update: true,
        delete: true,
    };

    pub const NONE: Operations = Operations {
        create: false,
        update: false,
        delete: false,
    };

    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// The id segment a create request is addressed to.
///
/// Classic endpoints are `POST /<endpoint>/id/<x>`. Most types accept any
/// placeholder, some insist on `0`, and patch policies are posted to the id
/// of the software title they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateTarget {
    Collection,
    IdZero,
    Field(&'static str),
}

/// Static description of one record type.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    /// Registry name, e.g. `Computers`
    pub name: &'static str,

    /// Document key of a single record, e.g. `computer`
    pub singular: &'static str,

    /// Document key of the listing, e.g. `computers`
    pub plural: &'static str,

    /// Classic API resource, e.g. `computers`
    pub endpoint: &'static str,

    /// Where the display name lives inside the full record
    pub name_path: &'static str,

    /// Key holding the display name in listing entries
    pub listing_name_key: &'static str,

    /// Paths whose value must always be a list
    pub array_paths: &'static [&'static str],

    /// Defaults for a new record, applied in order after the name
    pub fields: &'static [FieldSpec],

    /// Extra create-response keys that may carry the new id
    pub create_response_keys: &'static [&'static str],

    /// Fixups applied to outgoing data before an update
    pub save_rules: &'static [SaveRule],

    pub ops: Operations,

    pub create_target: CreateTarget,

    /// The server assigns the display name; new records get no random one.
    pub server_named: bool,
}

impl TypeSpec {
    const fn new(
        name: &'static str,
        singular: &'static str,
        plural: &'static str,
        endpoint: &'static str,
    ) -> Self {
        Self {
            name,
            singular,
            plural,
            endpoint,
            name_path: "name",
            listing_name_key: "name",
            array_paths: &[],
            fields: &[],
            create_response_keys: &[],
            save_rules: &[],
            ops: Operations::ALL,
            create_target: CreateTarget::Collection,
            server_named: false,
        }
    }

    /// Name lives under `general/name`.
    const fn general_name(mut self) -> Self {
        self.name_path = "general/name";
        self
    }

    const fn listing_name(mut self, key: &'static str) -> Self {
        self.listing_name_key = key;
        self
    }

    const fn arrays(mut self, paths: &'static [&'static str]) -> Self {
        self.array_paths = paths;
        self
    }

    const fn fields(mut self, fields: &'static [FieldSpec]) -> Self {
        self.fields = fields;
        self
    }

    const fn responds_with(mut self, keys: &'static [&'static str]) -> Self {
        self.create_response_keys = keys;
        self
    }

    const fn save_rules(mut self, rules: &'static [SaveRule]) -> Self {
        self.save_rules = rules;
        self
    }

    const fn create_at(mut self, target: CreateTarget) -> Self {
        self.create_target = target;
        self
    }

    const fn server_named(mut self) -> Self {
        self.server_named = true;
        self
    }

    const fn no_create(mut self) -> Self {
        self.ops.create = false;
        self
    }

    const fn no_update(mut self) -> Self {
        self.ops.update = false;
        self
    }

    const fn no_delete(mut self) -> Self {
        self.ops.delete = false;
        self
    }

    const fn read_only(mut self) -> Self {
        self.ops = Operations::NONE;
        self
    }
}

/// A [`TypeSpec`] as seen by one session: built-in facts plus whatever
/// always-array paths the configuration adds.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    spec: &'static TypeSpec,
    extra_array_paths: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(spec: &'static TypeSpec) -> Self {
        Self {
            spec,
            extra_array_paths: Vec::new(),
        }
    }

    pub fn with_array_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        for path in paths {
            let path = path.trim_matches('/').to_string();
            if !path.is_empty() && !self.has_array_path(&path) {
                self.extra_array_paths.push(path);
            }
        }
        self
    }

    pub fn spec(&self) -> &'static TypeSpec {
        self.spec
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn singular(&self) -> &'static str {
        self.spec.singular
    }

    pub fn plural(&self) -> &'static str {
        self.spec.plural
    }

    pub fn endpoint(&self) -> &'static str {
        self.spec.endpoint
    }

    pub fn name_path(&self) -> &'static str {
        self.spec.name_path
    }

    pub fn listing_name_key(&self) -> &'static str {
        self.spec.listing_name_key
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.spec.ops.allows(op)
    }

    /// `Unsupported` unless the server offers `op` for this type.
    pub fn require(&self, op: Operation) -> Result<()> {
        if self.allows(op) {
            Ok(())
        } else {
            Err(JamfError::Unsupported {
                type_name: self.name().to_string(),
                operation: op,
            })
        }
    }

    /// Built-in and configured always-array paths.
    pub fn array_paths(&self) -> impl Iterator<Item = &str> {
        self.spec
            .array_paths
            .iter()
            .copied()
            .chain(self.extra_array_paths.iter().map(String::as_str))
    }

    fn has_array_path(&self, path: &str) -> bool {
        self.array_paths().any(|p| p == path)
    }

    /// Document keys a create response may carry the new id under.
    pub fn create_response_keys(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.spec.singular).chain(self.spec.create_response_keys.iter().copied())
    }

    /// Id segment for the create request, given the outgoing record body.
    pub fn create_path_id(&self, data: &Value) -> Option<String> {
        match self.spec.create_target {
            CreateTarget::Collection => None,
            CreateTarget::IdZero => Some("0".to_string()),
            CreateTarget::Field(path) => data.lookup(path).and_then(Value::as_text),
        }
    }

    /// Display name of a full record body.
    ///
    /// Falls back to the listing key for types whose name the server assigns
    /// under a different element.
    pub fn name_of(&self, data: &Value) -> Option<String> {
        data.lookup(self.name_path())
            .or_else(|| data.get(self.listing_name_key()))
            .and_then(Value::as_text)
    }
}

/// Lookup table from type name to descriptor.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
    case_sensitive: bool,
}

impl TypeRegistry {
    /// All built-in types with no configuration applied.
    pub fn builtin() -> Self {
        Self {
            descriptors: types::TYPES.iter().map(TypeDescriptor::new).collect(),
            case_sensitive: true,
        }
    }

    /// Built-in types with configured array paths and lookup mode.
    ///
    /// Array path entries for unknown type names are an error, so typos in
    /// the configuration surface instead of being ignored.
    pub fn with_config(config: &RecordsConfig) -> Result<Self> {
        let mut registry = Self::builtin();
        registry.case_sensitive = config.case_sensitive_types;

        let mut extra: HashMap<usize, Vec<String>> = HashMap::new();
        for (type_name, paths) in config.array_paths() {
            let index = registry.position(type_name)?;
            extra.entry(index).or_default().extend(paths.iter().cloned());
        }
        for (index, paths) in extra {
            let descriptor = registry.descriptors[index].clone();
            registry.descriptors[index] = descriptor.with_array_paths(paths);
        }
        Ok(registry)
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn lookup(&self, name: &str) -> Result<&TypeDescriptor> {
        self.position(name).map(|index| &self.descriptors[index])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.iter().map(TypeDescriptor::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors.iter()
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.descriptors
            .iter()
            .position(|d| {
                if self.case_sensitive {
                    d.name() == name
                } else {
                    d.name().eq_ignore_ascii_case(name)
                }
            })
            .ok_or_else(|| JamfError::UnknownType(name.to_string()))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
