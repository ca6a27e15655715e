use super::{ConnectionProvider, ProviderError, ProviderResult};
use crate::error::{JamfError, Result};
use crate::record::RecordId;
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::value::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Provider calls, for counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    List,
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
struct Failure {
    call: Call,
    id: Option<RecordId>,
    error: ProviderError,
    once: bool,
}

/// In-memory Jamf server for tests and dry runs.
///
/// Uses `RefCell` for interior mutability since the records layer is
/// single-threaded. Records are stored unwrapped, keyed by endpoint.
pub struct MemServer {
    registry: TypeRegistry,
    records: RefCell<HashMap<&'static str, BTreeMap<RecordId, Value>>>,
    next_id: RefCell<i64>,
    calls: RefCell<HashMap<Call, usize>>,
    failures: RefCell<Vec<Failure>>,
    create_targets: RefCell<Vec<Option<String>>>,
    collapse_singletons: RefCell<bool>,
}

impl Default for MemServer {
    fn default() -> Self {
        Self {
            registry: TypeRegistry::builtin(),
            records: RefCell::new(HashMap::new()),
            next_id: RefCell::new(1),
            calls: RefCell::new(HashMap::new()),
            failures: RefCell::new(Vec::new()),
            create_targets: RefCell::new(Vec::new()),
            collapse_singletons: RefCell::new(false),
        }
    }
}

impl MemServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer like the XML API does: one-element lists come back as a bare
    /// element and listings carry a `size`.
    pub fn set_collapse_singletons(&self, collapse: bool) {
        *self.collapse_singletons.borrow_mut() = collapse;
    }

    /// Store a record as if someone had created it on the server.
    ///
    /// `body` is the unwrapped record; its `id` is filled in.
    pub fn seed(&self, type_name: &str, body: impl Into<Value>) -> Result<RecordId> {
        let desc = self.registry.lookup(type_name)?;
        let id = self.allocate_id();
        self.store(desc, id, body.into())?;
        Ok(id)
    }

    /// Apply `edit` to a stored record, as an out-of-band change.
    /// Returns false when the record does not exist.
    pub fn modify(&self, type_name: &str, id: RecordId, edit: impl FnOnce(&mut Value)) -> bool {
        let Ok(desc) = self.registry.lookup(type_name) else {
            return false;
        };
        let mut records = self.records.borrow_mut();
        match records
            .get_mut(desc.endpoint())
            .and_then(|bucket| bucket.get_mut(&id))
        {
            Some(body) => {
                edit(body);
                true
            }
            None => false,
        }
    }

    /// Drop a stored record, as an out-of-band delete.
    pub fn remove(&self, type_name: &str, id: RecordId) -> bool {
        let Ok(desc) = self.registry.lookup(type_name) else {
            return false;
        };
        self.records
            .borrow_mut()
            .get_mut(desc.endpoint())
            .and_then(|bucket| bucket.remove(&id))
            .is_some()
    }

    /// The stored (unwrapped) body of a record.
    pub fn stored(&self, type_name: &str, id: RecordId) -> Option<Value> {
        let desc = self.registry.lookup(type_name).ok()?;
        self.records
            .borrow()
            .get(desc.endpoint())
            .and_then(|bucket| bucket.get(&id))
            .cloned()
    }

    pub fn count(&self, type_name: &str) -> usize {
        let Ok(desc) = self.registry.lookup(type_name) else {
            return 0;
        };
        self.records
            .borrow()
            .get(desc.endpoint())
            .map_or(0, BTreeMap::len)
    }

    /// How many times `call` was made since creation or the last reset.
    pub fn calls(&self, call: Call) -> usize {
        self.calls.borrow().get(&call).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Id segments create requests were addressed to, in order.
    pub fn create_targets(&self) -> Vec<Option<String>> {
        self.create_targets.borrow().clone()
    }

    /// Fail the next `call` (for any id) with `error`.
    pub fn fail_next(&self, call: Call, error: ProviderError) {
        self.failures.borrow_mut().push(Failure {
            call,
            id: None,
            error,
            once: true,
        });
    }

    /// Fail every `call` for `id` with `error` until cleared.
    pub fn fail_always(&self, call: Call, id: RecordId, error: ProviderError) {
        self.failures.borrow_mut().push(Failure {
            call,
            id: Some(id),
            error,
            once: false,
        });
    }

    pub fn clear_failures(&self) {
        self.failures.borrow_mut().clear();
    }

    fn allocate_id(&self) -> RecordId {
        let mut next = self.next_id.borrow_mut();
        let id = RecordId(*next);
        *next += 1;
        id
    }

    fn store(&self, desc: &TypeDescriptor, id: RecordId, mut body: Value) -> Result<()> {
        let id_path = match desc.name_path().rsplit_once('/') {
            Some((parent, _)) => format!("{}/id", parent),
            None => "id".to_string(),
        };
        body.insert_at(&id_path, Value::from(id.0))?;
        self.records
            .borrow_mut()
            .entry(desc.endpoint())
            .or_default()
            .insert(id, body);
        Ok(())
    }

    fn enter(&self, call: Call, id: Option<RecordId>) -> ProviderResult<()> {
        *self.calls.borrow_mut().entry(call).or_insert(0) += 1;

        let mut failures = self.failures.borrow_mut();
        let hit = failures
            .iter()
            .position(|f| f.call == call && (f.id.is_none() || f.id == id));
        match hit {
            Some(index) if failures[index].once => Err(failures.remove(index).error),
            Some(index) => Err(failures[index].error.clone()),
            None => Ok(()),
        }
    }

    fn not_found(desc: &TypeDescriptor, id: RecordId) -> ProviderError {
        ProviderError::NotFound(format!("{}/id/{}", desc.endpoint(), id))
    }

    fn unwrap_doc(desc: &TypeDescriptor, doc: &Value) -> ProviderResult<Value> {
        match doc.get(desc.singular()) {
            Some(body @ Value::Map(_)) => Ok(body.clone()),
            _ => Err(ProviderError::Rejected {
                status: 400,
                message: format!("expected a <{}> document", desc.singular()),
            }),
        }
    }

    fn bad_body(err: JamfError) -> ProviderError {
        ProviderError::Rejected {
            status: 400,
            message: err.to_string(),
        }
    }

    fn wrap(key: &str, value: Value) -> Value {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        Value::Map(map)
    }
}

/// Turn every one-element list into its element, recursively.
fn collapse(value: Value) -> Value {
    match value {
        Value::List(mut items) if items.len() == 1 => collapse(items.remove(0)),
        Value::List(items) => Value::List(items.into_iter().map(collapse).collect()),
        Value::Map(map) => Value::Map(map.into_iter().map(|(k, v)| (k, collapse(v))).collect()),
        other => other,
    }
}

impl ConnectionProvider for MemServer {
    fn list(&self, ty: &TypeDescriptor) -> ProviderResult<Value> {
        self.enter(Call::List, None)?;
        debug!(endpoint = ty.endpoint(), "mem server list");

        let records = self.records.borrow();
        let entries: Vec<Value> = records
            .get(ty.endpoint())
            .into_iter()
            .flat_map(|bucket| bucket.iter())
            .map(|(id, body)| {
                let name = ty
                    .name_of(body)
                    .or_else(|| body.get(ty.listing_name_key()).and_then(Value::as_text))
                    .unwrap_or_default();
                let mut entry = Map::new();
                entry.insert("id".to_string(), Value::from(id.0));
                entry.insert(ty.listing_name_key().to_string(), Value::from(name));
                Value::Map(entry)
            })
            .collect();

        let body = if *self.collapse_singletons.borrow() {
            let mut sized = Map::new();
            sized.insert("size".to_string(), Value::from(entries.len().to_string()));
            match entries.len() {
                0 => {}
                1 => {
                    sized.insert(ty.singular().to_string(), collapse(Value::List(entries)));
                }
                _ => {
                    sized.insert(ty.singular().to_string(), Value::List(entries));
                }
            }
            Value::Map(sized)
        } else {
            Value::List(entries)
        };
        Ok(Self::wrap(ty.plural(), body))
    }

    fn get(&self, ty: &TypeDescriptor, id: RecordId) -> ProviderResult<Value> {
        self.enter(Call::Get, Some(id))?;
        debug!(endpoint = ty.endpoint(), %id, "mem server get");

        let body = self
            .records
            .borrow()
            .get(ty.endpoint())
            .and_then(|bucket| bucket.get(&id))
            .cloned()
            .ok_or_else(|| Self::not_found(ty, id))?;
        let body = if *self.collapse_singletons.borrow() {
            collapse(body)
        } else {
            body
        };
        Ok(Self::wrap(ty.singular(), body))
    }

    fn create(&self, ty: &TypeDescriptor, doc: &Value) -> ProviderResult<Value> {
        self.enter(Call::Create, None)?;
        let body = Self::unwrap_doc(ty, doc)?;
        self.create_targets
            .borrow_mut()
            .push(ty.create_path_id(&body));

        let id = self.allocate_id();
        self.store(ty, id, body).map_err(Self::bad_body)?;
        debug!(endpoint = ty.endpoint(), %id, "mem server create");

        let key = ty
            .spec()
            .create_response_keys
            .first()
            .copied()
            .unwrap_or(ty.singular());
        let mut reply = Map::new();
        reply.insert("id".to_string(), Value::from(id.0));
        Ok(Self::wrap(key, Value::Map(reply)))
    }

    fn update(&self, ty: &TypeDescriptor, id: RecordId, doc: &Value) -> ProviderResult<()> {
        self.enter(Call::Update, Some(id))?;
        let body = Self::unwrap_doc(ty, doc)?;
        let exists = self
            .records
            .borrow()
            .get(ty.endpoint())
            .is_some_and(|bucket| bucket.contains_key(&id));
        if !exists {
            return Err(Self::not_found(ty, id));
        }
        self.store(ty, id, body).map_err(Self::bad_body)?;
        debug!(endpoint = ty.endpoint(), %id, "mem server update");
        Ok(())
    }

    fn delete(&self, ty: &TypeDescriptor, id: RecordId) -> ProviderResult<()> {
        self.enter(Call::Delete, Some(id))?;
        let removed = self
            .records
            .borrow_mut()
            .get_mut(ty.endpoint())
            .and_then(|bucket| bucket.remove(&id))
            .is_some();
        if !removed {
            return Err(Self::not_found(ty, id));
        }
        debug!(endpoint = ty.endpoint(), %id, "mem server delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn desc(name: &str) -> TypeDescriptor {
        TypeRegistry::builtin().lookup(name).unwrap().clone()
    }

    #[test]
    fn test_seed_and_list() {
        let server = MemServer::new();
        server.seed("Buildings", json!({"name": "BIOL"})).unwrap();
        server.seed("Buildings", json!({"name": "CHEM"})).unwrap();

        let listing = server.list(&desc("Buildings")).unwrap();
        let entries = listing.get("buildings").unwrap().as_list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].get("name"), Some(&Value::from("BIOL")));
        assert_eq!(server.calls(Call::List), 1);
    }

    #[test]
    fn test_seed_unknown_type_fails() {
        let server = MemServer::new();
        assert!(server.seed("Toasters", json!({})).is_err());
    }

    #[test]
    fn test_seed_sets_id_next_to_name() {
        let server = MemServer::new();
        let id = server
            .seed("Policies", json!({"general": {"name": "p"}}))
            .unwrap();
        let stored = server.stored("Policies", id).unwrap();
        assert_eq!(stored.lookup("general/id").and_then(Value::as_i64), Some(id.0));
    }

    #[test]
    fn test_get_wraps_in_singular() {
        let server = MemServer::new();
        let id = server.seed("Sites", json!({"name": "Campus"})).unwrap();
        let doc = server.get(&desc("Sites"), id).unwrap();
        assert_eq!(doc.lookup("site/name"), Some(&Value::from("Campus")));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let server = MemServer::new();
        let err = server.get(&desc("Sites"), RecordId(99)).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_collapsed_listing_shapes() {
        let server = MemServer::new();
        server.set_collapse_singletons(true);
        let d = desc("Computers");

        let empty = server.list(&d).unwrap();
        assert_eq!(empty.lookup("computers/size"), Some(&Value::from("0")));

        server
            .seed("Computers", json!({"general": {"name": "only"}}))
            .unwrap();
        let single = server.list(&d).unwrap();
        assert!(single.lookup("computers/computer").unwrap().as_map().is_some());
    }

    #[test]
    fn test_create_assigns_ids_and_records_target() {
        let server = MemServer::new();
        let d = desc("PatchPolicies");
        let doc = Value::from(json!({"patch_policy": {
            "general": {"name": "p"},
            "software_title_configuration_id": 7
        }}));
        let reply = server.create(&d, &doc).unwrap();
        let id = reply.lookup("patch_policy/id").and_then(Value::as_i64).unwrap();
        assert!(server.stored("PatchPolicies", RecordId(id)).is_some());
        assert_eq!(server.create_targets(), vec![Some("7".to_string())]);
    }

    #[test]
    fn test_create_rejects_unwrapped_doc() {
        let server = MemServer::new();
        let err = server
            .create(&desc("Sites"), &Value::from(json!({"name": "x"})))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { status: 400, .. }));
    }

    #[test]
    fn test_fail_next_fires_once() {
        let server = MemServer::new();
        let id = server.seed("Sites", json!({"name": "a"})).unwrap();
        server.fail_next(Call::Get, ProviderError::Transport("reset".into()));
        assert!(server.get(&desc("Sites"), id).is_err());
        assert!(server.get(&desc("Sites"), id).is_ok());
        assert_eq!(server.calls(Call::Get), 2);
    }

    #[test]
    fn test_fail_always_targets_one_id() {
        let server = MemServer::new();
        let a = server.seed("Sites", json!({"name": "a"})).unwrap();
        let b = server.seed("Sites", json!({"name": "b"})).unwrap();
        server.fail_always(
            Call::Delete,
            b,
            ProviderError::Rejected {
                status: 409,
                message: "in use".into(),
            },
        );
        assert!(server.delete(&desc("Sites"), b).is_err());
        assert!(server.delete(&desc("Sites"), b).is_err());
        assert!(server.delete(&desc("Sites"), a).is_ok());
        assert_eq!(server.count("Sites"), 1);
    }

    #[test]
    fn test_seed_rejects_non_map_body() {
        let server = MemServer::new();
        let err = server.seed("Sites", json!("Campus")).unwrap_err();
        assert!(matches!(err, JamfError::InvalidData(_)));
        assert_eq!(server.count("Sites"), 0);
    }

    #[test]
    fn test_clear_failures_and_reset_calls() {
        let server = MemServer::new();
        let id = server.seed("Sites", json!({"name": "a"})).unwrap();
        server.fail_always(Call::Get, id, ProviderError::Transport("down".into()));
        assert!(server.get(&desc("Sites"), id).is_err());

        server.clear_failures();
        server.reset_calls();
        assert!(server.get(&desc("Sites"), id).is_ok());
        assert_eq!(server.calls(Call::Get), 1);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let server = MemServer::new();
        let doc = Value::from(json!({"site": {"name": "x"}}));
        let err = server.update(&desc("Sites"), RecordId(5), &doc).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_collapse_single_element_lists() {
        let value = Value::from(json!({"a": [{"b": [1]}], "c": [1, 2]}));
        let collapsed = collapse(value);
        assert_eq!(collapsed.lookup("a/b"), Some(&Value::from(1_i64)));
        assert_eq!(collapsed.get("c").unwrap().as_list().unwrap().len(), 2);
    }
}
