//! # Record Collections
//!
//! [`Records`] is the local picture of every record of one type on the
//! server. It starts empty and unpopulated; the first operation that needs
//! the listing fetches it, and later operations reuse it until
//! [`Records::refresh`] is called.
//!
//! ## Indices
//!
//! Two indices are kept in step with the records:
//!
//! - by id (`BTreeMap`, so enumeration order is stable),
//! - by name (`name -> set of ids`, since Jamf names are not unique).
//!
//! Every mutation that changes identity (refresh, create, save with a
//! rename, delete, eviction) updates both in the same step, and only after
//! the server call it depends on succeeded.
//!
//! ## Lazy bodies
//!
//! Records come from the listing with no body. Operations that need data
//! (path search, [`RecordHandle::data`]) fetch it one record at a time and
//! cache it on the record.
//!
//! ## Disappearing records
//!
//! The server is the source of truth. When a fetch or delete reports a
//! record as gone, it is evicted from both indices instead of lingering as a
//! phantom entry.

use crate::error::{JamfError, Result};
use crate::normalize;
use crate::path::PathQuery;
use crate::provider::{ConnectionProvider, ProviderError};
use crate::record::{encode_text, Record, RecordId};
use crate::registry::{rules, stub, Operation, TypeDescriptor};
use crate::selector::{DeleteOutcome, DeleteReport, RecordSelector};
use crate::value::{Map, Value};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub struct Records<P> {
    provider: Rc<P>,
    desc: TypeDescriptor,
    refresh_after_save: bool,
    by_id: BTreeMap<RecordId, Record>,
    by_name: HashMap<String, BTreeSet<RecordId>>,
    populated: bool,
}

impl<P: ConnectionProvider> Records<P> {
    /// An empty, unpopulated collection. Never touches the network.
    pub fn new(provider: Rc<P>, desc: TypeDescriptor, refresh_after_save: bool) -> Self {
        Self {
            provider,
            desc,
            refresh_after_save,
            by_id: BTreeMap::new(),
            by_name: HashMap::new(),
            populated: false,
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.desc
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Number of cached records (without populating).
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    // --- Listing ---

    /// Re-fetch the listing and reconcile.
    ///
    /// Records still on the server keep their loaded bodies and any unsaved
    /// edits; new ids are added as listed records; vanished ids are dropped.
    /// On failure the previous state is kept as is.
    pub fn refresh(&mut self) -> Result<()> {
        let raw = self.provider.list(&self.desc)?;
        let entries = normalize::listing_entries(&self.desc, &raw)?;

        let mut previous = std::mem::take(&mut self.by_id);
        let mut by_id = BTreeMap::new();
        for (id, name) in entries {
            let mut record = previous
                .remove(&id)
                .unwrap_or_else(|| Record::listed(id, name.as_str()));
            record.set_name(name);
            by_id.insert(id, record);
        }

        let dropped = previous.len();
        self.by_id = by_id;
        self.rebuild_name_index();
        self.populated = true;
        debug!(
            record_type = self.desc.name(),
            count = self.by_id.len(),
            dropped,
            "refreshed listing"
        );
        Ok(())
    }

    fn ensure_populated(&mut self) -> Result<()> {
        if !self.populated {
            self.refresh()?;
        }
        Ok(())
    }

    /// Every record, in id order. Populates on first use only.
    pub fn enumerate(&mut self) -> Result<impl Iterator<Item = &Record>> {
        self.ensure_populated()?;
        Ok(self.by_id.values())
    }

    pub fn ids(&mut self) -> Result<Vec<RecordId>> {
        self.ensure_populated()?;
        Ok(self.by_id.keys().copied().collect())
    }

    /// Distinct names, sorted.
    pub fn names(&mut self) -> Result<Vec<&str>> {
        self.ensure_populated()?;
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        Ok(names)
    }

    // --- Lookup ---

    pub fn record_with_id(&mut self, id: RecordId) -> Result<&Record> {
        self.ensure_populated()?;
        self.by_id
            .get(&id)
            .ok_or_else(|| JamfError::not_found(self.desc.name(), id))
    }

    /// All records with exactly this name, in id order. Never fails on zero
    /// or many matches.
    pub fn records_with_name(&mut self, name: &str) -> Result<Vec<&Record>> {
        self.ensure_populated()?;
        Ok(self
            .by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .collect())
    }

    /// The one record with this name; `AmbiguousName` when several share it.
    pub fn record_with_name(&mut self, name: &str) -> Result<&Record> {
        self.ensure_populated()?;
        let id = self.resolve(&RecordSelector::name(name))?;
        self.record_with_id(id)
    }

    /// Names matching `pattern` anywhere (search, not full match).
    ///
    /// Filters the current cache lazily; populates if never populated but
    /// does not refresh.
    pub fn records_with_regex(&mut self, pattern: &str) -> Result<impl Iterator<Item = &Record>> {
        let regex = Regex::new(pattern)?;
        self.ensure_populated()?;
        Ok(self
            .by_id
            .values()
            .filter(move |record| regex.is_match(record.name())))
    }

    /// Records whose body matches a path query.
    ///
    /// The query is parsed before anything is fetched. Bodies are loaded as
    /// needed; a record that disappeared server-side meanwhile is evicted
    /// and skipped.
    pub fn records_with_path(&mut self, path: &str) -> Result<Vec<&Record>> {
        let query = PathQuery::parse(path)?;
        self.ensure_populated()?;

        let ids: Vec<RecordId> = self.by_id.keys().copied().collect();
        for id in ids {
            match self.load(id) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    warn!(
                        record_type = self.desc.name(),
                        %id,
                        "record vanished during path search, evicting"
                    );
                    self.evict(id);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(self
            .by_id
            .values()
            .filter(|record| record.working().is_some_and(|data| query.matches(data)))
            .collect())
    }

    /// Whether an id (digits) or a name is known.
    pub fn contains(&mut self, key: &str) -> Result<bool> {
        self.ensure_populated()?;
        Ok(match RecordSelector::parse(key) {
            RecordSelector::Id(id) => self.by_id.contains_key(&id) || self.by_name.contains_key(key),
            RecordSelector::Name(name) => self.by_name.contains_key(&name),
        })
    }

    /// Look up by id or name.
    pub fn find(&mut self, selector: impl Into<RecordSelector>) -> Result<&Record> {
        self.ensure_populated()?;
        let id = self.resolve(&selector.into())?;
        self.record_with_id(id)
    }

    /// Mutable access to one record.
    pub fn record_mut(&mut self, id: RecordId) -> Result<RecordHandle<'_, P>> {
        self.ensure_populated()?;
        if !self.by_id.contains_key(&id) {
            return Err(JamfError::not_found(self.desc.name(), id));
        }
        Ok(RecordHandle { records: self, id })
    }

    // --- Create / delete ---

    /// Create a record from `initial`, completed with the type's defaults.
    ///
    /// The new record is indexed right away; an unpopulated collection stays
    /// unpopulated and picks the record up again on its first listing.
    pub fn create(&mut self, initial: Option<Value>) -> Result<&Record> {
        self.desc.require(Operation::Create)?;

        let mut data = stub::build(&self.desc, initial)?;
        encode_text(&mut data);
        let doc = wrap(self.desc.singular(), data.clone());

        let response = self.provider.create(&self.desc, &doc)?;
        let id = normalize::created_id(&self.desc, &response)?;

        let data = if self.refresh_after_save {
            match self.fetch(id) {
                Ok(canonical) => canonical,
                Err(err) => {
                    warn!(
                        record_type = self.desc.name(),
                        %id,
                        error = %err,
                        "created record could not be re-read, keeping sent data"
                    );
                    data
                }
            }
        } else {
            data
        };

        let name = self.desc.name_of(&data).unwrap_or_default();
        let mut record = Record::listed(id, name);
        record.load(data);
        info!(record_type = self.desc.name(), %id, name = record.name(), "created record");
        self.insert(record);

        self.by_id
            .get(&id)
            .ok_or_else(|| JamfError::not_found(self.desc.name(), id))
    }

    /// Delete each target, continuing past failures.
    ///
    /// Every target gets an outcome in the report. Names matching several
    /// records are reported as `AmbiguousName` and nothing is deleted for
    /// them. Only population failure or an unsupported type fail the call.
    ///
    /// Lookup results borrow the collection, so collect their ids first:
    ///
    /// ```
    /// # use jamf_records::{MemServer, RecordId, Session};
    /// # use serde_json::json;
    /// # let server = MemServer::new();
    /// # server.seed("Sites", json!({"name": "Old"})).unwrap();
    /// # let mut session = Session::new(server);
    /// let sites = session.records("Sites")?;
    /// let ids: Vec<RecordId> = sites
    ///     .records_with_name("Old")?
    ///     .into_iter()
    ///     .map(|record| record.id())
    ///     .collect();
    /// let report = sites.delete(ids)?;
    /// assert_eq!(report.succeeded().count(), 1);
    /// # Ok::<(), jamf_records::JamfError>(())
    /// ```
    pub fn delete<I>(&mut self, targets: I) -> Result<DeleteReport>
    where
        I: IntoIterator,
        I::Item: Into<RecordSelector>,
    {
        self.desc.require(Operation::Delete)?;
        self.ensure_populated()?;

        let mut report = DeleteReport::default();
        for target in targets {
            let selector = target.into();
            let result = self
                .resolve(&selector)
                .and_then(|id| self.delete_one(id).map(|_| id));
            if let Err(err) = &result {
                warn!(record_type = self.desc.name(), %selector, error = %err, "delete failed");
            }
            report.outcomes.push(DeleteOutcome { selector, result });
        }
        Ok(report)
    }

    // --- Internals ---

    fn resolve(&self, selector: &RecordSelector) -> Result<RecordId> {
        match selector {
            RecordSelector::Id(id) if self.by_id.contains_key(id) => Ok(*id),
            RecordSelector::Id(id) => Err(JamfError::not_found(self.desc.name(), id)),
            RecordSelector::Name(name) => match self.by_name.get(name) {
                Some(ids) if ids.len() > 1 => Err(JamfError::AmbiguousName {
                    type_name: self.desc.name().to_string(),
                    name: name.clone(),
                    count: ids.len(),
                }),
                Some(ids) => ids
                    .first()
                    .copied()
                    .ok_or_else(|| JamfError::not_found(self.desc.name(), name)),
                None => Err(JamfError::not_found(self.desc.name(), name)),
            },
        }
    }

    fn delete_one(&mut self, id: RecordId) -> Result<Record> {
        match self.provider.delete(&self.desc, id) {
            Ok(()) => {
                info!(record_type = self.desc.name(), %id, "deleted record");
                self.evict(id)
                    .map(Record::detach)
                    .ok_or_else(|| JamfError::not_found(self.desc.name(), id))
            }
            Err(ProviderError::NotFound(_)) => {
                self.evict(id);
                Err(JamfError::not_found(self.desc.name(), id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch and normalize one body. Not-found becomes `RecordNotFound`.
    fn fetch(&self, id: RecordId) -> Result<Value> {
        debug!(record_type = self.desc.name(), %id, "fetching record");
        let raw = self.provider.get(&self.desc, id).map_err(|err| match err {
            ProviderError::NotFound(_) => JamfError::not_found(self.desc.name(), id),
            other => other.into(),
        })?;
        normalize::record_data(&self.desc, raw)
    }

    /// Make sure a record's body is loaded.
    fn load(&mut self, id: RecordId) -> Result<()> {
        match self.by_id.get(&id) {
            Some(record) if record.is_loaded() => return Ok(()),
            Some(_) => {}
            None => return Err(JamfError::not_found(self.desc.name(), id)),
        }
        let data = self.fetch(id)?;
        self.store_fetched(id, data);
        Ok(())
    }

    /// Replace a record's copies with fetched data, following a server-side
    /// rename in the name index.
    fn store_fetched(&mut self, id: RecordId, data: Value) {
        let new_name = self.desc.name_of(&data);
        let Some(record) = self.by_id.get_mut(&id) else {
            return;
        };
        record.load(data);
        let old_name = record.name().to_string();
        if let Some(new_name) = new_name {
            if new_name != old_name {
                record.set_name(new_name.clone());
                self.reindex_name(id, &old_name, &new_name);
            }
        }
    }

    fn insert(&mut self, record: Record) {
        self.by_name
            .entry(record.name().to_string())
            .or_default()
            .insert(record.id());
        self.by_id.insert(record.id(), record);
    }

    /// Remove a record from both indices.
    fn evict(&mut self, id: RecordId) -> Option<Record> {
        let record = self.by_id.remove(&id)?;
        if let Some(ids) = self.by_name.get_mut(record.name()) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_name.remove(record.name());
            }
        }
        Some(record)
    }

    fn reindex_name(&mut self, id: RecordId, old: &str, new: &str) {
        if let Some(ids) = self.by_name.get_mut(old) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_name.remove(old);
            }
        }
        self.by_name.entry(new.to_string()).or_default().insert(id);
    }

    fn rebuild_name_index(&mut self) {
        self.by_name.clear();
        for (id, record) in &self.by_id {
            self.by_name
                .entry(record.name().to_string())
                .or_default()
                .insert(*id);
        }
    }

    #[cfg(test)]
    fn indices_agree(&self) -> bool {
        let indexed: usize = self.by_name.values().map(BTreeSet::len).sum();
        indexed == self.by_id.len()
            && self.by_id.values().all(|record| {
                self.by_name
                    .get(record.name())
                    .is_some_and(|ids| ids.contains(&record.id()))
            })
    }
}

fn wrap(key: &str, body: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), body);
    Value::Map(map)
}

/// Mutable view of one record inside its collection.
///
/// Borrowing the collection mutably means index updates (renames, eviction)
/// happen in the same place as the record change.
pub struct RecordHandle<'a, P> {
    records: &'a mut Records<P>,
    id: RecordId,
}

impl<'a, P: ConnectionProvider> RecordHandle<'a, P> {
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// The record, unless it was evicted through this handle.
    pub fn record(&self) -> Result<&Record> {
        self.records
            .by_id
            .get(&self.id)
            .ok_or_else(|| self.gone())
    }

    fn gone(&self) -> JamfError {
        JamfError::not_found(self.records.desc.name(), self.id)
    }

    /// The working copy, fetched on first access.
    pub fn data(&mut self) -> Result<&Value> {
        self.records.load(self.id)?;
        self.record()?
            .working()
            .ok_or_else(|| JamfError::ApiSurprise("loaded record has no body".to_string()))
    }

    /// The working copy for editing. Changes stay local until [`Self::save`].
    pub fn data_mut(&mut self) -> Result<&mut Value> {
        self.records.load(self.id)?;
        let gone = self.gone();
        self.records
            .by_id
            .get_mut(&self.id)
            .and_then(Record::working_mut)
            .ok_or(gone)
    }

    pub fn get_path(&mut self, path: &str) -> Result<Vec<&Value>> {
        let query = PathQuery::parse(path)?;
        Ok(query.select(self.data()?))
    }

    /// Replace every value a path reaches; the leaf must already exist.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<usize> {
        let query = PathQuery::parse(path)?;
        let value = value.into();
        query.set(self.data_mut()?, &value)
    }

    /// Set the display name in the working copy. The name index follows on
    /// save.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let name_path = self.records.desc.name_path();
        self.data_mut()?.insert_at(name_path, name.into())
    }

    /// Discard unsaved edits.
    pub fn revert(&mut self) -> Result<()> {
        let gone = self.gone();
        self.records
            .by_id
            .get_mut(&self.id)
            .map(Record::revert)
            .ok_or(gone)
    }

    /// Re-fetch both copies from the server, dropping unsaved edits.
    ///
    /// A record the server no longer has is evicted and `RecordNotFound`
    /// returned.
    pub fn refresh(&mut self) -> Result<()> {
        match self.records.fetch(self.id) {
            Ok(data) => {
                self.records.store_fetched(self.id, data);
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                warn!(
                    record_type = self.records.desc.name(),
                    id = %self.id,
                    "record gone on refresh, evicting"
                );
                self.records.evict(self.id);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Push the working copy to the server.
    ///
    /// Nothing is sent when the record was never loaded or has no edits.
    /// The outgoing copy gets the type's save rules and text encoding; the
    /// working copy is not touched by them. Without a re-read the working
    /// copy is what gets promoted to cached. Only after the server accepts
    /// the update does the cached copy change (and the name index with it).
    pub fn save(&mut self) -> Result<()> {
        let desc = self.records.desc.clone();
        desc.require(Operation::Update)?;

        let record = self.record()?;
        let Some(working) = record.working().filter(|_| record.is_modified()).cloned() else {
            debug!(record_type = desc.name(), id = %self.id, "nothing to save");
            return Ok(());
        };
        let old_name = record.name().to_string();

        let mut outgoing = working.clone();
        rules::apply_all(desc.spec().save_rules, &mut outgoing);
        encode_text(&mut outgoing);
        let doc = wrap(desc.singular(), outgoing);

        self.records
            .provider
            .update(&desc, self.id, &doc)
            .map_err(|err| match err {
                ProviderError::NotFound(_) => self.gone(),
                other => other.into(),
            })?;

        let canonical = if self.records.refresh_after_save {
            match self.records.fetch(self.id) {
                Ok(data) => data,
                Err(err) => {
                    warn!(
                        record_type = desc.name(),
                        id = %self.id,
                        error = %err,
                        "saved record could not be re-read, keeping working copy"
                    );
                    working
                }
            }
        } else {
            working
        };

        let new_name = desc.name_of(&canonical).unwrap_or_else(|| old_name.clone());
        let gone = self.gone();
        let record = self.records.by_id.get_mut(&self.id).ok_or(gone)?;
        record.load(canonical);
        if new_name != old_name {
            record.set_name(new_name.clone());
            self.records.reindex_name(self.id, &old_name, &new_name);
        }
        info!(record_type = desc.name(), id = %self.id, name = %new_name, "saved record");
        Ok(())
    }

    /// Delete the record on the server and detach it from the collection.
    pub fn delete(self) -> Result<Record> {
        self.records.desc.require(Operation::Delete)?;
        self.records.delete_one(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::{Call, MemServer};
    use crate::record::RecordState;
    use crate::registry::TypeRegistry;
    use serde_json::json;
    use tracing_test::traced_test;

    fn setup(type_name: &str) -> (Rc<MemServer>, Records<MemServer>) {
        let server = Rc::new(MemServer::new());
        let desc = TypeRegistry::builtin().lookup(type_name).unwrap().clone();
        let records = Records::new(Rc::clone(&server), desc, true);
        (server, records)
    }

    fn seed_buildings(server: &MemServer) -> Vec<RecordId> {
        ["BIOL", "CHEM", "CHEM"]
            .iter()
            .map(|name| server.seed("Buildings", json!({"name": name})).unwrap())
            .collect()
    }

    #[test]
    fn test_new_collection_does_not_fetch() {
        let (server, records) = setup("Buildings");
        assert!(!records.is_populated());
        assert_eq!(server.calls(Call::List), 0);
    }

    #[test]
    fn test_enumerate_populates_once() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        assert_eq!(records.enumerate().unwrap().count(), 3);
        assert_eq!(records.enumerate().unwrap().count(), 3);
        assert_eq!(server.calls(Call::List), 1);
    }

    #[test]
    fn test_refresh_failure_keeps_state() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        records.refresh().unwrap();
        server.fail_next(Call::List, ProviderError::Transport("down".into()));
        assert!(records.refresh().is_err());
        assert_eq!(records.len(), 3);
        assert!(records.indices_agree());
    }

    #[test]
    fn test_refresh_keeps_loaded_records_and_drops_vanished() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        records
            .record_mut(ids[0])
            .unwrap()
            .set_path("name", "BIOLOGY")
            .unwrap();

        server.remove("Buildings", ids[2]);
        server.seed("Buildings", json!({"name": "PHYS"})).unwrap();
        records.refresh().unwrap();

        assert_eq!(records.len(), 3);
        let kept = records.record_with_id(ids[0]).unwrap();
        assert_eq!(kept.state(), RecordState::Modified);
        assert!(records.record_with_id(ids[2]).is_err());
        assert!(records.indices_agree());
    }

    #[test]
    fn test_records_with_name_zero_one_many() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        assert!(records.records_with_name("MATH").unwrap().is_empty());
        assert_eq!(records.records_with_name("BIOL").unwrap().len(), 1);
        assert_eq!(records.records_with_name("CHEM").unwrap().len(), 2);
    }

    #[test]
    fn test_record_with_name_ambiguous() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        assert!(records.record_with_name("BIOL").is_ok());
        assert!(matches!(
            records.record_with_name("CHEM"),
            Err(JamfError::AmbiguousName { count: 2, .. })
        ));
    }

    #[test]
    fn test_records_with_regex_searches() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        assert_eq!(records.records_with_regex("^CH").unwrap().count(), 2);
        assert_eq!(records.records_with_regex("I").unwrap().count(), 1);
        assert!(matches!(
            records.records_with_regex("("),
            Err(JamfError::Pattern(_))
        ));
    }

    #[test]
    fn test_regex_never_refreshes() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        records.records_with_regex(".").unwrap().count();
        server.seed("Buildings", json!({"name": "NEW"})).unwrap();
        assert_eq!(records.records_with_regex("NEW").unwrap().count(), 0);
        assert_eq!(server.calls(Call::List), 1);
    }

    #[test]
    fn test_records_with_path_rejects_bad_path_before_fetching() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        assert!(matches!(
            records.records_with_path("a/[b"),
            Err(JamfError::InvalidPath { .. })
        ));
        assert_eq!(server.calls(Call::List), 0);
    }

    #[test]
    fn test_records_with_path_evicts_vanished() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        records.refresh().unwrap();
        server.remove("Buildings", ids[1]);

        let found = records.records_with_path("[name==CHEM]").unwrap();
        assert_eq!(found.len(), 1);
        assert!(!records.contains(&ids[1].to_string()).unwrap());
        assert!(records.indices_agree());
    }

    #[test]
    fn test_contains_by_id_and_name() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        assert!(records.contains(&ids[0].to_string()).unwrap());
        assert!(records.contains("CHEM").unwrap());
        assert!(!records.contains("999").unwrap());
        assert!(!records.contains("MATH").unwrap());
    }

    #[test]
    fn test_find_by_selector() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        assert_eq!(records.find("BIOL").unwrap().id(), ids[0]);
        assert_eq!(records.find(ids[1]).unwrap().name(), "CHEM");
        assert!(records.find("MATH").is_err());
    }

    #[test]
    fn test_create_indexes_new_record() {
        let (server, mut records) = setup("Buildings");
        let id = records
            .create(Some(Value::from(json!({"name": "GEOL"}))))
            .unwrap()
            .id();
        assert!(server.stored("Buildings", id).is_some());
        assert_eq!(records.records_with_name("GEOL").unwrap().len(), 1);
        assert_eq!(server.calls(Call::List), 1);
        assert!(records.indices_agree());
    }

    #[test]
    fn test_create_unsupported_type() {
        let (server, mut records) = setup("Peripherals");
        assert!(matches!(
            records.create(None),
            Err(JamfError::Unsupported { operation: Operation::Create, .. })
        ));
        assert_eq!(server.calls(Call::Create), 0);
    }

    #[test]
    fn test_create_failure_leaves_collection_unchanged() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        records.refresh().unwrap();
        server.fail_next(
            Call::Create,
            ProviderError::Rejected {
                status: 409,
                message: "duplicate".into(),
            },
        );
        assert!(records.create(Some(Value::from(json!({"name": "BIOL"})))).is_err());
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_delete_ambiguous_name_is_reported() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        let report = records.delete(["CHEM", "BIOL"]).unwrap();
        assert_eq!(report.succeeded().count(), 1);
        let (selector, err) = report.failed().next().unwrap();
        assert_eq!(selector, &RecordSelector::Name("CHEM".into()));
        assert!(matches!(err, JamfError::AmbiguousName { .. }));
        assert_eq!(server.count("Buildings"), 2);
    }

    #[test]
    fn test_delete_unknown_target_reported() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        let report = records.delete(["MATH"]).unwrap();
        assert!(!report.is_complete());
        assert!(report.failed().all(|(_, e)| e.is_not_found()));
    }

    #[test]
    fn test_delete_ids_from_name_lookup() {
        let (server, mut records) = setup("Buildings");
        seed_buildings(&server);
        let ids: Vec<RecordId> = records
            .records_with_name("CHEM")
            .unwrap()
            .into_iter()
            .map(Record::id)
            .collect();
        let report = records.delete(ids).unwrap();
        assert_eq!(report.succeeded().count(), 2);
        assert_eq!(records.ids().unwrap().len(), 1);
        assert_eq!(server.count("Buildings"), 1);
    }

    #[test]
    fn test_delete_unsupported_type() {
        let (_server, mut records) = setup("BYOProfiles");
        assert!(matches!(
            records.delete(["x"]),
            Err(JamfError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_handle_rename_updates_index_on_save_only() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        let mut handle = records.record_mut(ids[0]).unwrap();
        handle.set_name("BIOLOGY").unwrap();
        drop(handle);
        assert_eq!(records.records_with_name("BIOL").unwrap().len(), 1);

        records.record_mut(ids[0]).unwrap().save().unwrap();
        assert!(records.records_with_name("BIOL").unwrap().is_empty());
        assert_eq!(records.records_with_name("BIOLOGY").unwrap().len(), 1);
        assert!(records.indices_agree());
    }

    #[test]
    fn test_save_unmodified_is_noop() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        let mut handle = records.record_mut(ids[0]).unwrap();
        handle.save().unwrap();
        handle.data().unwrap();
        handle.save().unwrap();
        assert_eq!(server.calls(Call::Update), 0);
    }

    #[test]
    fn test_save_applies_rules_to_outgoing_copy_only() {
        let (server, mut records) = setup("Packages");
        let id = server
            .seed(
                "Packages",
                json!({"name": "a.pkg", "filename": "a.pkg", "category": "Apps"}),
            )
            .unwrap();
        let mut handle = records.record_mut(id).unwrap();
        handle
            .set_path("category", "No category assigned")
            .unwrap();
        handle.save().unwrap();

        assert!(server.stored("Packages", id).unwrap().get("category").is_none());
        let record = handle.record().unwrap();
        assert_eq!(record.working(), record.cached());
    }

    #[test]
    fn test_save_without_refresh_skips_reread() {
        let server = Rc::new(MemServer::new());
        let desc = TypeRegistry::builtin().lookup("Sites").unwrap().clone();
        let mut records = Records::new(Rc::clone(&server), desc, false);
        let id = server.seed("Sites", json!({"name": "Campus"})).unwrap();

        let mut handle = records.record_mut(id).unwrap();
        handle.set_path("name", "Main Campus").unwrap();
        handle.save().unwrap();
        assert_eq!(server.calls(Call::Get), 1);
        assert_eq!(handle.record().unwrap().name(), "Main Campus");
    }

    #[test]
    fn test_save_without_refresh_promotes_working_copy() {
        let server = Rc::new(MemServer::new());
        let desc = TypeRegistry::builtin().lookup("Packages").unwrap().clone();
        let mut records = Records::new(Rc::clone(&server), desc, false);
        let id = server
            .seed(
                "Packages",
                json!({"name": "a.pkg", "filename": "a.pkg", "category": "Apps", "notes": ""}),
            )
            .unwrap();

        let mut handle = records.record_mut(id).unwrap();
        handle.set_path("category", "No category assigned").unwrap();
        handle.set_path("notes", "line one\r\nline two").unwrap();
        let edited = handle.data().unwrap().clone();
        handle.save().unwrap();

        let stored = server.stored("Packages", id).unwrap();
        assert!(stored.get("category").is_none());
        assert_eq!(stored.get("notes"), Some(&Value::from("line one\nline two")));

        let record = handle.record().unwrap();
        assert_eq!(record.state(), RecordState::Synced);
        assert_eq!(record.cached(), Some(&edited));
        assert_eq!(record.working(), Some(&edited));
    }

    #[test]
    fn test_save_without_refresh_indexes_unencoded_name() {
        let server = Rc::new(MemServer::new());
        let desc = TypeRegistry::builtin().lookup("Sites").unwrap().clone();
        let mut records = Records::new(Rc::clone(&server), desc, false);
        let id = server.seed("Sites", json!({"name": "Campus"})).unwrap();

        let mut handle = records.record_mut(id).unwrap();
        handle.set_path("name", "North\r\nCampus").unwrap();
        handle.save().unwrap();
        drop(handle);

        assert_eq!(records.records_with_name("North\r\nCampus").unwrap().len(), 1);
        assert!(records.records_with_name("North\nCampus").unwrap().is_empty());
        assert!(records.indices_agree());
    }

    #[test]
    fn test_save_unsupported_type() {
        let (server, mut records) = setup("ComputerReports");
        let id = server.seed("ComputerReports", json!({"name": "r"})).unwrap();
        let err = records.record_mut(id).unwrap().save().unwrap_err();
        assert!(matches!(err, JamfError::Unsupported { .. }));
    }

    #[test]
    fn test_handle_refresh_evicts_vanished_record() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        records.refresh().unwrap();
        server.remove("Buildings", ids[0]);

        let mut handle = records.record_mut(ids[0]).unwrap();
        assert!(handle.refresh().unwrap_err().is_not_found());
        assert!(handle.record().is_err());
        drop(handle);
        assert!(records.records_with_name("BIOL").unwrap().is_empty());
    }

    #[test]
    fn test_handle_refresh_follows_server_rename() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        records.refresh().unwrap();
        server.modify("Buildings", ids[0], |body| {
            body.insert_at("name", "LIFE".into()).unwrap();
        });

        records.record_mut(ids[0]).unwrap().refresh().unwrap();
        assert_eq!(records.record_with_id(ids[0]).unwrap().name(), "LIFE");
        assert_eq!(records.records_with_name("LIFE").unwrap().len(), 1);
        assert!(records.indices_agree());
    }

    #[test]
    fn test_handle_delete_detaches() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        let detached = records.record_mut(ids[0]).unwrap().delete().unwrap();
        assert_eq!(detached.state(), RecordState::Detached);
        assert!(records.record_with_id(ids[0]).is_err());
        assert_eq!(server.count("Buildings"), 2);
    }

    #[test]
    #[traced_test]
    fn test_save_logs_rename() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        let mut handle = records.record_mut(ids[0]).unwrap();
        handle.set_name("BIOLOGY").unwrap();
        handle.save().unwrap();
        assert!(logs_contain("saved record"));
        assert!(logs_contain("BIOLOGY"));
    }

    #[test]
    #[traced_test]
    fn test_echo_failure_falls_back_with_warning() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        let mut handle = records.record_mut(ids[0]).unwrap();
        handle.set_path("name", "LIFE").unwrap();
        server.fail_next(Call::Get, ProviderError::Transport("reset".into()));
        handle.save().unwrap();

        assert!(logs_contain("could not be re-read"));
        let record = handle.record().unwrap();
        assert_eq!(record.name(), "LIFE");
        assert_eq!(record.state(), RecordState::Synced);
    }

    #[test]
    #[traced_test]
    fn test_vanished_record_logs_eviction() {
        let (server, mut records) = setup("Buildings");
        let ids = seed_buildings(&server);
        records.refresh().unwrap();
        server.remove("Buildings", ids[0]);
        records.records_with_path("name").unwrap();
        assert!(logs_contain("vanished during path search"));
    }

    #[test]
    fn test_record_mut_unknown_id() {
        let (_server, mut records) = setup("Buildings");
        assert!(records.record_mut(RecordId(404)).is_err());
    }
}
