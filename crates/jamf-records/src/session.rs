//! A connection-scoped set of record collections.
//!
//! [`Session`] owns one [`Records`] per type, created the first time the
//! type is asked for. Creating a collection never touches the network; the
//! listing is fetched by the first operation that needs it.

use crate::config::RecordsConfig;
use crate::error::Result;
use crate::provider::ConnectionProvider;
use crate::records::Records;
use crate::registry::TypeRegistry;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

pub struct Session<P> {
    provider: Rc<P>,
    registry: TypeRegistry,
    config: RecordsConfig,
    collections: HashMap<&'static str, Records<P>>,
}

impl<P: ConnectionProvider> Session<P> {
    /// A session with built-in types and default configuration.
    pub fn new(provider: P) -> Self {
        Self {
            provider: Rc::new(provider),
            registry: TypeRegistry::builtin(),
            config: RecordsConfig::default(),
            collections: HashMap::new(),
        }
    }

    /// Fails when the configuration names unknown types.
    pub fn with_config(provider: P, config: RecordsConfig) -> Result<Self> {
        Ok(Self {
            provider: Rc::new(provider),
            registry: TypeRegistry::with_config(&config)?,
            config,
            collections: HashMap::new(),
        })
    }

    /// The collection for a type, created on first use.
    pub fn records(&mut self, type_name: &str) -> Result<&mut Records<P>> {
        let desc = self.registry.lookup(type_name)?;
        let provider = &self.provider;
        let refresh_after_save = self.config.refresh_after_save;
        Ok(self.collections.entry(desc.name()).or_insert_with(|| {
            debug!(record_type = desc.name(), "opening collection");
            Records::new(Rc::clone(provider), desc.clone(), refresh_after_save)
        }))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RecordsConfig {
        &self.config
    }

    /// Drop every cached collection; the next access starts unpopulated.
    pub fn forget(&mut self) {
        self.collections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JamfError;
    use crate::provider::memory::{Call, MemServer};
    use serde_json::json;

    #[test]
    fn test_records_is_lazy_and_cached() {
        let mut session = Session::new(MemServer::new());
        session.records("Buildings").unwrap();
        assert_eq!(session.provider().calls(Call::List), 0);

        session.provider().seed("Buildings", json!({"name": "BIOL"})).unwrap();
        assert_eq!(session.records("Buildings").unwrap().ids().unwrap().len(), 1);
        session.records("Buildings").unwrap().ids().unwrap();
        assert_eq!(session.provider().calls(Call::List), 1);
    }

    #[test]
    fn test_unknown_type() {
        let mut session = Session::new(MemServer::new());
        assert!(matches!(
            session.records("Toasters"),
            Err(JamfError::UnknownType(_))
        ));
    }

    #[test]
    fn test_case_insensitive_lookup_shares_collection() {
        let config = RecordsConfig {
            case_sensitive_types: false,
            ..Default::default()
        };
        let mut session = Session::with_config(MemServer::new(), config).unwrap();
        session.provider().seed("Sites", json!({"name": "Campus"})).unwrap();
        session.records("sites").unwrap().ids().unwrap();
        assert!(session.records("SITES").unwrap().is_populated());
    }

    #[test]
    fn test_forget_drops_cache() {
        let mut session = Session::new(MemServer::new());
        session.records("Sites").unwrap().ids().unwrap();
        session.forget();
        assert!(!session.records("Sites").unwrap().is_populated());
    }
}
