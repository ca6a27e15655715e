//! # Jamf Records Architecture
//!
//! jamf-records is a **local cache with copy-on-write edits** over the Jamf
//! Pro Classic API. It does not speak HTTP itself: a [`ConnectionProvider`]
//! moves documents, and everything above it is about knowing what the
//! server has, without asking it more often than needed.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session (session.rs)                                       │
//! │  - One collection per record type, opened lazily            │
//! │  - Holds the provider, registry, and configuration          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Collections (records.rs)                                   │
//! │  - Id and name indices, lookups, regex and path search      │
//! │  - Create, batch delete, save through RecordHandle          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Normalization (normalize.rs) + Type Registry (registry/)   │
//! │  - Undo the XML-to-JSON quirks: collapsed lists, size wraps │
//! │  - Per-type facts: keys, name paths, defaults, save rules   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Provider (provider/)                                       │
//! │  - ConnectionProvider trait                                 │
//! │  - MemServer (testing and dry runs)                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle of a Record
//!
//! 1. The first lookup on a collection fetches the listing: ids and names.
//! 2. Reading data fetches the full body once and caches it twice, as the
//!    confirmed `cached` copy and the editable `working` copy.
//! 3. Edits change `working` only. [`RecordHandle::save`] sends it, and on
//!    success both copies are replaced by what the server now holds.
//! 4. Deleting, or discovering a record is gone, removes it from the indices.
//!
//! ## Example
//!
//! ```
//! use jamf_records::{MemServer, Session};
//! use serde_json::json;
//!
//! let server = MemServer::new();
//! server.seed("Buildings", json!({"name": "BIOL"})).unwrap();
//!
//! let mut session = Session::new(server);
//! let buildings = session.records("Buildings").unwrap();
//! let id = buildings.find("BIOL").unwrap().id();
//!
//! let mut handle = buildings.record_mut(id).unwrap();
//! handle.set_path("name", "Biology").unwrap();
//! handle.save().unwrap();
//!
//! assert_eq!(buildings.records_with_name("Biology").unwrap().len(), 1);
//! ```
//!
//! ## Module Overview
//!
//! - [`session`]: Entry point; per-type collections
//! - [`records`]: Collections, lookups, and mutation
//! - [`record`]: A single record and its two copies
//! - [`selector`]: Id/name selectors and batch delete reports
//! - [`path`]: Path query language
//! - [`value`]: Ordered document tree
//! - [`normalize`]: Response shape fixes
//! - [`registry`]: Per-type facts
//! - [`provider`]: Transport abstraction and the in-memory server
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod normalize;
pub mod path;
pub mod provider;
pub mod record;
pub mod records;
pub mod registry;
pub mod selector;
pub mod session;
pub mod value;

pub use config::RecordsConfig;
pub use error::{JamfError, Result};
pub use path::PathQuery;
pub use provider::memory::{Call, MemServer};
pub use provider::{ConnectionProvider, ProviderError};
pub use record::{Record, RecordId, RecordState};
pub use records::{RecordHandle, Records};
pub use registry::{Operation, TypeDescriptor, TypeRegistry};
pub use selector::{DeleteReport, RecordSelector};
pub use session::Session;
pub use value::Value;
