//! The boundary to the server.
//!
//! A [`ConnectionProvider`] owns authentication and HTTP; it hands back
//! decoded documents and takes documents to send. Everything above it works
//! on [`Value`] trees and never sees a URL.
//!
//! Documents are always wrapped in their element name, as on the wire:
//! `{"computer": {...}}` for one record, `{"computers": [...]}` for a listing.

pub mod memory;

use crate::record::RecordId;
use crate::registry::TypeDescriptor;
use crate::value::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Abstract interface for talking to a Jamf server.
///
/// Methods take `&self`; implementations that keep state (sessions, tokens,
/// counters) use interior mutability. The crate is single-threaded, so
/// `RefCell` is enough.
pub trait ConnectionProvider {
    /// Fetch the listing (ids and names) of every record of a type.
    fn list(&self, ty: &TypeDescriptor) -> ProviderResult<Value>;

    /// Fetch one full record.
    fn get(&self, ty: &TypeDescriptor, id: RecordId) -> ProviderResult<Value>;

    /// Create a record; the response carries the new id.
    fn create(&self, ty: &TypeDescriptor, doc: &Value) -> ProviderResult<Value>;

    /// Replace a record.
    fn update(&self, ty: &TypeDescriptor, id: RecordId, doc: &Value) -> ProviderResult<()>;

    /// Delete a record.
    fn delete(&self, ty: &TypeDescriptor, id: RecordId) -> ProviderResult<()>;
}
