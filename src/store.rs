//! Coordination-store capability.
//!
//! The client core reads single values (file-info records), lists ordered
//! child entries under a path (service membership), and blocks on changes
//! beneath a path. The store itself (etcd, ZooKeeper, whatever) is
//! supplied by the caller; the core only depends on these traits.

use async_trait::async_trait;
use thiserror::Error;

/// One child entry under a membership key. `endpoint` is the stored value:
/// the dialable address of the member, which also serves as its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    /// Child key under the listed path. Carried for diagnostics, not
    /// interpreted by the core.
    pub key: String,
    /// Member endpoint address (the child value).
    pub endpoint: String,
}

impl MemberEntry {
    pub fn new(key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("watch stream closed")]
    WatchClosed,
    #[error("store backend: {0}")]
    Backend(String),
}

/// Read and watch primitives over the coordination store.
///
/// `list` must return children in the store's sorted order; the group
/// mirrors that order for round-robin selection.
#[async_trait]
pub trait MembershipStore: Send + Sync + 'static {
    /// Read a single value (e.g. a serialized file-info record).
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// List child entries under `key`, recursive and sorted.
    async fn list(&self, key: &str) -> Result<Vec<MemberEntry>, StoreError>;

    /// Open a watch over `key` and everything beneath it.
    async fn watch(&self, key: &str) -> Result<Box<dyn MembershipWatch>, StoreError>;
}

/// A live watch; `changed` blocks until the next change or a stream error.
#[async_trait]
pub trait MembershipWatch: Send {
    async fn changed(&mut self) -> Result<(), StoreError>;
}
