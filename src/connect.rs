//! Connection-factory capability.
//!
//! A `Connector` dials one endpoint and returns an open connection handle.
//! Dial parameters (TLS, timeouts, credentials) are the connector's own
//! state, set up by whoever constructs it. Connections are cheap clonable
//! handles in the style of an RPC channel; `close` releases the underlying
//! transport for every clone.

use anyhow::Result;
use async_trait::async_trait;

/// An open connection handle.
#[async_trait]
pub trait ServiceConnection: Clone + Send + Sync + 'static {
    /// Release the underlying transport. Called by the group when the
    /// endpoint leaves membership or a partially built refresh is aborted.
    async fn close(&self);
}

/// Dials endpoints on behalf of a service client group.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: ServiceConnection;

    /// Open a connection to `endpoint`.
    async fn connect(&self, endpoint: &str) -> Result<Self::Connection>;
}
