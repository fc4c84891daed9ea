//! Service group configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Callback invoked with every error the background watch loop absorbs.
/// Errors reported here are never fatal to the loop.
pub type ErrorHandler = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

/// Configuration for one service client group.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Coordination-store key whose children list the group's members.
    pub key: String,
    /// Delay before reopening the watch after a watch-stream failure.
    pub watch_retry_delay: Duration,
    /// Bounded retries for a failed refresh triggered by a notification.
    pub update_retry: RetryPolicy,
}

impl GroupConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            watch_retry_delay: Duration::from_secs(5),
            update_retry: RetryPolicy::default(),
        }
    }
}
