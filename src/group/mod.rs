//! Live service connection group.
//!
//! Mirrors the membership published under one coordination-store key as
//! an ordered list of open connections. A refresh diffs against the
//! current list so connections to unchanged endpoints survive; a
//! background watch loop keeps the list current for the process
//! lifetime, absorbing store and dial failures with bounded retries.

mod config;
mod watch;

pub use config::{ErrorHandler, GroupConfig};

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch as watch_channel;

use crate::connect::{Connector, ServiceConnection};
use crate::store::MembershipStore;

struct NamedConnection<T> {
    name: String,
    conn: T,
}

/// Ordered set of open connections to one service group ("servers",
/// "peers"). Callers pick connections by index for round-robin use; a
/// returned handle is not guaranteed valid past the next refresh.
pub struct ServiceClientGroup<C: Connector> {
    config: GroupConfig,
    store: Arc<dyn MembershipStore>,
    connector: C,
    conns: Mutex<Vec<NamedConnection<C::Connection>>>,
    on_error: Option<ErrorHandler>,
    shutdown_tx: watch_channel::Sender<bool>,
    watch_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<C: Connector> ServiceClientGroup<C> {
    /// Build the group, perform the initial refresh, and start the
    /// background watch loop. Fails if the initial refresh fails.
    pub async fn start(
        store: Arc<dyn MembershipStore>,
        connector: C,
        config: GroupConfig,
        on_error: Option<ErrorHandler>,
    ) -> Result<Arc<Self>> {
        let (shutdown_tx, _) = watch_channel::channel(false);
        let group = Arc::new(Self {
            config,
            store,
            connector,
            conns: Mutex::new(Vec::new()),
            on_error,
            shutdown_tx,
            watch_handle: Mutex::new(None),
        });
        group.refresh().await?;
        let handle = tokio::spawn(Arc::clone(&group).watch_loop());
        *group.watch_handle.lock().unwrap() = Some(handle);
        Ok(group)
    }

    /// Number of live connections.
    pub fn size(&self) -> usize {
        self.conns.lock().unwrap().len()
    }

    /// Connection handle at `index` in membership order.
    pub fn connection(&self, index: usize) -> Option<C::Connection> {
        self.conns
            .lock()
            .unwrap()
            .get(index)
            .map(|named| named.conn.clone())
    }

    /// Endpoint addresses in membership order.
    pub fn endpoints(&self) -> Vec<String> {
        self.conns
            .lock()
            .unwrap()
            .iter()
            .map(|named| named.name.clone())
            .collect()
    }

    /// Signal the background watch loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for the watch loop to exit. Call after `shutdown` when the
    /// caller needs the loop gone, not just told to go.
    pub async fn stopped(&self) {
        let handle = self.watch_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Reconcile the connection list against the membership currently
    /// published in the store.
    ///
    /// Endpoints already connected keep their connection; new endpoints
    /// are dialed. A dial failure aborts the whole refresh: connections
    /// opened during the failed attempt are closed, the committed list is
    /// left untouched, and the error is returned. On success, connections
    /// whose endpoint left membership are closed after the new list is
    /// committed.
    pub async fn refresh(&self) -> Result<()> {
        let entries = self
            .store
            .list(&self.config.key)
            .await
            .with_context(|| format!("list members under {:?} fail", self.config.key))?;

        let old: HashMap<String, C::Connection> = {
            let conns = self.conns.lock().unwrap();
            conns
                .iter()
                .map(|named| (named.name.clone(), named.conn.clone()))
                .collect()
        };

        let mut next: Vec<NamedConnection<C::Connection>> = Vec::with_capacity(entries.len());
        let mut opened: Vec<C::Connection> = Vec::new();
        for entry in &entries {
            if let Some(conn) = old.get(&entry.endpoint) {
                next.push(NamedConnection {
                    name: entry.endpoint.clone(),
                    conn: conn.clone(),
                });
                continue;
            }
            match self.connector.connect(&entry.endpoint).await {
                Ok(conn) => {
                    opened.push(conn.clone());
                    next.push(NamedConnection {
                        name: entry.endpoint.clone(),
                        conn,
                    });
                }
                Err(err) => {
                    for conn in &opened {
                        conn.close().await;
                    }
                    return Err(err.context(format!("dial {:?} fail", entry.endpoint)));
                }
            }
        }

        let kept: HashSet<&str> = next.iter().map(|named| named.name.as_str()).collect();
        let dropped: Vec<C::Connection> = old
            .iter()
            .filter(|(name, _)| !kept.contains(name.as_str()))
            .map(|(_, conn)| conn.clone())
            .collect();

        let size = next.len();
        *self.conns.lock().unwrap() = next;
        tracing::debug!(key = %self.config.key, members = size, "membership refreshed");

        // Endpoints that left membership: release their transports.
        for conn in &dropped {
            conn.close().await;
        }
        Ok(())
    }

    fn report(&self, err: &anyhow::Error) {
        tracing::warn!(key = %self.config.key, error = %err, "service group error");
        if let Some(handler) = &self.on_error {
            handler(err);
        }
    }
}
