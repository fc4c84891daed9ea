//! In-memory test doubles: a coordination store with watch support and a
//! connector that records every dial.

// Each integration binary uses a different slice of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use dds::connect::{Connector, ServiceConnection};
use dds::store::{MemberEntry, MembershipStore, MembershipWatch, StoreError};

pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    members: Mutex<HashMap<String, Vec<MemberEntry>>>,
    events: broadcast::Sender<String>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            values: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            events,
        })
    }

    pub fn put(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        let _ = self.events.send(key.to_string());
    }

    /// Number of live watch subscriptions.
    pub fn watcher_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Replace the membership under `key` and notify watchers.
    pub fn set_members(&self, key: &str, endpoints: &[&str]) {
        let entries = endpoints
            .iter()
            .enumerate()
            .map(|(i, endpoint)| MemberEntry::new(format!("{key}/{i}"), *endpoint))
            .collect();
        self.members.lock().unwrap().insert(key.to_string(), entries);
        let _ = self.events.send(key.to_string());
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list(&self, key: &str) -> Result<Vec<MemberEntry>, StoreError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn watch(&self, key: &str) -> Result<Box<dyn MembershipWatch>, StoreError> {
        Ok(Box::new(MemoryWatch {
            key: key.to_string(),
            rx: self.events.subscribe(),
        }))
    }
}

pub struct MemoryWatch {
    key: String,
    rx: broadcast::Receiver<String>,
}

#[async_trait]
impl MembershipWatch for MemoryWatch {
    async fn changed(&mut self) -> Result<(), StoreError> {
        loop {
            match self.rx.recv().await {
                Ok(changed_key) if changed_key.starts_with(&self.key) => return Ok(()),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return Ok(()),
                Err(broadcast::error::RecvError::Closed) => return Err(StoreError::WatchClosed),
            }
        }
    }
}

#[derive(Clone)]
pub struct TestConnection {
    pub endpoint: String,
    pub id: usize,
    closed: Arc<AtomicBool>,
}

impl TestConnection {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ServiceConnection for TestConnection {
    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

#[derive(Clone, Default)]
pub struct TestConnector {
    state: Arc<ConnectorState>,
}

#[derive(Default)]
pub struct ConnectorState {
    next_id: AtomicUsize,
    dialed: Mutex<Vec<TestConnection>>,
    refused: Mutex<HashSet<String>>,
}

impl TestConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future dials of `endpoint` fail.
    pub fn refuse(&self, endpoint: &str) {
        self.state
            .refused
            .lock()
            .unwrap()
            .insert(endpoint.to_string());
    }

    pub fn allow(&self, endpoint: &str) {
        self.state.refused.lock().unwrap().remove(endpoint);
    }

    /// Every connection ever handed out, in dial order.
    pub fn dialed(&self) -> Vec<TestConnection> {
        self.state.dialed.lock().unwrap().clone()
    }

    pub fn dialed_endpoints(&self) -> Vec<String> {
        self.dialed().iter().map(|c| c.endpoint.clone()).collect()
    }
}

#[async_trait]
impl Connector for TestConnector {
    type Connection = TestConnection;

    async fn connect(&self, endpoint: &str) -> anyhow::Result<TestConnection> {
        if self.state.refused.lock().unwrap().contains(endpoint) {
            anyhow::bail!("connection refused");
        }
        let conn = TestConnection {
            endpoint: endpoint.to_string(),
            id: self.state.next_id.fetch_add(1, Ordering::Relaxed),
            closed: Arc::new(AtomicBool::new(false)),
        };
        self.state.dialed.lock().unwrap().push(conn.clone());
        Ok(conn)
    }
}
