//! Download client facade.
//!
//! Owns the two service groups ("servers" and "peers") and the task
//! scheduler, and turns a download request into a registered block task
//! source. Workers (out of scope here) consume the task stream, pick
//! connections round-robin from the groups, and write blocks through the
//! file abstraction.

use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::connect::Connector;
use crate::file::FileInfo;
use crate::group::{ErrorHandler, GroupConfig, ServiceClientGroup};
use crate::scheduler::{BlockTask, BlockTaskSource, PriorityDecider, TaskScheduler};
use crate::store::MembershipStore;

/// Distributed download client core.
pub struct Client<C: Connector> {
    store: Arc<dyn MembershipStore>,
    servers: Arc<ServiceClientGroup<C>>,
    peers: Arc<ServiceClientGroup<C>>,
    scheduler: TaskScheduler,
    priority: Arc<dyn PriorityDecider>,
    server_cursor: AtomicUsize,
    peer_cursor: AtomicUsize,
}

impl<C: Connector + Clone> Client<C> {
    /// Build the client: bring up both service groups (initial
    /// membership load included) and start the task scheduler. The
    /// returned receiver is the task stream for the worker pool.
    pub async fn start(
        store: Arc<dyn MembershipStore>,
        connector: C,
        priority: Arc<dyn PriorityDecider>,
        servers_config: GroupConfig,
        peers_config: GroupConfig,
        on_error: Option<ErrorHandler>,
    ) -> Result<(Self, mpsc::Receiver<BlockTask>)> {
        let servers = ServiceClientGroup::start(
            Arc::clone(&store),
            connector.clone(),
            servers_config,
            on_error.clone(),
        )
        .await
        .context("create service client group for servers fail")?;
        let peers = ServiceClientGroup::start(Arc::clone(&store), connector, peers_config, on_error)
            .await
            .context("create service client group for peers fail")?;

        let (scheduler, tasks) = TaskScheduler::spawn();
        Ok((
            Self {
                store,
                servers,
                peers,
                scheduler,
                priority,
                server_cursor: AtomicUsize::new(0),
                peer_cursor: AtomicUsize::new(0),
            },
            tasks,
        ))
    }

    /// Resolve the file-info record at `key` and register a block task
    /// source for it. Returns the decoded metadata; a missing or
    /// undecodable record is an error to the caller, not retried.
    pub async fn download(&self, key: &str) -> Result<FileInfo> {
        let raw = self
            .store
            .get(key)
            .await
            .with_context(|| format!("read file info at {:?} fail", key))?;
        let info: FileInfo = serde_json::from_str(&raw)
            .with_context(|| format!("decode file info at {:?} fail", key))?;
        let blocks = info
            .block_count()
            .ok_or_else(|| anyhow!("file info at {:?} has zero block size", key))?;

        tracing::info!(key, size = info.size, blocks, "download registered");
        let source = BlockTaskSource::new(key, blocks, self.priority.as_ref());
        self.scheduler.add_source(source).await?;
        Ok(info)
    }

    /// Next server connection, round-robin. `None` while the group is empty.
    pub fn server_connection(&self) -> Option<C::Connection> {
        pick(&self.servers, &self.server_cursor)
    }

    /// Next peer connection, round-robin. `None` while the group is empty.
    pub fn peer_connection(&self) -> Option<C::Connection> {
        pick(&self.peers, &self.peer_cursor)
    }

    /// The servers group, for direct membership inspection.
    pub fn servers(&self) -> &Arc<ServiceClientGroup<C>> {
        &self.servers
    }

    /// The peers group, for direct membership inspection.
    pub fn peers(&self) -> &Arc<ServiceClientGroup<C>> {
        &self.peers
    }

    /// Stop the scheduler loop and both watch loops.
    pub async fn shutdown(self) {
        self.servers.shutdown();
        self.peers.shutdown();
        self.scheduler.shutdown().await;
    }
}

fn pick<C: Connector>(
    group: &ServiceClientGroup<C>,
    cursor: &AtomicUsize,
) -> Option<C::Connection> {
    let size = group.size();
    if size == 0 {
        return None;
    }
    let index = cursor.fetch_add(1, Ordering::Relaxed) % size;
    group.connection(index)
}
