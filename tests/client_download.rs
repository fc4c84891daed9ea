//! Integration tests for the client facade: metadata resolution, task
//! source registration, and round-robin connection selection.

mod common;

use common::{MemoryStore, TestConnector};
use dds::client::Client;
use dds::file::BlockId;
use dds::group::GroupConfig;
use dds::retry::RetryPolicy;
use dds::scheduler::PriorityDecider;
use std::sync::Arc;
use std::time::Duration;

struct AscendingPriority;

impl PriorityDecider for AscendingPriority {
    fn decide(&self, block: BlockId) -> (i64, bool) {
        (block as i64, block % 2 == 0)
    }
}

fn quick_config(key: &str) -> GroupConfig {
    let mut config = GroupConfig::new(key);
    config.watch_retry_delay = Duration::from_millis(10);
    config.update_retry = RetryPolicy {
        max_attempts: 2,
        delay: Duration::from_millis(10),
    };
    config
}

async fn start_client(
    store: Arc<MemoryStore>,
) -> (
    Client<TestConnector>,
    tokio::sync::mpsc::Receiver<dds::scheduler::BlockTask>,
) {
    store.set_members("/dds/servers", &["s1:9000", "s2:9000"]);
    store.set_members("/dds/peers", &["p1:9000"]);
    Client::start(
        store,
        TestConnector::new(),
        Arc::new(AscendingPriority),
        quick_config("/dds/servers"),
        quick_config("/dds/peers"),
        None,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn download_registers_all_blocks_in_priority_order() {
    let store = MemoryStore::new();
    store.put(
        "/dds/files/disk.img",
        r#"{"checksum":"abc123","timestamp":1700000000,"size":4096,"block_size":512}"#,
    );
    let (client, mut tasks) = start_client(store).await;

    let info = client.download("/dds/files/disk.img").await.unwrap();
    assert_eq!(info.checksum, "abc123");
    assert_eq!(info.block_count(), Some(8));

    for expected in 0..8usize {
        let task = tasks.recv().await.expect("one task per block");
        assert_eq!(task.file_key, "/dds/files/disk.img");
        assert_eq!(task.block, expected);
        assert_eq!(task.from_server, expected % 2 == 0);
    }
    client.shutdown().await;
}

#[tokio::test]
async fn downloads_are_drained_file_at_a_time() {
    let store = MemoryStore::new();
    store.put(
        "/f/a",
        r#"{"checksum":"a","timestamp":1,"size":1024,"block_size":512}"#,
    );
    store.put(
        "/f/b",
        r#"{"checksum":"b","timestamp":1,"size":512,"block_size":512}"#,
    );
    let (client, mut tasks) = start_client(store).await;

    client.download("/f/a").await.unwrap();
    client.download("/f/b").await.unwrap();

    let mut keys = Vec::new();
    for _ in 0..3 {
        keys.push(tasks.recv().await.unwrap().file_key);
    }
    assert_eq!(keys, vec!["/f/a", "/f/a", "/f/b"]);
    client.shutdown().await;
}

#[tokio::test]
async fn missing_record_is_an_error() {
    let store = MemoryStore::new();
    let (client, _tasks) = start_client(store).await;
    let err = client.download("/f/absent").await.unwrap_err();
    assert!(err.to_string().contains("/f/absent"));
    client.shutdown().await;
}

#[tokio::test]
async fn undecodable_record_is_an_error() {
    let store = MemoryStore::new();
    store.put("/f/garbage", "not json at all");
    let (client, _tasks) = start_client(store).await;
    let err = client.download("/f/garbage").await.unwrap_err();
    assert!(err.to_string().contains("decode file info"));
    client.shutdown().await;
}

#[tokio::test]
async fn zero_block_size_record_is_an_error() {
    let store = MemoryStore::new();
    store.put(
        "/f/zero",
        r#"{"checksum":"x","timestamp":1,"size":100,"block_size":0}"#,
    );
    let (client, _tasks) = start_client(store).await;
    let err = client.download("/f/zero").await.unwrap_err();
    assert!(err.to_string().contains("zero block size"));
    client.shutdown().await;
}

#[tokio::test]
async fn connection_pickers_rotate_through_groups() {
    let store = MemoryStore::new();
    let (client, _tasks) = start_client(store).await;
    assert_eq!(client.servers().size(), 2);
    assert_eq!(client.peers().size(), 1);

    let picks: Vec<String> = (0..4)
        .map(|_| client.server_connection().unwrap().endpoint)
        .collect();
    assert_eq!(picks, vec!["s1:9000", "s2:9000", "s1:9000", "s2:9000"]);

    // Single-member group keeps returning its only connection.
    assert_eq!(client.peer_connection().unwrap().endpoint, "p1:9000");
    assert_eq!(client.peer_connection().unwrap().endpoint, "p1:9000");
    client.shutdown().await;
}
