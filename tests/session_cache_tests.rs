//! Session cache invariants: one live client per cluster, single-flight
//! connects, teardown on removal.

use docdb_connect::client::{ClientSessionCache, ClusterClient};
use docdb_connect::config::ConnectSettings;
use docdb_connect::credentials::CredentialCache;
use docdb_connect::mock::{
    MockClientFactory, MockClusterClient, MockConnectionStore, MockPrompter, MockTokenBroker,
};
use docdb_connect::orchestrator::ConnectionOrchestrator;
use docdb_connect::store::StoredConnectionRecord;
use std::sync::Arc;

#[tokio::test]
async fn insert_replaces_prior_session() {
    let cache = ClientSessionCache::new();
    let first = Arc::new(MockClusterClient::new(vec!["one".to_string()]));
    let second = Arc::new(MockClusterClient::new(vec!["two".to_string()]));

    cache.insert("c1", first).await;
    cache.insert("c1", second).await;

    let cached = cache.get("c1").await.unwrap();
    assert_eq!(cached.list_databases().await.unwrap(), ["two"]);
}

#[tokio::test]
async fn delete_tears_down_the_client() {
    let cache = ClientSessionCache::new();
    let client = Arc::new(MockClusterClient::new(vec![]));
    cache.insert("c1", client.clone()).await;

    cache.delete("c1").await;
    assert!(!cache.exists("c1").await);
    assert_eq!(client.disconnect_count(), 1);
    assert!(!client.is_connected().await.unwrap());

    // Repeat deletes are no-ops
    cache.delete("c1").await;
    assert_eq!(client.disconnect_count(), 1);
}

#[tokio::test]
async fn keys_are_case_insensitive() {
    let cache = ClientSessionCache::new();
    cache
        .insert(
            "/Subscriptions/ABC/Clusters/One",
            Arc::new(MockClusterClient::new(vec![])),
        )
        .await;

    assert!(cache.exists("/subscriptions/abc/clusters/one").await);
    assert!(cache.get("/SUBSCRIPTIONS/ABC/CLUSTERS/ONE").await.is_some());
}

#[tokio::test]
async fn concurrent_connects_for_one_cluster_coalesce() {
    let store = Arc::new(MockConnectionStore::new());
    store
        .insert_record(StoredConnectionRecord {
            id: "c1".to_string(),
            name: "c1".to_string(),
            connection_string: "mongodb://u:p@host1:27017/".to_string(),
            auth_method: None,
            emulator: None,
        })
        .await;

    let factory = Arc::new(MockClientFactory::new());
    let orchestrator = Arc::new(ConnectionOrchestrator::new(
        Arc::new(CredentialCache::new()),
        Arc::new(ClientSessionCache::new()),
        store,
        Arc::new(MockPrompter::cancelled()),
        Arc::new(MockTokenBroker::signed_out()),
        factory.clone(),
        ConnectSettings::default(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.authenticate_and_connect("c1").await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    // Every caller got a session, only one authentication happened
    assert_eq!(factory.create_count(), 1);
    assert!(orchestrator.sessions().exists("c1").await);
}

#[tokio::test]
async fn guards_for_different_clusters_are_independent() {
    let cache = ClientSessionCache::new();
    let _guard_a = cache.begin_connect("cluster-a").await;
    // A second cluster's guard must not block behind the first
    let _guard_b = cache.begin_connect("cluster-b").await;
}
