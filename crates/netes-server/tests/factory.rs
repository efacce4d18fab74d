//! Backend factory behavior: single construction, isolation, no poisoning.
#![allow(clippy::tests_outside_test_module)]

mod common;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{TestBuilder, TestLookup, embedded, embedded_with_network, factory};
use netes_cluster::{Cluster, ClusterRequest};
use netes_server::{BackendError, FactoryError};

#[tokio::test]
async fn concurrent_requests_build_once() {
    let lookup = TestLookup::with([embedded("c1")]);
    let builder = TestBuilder::slow(Duration::from_millis(50));
    let factory = factory(lookup.clone(), builder.clone());

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let factory = factory.clone();
        tasks.push(tokio::spawn(async move {
            factory.get(&ClusterRequest::new("c1")).await
        }));
    }

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().unwrap().unwrap());
    }

    assert_eq!(builder.builds(), 1);
    assert_eq!(lookup.calls(), 1);
    assert_eq!(factory.len(), 1);
    let first = &handles[0];
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, first)));
}

#[tokio::test]
async fn repeated_lookups_return_same_handle() {
    let lookup = TestLookup::with([embedded("c1")]);
    let factory = factory(lookup.clone(), TestBuilder::new());

    let a = factory.get(&ClusterRequest::new("c1")).await.unwrap().unwrap();
    let b = factory.get(&ClusterRequest::new("c1")).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(a.cluster(), b.cluster()));
    assert_eq!(lookup.calls(), 1);
}

#[tokio::test]
async fn slow_build_does_not_block_others() {
    let lookup = TestLookup::with([embedded("slow"), embedded("fast")]);
    let builder = TestBuilder::new();
    builder.delay("slow", Duration::from_secs(2));
    let factory = factory(lookup, builder.clone());

    let slow = {
        let factory = factory.clone();
        tokio::spawn(async move { factory.get(&ClusterRequest::new("slow")).await })
    };
    // let the slow build start first
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(builder.builds(), 1);

    let start = Instant::now();
    let fast = factory.get(&ClusterRequest::new("fast")).await.unwrap();
    assert!(fast.is_some());
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(builder.builds(), 2);
    assert!(!slow.is_finished());
    assert!(factory.cached("slow").is_none());
    slow.abort();
}

#[tokio::test]
async fn slow_lookup_does_not_block_others() {
    let lookup = TestLookup::with([embedded("slow"), embedded("fast")]);
    lookup.delay("slow", Duration::from_secs(2));
    let factory = factory(lookup, TestBuilder::new());

    let slow = {
        let factory = factory.clone();
        tokio::spawn(async move { factory.get(&ClusterRequest::new("slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let start = Instant::now();
    let fast = factory.get(&ClusterRequest::new("fast")).await.unwrap();
    assert!(fast.is_some());
    assert!(start.elapsed() < Duration::from_millis(500));
    assert!(!slow.is_finished());
    slow.abort();
}

#[tokio::test]
async fn mismatched_descriptor_is_rejected_and_not_built() {
    let lookup = TestLookup::with([]);
    lookup.insert_as("alias", embedded("canonical"));
    let builder = TestBuilder::new();
    let factory = factory(lookup.clone(), builder.clone());

    for _ in 0..5 {
        let err = factory.get(&ClusterRequest::new("alias")).await.unwrap_err();
        assert!(
            matches!(&err, FactoryError::ClusterMismatch { requested, resolved }
                if requested == "alias" && resolved == "canonical"),
            "got {err:?}"
        );
    }
    assert_eq!(builder.builds(), 0);
    assert_eq!(builder.closed(), 0);
    assert!(factory.is_empty());
    assert_eq!(lookup.calls(), 5);
}

#[tokio::test]
async fn not_found_then_found() {
    let lookup = TestLookup::with([]);
    let builder = TestBuilder::new();
    let factory = factory(lookup.clone(), builder.clone());

    assert!(factory.get(&ClusterRequest::new("c9")).await.unwrap().is_none());
    assert!(factory.is_empty());

    lookup.insert(embedded("c9"));
    let handle = factory.get(&ClusterRequest::new("c9")).await.unwrap().unwrap();
    assert_eq!(handle.cluster().id, "c9");
    assert_eq!(builder.builds(), 1);
}

#[tokio::test]
async fn lookup_errors_are_not_cached() {
    let lookup = TestLookup::with([embedded("c1")]);
    lookup.fail_next(1);
    let factory = factory(lookup.clone(), TestBuilder::new());

    let err = factory.get(&ClusterRequest::new("c1")).await.unwrap_err();
    assert!(matches!(err, FactoryError::Lookup(_)));
    assert!(factory.is_empty());

    assert!(factory.get(&ClusterRequest::new("c1")).await.unwrap().is_some());
    assert_eq!(lookup.calls(), 2);
}

#[tokio::test]
async fn build_errors_are_not_cached() {
    let lookup = TestLookup::with([embedded("c1")]);
    let builder = TestBuilder::new();
    builder.fail_next(1);
    let factory = factory(lookup, builder.clone());

    let err = factory.get(&ClusterRequest::new("c1")).await.unwrap_err();
    assert!(
        matches!(&err, FactoryError::Backend { cluster_id, source: BackendError::Build(_) } if cluster_id == "c1"),
        "got {err:?}"
    );
    assert!(factory.is_empty());

    assert!(factory.get(&ClusterRequest::new("c1")).await.unwrap().is_some());
    assert_eq!(builder.builds(), 2);
}

#[tokio::test]
async fn non_embedded_cluster_has_no_backend() {
    let plain = Cluster {
        id: "c2".into(),
        embedded: false,
        ..Default::default()
    };
    let builder = TestBuilder::new();
    let factory = factory(TestLookup::with([plain]), builder.clone());

    assert!(factory.get(&ClusterRequest::new("c2")).await.unwrap().is_none());
    assert_eq!(builder.builds(), 0);
    assert!(factory.is_empty());
}

#[tokio::test]
async fn request_without_cluster_id_is_none() {
    let lookup = TestLookup::with([embedded("c1")]);
    let factory = factory(lookup, TestBuilder::new());
    assert!(factory.get(&ClusterRequest::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn global_defaults_fill_cluster_settings() {
    let lookup = TestLookup::with([
        embedded("plain"),
        embedded_with_network("custom", "10.99.0.0/16", &["LimitRanger"]),
    ]);
    let builder = TestBuilder::new();
    let factory = factory(lookup, builder.clone());

    let plain = factory.get(&ClusterRequest::new("plain")).await.unwrap().unwrap();
    assert!(plain.cluster().k8s_server_config.is_some());
    factory.get(&ClusterRequest::new("custom")).await.unwrap().unwrap();

    let contexts = builder.contexts();
    let plain_ctx = contexts.iter().find(|c| c.cluster.id == "plain").unwrap();
    assert_eq!(plain_ctx.service_network.range().to_string(), "10.43.0.0/24");
    assert_eq!(plain_ctx.service_network.api_service_ip(), "10.43.0.1".parse::<IpAddr>().unwrap());
    assert_eq!(plain_ctx.admission_controllers.len(), 7);
    assert_eq!(plain_ctx.dialer.cluster_id(), "plain");

    let custom_ctx = contexts.iter().find(|c| c.cluster.id == "custom").unwrap();
    assert_eq!(custom_ctx.service_network.api_service_ip(), "10.99.0.1".parse::<IpAddr>().unwrap());
    assert_eq!(custom_ctx.admission_controllers, vec!["LimitRanger".to_string()]);
    assert_eq!(custom_ctx.dialer.cluster_id(), "custom");
}

#[tokio::test]
async fn invalid_service_cidr_fails_construction() {
    let lookup = TestLookup::with([embedded_with_network("bad", "10.0.0.0/40", &[])]);
    let builder = TestBuilder::new();
    let factory = factory(lookup, builder.clone());

    let err = factory.get(&ClusterRequest::new("bad")).await.unwrap_err();
    assert!(matches!(
        err,
        FactoryError::Backend {
            source: BackendError::InvalidServiceNet { .. },
            ..
        }
    ));
    assert_eq!(builder.builds(), 0);
    assert!(factory.is_empty());
}

#[tokio::test]
async fn close_all_closes_and_empties() {
    let lookup = TestLookup::with([embedded("a"), embedded("b")]);
    let builder = TestBuilder::new();
    let factory = factory(lookup, builder.clone());

    let a = factory.get(&ClusterRequest::new("a")).await.unwrap().unwrap();
    factory.get(&ClusterRequest::new("b")).await.unwrap().unwrap();
    assert_eq!(factory.len(), 2);

    factory.close_all();
    assert!(factory.is_empty());
    assert!(a.is_closed());
    assert_eq!(builder.closed(), 2);

    // a fresh request builds a new backend
    let again = factory.get(&ClusterRequest::new("a")).await.unwrap().unwrap();
    assert!(!Arc::ptr_eq(&a, &again));
    assert_eq!(builder.builds(), 3);
}
