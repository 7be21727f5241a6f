//! End-to-end tests: registry, fragment servers and downloads over loopback TCP.

use fragnet_core::Compression;
use fragnet_core::node::{DownloadConfig, NodeError, PeerClient};
use fragnet_integration_tests::fixtures::{
    Swarm, WarnCounter, dead_endpoint, patterned_data, vanishing_peer,
};
use fragnet_registry::{Registry, RegistryService};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const MIB: usize = 1024 * 1024;

fn small_fragments(fragment_size: u64) -> DownloadConfig {
    DownloadConfig {
        fragment_size,
        ..DownloadConfig::default()
    }
}

#[tokio::test]
async fn test_single_peer_download_reconstructs_file() {
    let data = patterned_data(5 * MIB / 2);
    let mut swarm = Swarm::new().await;
    swarm.add_peer(&[("movie.mkv", data.clone())]).await;

    let out = TempDir::new().unwrap();
    let destination = out.path().join("movie.mkv");
    let report = swarm
        .orchestrator(DownloadConfig::default())
        .download("movie.mkv", &destination)
        .await
        .unwrap();

    assert_eq!(report.file_size, 2_621_440);
    assert_eq!(report.fragment_count, 3);
    assert!(report.is_complete());
    assert_eq!(report.bytes_written, 2_621_440);
    assert_eq!(std::fs::read(&destination).unwrap(), data);
}

#[tokio::test]
async fn test_fragment_lengths_over_the_wire() {
    let data = patterned_data(5 * MIB / 2);
    let mut swarm = Swarm::new().await;
    let endpoint = swarm.add_peer(&[("movie.mkv", data.clone())]).await;
    let peer = PeerClient::new(endpoint);

    assert_eq!(peer.size_query("movie.mkv").await.unwrap(), Some(2_621_440));

    let mut rebuilt = Vec::new();
    let mut lengths = Vec::new();
    for index in 0..3 {
        let fragment = peer.fragment_query("movie.mkv", index).await.unwrap();
        lengths.push(fragment.len());
        rebuilt.extend_from_slice(&fragment);
    }
    assert_eq!(lengths, vec![1_048_576, 1_048_576, 524_288]);
    assert_eq!(rebuilt, data);

    let past_end = peer.fragment_query("movie.mkv", 3).await;
    assert!(matches!(past_end, Err(NodeError::OutOfRange { index: 3, .. })));

    let unshared = peer.fragment_query("other.mkv", 0).await;
    assert!(matches!(unshared, Err(NodeError::NotFound(_))));
    assert_eq!(peer.size_query("other.mkv").await.unwrap(), None);
}

#[tokio::test]
async fn test_unreachable_peer_leaves_its_fragments_missing() {
    const FRAGMENT: u64 = 1024;
    let (warnings, _guard) = WarnCounter::install();
    let data = patterned_data(4 * 1024 - 100);
    let mut swarm = Swarm::new().await;

    // A answers the size query and is gone by the time fragments are fetched
    let a = vanishing_peer(data.len() as u64).await;
    swarm.register_external("data.bin", &a).await;
    let b = swarm
        .add_peer_with(&[("data.bin", data.clone())], |config| {
            config.fragment_size = FRAGMENT;
        })
        .await;
    assert_eq!(
        swarm.registry().lookup("data.bin").await.unwrap(),
        vec![a, b]
    );

    let out = TempDir::new().unwrap();
    let destination = out.path().join("data.bin");
    let report = swarm
        .orchestrator(small_fragments(FRAGMENT))
        .download("data.bin", &destination)
        .await
        .unwrap();

    assert_eq!(report.fragment_count, 4);
    assert_eq!(report.missing, vec![0, 2]);
    assert!(!report.is_complete());
    // One warning per gap, nothing else
    assert_eq!(warnings.count(), 2);

    let mut expected = data[1024..2048].to_vec();
    expected.extend_from_slice(&data[3072..]);
    let written = std::fs::read(&destination).unwrap();
    assert_eq!(report.bytes_written, expected.len() as u64);
    assert!(written.len() < data.len());
    assert_eq!(written, expected);
}

#[tokio::test]
async fn test_unreachable_first_peer_aborts_download() {
    let mut swarm = Swarm::new().await;
    let dead = dead_endpoint().await;
    swarm.register_external("data.bin", &dead).await;
    swarm.add_peer(&[("data.bin", patterned_data(4096))]).await;

    let out = TempDir::new().unwrap();
    let destination = out.path().join("data.bin");
    let result = swarm
        .orchestrator(DownloadConfig::default())
        .download("data.bin", &destination)
        .await;

    assert!(matches!(result, Err(NodeError::SizeQuery { .. })));
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_unknown_file_contacts_no_peer() {
    // A registered "peer" that would notice any connection
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let registry = Arc::new(Registry::new());
    registry.register(
        "other.bin",
        fragnet_registry::Endpoint::from(listener.local_addr().unwrap()),
    );

    let orchestrator =
        fragnet_core::node::DownloadOrchestrator::new(registry, DownloadConfig::default())
            .unwrap();
    let out = TempDir::new().unwrap();
    let destination = out.path().join("never.bin");
    let result = orchestrator.download("never.bin", &destination).await;

    assert!(matches!(result, Err(NodeError::NotFound(_))));
    assert!(!destination.exists());
    let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
    assert!(accepted.is_err(), "a peer was contacted");
}

#[tokio::test]
async fn test_round_robin_across_peers() {
    const FRAGMENT: u64 = 4096;
    let (warnings, _guard) = WarnCounter::install();
    let data = patterned_data(10 * 4096 + 17);
    let mut swarm = Swarm::new().await;
    for _ in 0..3 {
        swarm
            .add_peer_with(&[("shared.iso", data.clone())], |config| {
                config.fragment_size = FRAGMENT;
            })
            .await;
    }

    let out = TempDir::new().unwrap();
    let destination = out.path().join("shared.iso");
    let report = swarm
        .orchestrator(small_fragments(FRAGMENT))
        .download("shared.iso", &destination)
        .await
        .unwrap();

    assert_eq!(report.fragment_count, 11);
    assert!(report.is_complete());
    assert_eq!(warnings.count(), 0);
    assert_eq!(std::fs::read(&destination).unwrap(), data);
}

#[tokio::test]
async fn test_lz4_compressed_download() {
    let mut data = vec![0u8; 3 * MIB];
    data[..MIB].copy_from_slice(&patterned_data(MIB));
    let mut swarm = Swarm::new().await;
    swarm
        .add_peer_with(&[("disk.img", data.clone())], |config| {
            config.compression = Compression::Lz4;
        })
        .await;

    let out = TempDir::new().unwrap();
    let destination = out.path().join("disk.img");
    let config = DownloadConfig {
        compression: Compression::Lz4,
        ..DownloadConfig::default()
    };
    let report = swarm
        .orchestrator(config)
        .download("disk.img", &destination)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(std::fs::read(&destination).unwrap(), data);
}

#[tokio::test]
async fn test_concurrency_ceiling_of_one() {
    const FRAGMENT: u64 = 1024;
    let data = patterned_data(20 * 1024);
    let mut swarm = Swarm::new().await;
    swarm
        .add_peer_with(&[("a.bin", data.clone())], |config| {
            config.fragment_size = FRAGMENT;
            config.max_connections = 1;
        })
        .await;

    let out = TempDir::new().unwrap();
    let destination = out.path().join("a.bin");
    let config = DownloadConfig {
        fragment_size: FRAGMENT,
        max_concurrent_fetches: 1,
        ..DownloadConfig::default()
    };
    let report = swarm
        .orchestrator(config)
        .download("a.bin", &destination)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(std::fs::read(&destination).unwrap(), data);
}

#[tokio::test]
async fn test_empty_file_download() {
    let mut swarm = Swarm::new().await;
    swarm.add_peer(&[("empty", Vec::new())]).await;

    let out = TempDir::new().unwrap();
    let destination = out.path().join("empty");
    let report = swarm
        .orchestrator(DownloadConfig::default())
        .download("empty", &destination)
        .await
        .unwrap();

    assert_eq!(report.fragment_count, 0);
    assert!(report.is_complete());
    assert_eq!(std::fs::read(&destination).unwrap(), Vec::<u8>::new());
}

#[tokio::test]
async fn test_stopped_peer_is_unregistered() {
    let mut swarm = Swarm::new().await;
    let a = swarm.add_peer(&[("a.bin", patterned_data(100))]).await;
    let b = swarm.add_peer(&[("a.bin", patterned_data(100))]).await;

    let registry = swarm.registry();
    assert_eq!(registry.lookup("a.bin").await.unwrap(), vec![a.clone(), b.clone()]);

    swarm.stop_peer(&a).await;
    assert_eq!(registry.lookup("a.bin").await.unwrap(), vec![b.clone()]);

    swarm.stop_peer(&b).await;
    assert!(registry.lookup("a.bin").await.unwrap().is_empty());
    assert!(registry.files().await.unwrap().is_empty());

    let out = TempDir::new().unwrap();
    let result = swarm
        .orchestrator(DownloadConfig::default())
        .download("a.bin", out.path().join("a.bin"))
        .await;
    assert!(matches!(result, Err(NodeError::NotFound(_))));
}

#[tokio::test]
async fn test_registry_lists_shared_files() {
    let mut swarm = Swarm::new().await;
    swarm
        .add_peer(&[("b.bin", vec![1]), ("a.bin", vec![2])])
        .await;
    swarm.add_peer(&[("c.bin", vec![3])]).await;

    let files = swarm.registry().files().await.unwrap();
    assert_eq!(files, vec!["a.bin", "b.bin", "c.bin"]);
}

#[tokio::test]
async fn test_file_changed_on_disk_is_served_as_is() {
    let mut swarm = Swarm::new().await;
    let endpoint = swarm.add_peer(&[("log.txt", b"first".to_vec())]).await;
    let peer = PeerClient::new(endpoint);

    assert_eq!(peer.size_query("log.txt").await.unwrap(), Some(5));

    std::fs::write(swarm.peers[0].path("log.txt"), b"first second").unwrap();
    assert_eq!(peer.size_query("log.txt").await.unwrap(), Some(12));

    std::fs::remove_file(swarm.peers[0].path("log.txt")).unwrap();
    assert_eq!(peer.size_query("log.txt").await.unwrap(), None);
}
