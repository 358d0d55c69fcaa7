use std::sync::Arc;
use std::time::Duration;

use camscan::config::ScanConfig;
use camscan::engine::ScanEngine;
use camscan::probe::{Probe, TcpProbe};
use camscan::types::{Finding, ScanEvent, Target};
use futures::StreamExt;
use tokio::net::TcpListener;

#[tokio::test]
async fn listening_port_is_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let probe = TcpProbe::new(Duration::from_secs(1));
    assert!(probe.is_open("127.0.0.1", port).await);
}

#[tokio::test]
async fn closed_port_is_not_open() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let probe = TcpProbe::new(Duration::from_secs(1));
    assert!(!probe.is_open("127.0.0.1", port).await);
}

#[tokio::test]
async fn unresolvable_target_is_not_open() {
    let probe = TcpProbe::new(Duration::from_secs(1));
    assert!(!probe.is_open("bad-ip.invalid", 80).await);
    assert!(!probe.is_open("not an address", 80).await);
}

#[tokio::test]
async fn engine_reports_real_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_port = listener.local_addr().unwrap().port();
    let closed_port = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    };

    let config = ScanConfig {
        ports: vec![closed_port, open_port],
        pacing_ms: 0,
        ..ScanConfig::default()
    };
    let engine = ScanEngine::with_probe(
        config.clone(),
        Arc::new(TcpProbe::new(config.timeout())),
    );
    let events: Vec<ScanEvent> = engine
        .scan(vec![Target::parse("127.0.0.1").unwrap()])
        .collect()
        .await;

    let expected = Finding {
        target: Target::parse("127.0.0.1").unwrap(),
        port: open_port,
    };
    assert!(events.contains(&ScanEvent::PortOpen(expected.clone())));
    assert!(events.contains(&ScanEvent::Summary {
        findings: vec![expected]
    }));
}
