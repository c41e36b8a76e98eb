use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use trafficcache::{
    clock::{Clock, ManualClock},
    config::{CacheConfig, ConfigError},
    core::{store::TrafficStore, sweep::SweepError},
    query::TrafficQueries,
    runtime::{
        events::{CacheEvent, RejectReason},
        handle::{spawn_traffic_cache, IngestOutcome, RuntimeError},
    },
    traffic::TrafficReport,
    types::{IcaoAddress, TimestampMs},
};

const A1_FIX: &str = r#"{"Icao_addr":"A1","Position_valid":true,"Lat":47.5,"Lng":-122.3,"OnGround":false,"Distance":1200.0,"Alt":3500.0,"Bearing":90.0}"#;

fn icao(raw: &str) -> IcaoAddress {
    raw.parse().expect("icao")
}

fn manual_config() -> CacheConfig {
    CacheConfig {
        sweep_interval_ms: 0,
        ..CacheConfig::default()
    }
}

async fn next_event(sub: &mut tokio::sync::broadcast::Receiver<CacheEvent>) -> CacheEvent {
    tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("event")
        .expect("recv")
}

/// Clock that panics while armed.
struct FaultyClock {
    inner: ManualClock,
    armed: Arc<AtomicBool>,
}

impl Clock for FaultyClock {
    fn now_ms(&self) -> TimestampMs {
        if self.armed.load(Ordering::SeqCst) {
            panic!("clock fault injected");
        }
        self.inner.now_ms()
    }
}

#[tokio::test]
async fn reliable_record_is_served_then_evicted_after_ttl() {
    let clock = ManualClock::new(1_000_000);
    let handle = spawn_traffic_cache(TrafficStore::new(), Arc::new(clock.clone()), manual_config());

    let outcome = handle.ingest_message(A1_FIX).await.expect("ingest");
    assert_eq!(outcome, IngestOutcome::Tracked(icao("A1")));

    let reliable = handle.traffic_reliable().await.expect("reliable");
    assert_eq!(reliable[&icao("A1")].display_name, "A1");

    clock.advance(Duration::from_millis(2_000));
    let summary = handle.sweep_now().await.expect("sweep");
    assert_eq!((summary.retained, summary.evicted), (1, 0));

    clock.advance(Duration::from_millis(1));
    let summary = handle.sweep_now().await.expect("sweep");
    assert_eq!((summary.retained, summary.evicted), (0, 1));

    assert!(handle.traffic_full().await.expect("full").is_empty());
    assert_eq!(handle.traffic_detail("A1").await.expect("detail"), None);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn events_follow_command_order() {
    let clock = ManualClock::new(10_000);
    let handle = spawn_traffic_cache(TrafficStore::new(), Arc::new(clock.clone()), manual_config());
    let mut sub = handle.subscribe();

    handle.ingest_message(r#"{"Icao_addr":"A1","Lat":1.0}"#).await.expect("ingest");
    handle.ingest_message(r#"{"Icao_addr":"A1","Lat":2.0}"#).await.expect("ingest");
    let malformed = handle.ingest_message("{not json").await.expect("ingest");
    let anonymous = handle.ingest_message(r#"{"Lat":3.0}"#).await.expect("ingest");
    assert_eq!(malformed, IngestOutcome::Rejected(RejectReason::Malformed));
    assert_eq!(anonymous, IngestOutcome::Rejected(RejectReason::MissingIdentifier));

    clock.advance(Duration::from_secs(5));
    handle.sweep_now().await.expect("sweep");

    let id = icao("A1");
    assert_eq!(next_event(&mut sub).await, CacheEvent::Tracked { id });
    assert_eq!(next_event(&mut sub).await, CacheEvent::Updated { id });
    assert_eq!(
        next_event(&mut sub).await,
        CacheEvent::Rejected {
            reason: RejectReason::Malformed
        }
    );
    assert_eq!(
        next_event(&mut sub).await,
        CacheEvent::Rejected {
            reason: RejectReason::MissingIdentifier
        }
    );
    assert_eq!(next_event(&mut sub).await, CacheEvent::Evicted { id });
    assert_eq!(
        next_event(&mut sub).await,
        CacheEvent::SweepCompleted {
            retained: 0,
            evicted: 1
        }
    );

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn sweep_timer_evicts_without_manual_trigger() {
    let clock = ManualClock::new(0);
    let config = CacheConfig {
        sweep_interval_ms: 100,
        ..CacheConfig::default()
    };
    let handle = spawn_traffic_cache(TrafficStore::new(), Arc::new(clock.clone()), config);
    let mut sub = handle.subscribe();

    handle
        .ingest(TrafficReport::for_id(icao("B2")))
        .await
        .expect("ingest");
    clock.set(10_000);

    let mut swept = false;
    for _ in 0..16 {
        let evt = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .expect("event")
            .expect("recv");
        if let CacheEvent::SweepCompleted { evicted: 1, .. } = evt {
            swept = true;
            break;
        }
    }
    assert!(swept, "expected a timer-driven sweep to evict B2");
    assert!(handle.snapshot().await.expect("snapshot").is_empty());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn faulted_sweep_leaves_store_intact_and_next_cycle_runs() {
    let armed = Arc::new(AtomicBool::new(false));
    let inner = ManualClock::new(1_000);
    let clock = FaultyClock {
        inner: inner.clone(),
        armed: Arc::clone(&armed),
    };
    let handle = spawn_traffic_cache(TrafficStore::new(), Arc::new(clock), manual_config());
    let mut sub = handle.subscribe();

    handle.ingest_message(A1_FIX).await.expect("ingest");
    let _ = next_event(&mut sub).await;

    inner.advance(Duration::from_secs(10));
    armed.store(true, Ordering::SeqCst);
    let err = handle.sweep_now().await.expect_err("sweep should fault");
    armed.store(false, Ordering::SeqCst);

    assert!(matches!(err, RuntimeError::Sweep(SweepError::Panicked(_))));
    assert_eq!(next_event(&mut sub).await, CacheEvent::SweepFailed);
    assert!(handle.get(icao("A1")).await.expect("get").is_some());

    let summary = handle.sweep_now().await.expect("sweep");
    assert_eq!(summary.evicted, 1);
    assert!(handle.get(icao("A1")).await.expect("get").is_none());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_never_see_partial_merges() {
    let clock = ManualClock::new(1_000);
    let handle = spawn_traffic_cache(TrafficStore::new(), Arc::new(clock), manual_config());
    let id = icao("ABC123");

    let mut tasks = Vec::new();
    for writer in 0..4u32 {
        let h = handle.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..200u32 {
                let v = f64::from(writer * 1_000 + i);
                let report = TrafficReport {
                    latitude: Some(v),
                    longitude: Some(v),
                    altitude: Some(v),
                    distance: Some(v),
                    bearing: Some(v),
                    ..TrafficReport::for_id(id)
                };
                h.ingest(report).await.expect("ingest");
            }
        }));
    }

    for _ in 0..2 {
        let h = handle.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..200 {
                let full = h.traffic_full().await.expect("full");
                if let Some(rec) = full.get(&id) {
                    let lat = rec.latitude;
                    assert_eq!(rec.longitude, lat);
                    assert_eq!(rec.altitude, lat);
                    assert_eq!(rec.distance, lat);
                    assert_eq!(rec.bearing, lat);
                }
            }
        }));
    }

    for task in tasks {
        task.await.expect("join");
    }

    let status = handle.service_status().await.expect("status");
    assert_eq!(status.tracked_traffic_count, 1);
    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn status_reset_and_detail_through_query_interface() {
    let clock = ManualClock::new(1_700_000_000_000);
    let handle = spawn_traffic_cache(TrafficStore::new(), Arc::new(clock.clone()), manual_config());
    let mut sub = handle.subscribe();

    let status = handle.service_status().await.expect("status");
    assert_eq!(status.seconds_since_last_ingest, None);
    assert_eq!(status.tracked_traffic_count, 0);

    handle.ingest_message(A1_FIX).await.expect("ingest");
    let _ = next_event(&mut sub).await;
    clock.advance(Duration::from_millis(1_500));

    let status = handle.service_status().await.expect("status");
    assert_eq!(status.seconds_since_last_ingest, Some(1.5));

    let receipt = handle.service_reset().await.expect("reset");
    assert_eq!(receipt.generation, 1);
    assert_eq!(handle.ingest_link().reset_generation(), 1);
    assert_eq!(
        next_event(&mut sub).await,
        CacheEvent::ResetRequested { generation: 1 }
    );
    let json = serde_json::to_value(&receipt).expect("json");
    assert_eq!(json["resetTime"], "Tue, 14 Nov 2023 22:13:21 GMT");

    assert_eq!(handle.service_reset().await.expect("reset").generation, 2);
    assert_eq!(handle.traffic_full().await.expect("full").len(), 1);

    let detail = handle.traffic_detail("a1").await.expect("detail").expect("tracked");
    assert_eq!(detail.latitude, Some(47.5));
    assert_eq!(handle.traffic_detail("zz-top").await.expect("detail"), None);
    assert_eq!(handle.service_info().server.name, "trafficcache");

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn calls_after_shutdown_report_closed_channel() {
    let handle = spawn_traffic_cache(
        TrafficStore::new(),
        Arc::new(ManualClock::new(0)),
        manual_config(),
    );
    handle.shutdown().await.expect("shutdown");

    let err = handle
        .ingest(TrafficReport::for_id(icao("A1")))
        .await
        .expect_err("closed");
    assert_eq!(err, RuntimeError::ChannelClosed);
    assert_eq!(
        handle.traffic_summary().await.expect_err("closed"),
        RuntimeError::ChannelClosed
    );
}

#[test]
fn config_overrides_come_from_lookup() {
    let config = CacheConfig::from_lookup(|key| match key {
        "TRAFFIC_TTL_MS" => Some("5000".to_string()),
        "TRAFFIC_SWEEP_INTERVAL_MS" => Some(" 0 ".to_string()),
        "TRAFFIC_INGEST_ADDR" => Some("10.0.0.2:30006".to_string()),
        "TRAFFIC_MAX_LINE_BYTES" => Some("4096".to_string()),
        _ => None,
    })
    .expect("config");

    assert_eq!(config.ttl(), Duration::from_secs(5));
    assert_eq!(config.sweep_interval(), None);
    assert_eq!(config.ingest_addr, "10.0.0.2:30006");
    assert_eq!(config.reconnect_delay(), Duration::from_secs(1));
    assert_eq!(config.max_line_bytes, 4096);

    let err = CacheConfig::from_lookup(|key| (key == "TRAFFIC_TTL_MS").then(|| "soon".to_string()))
        .expect_err("bad ttl");
    assert_eq!(
        err,
        ConfigError {
            key: "TRAFFIC_TTL_MS",
            value: "soon".to_string()
        }
    );

    let defaults = CacheConfig::default();
    assert_eq!(defaults.ttl_ms, 2_000);
    assert_eq!(defaults.max_line_bytes, 64 * 1024);
    assert_eq!(defaults.sweep_interval(), Some(Duration::from_secs(5)));
}
