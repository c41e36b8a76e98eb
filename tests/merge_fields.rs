use trafficcache::{
    core::{
        merge::{merge_report, MergeError},
        store::{TrafficStore, UpsertKind},
    },
    ingest::decode::decode_message,
    traffic::TrafficReport,
    types::IcaoAddress,
};

fn icao(raw: &str) -> IcaoAddress {
    raw.parse().expect("icao")
}

fn merge_json(store: &mut TrafficStore, json: &str, now_ms: u64) -> UpsertKind {
    let report = decode_message(json).expect("decode");
    merge_report(store, &report, now_ms).expect("merge").kind
}

#[test]
fn first_report_creates_and_later_reports_update() {
    let mut store = TrafficStore::new();
    assert_eq!(
        merge_json(&mut store, r#"{"Icao_addr":"ABC123","Lat":10.0}"#, 1_000),
        UpsertKind::Created
    );
    assert_eq!(
        merge_json(&mut store, r#"{"Icao_addr":"ABC123","Lng":20.0}"#, 1_100),
        UpsertKind::Updated
    );
    assert_eq!(store.len(), 1);

    let rec = store.get(icao("ABC123")).expect("record");
    assert_eq!(rec.latitude, Some(10.0));
    assert_eq!(rec.longitude, Some(20.0));
    assert_eq!(rec.last_update_ms, Some(1_100));
}

#[test]
fn omitted_null_and_blank_fields_keep_known_values() {
    let mut store = TrafficStore::new();
    merge_json(
        &mut store,
        r#"{"Icao_addr":"ABC123","Reg":"N123AB","Tail":"UAL12","Lat":10.0,"Squawk":"7000"}"#,
        1_000,
    );
    merge_json(&mut store, r#"{"Icao_addr":"ABC123","Alt":3500.0}"#, 1_100);
    merge_json(
        &mut store,
        r#"{"Icao_addr":"ABC123","Lat":null,"Reg":null,"Squawk":null}"#,
        1_200,
    );
    merge_json(&mut store, r#"{"Icao_addr":"ABC123","Tail":"   ","Reg":""}"#, 1_300);

    let rec = store.get(icao("ABC123")).expect("record");
    assert_eq!(rec.registration.as_deref(), Some("N123AB"));
    assert_eq!(rec.tail_number.as_deref(), Some("UAL12"));
    assert_eq!(rec.latitude, Some(10.0));
    assert_eq!(rec.altitude, Some(3500.0));
    assert_eq!(rec.squawk.as_deref(), Some("7000"));
    assert_eq!(rec.last_update_ms, Some(1_300));
}

#[test]
fn later_values_win_per_field() {
    let mut store = TrafficStore::new();
    merge_json(
        &mut store,
        r#"{"Icao_addr":"ABC123","Lat":10.0,"Position_valid":true,"OnGround":true}"#,
        1_000,
    );
    merge_json(
        &mut store,
        r#"{"Icao_addr":"ABC123","Lat":11.5,"Position_valid":false,"OnGround":false}"#,
        1_050,
    );

    let rec = store.get(icao("ABC123")).expect("record");
    assert_eq!(rec.latitude, Some(11.5));
    assert!(!rec.position_valid);
    assert_eq!(rec.on_ground, Some(false));
}

#[test]
fn re_merging_the_same_report_changes_nothing_but_the_stamp() {
    let report = decode_message(r#"{"Icao_addr":"ABC123","Lat":10.0,"Tail":"N1"}"#).expect("decode");
    let mut store = TrafficStore::new();
    merge_report(&mut store, &report, 1_000).expect("merge");
    let first = store.get_cloned(icao("ABC123")).expect("record");

    merge_report(&mut store, &report, 1_000).expect("merge");
    let second = store.get_cloned(icao("ABC123")).expect("record");
    assert_eq!(first, second);

    merge_report(&mut store, &report, 1_400).expect("merge");
    let third = store.get_cloned(icao("ABC123")).expect("record");
    assert_eq!(third.last_update_ms, Some(1_400));
    assert!(!report.is_empty());
    assert!(TrafficReport::for_id(icao("ABC123")).is_empty());
}

#[test]
fn report_without_identifier_is_rejected_and_store_untouched() {
    let mut store = TrafficStore::new();
    let report = decode_message(r#"{"Lat":10.0,"Tail":"N1"}"#).expect("decode");

    assert_eq!(
        merge_report(&mut store, &report, 1_000),
        Err(MergeError::MissingIdentifier)
    );
    assert!(store.is_empty());
    assert_eq!(store.last_ingest_ms(), None);
}

#[test]
fn stamp_never_moves_backwards_when_clock_does() {
    let mut store = TrafficStore::new();
    let report = TrafficReport {
        altitude: Some(1_000.0),
        ..TrafficReport::for_id(icao("A1"))
    };

    let first = merge_report(&mut store, &report, 5_000).expect("merge");
    assert_eq!(first.stamp_ms, 5_000);

    let second = merge_report(&mut store, &report, 3_000).expect("merge");
    assert_eq!(second.stamp_ms, 5_000);
    assert_eq!(
        store.get(icao("A1")).and_then(|r| r.last_update_ms),
        Some(5_000)
    );
    assert_eq!(store.last_ingest_ms(), Some(5_000));
}

#[test]
fn snapshots_do_not_see_later_merges() {
    let mut store = TrafficStore::new();
    merge_json(&mut store, r#"{"Icao_addr":"A1","Lat":1.0}"#, 1_000);
    let before = store.snapshot(1_000);

    merge_json(&mut store, r#"{"Icao_addr":"A1","Lat":2.0}"#, 1_100);
    merge_json(&mut store, r#"{"Icao_addr":"B2","Lat":3.0}"#, 1_100);

    assert_eq!(before.len(), 1);
    assert_eq!(
        before.records.get(&icao("A1")).and_then(|r| r.latitude),
        Some(1.0)
    );
    assert_eq!(store.snapshot(1_200).len(), 2);
}

#[test]
fn distinct_identifiers_are_independent() {
    let mut store = TrafficStore::new();
    merge_json(&mut store, r#"{"Icao_addr":"A1","Tail":"N1"}"#, 1_000);
    merge_json(&mut store, r#"{"Icao_addr":"B2","Tail":"N2"}"#, 1_000);

    let mut ids = store.ids();
    ids.sort();
    assert_eq!(ids, vec![icao("A1"), icao("B2")]);
    assert_eq!(
        store.get(icao("A1")).and_then(|r| r.tail_number.clone()).as_deref(),
        Some("N1")
    );
}
