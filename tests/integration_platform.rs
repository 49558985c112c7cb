use adbreak::platform::{has_unbounded_duration, Capabilities, MediaHost, MemoryMediaHost, SourceId, TrackId};
use adbreak::snapshot::{self, CaptureOptions, RestoreOutcome, SnapshotStore};
use adbreak::{Error, PlayBlockStrategy};

fn playing_movie_at(position: f64) -> MemoryMediaHost {
    let mut h = MemoryMediaHost::with_source("movie", 600.0);
    h.set_position(position);
    h.select_track(Some(&TrackId("fr".into())));
    h.set_muted(true);
    h.play();
    h
}

#[test]
fn snapshot_round_trip_on_unchanged_source() {
    let mut host = playing_movie_at(73.5);
    let mut store = SnapshotStore::new();
    store.capture(&host, CaptureOptions::default()).expect("capture");

    host.attach_media("ad.mp4", 30.0);
    host.set_position(30.0);
    host.set_muted(false);

    let outcome = store.restore(&mut host, false).expect("restore");
    assert_eq!(outcome, RestoreOutcome::Resumed);
    assert_eq!(host.current_time(), 73.5);
    assert_eq!(host.active_track(), Some(TrackId("fr".into())));
    assert!(host.muted());
    assert_eq!(host.loads(), &[SourceId::new("movie")]);
    assert!(!store.is_live());
}

#[test]
fn second_capture_while_unresolved_is_an_invariant_violation() {
    let host = playing_movie_at(1.0);
    let mut store = SnapshotStore::new();
    store.capture(&host, CaptureOptions::default()).unwrap();
    let err = store.capture(&host, CaptureOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InvariantViolation(_)));
    // the first snapshot survives the failed attempt
    assert_eq!(store.get().map(|s| s.position), Some(1.0));
}

#[test]
fn restore_without_capture_is_an_invariant_violation() {
    let mut host = playing_movie_at(1.0);
    let mut store = SnapshotStore::new();
    assert!(matches!(
        store.restore(&mut host, false),
        Err(Error::InvariantViolation(_))
    ));
}

#[test]
fn capture_without_source_is_a_host_inconsistency() {
    let host = MemoryMediaHost::new();
    assert!(matches!(
        snapshot::capture(&host),
        Err(Error::HostInconsistency(_))
    ));
}

#[test]
fn replaced_source_is_left_alone() {
    let mut host = playing_movie_at(10.0);
    let mut store = SnapshotStore::new();
    store.capture(&host, CaptureOptions::default()).unwrap();

    host.set_content("other-movie", 100.0);
    let outcome = store.restore(&mut host, false).unwrap();
    assert_eq!(outcome, RestoreOutcome::SourceReplaced);
    assert_eq!(host.current_time(), 0.0);
    assert!(host.loads().is_empty());
}

#[test]
fn forced_restore_reloads_even_a_replaced_source() {
    let mut host = playing_movie_at(10.0);
    let snap = snapshot::capture(&host).unwrap();
    host.set_content("other-movie", 100.0);

    let outcome = snapshot::restore(&mut host, &snap, true);
    assert_eq!(outcome, RestoreOutcome::Resumed);
    assert_eq!(host.loads(), &[SourceId::new("movie")]);
    assert_eq!(host.current_time(), 10.0);
}

#[test]
fn live_snapshot_does_not_seek_back() {
    let mut host = playing_movie_at(500.0);
    host.set_duration(Some(f64::INFINITY));
    let mut store = SnapshotStore::new();
    let opts = CaptureOptions {
        live: true,
        ..Default::default()
    };
    assert!(store.capture(&host, opts).unwrap().live);

    host.set_position(530.0);
    store.restore(&mut host, false).unwrap();
    assert_eq!(host.current_time(), 530.0);
}

#[test]
fn pending_play_is_folded_into_the_snapshot() {
    let mut host = playing_movie_at(0.0);
    host.pause();
    let mut store = SnapshotStore::new();
    let opts = CaptureOptions {
        play_pending: true,
        ..Default::default()
    };
    assert!(!store.capture(&host, opts).unwrap().paused);
    assert_eq!(store.restore(&mut host, false).unwrap(), RestoreOutcome::Resumed);
    assert!(!host.paused());
}

#[test]
fn capabilities_pick_the_gate_strategy() {
    assert_eq!(
        PlayBlockStrategy::for_capabilities(&Capabilities::android()),
        PlayBlockStrategy::ReactiveCancel
    );
    assert!(!Capabilities::android().background_decode());
    assert!(Capabilities::desktop().background_decode());
}

#[test]
fn unbounded_duration_is_live() {
    let mut host = MemoryMediaHost::with_source("channel-7", 0.0);
    assert!(!has_unbounded_duration(&host));
    host.set_duration(Some(f64::INFINITY));
    assert!(has_unbounded_duration(&host));
}
