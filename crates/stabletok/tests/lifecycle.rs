#![allow(missing_docs)]

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use stabletok::{
    AdaptiveMonitor, StableIdAllocator, StableTokError, StoreOptions, TransactionalUpdater,
    VocabMapping, VocabStore,
    adaptive::MonitorOptions,
    allocation::{AllocatorOptions, build_stable_mapping},
    support::ManualClock,
    updater::{UpdateStatus, UpdaterOptions},
};

type T = u32;

struct Fixture {
    store: Arc<VocabStore<T>>,
    updater: TransactionalUpdater<T>,
    clock: Arc<ManualClock>,
}

fn fixture(accelerated: bool) -> Fixture {
    let options = AllocatorOptions::default();
    let mut tokens: Vec<String> = ('a'..='z').map(String::from).collect();
    tokens.push(" ".to_string());
    let mapping: VocabMapping<T> = build_stable_mapping(&tokens, &options).unwrap();

    let store = Arc::new(
        VocabStore::new(
            mapping,
            StoreOptions::default().with_accelerated(accelerated),
        )
        .unwrap(),
    );
    let clock = Arc::new(ManualClock::new(Duration::from_secs(1_700_000_000)));
    let updater = TransactionalUpdater::new(
        store.clone(),
        StableIdAllocator::new(options).unwrap(),
        UpdaterOptions::default(),
    )
    .unwrap()
    .with_clock(clock.clone());

    Fixture {
        store,
        updater,
        clock,
    }
}

fn ids_of(
    store: &VocabStore<T>,
    tokens: &[&str],
) -> Vec<T> {
    tokens.iter().map(|t| store.token_id(t.as_bytes())).collect()
}

#[test]
fn test_stage_validate_commit() {
    for accelerated in [false, true] {
        let Fixture { store, updater, .. } = fixture(accelerated);
        let letters: Vec<&str> = vec!["a", "b", "z", " "];
        let before = ids_of(&store, &letters);

        let stage_id = updater.stage(["quick", "brown", "fox"], BTreeMap::new());
        let metrics = updater
            .validate(&stage_id, ["the quick brown fox", "quick fox"])
            .unwrap();
        assert_eq!(metrics.tokens_assigned, 3);
        assert_eq!(metrics.unknown_token_rate, 0.0);
        assert_eq!(updater.staged(&stage_id).unwrap().status, UpdateStatus::Validated);

        assert!(updater.commit(&stage_id).unwrap());
        assert!(updater.staged(&stage_id).is_none());
        assert_eq!(updater.history().len(), 1);
        assert_eq!(updater.commit_record(&stage_id).unwrap().tokens_added, 3);

        // Old ids never move.
        assert_eq!(ids_of(&store, &letters), before);

        let tokens = store.tokenize("quick brown fox");
        assert_eq!(tokens.len(), 5);
        assert_eq!(store.decode(&tokens), "quick brown fox");
    }
}

#[test]
fn test_rejected_update_changes_nothing() {
    let Fixture { store, updater, .. } = fixture(true);
    let size = store.size();

    let stage_id = updater.stage(["hello"], BTreeMap::new());
    let metrics = updater.validate(&stage_id, ["hello 123 456"]).unwrap();
    assert!(metrics.unknown_token_rate > 0.1);

    assert!(!updater.commit(&stage_id).unwrap());
    assert_eq!(store.size(), size);
    assert!(updater.history().is_empty());

    assert!(updater.rollback(&stage_id));
    assert!(matches!(
        updater.commit(&stage_id),
        Err(StableTokError::UnknownStage { .. })
    ));
}

#[test]
fn test_commit_order_errors() {
    let Fixture { updater, .. } = fixture(false);

    let stage_id = updater.stage(["abc"], BTreeMap::new());
    assert!(matches!(
        updater.commit(&stage_id),
        Err(StableTokError::InvalidState { .. })
    ));

    updater.validate(&stage_id, ["abc"]).unwrap();
    assert!(matches!(
        updater.validate(&stage_id, ["abc"]),
        Err(StableTokError::UnknownStage { .. })
    ));

    assert!(!updater.rollback("stage_0_999"));
    assert!(matches!(
        updater.validate("stage_0_999", ["abc"]),
        Err(StableTokError::UnknownStage { .. })
    ));
}

#[test]
fn test_stage_ids_are_unique() {
    let Fixture { updater, .. } = fixture(false);
    let a = updater.stage(["x1"], BTreeMap::new());
    let b = updater.stage(["x1"], BTreeMap::new());
    assert_ne!(a, b);
    assert!(a.starts_with("stage_1700000000_"));
    assert_eq!(updater.staged_ids().len(), 2);
}

#[test]
fn test_state_round_trip() {
    let Fixture { store, updater, .. } = fixture(true);
    let stage_id = updater.stage(["hello", "world"], BTreeMap::new());
    updater.validate(&stage_id, ["hello world"]).unwrap();
    assert!(updater.commit(&stage_id).unwrap());

    let expected: Vec<(T, Vec<u8>)> = store
        .snapshot()
        .mapping()
        .tokens_by_id()
        .into_iter()
        .map(|(id, t)| (id, t.to_vec()))
        .collect();

    tempdir::TempDir::new("state_round_trip")
        .and_then(|dir| {
            let path = dir.path().join("state.json");
            updater.save_state(&path).expect("failed to save");

            let Fixture {
                store: fresh_store,
                updater: fresh,
                ..
            } = fixture(false);
            fresh.stage(["pending"], BTreeMap::new());
            fresh.load_state(&path).expect("failed to load");

            let actual: Vec<(T, Vec<u8>)> = fresh_store
                .snapshot()
                .mapping()
                .tokens_by_id()
                .into_iter()
                .map(|(id, t)| (id, t.to_vec()))
                .collect();
            assert_eq!(actual, expected);
            assert_eq!(fresh.history(), updater.history());
            assert!(fresh.staged_ids().is_empty());

            assert_eq!(
                fresh_store.tokenize("hello world"),
                store.tokenize("hello world")
            );
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_malformed_state_installs_nothing() {
    let Fixture { store, updater, .. } = fixture(false);
    let size = store.size();

    tempdir::TempDir::new("malformed_state")
        .and_then(|dir| {
            for (name, body) in [
                ("truncated.json", r#"{"format_version": 1, "mapping": ["#),
                (
                    "bad_b64.json",
                    r#"{"format_version": 1, "mapping": [{"token": "!!!", "id": 3}], "history": [], "saved_at": 0}"#,
                ),
                (
                    "dup_id.json",
                    r#"{"format_version": 1, "mapping": [{"token": "YQ==", "id": 3}, {"token": "Yg==", "id": 3}], "history": [], "saved_at": 0}"#,
                ),
                (
                    "version.json",
                    r#"{"format_version": 99, "mapping": [], "history": [], "saved_at": 0}"#,
                ),
            ] {
                let path = dir.path().join(name);
                std::fs::write(&path, body)?;
                assert!(
                    matches!(updater.load_state(&path), Err(StableTokError::Format(_))),
                    "{name}"
                );
                assert_eq!(store.size(), size, "{name}");
            }

            assert!(matches!(
                updater.load_state(dir.path().join("missing.json")),
                Err(StableTokError::Io(_))
            ));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_pinned_snapshot_survives_publish() {
    let Fixture { store, updater, .. } = fixture(true);
    let pinned = store.snapshot();
    let before = pinned.segment(b"hello");
    assert_eq!(before.len(), 5);

    let stage_id = updater.stage(["hello"], BTreeMap::new());
    updater.validate(&stage_id, ["hello"]).unwrap();
    assert!(updater.commit(&stage_id).unwrap());

    assert_eq!(pinned.segment(b"hello"), before);
    assert_eq!(store.tokenize("hello").len(), 1);
    assert!(store.snapshot().generation() > pinned.generation());
}

#[test]
fn test_concurrent_readers() {
    let Fixture { store, updater, .. } = fixture(true);
    let words: Vec<String> = ('a'..='t').map(|c| format!("zq{c}")).collect();
    let text = words.join(" ");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let store = store.clone();
            let text = text.clone();
            scope.spawn(move || {
                for _ in 0..200 {
                    // Every segmentation comes from a single whole snapshot.
                    let snapshot = store.snapshot();
                    let tokens = snapshot.segment(text.as_bytes());
                    assert_eq!(snapshot.decode(&tokens).len(), text.len());
                }
            });
        }

        for word in &words {
            let stage_id = updater.stage([word.clone()], BTreeMap::new());
            updater.validate(&stage_id, [word.as_str()]).unwrap();
            updater.commit(&stage_id).unwrap();
        }
    });

    for word in &words {
        assert!(store.contains(word.as_bytes()));
    }
}

#[test]
fn test_adaptation_loop() {
    let Fixture {
        store,
        updater,
        clock,
    } = fixture(true);
    let monitor = AdaptiveMonitor::with_clock(
        store.clone(),
        MonitorOptions::default()
            .with_window_capacity(4)
            .with_min_candidate_count(2)
            .with_cooldown(Duration::from_secs(60)),
        clock.clone(),
    )
    .unwrap();

    // Digits are unknown; the window fills, but the cooldown holds.
    for _ in 0..4 {
        let (_, summary) = monitor.tokenize_with_adaptation("ab12", &updater).unwrap();
        assert!(summary.is_none());
    }
    assert!(!monitor.should_trigger_adaptation());
    assert_eq!(monitor.rank_candidates()[0].text, "12");

    clock.advance(Duration::from_secs(61));
    let (tokens, summary) = monitor.tokenize_with_adaptation("ab12", &updater).unwrap();
    assert_eq!(tokens.len(), 4);

    let summary = summary.unwrap();
    assert!(summary.accepted);
    assert_eq!(summary.tokens_added, 1);
    assert!(store.contains(b"12"));
    assert_eq!(store.tokenize("ab12").len(), 3);

    let stats = monitor.stats();
    assert_eq!(stats.adaptation_events, 1);
    assert_eq!(stats.candidate_count, 0);
    assert!(!monitor.should_trigger_adaptation());
}
