//! Persistence laws of the record store.
//!
//! Drives long insert/delete/clear sequences against file-backed storage
//! and checks after every step that a fresh load equals memory.

use ui_refine_lib::store::STORAGE_KEY;
use ui_refine_lib::{AnalysisRecord, FileStorage, NewAnalysis, RecordStore, Storage};

/// Small deterministic generator so sequences are reproducible.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn record(rng: &mut XorShift, n: usize) -> AnalysisRecord {
    let with_code = rng.below(2) == 0;
    let mut r = AnalysisRecord::pending(
        NewAnalysis {
            screen_name: format!("screen-{}", n),
            url: (rng.below(3) == 0).then(|| format!("https://example.com/{}", n)),
            code_snippet: with_code.then(|| format!("<div>{}</div>", n)),
            ..Default::default()
        },
        Some("data:image/png;base64,AAAA".to_string()),
    );
    r.timestamp = rng.below(50) as i64;
    match rng.below(3) {
        0 => {}
        1 => {
            r.begin_analysis().unwrap();
            r.complete(format!("report {}", n)).unwrap();
        }
        _ => {
            r.begin_analysis().unwrap();
            r.fail(format!("error {}", n)).unwrap();
        }
    }
    r
}

fn reload(dir: &std::path::Path) -> Vec<AnalysisRecord> {
    RecordStore::open(FileStorage::new(dir)).records().to_vec()
}

fn assert_sorted(records: &[AnalysisRecord]) {
    assert!(records.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[test]
fn persisted_state_matches_memory_after_every_operation() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RecordStore::open(FileStorage::new(dir.path()));
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);

    for step in 0..300 {
        match rng.below(10) {
            0..=5 => {
                let r = record(&mut rng, step);
                store.insert(r).unwrap();
            }
            6..=8 if !store.is_empty() => {
                let idx = rng.below(store.len() as u64) as usize;
                let id = store.records()[idx].id.clone();
                assert!(store.delete_by_id(&id).unwrap());
            }
            9 => store.clear_all().unwrap(),
            _ => {}
        }

        assert_sorted(store.records());
        let loaded = reload(dir.path());
        assert_eq!(loaded, store.records(), "mismatch after step {}", step);

        let entry = store.storage().get_item(STORAGE_KEY).unwrap();
        assert_eq!(entry.is_none(), store.is_empty(), "entry presence at step {}", step);
    }
}

#[test]
fn newest_insert_loads_first_only_when_newest() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RecordStore::open(FileStorage::new(dir.path()));
    let mut rng = XorShift(42);

    for n in 0..5 {
        let mut r = record(&mut rng, n);
        r.timestamp = 100 + n as i64;
        store.insert(r).unwrap();
    }

    let mut newest = record(&mut rng, 10);
    newest.timestamp = 1_000;
    let newest_id = newest.id.clone();
    store.insert(newest).unwrap();
    assert_eq!(reload(dir.path())[0].id, newest_id);

    let mut older = record(&mut rng, 11);
    older.timestamp = 50;
    let older_id = older.id.clone();
    store.insert(older).unwrap();
    let loaded = reload(dir.path());
    assert_ne!(loaded[0].id, older_id);
    assert_eq!(loaded.last().unwrap().id, older_id);
}

#[test]
fn clear_all_then_reload_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RecordStore::open(FileStorage::new(dir.path()));
    let mut rng = XorShift(7);
    for n in 0..4 {
        store.insert(record(&mut rng, n)).unwrap();
    }
    store.clear_all().unwrap();

    assert!(reload(dir.path()).is_empty());
    assert!(store.storage().get_item(STORAGE_KEY).unwrap().is_none());
}

#[test]
fn corrupt_file_is_discarded_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FileStorage::new(dir.path());
    storage
        .set_item(STORAGE_KEY, r#"[{"id": 1, "screenName": true}]"#)
        .unwrap();

    let store = RecordStore::open(storage);
    assert!(store.is_empty());
    assert!(!dir.path().join("screenAnalyses.json").exists());
}
