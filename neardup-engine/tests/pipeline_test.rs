//! End-to-end build and query runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use neardup_core::config::{NeardupConfig, VerifyMode};
use neardup_core::errors::{IngestError, PipelineError, SignatureError};
use neardup_core::events::{DocumentSkippedEvent, EventDispatcher, NeardupEventHandler, StageCompleteEvent};
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::Document;
use neardup_engine::DedupPipeline;
use neardup_storage::{MemoryStore, SqliteStore};

const FOX: &str = "the quick brown fox jumps over the lazy dog near the river bank today";
const DB: &str = "completely unrelated content about database indexing and query planning strategies";

fn config() -> NeardupConfig {
    let mut config = NeardupConfig::default();
    config.pipeline.workers = Some(2);
    config
}

fn corpus() -> Vec<Result<Document, IngestError>> {
    vec![
        Ok(Document::new("doc1", FOX)),
        Ok(Document::new("doc2", FOX)),
        Ok(Document::new("doc3", DB)),
    ]
}

fn ids(groups: &[&[&str]]) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = groups
        .iter()
        .map(|g| {
            let mut v: Vec<String> = g.iter().map(|s| s.to_string()).collect();
            v.sort();
            v
        })
        .collect();
    out.sort();
    out
}

#[test]
fn identical_pair_clusters_and_unrelated_stays_alone() {
    let pipeline = DedupPipeline::from_config(&config()).unwrap();
    let store = MemoryStore::new();
    let outcome = pipeline.build(&store, corpus()).unwrap();

    assert_eq!(outcome.report.partition(), ids(&[&["doc1", "doc2"], &["doc3"]]));
    let doc1 = outcome.report.assignment("doc1").unwrap();
    let doc2 = outcome.report.assignment("doc2").unwrap();
    let doc3 = outcome.report.assignment("doc3").unwrap();
    assert!(doc1.is_representative);
    assert!(!doc2.is_representative);
    assert_eq!(doc1.cluster_id, doc2.cluster_id);
    assert_ne!(doc1.cluster_id, doc3.cluster_id);
    assert!(doc3.is_representative);

    assert_eq!(outcome.summary.documents_processed, 3);
    assert_eq!(outcome.summary.duplicate_groups, 1);
    assert_eq!(outcome.edges.len(), 1);
    assert_eq!(outcome.neighbours()["doc2"], vec!["doc1"]);
    assert_eq!(store.signature_count().unwrap(), 3);
}

#[test]
fn malformed_documents_are_skipped_not_fatal() {
    let pipeline = DedupPipeline::from_config(&config()).unwrap();
    let store = MemoryStore::new();
    let mut docs = corpus();
    docs.push(Ok(Document::new("empty", "   ")));
    docs.push(Err(IngestError::InvalidJson {
        path: "broken.json".into(),
        message: "expected value".into(),
    }));
    docs.push(Ok(Document::new("doc1", DB)));

    let outcome = pipeline.build(&store, docs).unwrap();
    assert_eq!(outcome.summary.documents_seen, 6);
    assert_eq!(outcome.summary.documents_processed, 3);
    let codes: Vec<_> = outcome.summary.skipped.iter().map(|s| s.code).collect();
    assert_eq!(codes, vec!["MALFORMED_DOCUMENT", "SOURCE_ERROR", "DUPLICATE_ID"]);
    assert!(outcome.report.assignment("empty").is_none());
}

#[test]
fn max_docs_stops_pulling_records() {
    let mut capped = config();
    capped.ingest.max_docs = Some(2);
    let store = MemoryStore::new();

    let mut pulled = 0;
    let docs = corpus().into_iter().inspect(|_| pulled += 1);
    let outcome = DedupPipeline::from_config(&capped)
        .unwrap()
        .build(&store, docs)
        .unwrap();

    assert_eq!(pulled, 2);
    assert_eq!(outcome.summary.documents_seen, 2);
    assert_eq!(outcome.summary.documents_processed, 2);
    assert_eq!(store.signature_count().unwrap(), 2);
    assert!(outcome.report.assignment("doc3").is_none());
}

#[test]
fn zero_max_docs_means_no_cap() {
    let mut uncapped = config();
    uncapped.ingest.max_docs = Some(0);
    let store = MemoryStore::new();
    let outcome = DedupPipeline::from_config(&uncapped)
        .unwrap()
        .build(&store, corpus())
        .unwrap();

    assert_eq!(outcome.summary.documents_seen, 3);
    assert_eq!(outcome.summary.documents_processed, 3);
    assert_eq!(store.signature_count().unwrap(), 3);
}

#[test]
fn query_against_sqlite_index_reproduces_build_clusters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.db");

    let built = {
        let store = SqliteStore::open(&path).unwrap();
        let outcome = DedupPipeline::from_config(&config())
            .unwrap()
            .build(&store, corpus())
            .unwrap();
        store.checkpoint().unwrap();
        outcome
    };

    // separate store handle and pipeline, as a second process would have
    let store = SqliteStore::open_existing(&path).unwrap();
    let queried = DedupPipeline::from_config(&config())
        .unwrap()
        .query(&store, corpus())
        .unwrap();

    assert_eq!(built.report.partition(), queried.report.partition());
    assert_eq!(store.signature_count().unwrap(), 3);
}

#[test]
fn query_through_snapshot_matches_build() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("index.json");

    let source = SqliteStore::open_in_memory().unwrap();
    let built = DedupPipeline::from_config(&config())
        .unwrap()
        .build(&source, corpus())
        .unwrap();
    source.snapshot(&snapshot).unwrap();

    let restored = MemoryStore::from_snapshot(&snapshot).unwrap();
    let queried = DedupPipeline::from_config(&config())
        .unwrap()
        .query(&restored, corpus())
        .unwrap();
    assert_eq!(built.report.partition(), queried.report.partition());
}

#[test]
fn query_finds_duplicates_of_persisted_documents_and_writes_nothing() {
    let pipeline = DedupPipeline::from_config(&config()).unwrap();
    let store = MemoryStore::new();
    pipeline
        .build(&store, vec![Ok(Document::new("stored", FOX))])
        .unwrap();

    let outcome = pipeline
        .query(
            &store,
            vec![
                Ok(Document::new("fresh", FOX)),
                Ok(Document::new("other", DB)),
            ],
        )
        .unwrap();

    let fresh = outcome.report.assignment("fresh").unwrap();
    let stored = outcome.report.assignment("stored").unwrap();
    assert_eq!(fresh.cluster_id, stored.cluster_id);
    // run documents rank ahead of persisted-only ones
    assert!(fresh.is_representative);
    assert!(!stored.is_representative);
    assert_eq!(store.signature_count().unwrap(), 1);
    assert!(store.get_signature("fresh").unwrap().is_none());
}

#[test]
fn query_sees_duplicates_within_its_own_batch() {
    let pipeline = DedupPipeline::from_config(&config()).unwrap();
    let store = MemoryStore::new();
    pipeline
        .build(&store, vec![Ok(Document::new("seed", DB))])
        .unwrap();

    let outcome = pipeline
        .query(
            &store,
            vec![Ok(Document::new("q1", FOX)), Ok(Document::new("q2", FOX))],
        )
        .unwrap();
    assert_eq!(outcome.report.partition(), ids(&[&["q1", "q2"]]));
}

#[test]
fn seed_drift_between_build_and_query_is_fatal() {
    let store = MemoryStore::new();
    DedupPipeline::from_config(&config())
        .unwrap()
        .build(&store, corpus())
        .unwrap();

    let mut drifted = config();
    drifted.minhash.seed = Some(42);
    let err = DedupPipeline::from_config(&drifted)
        .unwrap()
        .query(&store, corpus())
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        PipelineError::Signature(SignatureError::ConfigDrift { ref field, .. }) if field == "minhash.seed"
    ));
}

fn at_threshold(threshold: f64) -> NeardupConfig {
    let mut config = config();
    config.lsh.threshold = Some(threshold);
    config
}

#[test]
fn query_at_new_threshold_uses_the_index_band_split() {
    let store = MemoryStore::new();
    let built = DedupPipeline::from_config(&config())
        .unwrap()
        .build(&store, corpus())
        .unwrap();

    let stricter = DedupPipeline::from_config(&at_threshold(0.9)).unwrap();
    assert_ne!(stricter.params(), DedupPipeline::from_config(&config()).unwrap().params());

    let queried = stricter.query(&store, corpus()).unwrap();
    assert_eq!(built.report.partition(), queried.report.partition());
    assert!(queried.edges.iter().all(|e| e.similarity >= 0.9));
}

#[test]
fn build_at_new_threshold_is_drift() {
    let store = MemoryStore::new();
    DedupPipeline::from_config(&config())
        .unwrap()
        .build(&store, corpus())
        .unwrap();

    let err = DedupPipeline::from_config(&at_threshold(0.9))
        .unwrap()
        .build(&store, corpus())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Signature(SignatureError::ConfigDrift { ref field, .. }) if field.starts_with("lsh.")
    ));
}

#[test]
fn explicit_band_split_must_match_on_query() {
    let store = MemoryStore::new();
    let built = DedupPipeline::from_config(&config()).unwrap();
    built.build(&store, corpus()).unwrap();

    let stored = built.params();
    let mut explicit = config();
    let (bands, rows) = if stored.rows == 4 { (16, 8) } else { (32, 4) };
    explicit.lsh.bands = Some(bands);
    explicit.lsh.rows = Some(rows);
    let err = DedupPipeline::from_config(&explicit)
        .unwrap()
        .query(&store, corpus())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Signature(SignatureError::ConfigDrift { ref field, .. }) if field == "lsh.bands"
    ));
}

#[test]
fn num_perm_change_is_length_mismatch() {
    let store = MemoryStore::new();
    DedupPipeline::from_config(&config())
        .unwrap()
        .build(&store, corpus())
        .unwrap();

    let mut shorter = config();
    shorter.minhash.num_perm = Some(64);
    let err = DedupPipeline::from_config(&shorter)
        .unwrap()
        .build(&store, corpus())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Signature(SignatureError::LengthMismatch { .. })
    ));
}

#[test]
fn query_without_index_is_missing_manifest() {
    let err = DedupPipeline::from_config(&config())
        .unwrap()
        .query(&MemoryStore::new(), corpus())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Signature(SignatureError::MissingManifest)));
}

#[test]
fn conflicting_rebuild_keeps_stored_signature() {
    let pipeline = DedupPipeline::from_config(&config()).unwrap();
    let store = SqliteStore::open_in_memory().unwrap();
    pipeline
        .build(&store, vec![Ok(Document::new("x", FOX))])
        .unwrap();
    let original = store.get_signature("x").unwrap().unwrap();

    let outcome = pipeline
        .build(
            &store,
            vec![Ok(Document::new("x", DB)), Ok(Document::new("y", FOX))],
        )
        .unwrap();

    let codes: Vec<_> = outcome.summary.skipped.iter().map(|s| s.code).collect();
    assert_eq!(codes, vec!["WRITE_CONFLICT"]);
    assert_eq!(store.get_signature("x").unwrap().unwrap(), original);
    // the stored x still matches y
    assert_eq!(outcome.report.partition(), ids(&[&["x", "y"]]));
}

#[test]
fn short_documents_are_degenerate_singletons() {
    let pipeline = DedupPipeline::from_config(&config()).unwrap();
    let store = MemoryStore::new();
    let outcome = pipeline
        .build(
            &store,
            vec![Ok(Document::new("s1", "two words")), Ok(Document::new("s2", "two words"))],
        )
        .unwrap();

    assert_eq!(outcome.summary.degenerate_documents, 2);
    assert_eq!(outcome.report.partition(), ids(&[&["s1"], &["s2"]]));
    assert_eq!(store.signature_count().unwrap(), 2);
}

#[test]
fn exact_mode_reports_true_jaccard() {
    let mut exact = config();
    exact.verify.mode = Some(VerifyMode::Exact);
    exact.lsh.threshold = Some(0.5);
    let pipeline = DedupPipeline::from_config(&exact).unwrap();

    let outcome = pipeline
        .build(
            &MemoryStore::new(),
            vec![Ok(Document::new("a", FOX)), Ok(Document::new("b", FOX))],
        )
        .unwrap();
    assert_eq!(outcome.edges.len(), 1);
    assert_eq!(outcome.edges[0].similarity, 1.0);
}

#[derive(Default)]
struct Counter {
    stages: AtomicUsize,
    skipped: AtomicUsize,
}

impl NeardupEventHandler for Counter {
    fn on_stage_complete(&self, _event: &StageCompleteEvent) {
        self.stages.fetch_add(1, Ordering::SeqCst);
    }

    fn on_document_skipped(&self, _event: &DocumentSkippedEvent) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn events_cover_every_stage_and_skip() {
    let counter = Arc::new(Counter::default());
    let mut events = EventDispatcher::new();
    events.register(counter.clone());

    let pipeline = DedupPipeline::from_config(&config())
        .unwrap()
        .with_events(events);
    let mut docs = corpus();
    docs.push(Ok(Document::new("blank", "")));
    let outcome = pipeline.build(&MemoryStore::new(), docs).unwrap();

    assert_eq!(counter.stages.load(Ordering::SeqCst), 7);
    assert_eq!(counter.skipped.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.summary.stages.len(), 7);
}
