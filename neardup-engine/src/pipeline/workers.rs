//! Signature worker pool.
//!
//! The calling thread ingests and dispatches documents into a bounded job
//! queue; a fixed set of scoped workers shingles, signs and indexes each
//! one; a single collector drains the result queue. Workers share nothing
//! mutable except the index target, whose adapter handles its own locking.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use neardup_core::errors::{IngestError, PipelineError, StorageError};
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::{DocHandle, Document, Signature};

use super::ingest::{IngestStage, IngestedDocument};
use crate::lsh::BandingIndex;
use crate::minhash::MinHasher;
use crate::shingle::{ShingleSet, Shingler};

/// A document that made it through SIGNED and INDEXED.
#[derive(Debug, Clone)]
pub struct SignedDocument {
    pub handle: DocHandle,
    pub id: String,
    pub signature: Signature,
    /// Kept only when exact verification needs it.
    pub shingles: Option<ShingleSet>,
}

/// Per-document outcome sent to the collector.
enum WorkResult {
    Signed(SignedDocument),
    /// The index already holds a different signature for this id.
    Conflict { id: String, error: StorageError },
    Fatal(PipelineError),
}

/// Everything the pool produced, in ingestion order.
#[derive(Debug, Default)]
pub struct PoolOutput {
    pub signed: Vec<SignedDocument>,
    pub conflicts: Vec<(String, StorageError)>,
    pub dispatch_ms: u64,
    /// Worker time summed across threads.
    pub shingle_ms: u64,
    pub sign_ms: u64,
    pub index_ms: u64,
}

pub struct SignaturePool<'a> {
    shingler: Shingler,
    hasher: &'a MinHasher,
    banding: BandingIndex,
    target: &'a dyn PersistenceAdapter,
    workers: usize,
    queue_capacity: usize,
    keep_shingles: bool,
}

#[derive(Default)]
struct WorkerClock {
    shingle_us: AtomicU64,
    sign_us: AtomicU64,
    index_us: AtomicU64,
}

impl<'a> SignaturePool<'a> {
    pub fn new(
        shingler: Shingler,
        hasher: &'a MinHasher,
        banding: BandingIndex,
        target: &'a dyn PersistenceAdapter,
    ) -> Self {
        Self {
            shingler,
            hasher,
            banding,
            target,
            workers: 1,
            queue_capacity: 1024,
            keep_shingles: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn keep_shingles(mut self, keep: bool) -> Self {
        self.keep_shingles = keep;
        self
    }

    /// Pull `docs` through ingest, then sign and index every admitted
    /// document. Stops at the first fatal error.
    pub fn run<I>(
        &self,
        docs: I,
        ingest: &mut IngestStage<'_>,
    ) -> Result<PoolOutput, PipelineError>
    where
        I: IntoIterator<Item = Result<Document, IngestError>>,
    {
        let (job_tx, job_rx) = bounded::<IngestedDocument>(self.queue_capacity);
        let (result_tx, result_rx) = bounded::<WorkResult>(self.queue_capacity);
        let abort = AtomicBool::new(false);
        let clock = WorkerClock::default();

        let (collected, dispatch_ms, panicked) = std::thread::scope(|scope| {
            let abort = &abort;
            let clock = &clock;

            let workers: Vec<_> = (0..self.workers)
                .map(|_| {
                    let jobs = job_rx.clone();
                    let results = result_tx.clone();
                    scope.spawn(move || self.work(jobs, results, abort, clock))
                })
                .collect();
            drop(job_rx);
            drop(result_tx);

            let collector = scope.spawn(move || collect(result_rx, abort));

            let started = Instant::now();
            // the cap is checked before pulling, so a lazy loader never
            // reads past it
            let mut records = docs.into_iter();
            while !ingest.limit_reached() && !abort.load(Ordering::Relaxed) {
                let Some(record) = records.next() else {
                    break;
                };
                if let Some(job) = ingest.admit(record) {
                    if job_tx.send(job).is_err() {
                        break;
                    }
                }
            }
            drop(job_tx);
            let dispatch_ms = started.elapsed().as_millis() as u64;

            let mut panicked = false;
            for worker in workers {
                panicked |= worker.join().is_err();
            }
            let collected = collector.join();
            (collected, dispatch_ms, panicked)
        });

        if panicked {
            return Err(PipelineError::Worker {
                message: "a signature worker panicked".to_string(),
            });
        }
        let (mut signed, conflicts) = collected.map_err(|_| PipelineError::Worker {
            message: "result collector panicked".to_string(),
        })??;

        signed.sort_by_key(|d| d.handle.index());
        Ok(PoolOutput {
            signed,
            conflicts,
            dispatch_ms,
            shingle_ms: clock.shingle_us.load(Ordering::Relaxed) / 1000,
            sign_ms: clock.sign_us.load(Ordering::Relaxed) / 1000,
            index_ms: clock.index_us.load(Ordering::Relaxed) / 1000,
        })
    }

    fn work(
        &self,
        jobs: Receiver<IngestedDocument>,
        results: Sender<WorkResult>,
        abort: &AtomicBool,
        clock: &WorkerClock,
    ) {
        for doc in jobs {
            if abort.load(Ordering::Relaxed) {
                // keep draining so the dispatcher never blocks on a full queue
                continue;
            }
            let result = self.process(doc, clock);
            if results.send(result).is_err() {
                return;
            }
        }
    }

    fn process(&self, doc: IngestedDocument, clock: &WorkerClock) -> WorkResult {
        let t = Instant::now();
        let shingles = self.shingler.shingle(&doc.text);
        clock
            .shingle_us
            .fetch_add(t.elapsed().as_micros() as u64, Ordering::Relaxed);

        let t = Instant::now();
        let signature = self.hasher.signature(&shingles);
        clock
            .sign_us
            .fetch_add(t.elapsed().as_micros() as u64, Ordering::Relaxed);

        let t = Instant::now();
        let indexed = self.banding.insert(self.target, &doc.id, &signature);
        clock
            .index_us
            .fetch_add(t.elapsed().as_micros() as u64, Ordering::Relaxed);

        match indexed {
            Ok(()) => WorkResult::Signed(SignedDocument {
                handle: doc.handle,
                id: doc.id,
                signature,
                shingles: self.keep_shingles.then_some(shingles),
            }),
            Err(PipelineError::Storage(error @ StorageError::WriteConflict { .. })) => {
                WorkResult::Conflict { id: doc.id, error }
            }
            Err(e) => WorkResult::Fatal(e),
        }
    }
}

type Collected = Result<(Vec<SignedDocument>, Vec<(String, StorageError)>), PipelineError>;

fn collect(results: Receiver<WorkResult>, abort: &AtomicBool) -> Collected {
    let mut signed = Vec::new();
    let mut conflicts = Vec::new();
    let mut fatal = None;
    for result in results {
        match result {
            WorkResult::Signed(doc) => signed.push(doc),
            WorkResult::Conflict { id, error } => conflicts.push((id, error)),
            WorkResult::Fatal(e) => {
                abort.store(true, Ordering::Relaxed);
                if fatal.is_none() {
                    tracing::error!(error = %e, "fatal error in signature worker; aborting run");
                    fatal = Some(e);
                }
            }
        }
    }
    match fatal {
        Some(e) => Err(e),
        None => Ok((signed, conflicts)),
    }
}
