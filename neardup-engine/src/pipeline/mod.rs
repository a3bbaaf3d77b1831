//! Build and query runs.
//!
//! Stages run strictly in order: INGESTED -> SHINGLED -> SIGNED -> INDEXED
//! -> CANDIDATE -> VERIFIED -> CLUSTERED. The first four happen per
//! document inside the worker pool; the rest run once over the whole batch.

pub mod ingest;
pub mod summary;
pub mod workers;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use neardup_core::config::{NeardupConfig, VerifyMode};
use neardup_core::errors::{ConfigError, IngestError, PipelineError, SignatureError, StorageError};
use neardup_core::events::{EventDispatcher, RunCompleteEvent, RunStartedEvent, StageCompleteEvent};
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::{
    DocHandle, DocInterner, Document, FxHashMap, IndexManifest, RunMode, Signature, Stage,
};
use neardup_storage::MemoryStore;
use rayon::prelude::*;
use serde::Serialize;

use self::ingest::IngestStage;
use self::summary::RunSummary;
use self::workers::{SignaturePool, SignedDocument};
use crate::cluster::{ClusterReport, DuplicateClusterer};
use crate::lsh::{BandingIndex, LshParams};
use crate::minhash::MinHasher;
use crate::shingle::Shingler;
use crate::verify::{CandidatePair, CandidateVerifier, VerifiedEdge, VerifyInput};

/// A verified pair, by document id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPair {
    pub left: String,
    pub right: String,
    pub similarity: f64,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize)]
pub struct DedupOutcome {
    pub report: ClusterReport,
    pub summary: RunSummary,
    pub edges: Vec<SimilarPair>,
}

impl DedupOutcome {
    /// Each document with the ids it was verified similar to, both
    /// directions, sorted.
    pub fn neighbours(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for edge in &self.edges {
            out.entry(edge.left.clone()).or_default().push(edge.right.clone());
            out.entry(edge.right.clone()).or_default().push(edge.left.clone());
        }
        for ids in out.values_mut() {
            ids.sort();
            ids.dedup();
        }
        out
    }
}

/// Configured detector. One instance serves any number of runs.
#[derive(Debug)]
pub struct DedupPipeline {
    shingler: Shingler,
    hasher: MinHasher,
    banding: BandingIndex,
    verifier: CandidateVerifier,
    manifest: IndexManifest,
    /// `[lsh] bands/rows` were set explicitly rather than derived from the
    /// threshold.
    explicit_bands: bool,
    workers: usize,
    queue_capacity: usize,
    max_docs: Option<usize>,
    events: EventDispatcher,
}

impl DedupPipeline {
    pub fn from_config(config: &NeardupConfig) -> Result<Self, ConfigError> {
        NeardupConfig::validate(config)?;

        let num_perm = config.minhash.effective_num_perm();
        let params = LshParams::from_config(&config.lsh, num_perm)?;
        let shingler = Shingler::from_config(&config.shingle);
        let hasher = MinHasher::from_config(&config.minhash);

        let manifest = IndexManifest {
            shingle_width: shingler.width(),
            shingle_seed: shingler.seed(),
            lowercase: shingler.lowercase(),
            strip_punctuation: shingler.strip_punctuation(),
            num_perm,
            minhash_seed: hasher.seed(),
            bands: params.bands,
            rows: params.rows,
        };

        Ok(Self {
            shingler,
            hasher,
            banding: BandingIndex::new(params),
            verifier: CandidateVerifier::new(
                config.lsh.effective_threshold(),
                config.verify.effective_mode(),
            ),
            manifest,
            explicit_bands: config.lsh.explicit_bands_rows().is_some(),
            workers: config.pipeline.effective_workers(),
            queue_capacity: config.pipeline.effective_queue_capacity(),
            max_docs: config.ingest.effective_max_docs(),
            events: EventDispatcher::new(),
        })
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn params(&self) -> LshParams {
        self.banding.params()
    }

    pub fn shingler(&self) -> &Shingler {
        &self.shingler
    }

    pub fn hasher(&self) -> &MinHasher {
        &self.hasher
    }

    /// Sign and persist every document, then report duplicates among the
    /// batch and against whatever `store` already held.
    pub fn build<I>(
        &self,
        store: &dyn PersistenceAdapter,
        docs: I,
    ) -> Result<DedupOutcome, PipelineError>
    where
        I: IntoIterator<Item = Result<Document, IngestError>>,
    {
        let banding = self.ensure_manifest(store, RunMode::Build)?;
        self.run(RunMode::Build, banding, store, None, docs)
    }

    /// Sign every document and report duplicates against the persisted
    /// index and within the batch. Writes nothing to `store`.
    pub fn query<I>(
        &self,
        store: &dyn PersistenceAdapter,
        docs: I,
    ) -> Result<DedupOutcome, PipelineError>
    where
        I: IntoIterator<Item = Result<Document, IngestError>>,
    {
        let banding = self.ensure_manifest(store, RunMode::Query)?;
        let overlay = MemoryStore::new();
        self.run(RunMode::Query, banding, store, Some(&overlay), docs)
    }

    /// Build writes the manifest into an empty store; query needs one.
    /// Either way the stored signatures must match the configuration.
    ///
    /// Returns the banding to run with. A build must band exactly as the
    /// index was built. A query whose (bands, rows) were derived from a
    /// different threshold looks buckets up with the stored split and only
    /// verifies at the new threshold, so retuning needs no rebuild.
    fn ensure_manifest(
        &self,
        store: &dyn PersistenceAdapter,
        mode: RunMode,
    ) -> Result<BandingIndex, PipelineError> {
        let stored = match store.get_manifest()? {
            Some(stored) => stored,
            None if mode == RunMode::Build => {
                store.put_manifest(&self.manifest)?;
                tracing::info!(
                    num_perm = self.manifest.num_perm,
                    bands = self.manifest.bands,
                    rows = self.manifest.rows,
                    "wrote index manifest"
                );
                return Ok(self.banding);
            }
            None => return Err(SignatureError::MissingManifest.into()),
        };

        if mode == RunMode::Build || self.explicit_bands {
            stored.check_compatible(&self.manifest)?;
            return Ok(self.banding);
        }

        stored.check_signatures_compatible(&self.manifest)?;
        let params = LshParams::new(stored.bands, stored.rows)?;
        if params != self.banding.params() {
            tracing::info!(
                bands = params.bands,
                rows = params.rows,
                threshold = self.verifier.threshold(),
                "querying with the index's band split"
            );
        }
        Ok(BandingIndex::new(params))
    }

    fn run<I>(
        &self,
        mode: RunMode,
        banding: BandingIndex,
        store: &dyn PersistenceAdapter,
        overlay: Option<&MemoryStore>,
        docs: I,
    ) -> Result<DedupOutcome, PipelineError>
    where
        I: IntoIterator<Item = Result<Document, IngestError>>,
    {
        let started = Instant::now();
        let params = banding.params();
        self.events.emit_run_started(&RunStartedEvent {
            mode,
            threshold: self.verifier.threshold(),
            num_perm: self.manifest.num_perm,
            bands: params.bands,
            rows: params.rows,
        });
        tracing::info!(
            mode = %mode,
            threshold = self.verifier.threshold(),
            num_perm = self.manifest.num_perm,
            bands = params.bands,
            rows = params.rows,
            workers = self.workers,
            "run started"
        );

        let mut summary = RunSummary::new(mode);
        let mut ingest = IngestStage::new(self.max_docs, &self.events);

        // Query runs band into a throwaway overlay so the persisted index
        // is never written.
        let target: &dyn PersistenceAdapter = match overlay {
            Some(o) => o,
            None => store,
        };
        let pool = SignaturePool::new(self.shingler, &self.hasher, banding, target)
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .keep_shingles(self.verifier.mode() == VerifyMode::Exact);
        let output = pool.run(docs, &mut ingest)?;

        let conflicts = output.conflicts.len();
        for (id, error) in output.conflicts {
            ingest.record(Some(id), &PipelineError::Storage(error));
        }
        let signed = output.signed;

        self.finish_stage(&mut summary, Stage::Ingested, ingest.admitted(), output.dispatch_ms);
        self.finish_stage(&mut summary, Stage::Shingled, signed.len() + conflicts, output.shingle_ms);
        self.finish_stage(&mut summary, Stage::Signed, signed.len() + conflicts, output.sign_ms);
        self.finish_stage(&mut summary, Stage::Indexed, signed.len(), output.index_ms);

        summary.documents_seen = ingest.seen();
        let (mut interner, skipped) = ingest.finish();
        summary.skipped = skipped;
        summary.documents_processed = signed.len();
        summary.degenerate_documents = signed.iter().filter(|d| d.signature.is_degenerate()).count();

        let t = Instant::now();
        let pairs = self.candidates(&banding, store, overlay, &signed, &mut interner)?;
        summary.candidate_pairs = pairs.len();
        self.finish_stage(&mut summary, Stage::Candidate, pairs.len(), elapsed_ms(t));

        let t = Instant::now();
        let edges = self.verify(store, &signed, &interner, &pairs)?;
        summary.verified_edges = edges.len();
        self.finish_stage(&mut summary, Stage::Verified, edges.len(), elapsed_ms(t));

        let t = Instant::now();
        let mut in_run = vec![false; interner.len()];
        for doc in &signed {
            in_run[doc.handle.index()] = true;
        }
        let report = DuplicateClusterer::new().cluster(&interner, &in_run, &edges);
        summary.clusters = report.clusters.len();
        summary.duplicate_groups = report.duplicate_group_count();
        self.finish_stage(&mut summary, Stage::Clustered, report.clusters.len(), elapsed_ms(t));

        summary.duration_ms = elapsed_ms(started);
        self.events.emit_run_complete(&RunCompleteEvent {
            mode,
            documents: summary.documents_processed,
            skipped: summary.skipped_count(),
            verified_edges: summary.verified_edges,
            duplicate_groups: summary.duplicate_groups,
            duration_ms: summary.duration_ms,
        });
        tracing::info!(
            mode = %mode,
            documents = summary.documents_processed,
            skipped = summary.skipped_count(),
            duplicate_groups = summary.duplicate_groups,
            duration_ms = summary.duration_ms,
            "run complete"
        );

        let edges = edges
            .iter()
            .map(|e| SimilarPair {
                left: interner.resolve(e.left).to_string(),
                right: interner.resolve(e.right).to_string(),
                similarity: e.similarity,
            })
            .collect();

        Ok(DedupOutcome {
            report,
            summary,
            edges,
        })
    }

    /// Bucket lookups run in parallel; interning what they return is
    /// sequential. Pairs come back sorted and deduplicated.
    fn candidates(
        &self,
        banding: &BandingIndex,
        store: &dyn PersistenceAdapter,
        overlay: Option<&MemoryStore>,
        signed: &[SignedDocument],
        interner: &mut DocInterner,
    ) -> Result<Vec<CandidatePair>, PipelineError> {
        let found: Vec<Vec<String>> = signed
            .par_iter()
            .map(|doc| -> Result<Vec<String>, PipelineError> {
                let mut ids = banding.query(store, &doc.id, &doc.signature)?;
                if let Some(overlay) = overlay {
                    ids.extend(banding.query(overlay, &doc.id, &doc.signature)?);
                }
                Ok(ids)
            })
            .collect::<Result<_, _>>()?;

        let mut pairs = BTreeSet::new();
        for (doc, ids) in signed.iter().zip(found) {
            for id in ids {
                let other = interner.intern(&id);
                if let Some(pair) = CandidatePair::new(doc.handle, other) {
                    pairs.insert(pair);
                }
            }
        }
        Ok(pairs.into_iter().collect())
    }

    fn verify(
        &self,
        store: &dyn PersistenceAdapter,
        signed: &[SignedDocument],
        interner: &DocInterner,
        pairs: &[CandidatePair],
    ) -> Result<Vec<VerifiedEdge>, PipelineError> {
        let mut by_handle: Vec<Option<&SignedDocument>> = vec![None; interner.len()];
        for doc in signed {
            by_handle[doc.handle.index()] = Some(doc);
        }

        // Documents held only by the store: signatures come from there and
        // are authoritative.
        let mut stored: FxHashMap<DocHandle, Signature> = FxHashMap::default();
        for pair in pairs {
            for handle in [pair.left, pair.right] {
                if by_handle[handle.index()].is_some() || stored.contains_key(&handle) {
                    continue;
                }
                let id = interner.resolve(handle);
                let signature = store.get_signature(id)?.ok_or_else(|| {
                    StorageError::CorruptRecord {
                        message: format!("bucket member {id} has no stored signature"),
                    }
                })?;
                if signature.len() != self.manifest.num_perm {
                    return Err(SignatureError::LengthMismatch {
                        doc_id: id.to_string(),
                        expected: self.manifest.num_perm,
                        actual: signature.len(),
                    }
                    .into());
                }
                stored.insert(handle, signature);
            }
        }

        self.verifier.verify(pairs, interner, |handle| {
            match by_handle.get(handle.index()).copied().flatten() {
                Some(doc) => Some(VerifyInput {
                    signature: &doc.signature,
                    shingles: doc.shingles.as_ref(),
                }),
                None => stored.get(&handle).map(|signature| VerifyInput {
                    signature,
                    shingles: None,
                }),
            }
        })
    }

    fn finish_stage(&self, summary: &mut RunSummary, stage: Stage, count: usize, duration_ms: u64) {
        tracing::info!(stage = %stage, count, duration_ms, "stage complete");
        summary.record_stage(stage, count, duration_ms);
        self.events.emit_stage_complete(&StageCompleteEvent {
            stage,
            count,
            duration_ms,
        });
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
