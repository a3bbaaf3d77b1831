//! Ingest stage: validate loader records, intern ids, drop duplicates.
//!
//! Runs on the dispatching thread, so it can own the interner without
//! locking. Everything it rejects is recorded and the run continues.

use neardup_core::errors::{IngestError, PipelineError};
use neardup_core::events::{DocumentSkippedEvent, EventDispatcher};
use neardup_core::types::{DocHandle, DocInterner, Document};

use super::summary::SkippedDocument;

/// A validated document on its way to a signature worker.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub handle: DocHandle,
    pub id: String,
    pub text: String,
}

#[derive(Debug)]
pub struct IngestStage<'e> {
    interner: DocInterner,
    max_docs: Option<usize>,
    seen: usize,
    admitted: usize,
    skipped: Vec<SkippedDocument>,
    events: &'e EventDispatcher,
}

impl<'e> IngestStage<'e> {
    pub fn new(max_docs: Option<usize>, events: &'e EventDispatcher) -> Self {
        Self {
            interner: DocInterner::new(),
            max_docs,
            seen: 0,
            admitted: 0,
            skipped: Vec::new(),
            events,
        }
    }

    /// True once `max_docs` records have been pulled.
    pub fn limit_reached(&self) -> bool {
        self.max_docs.is_some_and(|max| self.seen >= max)
    }

    /// Validate one loader record. `None` means it was skipped.
    pub fn admit(&mut self, record: Result<Document, IngestError>) -> Option<IngestedDocument> {
        self.seen += 1;
        let doc = match record {
            Ok(doc) => doc,
            Err(e) => {
                self.skip(e);
                return None;
            }
        };

        if doc.id.trim().is_empty() {
            self.skip(IngestError::MalformedDocument {
                doc_id: None,
                reason: "empty document id".to_string(),
            });
            return None;
        }
        if doc.text.trim().is_empty() {
            self.skip(IngestError::malformed(doc.id, "missing or empty text"));
            return None;
        }
        if self.interner.contains(&doc.id) {
            self.skip(IngestError::DuplicateId { doc_id: doc.id });
            return None;
        }

        let handle = self.interner.intern(&doc.id);
        self.admitted += 1;
        Some(IngestedDocument {
            handle,
            id: doc.id,
            text: doc.text,
        })
    }

    /// Record a problem found after ingestion (a write conflict, say).
    pub fn record(&mut self, doc_id: Option<String>, error: &PipelineError) {
        tracing::warn!(doc_id = doc_id.as_deref().unwrap_or("<unknown>"), error = %error, "skipping document");
        self.events.emit_document_skipped(&DocumentSkippedEvent {
            doc_id: doc_id.clone(),
            reason: error.to_string(),
        });
        self.skipped.push(SkippedDocument::from_error(doc_id, error));
    }

    fn skip(&mut self, error: IngestError) {
        let doc_id = error.doc_id().map(str::to_string);
        self.record(doc_id, &PipelineError::Ingest(error));
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn admitted(&self) -> usize {
        self.admitted
    }

    /// Hand back the interner and the skip list.
    pub fn finish(self) -> (DocInterner, Vec<SkippedDocument>) {
        (self.interner, self.skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_and_duplicate_records_are_skipped() {
        let events = EventDispatcher::new();
        let mut stage = IngestStage::new(None, &events);

        assert!(stage.admit(Ok(Document::new("a", "some text"))).is_some());
        assert!(stage.admit(Ok(Document::new("b", "   "))).is_none());
        assert!(stage.admit(Ok(Document::new("", "text"))).is_none());
        assert!(stage.admit(Ok(Document::new("a", "other text"))).is_none());
        assert!(stage
            .admit(Err(IngestError::InvalidJson {
                path: "x.json".into(),
                message: "eof".into(),
            }))
            .is_none());

        assert_eq!(stage.seen(), 5);
        assert_eq!(stage.admitted(), 1);
        let (interner, skipped) = stage.finish();
        assert_eq!(interner.len(), 1);
        let codes: Vec<_> = skipped.iter().map(|s| s.code).collect();
        assert_eq!(
            codes,
            vec!["MALFORMED_DOCUMENT", "MALFORMED_DOCUMENT", "DUPLICATE_ID", "SOURCE_ERROR"]
        );
        assert_eq!(skipped[0].doc_id.as_deref(), Some("b"));
    }

    #[test]
    fn max_docs_counts_every_record() {
        let events = EventDispatcher::new();
        let mut stage = IngestStage::new(Some(2), &events);
        stage.admit(Ok(Document::new("a", "")));
        assert!(!stage.limit_reached());
        stage.admit(Ok(Document::new("b", "text")));
        assert!(stage.limit_reached());
    }

    #[test]
    fn zero_cap_admits_nothing() {
        let events = EventDispatcher::new();
        let stage = IngestStage::new(Some(0), &events);
        assert!(stage.limit_reached());
        assert_eq!(stage.seen(), 0);
    }
}
