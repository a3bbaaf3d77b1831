//! JSON directory loader.
//!
//! One JSON object per file. Files are visited in sorted name order so two
//! runs over the same directory ingest in the same order.

use std::fs;
use std::path::{Path, PathBuf};

use neardup_core::config::IngestConfig;
use neardup_core::errors::IngestError;
use neardup_core::types::Document;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct JsonDirLoader {
    files: Vec<PathBuf>,
    id_field: String,
    text_fields: Vec<String>,
}

impl JsonDirLoader {
    /// List `dir`. Hidden files and subdirectories are ignored.
    pub fn open(dir: &Path, config: &IngestConfig) -> Result<Self, IngestError> {
        let unreadable = |e: std::io::Error| IngestError::UnreadableSource {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && entry.file_type().map_err(unreadable)?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        if let Some(max) = config.effective_max_docs() {
            files.truncate(max);
        }
        tracing::debug!(dir = %dir.display(), files = files.len(), "listed data directory");

        Ok(Self {
            files,
            id_field: config.effective_id_field().to_string(),
            text_fields: config.effective_text_fields(),
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Lazily read and parse each file.
    pub fn documents(&self) -> impl Iterator<Item = Result<Document, IngestError>> + '_ {
        self.files.iter().map(|path| self.read(path))
    }

    fn read(&self, path: &Path) -> Result<Document, IngestError> {
        let bytes = fs::read(path).map_err(|e| IngestError::UnreadableSource {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| IngestError::InvalidJson {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.parse(path, &value)
    }

    fn parse(&self, path: &Path, value: &Value) -> Result<Document, IngestError> {
        let Value::Object(record) = value else {
            return Err(IngestError::InvalidJson {
                path: path.display().to_string(),
                message: "expected a JSON object".to_string(),
            });
        };

        let id = match record.get(&self.id_field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(IngestError::MalformedDocument {
                    doc_id: None,
                    reason: format!("{} has no '{}' field", path.display(), self.id_field),
                })
            }
        };

        let mut parts = Vec::with_capacity(self.text_fields.len());
        for field in &self.text_fields {
            match record.get(field) {
                Some(Value::String(s)) => parts.push(s.as_str()),
                None | Some(Value::Null) => {}
                Some(_) => {
                    return Err(IngestError::malformed(
                        id,
                        format!("field '{field}' is not a string"),
                    ))
                }
            }
        }
        if parts.is_empty() {
            return Err(IngestError::malformed(
                id,
                format!("none of the text fields {:?} present", self.text_fields),
            ));
        }

        Ok(Document::new(id, parts.join("\n")))
    }
}
