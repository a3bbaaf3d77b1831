//! Ingestion configuration: which record fields make up a document.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Field holding the document id. Default: "id".
    pub id_field: Option<String>,
    /// Fields concatenated (newline-separated) into the document text.
    /// Default: ["content"].
    #[serde(default)]
    pub text_fields: Vec<String>,
    /// Stop after this many records. 0 or unset means unlimited.
    pub max_docs: Option<usize>,
}

impl IngestConfig {
    pub fn effective_id_field(&self) -> &str {
        self.id_field.as_deref().unwrap_or("id")
    }

    pub fn effective_text_fields(&self) -> Vec<String> {
        if self.text_fields.is_empty() {
            vec!["content".to_string()]
        } else {
            self.text_fields.clone()
        }
    }

    pub fn effective_max_docs(&self) -> Option<usize> {
        self.max_docs.filter(|&n| n > 0)
    }
}
