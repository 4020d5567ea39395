//! Model catalog: the model ids the backend can serve.
//!
//! Loaded once at startup and read-only afterwards. There is no refresh; a
//! restart picks up backend catalog changes.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::backend::{BackendClient, BackendError};
use crate::translate::openai::{ModelInfo, ModelList};

/// `created` reported for models the backend does not timestamp.
pub const DEFAULT_CREATED: u64 = 1_677_610_602;

/// `owned_by` reported for models the backend does not attribute.
pub const DEFAULT_OWNER: &str = "gonka";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("backend reported no usable models")]
    Empty,

    #[error("model `{0}` is not served by the backend")]
    NotFound(String),

    #[error("failed to fetch model catalog: {0}")]
    Backend(#[from] BackendError),
}

/// One servable model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub id: String,
    pub owned_by: Option<String>,
    pub created: Option<u64>,
    /// The entry exactly as the backend reported it.
    pub raw: Value,
}

impl ModelEntry {
    /// Build an entry from a backend object; `None` without a string `id`.
    pub fn from_raw(raw: Value) -> Option<Self> {
        let id = raw.get("id")?.as_str()?.to_string();
        let owned_by = raw
            .get("owned_by")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let created = raw.get("created").and_then(Value::as_u64);
        Some(Self {
            id,
            owned_by,
            created,
            raw,
        })
    }

    pub fn to_openai(&self) -> ModelInfo {
        ModelInfo {
            id: self.id.clone(),
            object: "model".to_string(),
            created: self.created.unwrap_or(DEFAULT_CREATED),
            owned_by: self
                .owned_by
                .clone()
                .unwrap_or_else(|| DEFAULT_OWNER.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
    index: HashMap<String, usize>,
}

impl ModelCatalog {
    /// Build a catalog. Duplicate ids keep their first occurrence.
    pub fn from_entries(entries: Vec<ModelEntry>) -> Result<Self, CatalogError> {
        let mut kept = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());

        for entry in entries {
            if index.contains_key(&entry.id) {
                continue;
            }
            index.insert(entry.id.clone(), kept.len());
            kept.push(entry);
        }

        if kept.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self {
            entries: kept,
            index,
        })
    }

    /// Query the backend once and build the catalog from its answer.
    pub async fn load(client: &BackendClient) -> Result<Self, CatalogError> {
        Self::from_entries(client.list_models().await?)
    }

    pub fn list(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn resolve(&self, id: &str) -> Result<&ModelEntry, CatalogError> {
        self.index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_openai_list(&self) -> ModelList {
        ModelList {
            object: "list".to_string(),
            data: self.entries.iter().map(ModelEntry::to_openai).collect(),
        }
    }

    /// Backend entries verbatim, for the web UI.
    pub fn raw_entries(&self) -> Vec<Value> {
        self.entries.iter().map(|e| e.raw.clone()).collect()
    }
}
