//! Storage layer for atareport.
//!
//! This module provides the form store: create, read, update, delete and
//! list operations over an injected [`KeyValueStore`], with every read
//! passing through the shape normalizer.

pub mod kv;
pub mod migrations;
pub mod schema;

use tracing::{debug, error, info, warn};

use crate::config::StorageConfig;
use crate::error::Result;
use crate::form::{FormDocument, FormId, FormUpdate, HeaderData, IndexEntry};

pub use kv::{FileStore, KeyValueStore, MemoryStore, StorageKey};
pub use migrations::{normalize, normalize_json, Migration, Normalized};

/// Result of deleting a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The document and its index entry were removed.
    Deleted,
    /// No document exists with that identifier; nothing was changed.
    NotFound,
    /// The document was removed but the index could not be updated.
    PartiallyDeleted {
        /// Why the index update failed.
        reason: String,
    },
}

/// Counts describing the store contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Stored form documents.
    pub forms: usize,
    /// Entries in the index.
    pub indexed: usize,
}

/// Form persistence over a key-value backend.
#[derive(Debug)]
pub struct FormStore {
    backend: Box<dyn KeyValueStore>,
}

impl FormStore {
    /// Wrap an existing backend.
    #[must_use]
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Open the filesystem store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be created.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let data_dir = config.resolved_data_dir();
        let backend = FileStore::open(&data_dir, &config.index_file, &config.forms_dir)?;
        info!("Form storage ready at {}", data_dir.display());
        Ok(Self::new(Box::new(backend)))
    }

    /// Create a store that keeps everything in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Create a new form with the canonical default document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document or the index cannot be written.
    pub fn create(&self) -> Result<FormId> {
        let id = FormId::generate();
        let mut index = self.load_index()?;
        self.write_document(&id, &FormDocument::default())?;

        index.push(IndexEntry::new_form(&id));
        self.write_index(&index)?;

        info!("Created form {}", id);
        Ok(id)
    }

    /// Read a form, normalizing its stored shape.
    ///
    /// An unknown identifier yields a freshly persisted default document.
    /// A stored document that cannot be parsed yields a default document
    /// without overwriting the stored one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or written.
    pub fn read(&self, id: &FormId) -> Result<FormDocument> {
        let key = StorageKey::Form(id.clone());
        let Some(text) = self.backend.get(&key)? else {
            debug!("Form {} not stored, synthesizing default", id);
            let document = FormDocument::default();
            self.write_document(id, &document)?;
            return Ok(document);
        };

        let normalized = match normalize_json(&text) {
            Ok(normalized) => normalized,
            Err(e) => {
                error!("Stored form {} is unreadable, serving defaults: {}", id, e);
                return Ok(FormDocument::default());
            }
        };

        if normalized.is_migrated() {
            info!("Migrated form {} ({})", id, normalized.describe());
            self.write_document(id, &normalized.document)?;
        }
        Ok(normalized.document)
    }

    /// Replace the fields present in `update` and persist the document.
    ///
    /// When the header changes, the index entry is refreshed from it. Once
    /// the document is written the update has succeeded; a failure to
    /// rewrite the index afterwards is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn update(&self, id: &FormId, update: FormUpdate) -> Result<FormDocument> {
        if update.is_empty() {
            debug!("Update for form {} carries no fields", id);
        }
        let mut document = self.read(id)?;
        if document.pdf_gerado {
            info!("Updating form {} after its PDF was generated", id);
        }

        let index = match &update.header_data {
            Some(header) => self.synced_index(id, header)?,
            None => None,
        };
        document.apply(update);
        self.write_document(id, &document)?;

        if let Some(index) = index {
            if let Err(e) = self.write_index(&index) {
                error!("Saved form {} but could not refresh the index: {}", id, e);
            }
        }

        debug!("Updated form {}", id);
        Ok(document)
    }

    /// Delete a form and its index entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be removed.
    pub fn delete(&self, id: &FormId) -> Result<DeleteOutcome> {
        if !self.backend.delete(&StorageKey::Form(id.clone()))? {
            return Ok(DeleteOutcome::NotFound);
        }

        let outcome = match self.remove_from_index(id) {
            Ok(()) => DeleteOutcome::Deleted,
            Err(e) => {
                warn!("Deleted form {} but could not update the index: {}", id, e);
                DeleteOutcome::PartiallyDeleted {
                    reason: e.to_string(),
                }
            }
        };
        info!("Deleted form {}", id);
        Ok(outcome)
    }

    /// The form index in insertion order.
    ///
    /// A corrupt index is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn list(&self) -> Result<Vec<IndexEntry>> {
        self.load_index()
    }

    /// Set `pdfGerado` on a form.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn mark_pdf_generated(&self, id: &FormId) -> Result<()> {
        let mut document = self.read(id)?;
        if !document.pdf_gerado {
            document.pdf_gerado = true;
            self.write_document(id, &document)?;
        }
        debug!("Marked form {} as generated", id);
        Ok(())
    }

    /// Count stored documents and index entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be enumerated.
    pub fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            forms: self.backend.list()?.len(),
            indexed: self.list()?.len(),
        })
    }

    fn remove_from_index(&self, id: &FormId) -> Result<()> {
        let mut index = self.load_index()?;
        index.retain(|entry| entry.id != id.as_str());
        self.write_index(&index)
    }

    /// The stored index; a missing, blank or corrupt index reads as empty
    /// and is rebuilt by the next write.
    fn load_index(&self) -> Result<Vec<IndexEntry>> {
        let Some(text) = self.backend.get(&StorageKey::Index)? else {
            return Ok(Vec::new());
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&text) {
            Ok(index) => Ok(index),
            Err(e) => {
                warn!("Form index is corrupt, starting from an empty list: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// The index with the entries of `id` refreshed from `header`, or
    /// `None` when `id` is not indexed.
    fn synced_index(&self, id: &FormId, header: &HeaderData) -> Result<Option<Vec<IndexEntry>>> {
        let mut index = self.load_index()?;
        let mut touched = false;
        for entry in index.iter_mut().filter(|e| e.id == id.as_str()) {
            entry.sync_with_header(header);
            touched = true;
        }
        Ok(touched.then_some(index))
    }

    fn write_index(&self, index: &[IndexEntry]) -> Result<()> {
        let text = serde_json::to_string_pretty(index)?;
        self.backend.put(&StorageKey::Index, &text)
    }

    fn write_document(&self, id: &FormId, document: &FormDocument) -> Result<()> {
        let text = serde_json::to_string_pretty(document)?;
        self.backend.put(&StorageKey::Form(id.clone()), &text)
    }
}
