use serde::{Deserialize, Serialize};

/// Descriptor for a secondary-index table (spec §3 Index Table).
///
/// `IndexTable` is itself persisted as an asset on the ledger (spec §4.E);
/// this struct is the payload. The primary-key field must appear as the
/// last component of every composite index (enforced by
/// `custodia-index::IndexEngine::get_table`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexTableDescriptor {
    pub name: String,
    pub primary_key_field: String,
    /// Each entry is an ordered field sequence `[f1, .., fn]`; the engine
    /// appends the primary key field when building composite ledger keys.
    pub indexes: Vec<Vec<String>>,
    pub encrypted: bool,
    /// Id of an external datastore holding row values off-ledger, if any.
    pub external_datastore_id: Option<String>,
}

impl IndexTableDescriptor {
    pub fn new(name: impl Into<String>, primary_key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key_field: primary_key_field.into(),
            indexes: Vec::new(),
            encrypted: false,
            external_datastore_id: None,
        }
    }

    pub fn with_index(mut self, fields: Vec<String>) -> Self {
        self.indexes.push(fields);
        self
    }

    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn with_external_datastore(mut self, id: impl Into<String>) -> Self {
        self.external_datastore_id = Some(id.into());
        self
    }
}
