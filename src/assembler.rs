//! Catalog assembly: id assignment and global uniqueness.

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit persisted to the output catalog. Its id is the key of the
/// enclosing map; `descricao`/`contexto` are the wire contract consumed by
/// the routing/SQL layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub descricao: String,
    pub contexto: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sinonimos: Vec<String>,
}

/// The catalog document, ordered by id.
pub type Catalog = BTreeMap<String, CatalogEntry>;

pub struct CatalogAssembler {
    id_prefix: String,
    catalog: Catalog,
}

impl CatalogAssembler {
    pub fn new(id_prefix: Option<&str>) -> Self {
        Self {
            id_prefix: id_prefix.unwrap_or_default().to_string(),
            catalog: Catalog::new(),
        }
    }

    /// Deterministic id derivation: prefix plus the normalized table name.
    pub fn entry_id(&self, table_name: &str) -> String {
        format!("{}{}", self.id_prefix, table_name.trim().to_lowercase())
    }

    /// Insert the entry for a table, failing the run on id collision; a
    /// collision means the naming scheme is broken and silently
    /// overwriting would drop a table from the catalog.
    pub fn insert(&mut self, table_name: &str, entry: CatalogEntry) -> Result<String> {
        let id = self.entry_id(table_name);
        if self.catalog.contains_key(&id) {
            return Err(CatalogError::DuplicateCatalogId(id));
        }
        self.catalog.insert(id.clone(), entry);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn finish(self) -> Catalog {
        self.catalog
    }
}
