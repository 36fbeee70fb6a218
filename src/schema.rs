//! Schema facts read from the warehouse metadata service.
//!
//! Facts are fetched fresh per generation run and never cached across runs;
//! everything downstream (drafting, grounding validation) treats them as
//! the single source of truth for what exists.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Fully-qualified table identifier `(catalog, schema, table)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

/// One row of `system.information_schema.tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub table_catalog: String,
    pub table_schema: String,
    pub table_name: String,
    pub comment: Option<String>,
}

impl TableInfo {
    pub fn table_ref(&self) -> TableRef {
        TableRef {
            catalog: self.table_catalog.clone(),
            schema: self.table_schema.clone(),
            table: self.table_name.clone(),
        }
    }

    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.table_catalog, self.table_schema, self.table_name)
    }
}

/// One row of `system.information_schema.columns` (or one `DESCRIBE` line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table_name: String,
    pub column_name: String,
    pub data_type: Option<String>,
    pub comment: Option<String>,
    pub ordinal_position: Option<i64>,
}

/// Read-only access to warehouse schema metadata.
///
/// `describe_table` is the per-table fallback for when the bulk
/// `information_schema` view has no rows for a table; the generator treats
/// whichever source answered as authoritative.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn list_tables(
        &self,
        catalog: &str,
        schema: &str,
        table_like: &str,
    ) -> Result<Vec<TableInfo>>;

    async fn list_columns(&self, catalog: &str, schema: &str) -> Result<Vec<ColumnInfo>>;

    async fn describe_table(&self, fqn: &str) -> Result<Vec<ColumnInfo>>;
}

/// Group a bulk column listing by table name, preserving the listing order
/// (the query orders by ordinal position).
pub fn columns_by_table(columns: Vec<ColumnInfo>) -> HashMap<String, Vec<ColumnInfo>> {
    let mut by_table: HashMap<String, Vec<ColumnInfo>> = HashMap::new();
    for column in columns {
        by_table.entry(column.table_name.clone()).or_default().push(column);
    }
    by_table
}
