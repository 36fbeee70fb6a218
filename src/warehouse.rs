//! Warehouse adapter over the SQL statement REST API.
//!
//! Source of truth for schema facts:
//! - `system.information_schema.tables`
//! - `system.information_schema.columns`
//! - `DESCRIBE <fqn>` as a per-table fallback when the columns view has no
//!   rows for a selected table.
//!
//! All statements issued here are reads; the generator never mutates the
//! warehouse.

use crate::config::WarehouseConfig;
use crate::error::{CatalogError, Result};
use crate::schema::{ColumnInfo, SchemaSource, TableInfo};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

const STATEMENT_API_PATH: &str = "/api/2.0/sql/statements";
const WAIT_TIMEOUT: &str = "30s";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS: u32 = 3;

/// Column names and row cells, as returned by the statement API
/// (`JSON_ARRAY` disposition renders every cell as a string or null).
type QueryResult = (Vec<String>, Vec<Vec<Option<String>>>);

pub struct WarehouseClient {
    http: reqwest::Client,
    config: WarehouseConfig,
}

enum CallError {
    Transient(String),
    Fatal(String),
}

impl WarehouseClient {
    pub fn new(config: WarehouseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::SchemaUnavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    /// Run one SQL statement and return its inline result.
    ///
    /// Transport errors, 429 and 5xx are retried with bounded attempts;
    /// anything else fails immediately.
    pub async fn execute_query(&self, query: &str) -> Result<QueryResult> {
        debug!("executing SQL: {}", query);
        let url = format!("{}{}", self.config.host, STATEMENT_API_PATH);
        let body = serde_json::json!({
            "statement": query,
            "warehouse_id": self.config.warehouse_id,
            "wait_timeout": WAIT_TIMEOUT,
            "on_wait_timeout": "CANCEL",
            "format": "JSON_ARRAY",
            "disposition": "INLINE",
        });

        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.post_statement(&url, &body).await {
                Ok(value) => return parse_statement_response(&value),
                Err(CallError::Fatal(message)) => {
                    return Err(CatalogError::SchemaUnavailable(message));
                }
                Err(CallError::Transient(message)) => {
                    warn!(
                        "warehouse call failed (attempt {}/{}): {}",
                        attempt, MAX_ATTEMPTS, message
                    );
                    last_error = message;
                }
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
            }
        }
        Err(CatalogError::SchemaUnavailable(last_error))
    }

    async fn post_statement(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, CallError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.token)
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Transient(format!("warehouse request failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CallError::Transient(format!("warehouse returned {}", status)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CallError::Fatal(format!("warehouse returned {}: {}", status, text)));
        }
        response
            .json()
            .await
            .map_err(|e| CallError::Transient(format!("malformed warehouse response: {}", e)))
    }
}

#[async_trait]
impl SchemaSource for WarehouseClient {
    async fn list_tables(
        &self,
        catalog: &str,
        schema: &str,
        table_like: &str,
    ) -> Result<Vec<TableInfo>> {
        let (names, rows) = self.execute_query(&tables_query(catalog, schema, table_like)).await?;
        Ok(rows_to_tables(&names, &rows))
    }

    async fn list_columns(&self, catalog: &str, schema: &str) -> Result<Vec<ColumnInfo>> {
        let (names, rows) = self.execute_query(&columns_query(catalog, schema)).await?;
        Ok(rows_to_columns(&names, &rows))
    }

    async fn describe_table(&self, fqn: &str) -> Result<Vec<ColumnInfo>> {
        let (names, rows) = self.execute_query(&format!("DESCRIBE {}", fqn)).await?;
        Ok(parse_describe_rows(fqn, &names, &rows))
    }
}

// Used only for simple literals in catalog queries.
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn tables_query(catalog: &str, schema: &str, table_like: &str) -> String {
    format!(
        "SELECT\n  table_catalog,\n  table_schema,\n  table_name,\n  comment\n\
         FROM system.information_schema.tables\n\
         WHERE table_catalog = '{}'\n  AND table_schema = '{}'\n  AND table_type = 'BASE TABLE'\n  AND table_name LIKE '{}'\n\
         ORDER BY table_name",
        escape_literal(catalog),
        escape_literal(schema),
        escape_literal(table_like)
    )
}

fn columns_query(catalog: &str, schema: &str) -> String {
    format!(
        "SELECT\n  table_name,\n  column_name,\n  data_type,\n  comment,\n  ordinal_position\n\
         FROM system.information_schema.columns\n\
         WHERE table_catalog = '{}'\n  AND table_schema = '{}'\n\
         ORDER BY table_name, ordinal_position",
        escape_literal(catalog),
        escape_literal(schema)
    )
}

fn parse_statement_response(value: &serde_json::Value) -> Result<QueryResult> {
    let state = value["status"]["state"].as_str().unwrap_or("UNKNOWN");
    if state != "SUCCEEDED" {
        let message = value["status"]["error"]["message"].as_str().unwrap_or("no error message");
        return Err(CatalogError::SchemaUnavailable(format!(
            "statement finished in state {}: {}",
            state, message
        )));
    }

    let names: Vec<String> = value["manifest"]["schema"]["columns"]
        .as_array()
        .map(|columns| {
            columns
                .iter()
                .filter_map(|c| c["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let rows: Vec<Vec<Option<String>>> = value["result"]["data_array"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(|cell| cell.as_str().map(String::from)).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();

    Ok((names, rows))
}

fn cell(row: &[Option<String>], index: Option<&usize>) -> Option<String> {
    index
        .and_then(|&i| row.get(i))
        .and_then(|value| value.clone())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn rows_to_tables(names: &[String], rows: &[Vec<Option<String>>]) -> Vec<TableInfo> {
    let index: HashMap<&str, usize> =
        names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
    rows.iter()
        .map(|row| TableInfo {
            table_catalog: cell(row, index.get("table_catalog")).unwrap_or_default(),
            table_schema: cell(row, index.get("table_schema")).unwrap_or_default(),
            table_name: cell(row, index.get("table_name")).unwrap_or_default(),
            comment: cell(row, index.get("comment")),
        })
        .filter(|t| !t.table_name.is_empty())
        .collect()
}

fn rows_to_columns(names: &[String], rows: &[Vec<Option<String>>]) -> Vec<ColumnInfo> {
    let index: HashMap<&str, usize> =
        names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
    rows.iter()
        .map(|row| ColumnInfo {
            table_name: cell(row, index.get("table_name")).unwrap_or_default(),
            column_name: cell(row, index.get("column_name")).unwrap_or_default(),
            data_type: cell(row, index.get("data_type")),
            comment: cell(row, index.get("comment")),
            ordinal_position: cell(row, index.get("ordinal_position"))
                .and_then(|v| v.parse::<i64>().ok()),
        })
        .filter(|c| !c.column_name.is_empty())
        .collect()
}

/// `DESCRIBE` output mixes column rows with `#`-prefixed pseudo-sections
/// (partition info repeats the partition columns afterwards); keep the first
/// occurrence of each column and re-number ordinals.
fn parse_describe_rows(fqn: &str, names: &[String], rows: &[Vec<Option<String>>]) -> Vec<ColumnInfo> {
    let index: HashMap<&str, usize> =
        names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
    let table_name = fqn.rsplit('.').next().unwrap_or(fqn).to_string();

    let mut seen: HashSet<String> = HashSet::new();
    let mut columns = Vec::new();
    for row in rows {
        let col_name = match cell(row, index.get("col_name")) {
            Some(name) if !name.starts_with('#') => name,
            _ => continue,
        };
        if !seen.insert(col_name.clone()) {
            continue;
        }
        columns.push(ColumnInfo {
            table_name: table_name.clone(),
            column_name: col_name,
            data_type: cell(row, index.get("data_type")),
            comment: cell(row, index.get("comment")),
            ordinal_position: Some(columns.len() as i64 + 1),
        });
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|c| c.map(String::from)).collect()
    }

    #[test]
    fn test_escape_literal_doubles_quotes() {
        assert_eq!(escape_literal("o'brien"), "o''brien");
        assert_eq!(escape_literal("mart_%"), "mart_%");
    }

    #[test]
    fn test_tables_query_shape() {
        let query = tables_query("dev", "diamond", "mart_%");
        assert!(query.contains("FROM system.information_schema.tables"));
        assert!(query.contains("table_catalog = 'dev'"));
        assert!(query.contains("table_type = 'BASE TABLE'"));
        assert!(query.contains("table_name LIKE 'mart_%'"));
        assert!(query.ends_with("ORDER BY table_name"));
    }

    #[test]
    fn test_parse_statement_response_succeeded() {
        let value = serde_json::json!({
            "status": {"state": "SUCCEEDED"},
            "manifest": {"schema": {"columns": [{"name": "table_name"}, {"name": "comment"}]}},
            "result": {"data_array": [["mart_a", null]]},
        });
        let (names, rows) = parse_statement_response(&value).unwrap();
        assert_eq!(names, vec!["table_name", "comment"]);
        assert_eq!(rows, vec![row(&[Some("mart_a"), None])]);
    }

    #[test]
    fn test_parse_statement_response_failed_state() {
        let value = serde_json::json!({
            "status": {"state": "FAILED", "error": {"message": "TABLE_OR_VIEW_NOT_FOUND"}},
        });
        let err = parse_statement_response(&value).unwrap_err();
        assert!(err.to_string().contains("FAILED"));
    }

    #[test]
    fn test_rows_to_columns_parses_ordinals() {
        let names = vec![
            "table_name".to_string(),
            "column_name".to_string(),
            "data_type".to_string(),
            "comment".to_string(),
            "ordinal_position".to_string(),
        ];
        let rows = vec![row(&[Some("mart_a"), Some("id"), Some("string"), None, Some("1")])];
        let columns = rows_to_columns(&names, &rows);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].column_name, "id");
        assert_eq!(columns[0].ordinal_position, Some(1));
        assert_eq!(columns[0].comment, None);
    }

    #[test]
    fn test_parse_describe_skips_metadata_and_duplicates() {
        let names = vec!["col_name".to_string(), "data_type".to_string(), "comment".to_string()];
        let rows = vec![
            row(&[Some("id"), Some("bigint"), None]),
            row(&[Some("dt"), Some("date"), Some("partition date")]),
            row(&[Some(""), None, None]),
            row(&[Some("# Partition Information"), None, None]),
            row(&[Some("dt"), Some("date"), None]),
        ];
        let columns = parse_describe_rows("dev.diamond.mart_a", &names, &rows);
        let parsed: Vec<_> = columns.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(parsed, vec!["id", "dt"]);
        assert_eq!(columns[1].ordinal_position, Some(2));
        assert!(columns.iter().all(|c| c.table_name == "mart_a"));
    }
}
