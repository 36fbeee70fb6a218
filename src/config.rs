//! Environment-backed configuration.
//!
//! All external endpoints are resolved here so the pipeline modules never
//! read the environment themselves.

use crate::error::{CatalogError, Result};

/// Connection settings for the warehouse SQL statement API.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub host: String,
    pub token: String,
    pub warehouse_id: String,
}

impl WarehouseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: normalize_host(&require_env("DATABRICKS_HOST")?),
            token: require_env("DATABRICKS_TOKEN")?,
            warehouse_id: require_env("DATABRICKS_WAREHOUSE_ID")?,
        })
    }
}

/// Connection settings for a model serving endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub host: String,
    pub token: String,
    pub endpoint: String,
    pub temperature: f64,
}

impl LlmConfig {
    /// `endpoint` falls back to env `LLM_ENDPOINT`, then to the workspace
    /// default model.
    pub fn from_env(endpoint: Option<String>, temperature: f64) -> Result<Self> {
        Ok(Self {
            host: normalize_host(&require_env("DATABRICKS_HOST")?),
            token: require_env("DATABRICKS_TOKEN")?,
            endpoint: endpoint.unwrap_or_else(default_llm_endpoint),
            temperature,
        })
    }
}

/// Env var is preferred over config files so the default does not depend on
/// any secret store.
pub fn default_llm_endpoint() -> String {
    std::env::var("LLM_ENDPOINT").unwrap_or_else(|_| "databricks-gpt-5-2".to_string())
}

pub fn generated_catalog_path() -> String {
    std::env::var("GENERATED_CATALOG_PATH").unwrap_or_else(|_| "generated_catalog.json".to_string())
}

pub fn curated_catalog_path() -> Option<String> {
    std::env::var("CURATED_CATALOG_PATH").ok().filter(|p| !p.trim().is_empty())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CatalogError::Config(format!("missing environment variable {}", name)))
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("adb-123.azuredatabricks.net/"),
            "https://adb-123.azuredatabricks.net"
        );
        assert_eq!(normalize_host("https://dbc.cloud.databricks.com"), "https://dbc.cloud.databricks.com");
    }
}
