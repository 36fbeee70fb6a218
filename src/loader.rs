//! Catalog loading with merge.
//!
//! Two documents feed the runtime catalog: the generated JSON produced by
//! this tool and an optional curated JSON maintained by hand. Merge rule:
//! curated overrides generated (manual > generated).

use crate::assembler::Catalog;
use crate::config;
use std::path::Path;
use tracing::warn;

/// Lenient read: a missing or malformed document yields an empty catalog
/// rather than failing the caller.
pub fn read_catalog_file(path: &Path) -> Catalog {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => return Catalog::new(),
    };
    match serde_json::from_str::<Catalog>(&text) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("ignoring malformed catalog {}: {}", path.display(), e);
            Catalog::new()
        }
    }
}

pub fn merge_catalogs(generated: Catalog, curated: Catalog) -> Catalog {
    let mut merged = generated;
    merged.extend(curated);
    merged
}

/// Load the runtime catalog from the configured paths.
pub fn load_catalog() -> Catalog {
    let generated = read_catalog_file(Path::new(&config::generated_catalog_path()));
    let curated = match config::curated_catalog_path() {
        Some(path) => read_catalog_file(Path::new(&path)),
        None => Catalog::new(),
    };
    merge_catalogs(generated, curated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::CatalogEntry;

    fn entry(descricao: &str) -> CatalogEntry {
        CatalogEntry {
            descricao: descricao.to_string(),
            contexto: "ctx\n".to_string(),
            tags: Vec::new(),
            sinonimos: Vec::new(),
        }
    }

    #[test]
    fn test_curated_overrides_generated() {
        let mut generated = Catalog::new();
        generated.insert("kpi_weekly".to_string(), entry("generated"));
        generated.insert("orders".to_string(), entry("generated"));

        let mut curated = Catalog::new();
        curated.insert("kpi_weekly".to_string(), entry("curated"));

        let merged = merge_catalogs(generated, curated);
        assert_eq!(merged["kpi_weekly"].descricao, "curated");
        assert_eq!(merged["orders"].descricao, "generated");
    }

    #[test]
    fn test_missing_file_yields_empty_catalog() {
        let catalog = read_catalog_file(Path::new("/nonexistent/lakecat_catalog.json"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_malformed_file_yields_empty_catalog() {
        let path = std::env::temp_dir().join("lakecat_loader_test.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(read_catalog_file(&path).is_empty());
        std::fs::remove_file(&path).ok();
    }
}
