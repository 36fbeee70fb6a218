//! Output boundary: serialize the assembled catalog.

use crate::assembler::Catalog;
use crate::error::Result;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

/// Render the catalog document: pretty JSON, keys already sorted by the
/// map, trailing newline.
pub fn render_catalog(catalog: &Catalog) -> Result<String> {
    let mut payload = serde_json::to_string_pretty(catalog)?;
    payload.push('\n');
    Ok(payload)
}

/// Single final write; per-table work is never interleaved with output.
pub fn write_catalog(catalog: &Catalog, target: &OutputTarget, echo_stdout: bool) -> Result<()> {
    let payload = render_catalog(catalog)?;
    match target {
        OutputTarget::File(path) => {
            std::fs::write(path, &payload)?;
            if echo_stdout {
                std::io::stdout().write_all(payload.as_bytes())?;
            }
        }
        OutputTarget::Stdout => {
            std::io::stdout().write_all(payload.as_bytes())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::CatalogEntry;

    #[test]
    fn test_render_is_sorted_and_newline_terminated() {
        let mut catalog = Catalog::new();
        for id in ["diamond_mart_b", "diamond_mart_a"] {
            catalog.insert(
                id.to_string(),
                CatalogEntry {
                    descricao: "d".to_string(),
                    contexto: "c\n".to_string(),
                    tags: Vec::new(),
                    sinonimos: Vec::new(),
                },
            );
        }
        let payload = render_catalog(&catalog).unwrap();
        assert!(payload.ends_with('\n'));
        let a = payload.find("diamond_mart_a").unwrap();
        let b = payload.find("diamond_mart_b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_write_to_file_round_trips() {
        let mut catalog = Catalog::new();
        catalog.insert(
            "kpi_weekly".to_string(),
            CatalogEntry {
                descricao: "Métricas semanais.".to_string(),
                contexto: "Você é um analista de dados.\n".to_string(),
                tags: vec!["kpi".to_string()],
                sinonimos: Vec::new(),
            },
        );

        let path = std::env::temp_dir().join("lakecat_sink_test.json");
        write_catalog(&catalog, &OutputTarget::File(path.clone()), false).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Catalog = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, catalog);
        std::fs::remove_file(&path).ok();
    }
}
