//! The generation pipeline: select tables, draft contexts, validate
//! grounding, assemble the catalog.
//!
//! Per-table failures (LLM call, grounding rejection, DESCRIBE fallback)
//! degrade that table to its baseline artifact and the run continues; only
//! an unreachable schema source or an id collision aborts the run, before
//! any output is written.

use crate::assembler::{Catalog, CatalogAssembler, CatalogEntry};
use crate::drafter::{build_context, build_description, draft_with_model};
use crate::error::Result;
use crate::llm::DraftModel;
use crate::schema::{columns_by_table, ColumnInfo, SchemaSource, TableInfo};
use crate::selector::{select_tables, TableFilter};
use crate::validator::validate_entry;
use std::fmt;
use tracing::{info, warn};

/// Entries produced without a validated LLM draft carry this tag so
/// consumers can tell schema-only contexts apart.
pub const FALLBACK_TAG: &str = "fallback_schema_only";

/// Generation scope for one run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub table_catalog: String,
    pub table_schema: String,
    pub table_like: String,
    pub table_regex: Option<String>,
    pub id_prefix: Option<String>,
}

/// How a table's emitted entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryProvenance {
    /// LLM draft passed grounding validation.
    LlmValidated,
    /// LLM draft failed or was rejected; baseline emitted.
    LlmFellBack,
    /// LLM drafting was not requested.
    BaselineOnly,
}

impl fmt::Display for EntryProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryProvenance::LlmValidated => write!(f, "llm_validated"),
            EntryProvenance::LlmFellBack => write!(f, "llm_fallback"),
            EntryProvenance::BaselineOnly => write!(f, "baseline_only"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub id: String,
    pub table: String,
    pub provenance: EntryProvenance,
}

#[derive(Debug)]
pub struct GenerationReport {
    pub catalog: Catalog,
    pub outcomes: Vec<TableOutcome>,
}

pub struct CatalogGenerator<'a> {
    schema: &'a dyn SchemaSource,
    model: Option<&'a dyn DraftModel>,
}

impl<'a> CatalogGenerator<'a> {
    pub fn new(schema: &'a dyn SchemaSource) -> Self {
        Self { schema, model: None }
    }

    /// Enable LLM-assisted drafting for this run.
    pub fn with_model(mut self, model: &'a dyn DraftModel) -> Self {
        self.model = Some(model);
        self
    }

    pub async fn run(&self, options: &GenerateOptions) -> Result<GenerationReport> {
        let filter = TableFilter::new(&options.table_like, options.table_regex.as_deref())?;
        let listed = self
            .schema
            .list_tables(&options.table_catalog, &options.table_schema, &options.table_like)
            .await?;
        let tables = select_tables(listed, &filter);
        info!(
            "{} table(s) selected in {}.{}",
            tables.len(),
            options.table_catalog,
            options.table_schema
        );

        let mut columns = columns_by_table(
            self.schema
                .list_columns(&options.table_catalog, &options.table_schema)
                .await?,
        );

        let mut assembler = CatalogAssembler::new(options.id_prefix.as_deref());
        let mut outcomes = Vec::with_capacity(tables.len());
        for table in &tables {
            let table_columns = match columns.remove(&table.table_name) {
                Some(found) if !found.is_empty() => found,
                _ => self.describe_fallback(table).await,
            };

            let (entry, provenance) = self.build_entry(table, &table_columns).await;
            let id = assembler.insert(&table.table_name, entry)?;
            info!("{} -> {} [{}]", table.fqn(), id, provenance);
            outcomes.push(TableOutcome {
                id,
                table: table.fqn(),
                provenance,
            });
        }

        Ok(GenerationReport {
            catalog: assembler.finish(),
            outcomes,
        })
    }

    /// The bulk columns view can lag behind newly created tables; a
    /// per-table DESCRIBE is then authoritative. A failing DESCRIBE only
    /// degrades this table to an empty column list.
    async fn describe_fallback(&self, table: &TableInfo) -> Vec<ColumnInfo> {
        match self.schema.describe_table(&table.fqn()).await {
            Ok(columns) => {
                if columns.is_empty() {
                    warn!("no columns found for {}", table.fqn());
                }
                columns
            }
            Err(e) => {
                warn!("DESCRIBE failed for {}: {}", table.fqn(), e);
                Vec::new()
            }
        }
    }

    async fn build_entry(
        &self,
        table: &TableInfo,
        columns: &[ColumnInfo],
    ) -> (CatalogEntry, EntryProvenance) {
        let baseline = CatalogEntry {
            descricao: build_description(table),
            contexto: build_context(table, columns),
            tags: Vec::new(),
            sinonimos: Vec::new(),
        };

        let model = match self.model {
            Some(model) => model,
            None => return (baseline, EntryProvenance::BaselineOnly),
        };

        match draft_with_model(model, table, columns).await {
            Ok(draft) => {
                let violations = validate_entry(&draft, table, columns);
                if violations.is_empty() {
                    let entry = CatalogEntry {
                        descricao: draft.descricao.trim().to_string(),
                        contexto: format!("{}\n", draft.contexto.trim()),
                        tags: draft.tags,
                        sinonimos: draft.sinonimos,
                    };
                    (entry, EntryProvenance::LlmValidated)
                } else {
                    for violation in &violations {
                        warn!("grounding violation: {}", violation);
                    }
                    (fallback(baseline), EntryProvenance::LlmFellBack)
                }
            }
            Err(e) => {
                warn!("LLM draft failed for {}: {}", table.fqn(), e);
                (fallback(baseline), EntryProvenance::LlmFellBack)
            }
        }
    }
}

/// Fallback entries are the baseline artifact byte-for-byte, plus the
/// degradation tag; rejection reasons stay in the logs so offending tokens
/// never leak into the artifact.
fn fallback(baseline: CatalogEntry) -> CatalogEntry {
    CatalogEntry {
        tags: vec![FALLBACK_TAG.to_string()],
        ..baseline
    }
}
