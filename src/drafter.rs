//! Context drafting.
//!
//! The baseline path only echoes schema facts, so it can always stand in
//! for a rejected or failed LLM draft. The PT-BR artifact text (section
//! headers included) is the wire format the downstream routing/SQL layer
//! consumes; do not restyle it.

use crate::error::{CatalogError, Result};
use crate::llm::{extract_json, DraftModel};
use crate::schema::{ColumnInfo, TableInfo};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Entry shape the model must produce.
///
/// `tags`/`sinonimos` are optional so routing can evolve without breaking
/// consumers that only require `descricao`/`contexto`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCatalogEntry {
    pub descricao: String,
    pub contexto: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sinonimos: Vec<String>,
}

/// Deterministic `contexto` built from schema facts alone.
pub fn build_context(table: &TableInfo, columns: &[ColumnInfo]) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("Você é um analista de dados. Tabela: `{}`", table.fqn()));
    lines.push(String::new());
    if let Some(comment) = nonempty(table.comment.as_deref()) {
        lines.push(format!("Descrição da tabela: {}", comment));
        lines.push(String::new());
    }

    lines.push("Colunas:".to_string());
    if columns.is_empty() {
        lines.push("- (sem colunas encontradas no information_schema)".to_string());
    } else {
        for column in columns {
            let type_part = column
                .data_type
                .as_deref()
                .map(|t| format!(" ({})", t))
                .unwrap_or_default();
            let comment_part = nonempty(column.comment.as_deref())
                .map(|c| format!(": {}", c))
                .unwrap_or_default();
            lines.push(format!("- {}{}{}.", column.column_name, type_part, comment_part));
        }
    }
    lines.push(String::new());
    lines.push("Regras:".to_string());
    lines.push("1. Prefira selecionar apenas as colunas necessárias (evite SELECT *).".to_string());
    lines.push("2. Use filtros por período quando aplicável (ex.: datas/partições).".to_string());
    lines.push("3. Se não houver agregação explícita, use LIMIT 100.".to_string());
    lines.push(
        "4. Ao agregar, confira o grão para evitar duplicação (JOINs podem multiplicar linhas)."
            .to_string(),
    );
    format!("{}\n", lines.join("\n").trim())
}

/// Deterministic one-line `descricao`: the table comment when present.
pub fn build_description(table: &TableInfo) -> String {
    match nonempty(table.comment.as_deref()) {
        Some(comment) => comment.to_string(),
        None => format!("Tabela `{}`.", table.fqn()),
    }
}

/// Grounding prompt for the LLM: real metadata only, strict-JSON output.
pub fn build_llm_prompt(table: &TableInfo, columns: &[ColumnInfo]) -> String {
    let column_lines = if columns.is_empty() {
        "- (sem colunas no information_schema)".to_string()
    } else {
        columns
            .iter()
            .map(|column| {
                let type_part = column
                    .data_type
                    .as_deref()
                    .map(|t| format!(" ({})", t))
                    .unwrap_or_default();
                let comment_part = nonempty(column.comment.as_deref())
                    .map(|c| format!(" - {}", c))
                    .unwrap_or_default();
                format!("- {}{}{}", column.column_name, type_part, comment_part)
            })
            .join("\n")
    };
    let table_comment = nonempty(table.comment.as_deref()).unwrap_or("");
    let fqn = table.fqn();

    format!(
        r#"Você é um especialista em modelagem de dados e geração de contexto para SQL (Spark SQL / Databricks).

Você receberá APENAS metadados reais (schema). Não invente colunas e não invente tabelas.

Tabela (FQN): {fqn}
Comentário da tabela: {table_comment}

Colunas reais (nome, tipo, comentário quando existir):
{column_lines}

Tarefa:
Gere um JSON estrito (apenas JSON, sem markdown, sem texto extra) com o seguinte schema:
{{
  "descricao": "string curta (1 linha) para ajudar o roteador a escolher a tabela",
  "contexto": "texto em PT-BR com: 1) a frase inicial 'Você é um analista de dados. Tabela: `<FQN>`' 2) uma seção 'Colunas:' listando SOMENTE colunas reais 3) uma seção 'Regras:' com orientações práticas (filtros, grão, duplicação, LIMIT quando aplicável)",
  "tags": ["opcional", "strings curtas"],
  "sinonimos": ["opcional", "termos de negócio relevantes"]
}}

Regras obrigatórias:
- Em `contexto`, cite a tabela exatamente como `{fqn}` dentro de crases: `{fqn}`.
- Na seção `Colunas:`, liste apenas colunas que estão na lista fornecida.
- Não cite nomes de outras tabelas.
- Responda APENAS com JSON válido."#
    )
}

/// Ask the model for a candidate entry. The result is not yet grounded;
/// callers must pass it through the validator.
pub async fn draft_with_model(
    model: &dyn DraftModel,
    table: &TableInfo,
    columns: &[ColumnInfo],
) -> Result<LlmCatalogEntry> {
    let prompt = build_llm_prompt(table, columns);
    let raw = model.draft(&prompt).await?;
    let entry: LlmCatalogEntry = serde_json::from_str(&extract_json(&raw))
        .map_err(|e| CatalogError::Llm(format!("failed to parse draft for {}: {}", table.fqn(), e)))?;
    if entry.descricao.trim().is_empty() || entry.contexto.trim().is_empty() {
        return Err(CatalogError::Llm(format!("empty draft fields for {}", table.fqn())));
    }
    Ok(entry)
}

fn nonempty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
