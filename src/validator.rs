//! Grounding validation for drafted catalog entries.
//!
//! Token matching is heuristic: natural language does not delimit
//! identifiers, so the rules here are conservative. Flagging a real
//! reference only costs a fallback to the baseline artifact; letting a
//! fabricated identifier through would mislead the SQL generator.
//!
//! A token "looks like a schema reference" when it is one of:
//! - a backtick-delimited span in `contexto`;
//! - the leading token of a `- ` line inside the `Colunas:` section;
//! - a dot-qualified identifier chain (`schema.table`, `table.column`, FQN);
//! - a bare lowercase snake_case word (at least one underscore).
//! Every such token is compared against the table's own identifiers with
//! case-insensitive exact matching, never substring matching, so columns
//! named like common words (`id`, `date`) resolve correctly.

use crate::drafter::LlmCatalogEntry;
use crate::schema::{ColumnInfo, TableInfo};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

lazy_static! {
    static ref BACKTICK_RE: Regex = Regex::new(r"`([^`]+)`").unwrap();
    static ref QUALIFIED_RE: Regex =
        Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)+\b").unwrap();
    static ref SNAKE_RE: Regex = Regex::new(r"\b[a-z][a-z0-9]*(?:_[a-z0-9]+)+\b").unwrap();
}

/// Which artifact field a violation was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactField {
    Description,
    Context,
}

impl fmt::Display for ArtifactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactField::Description => write!(f, "descricao"),
            ArtifactField::Context => write!(f, "contexto"),
        }
    }
}

/// A reference in a drafted artifact with no matching schema fact.
#[derive(Debug, Clone)]
pub struct GroundingViolation {
    pub table: String,
    pub field: ArtifactField,
    pub token: String,
    pub reason: String,
}

impl GroundingViolation {
    fn new(table: &str, field: ArtifactField, token: &str, reason: &str) -> Self {
        Self {
            table: table.to_string(),
            field,
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for GroundingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: '{}' in {} ({})",
            self.table, self.token, self.field, self.reason
        )
    }
}

/// Check a candidate entry against the schema facts of its table.
///
/// Returns every violation found; an empty result means the candidate is
/// grounded and may be emitted as-is.
pub fn validate_entry(
    entry: &LlmCatalogEntry,
    table: &TableInfo,
    columns: &[ColumnInfo],
) -> Vec<GroundingViolation> {
    let fqn = table.fqn();
    let allowed: HashSet<String> = columns
        .iter()
        .map(|c| c.column_name.to_lowercase())
        .collect();
    let mut violations = Vec::new();

    // The context must cite its own table, in backticks, exactly once as
    // the only backticked reference.
    let expected = format!("`{}`", fqn);
    if !entry.contexto.contains(&expected) {
        violations.push(GroundingViolation::new(
            &fqn,
            ArtifactField::Context,
            &fqn,
            "contexto does not cite the expected table",
        ));
    }
    for capture in BACKTICK_RE.captures_iter(&entry.contexto) {
        let spanned = &capture[1];
        if spanned != fqn {
            violations.push(GroundingViolation::new(
                &fqn,
                ArtifactField::Context,
                spanned,
                "backticked reference to another object",
            ));
        }
    }

    check_column_section(entry, table, &allowed, &mut violations);
    scan_tokens(ArtifactField::Description, &entry.descricao, table, &allowed, &mut violations);
    scan_tokens(ArtifactField::Context, &entry.contexto, table, &allowed, &mut violations);

    violations
}

/// Lines of the `Colunas:` section must each name a real column.
fn check_column_section(
    entry: &LlmCatalogEntry,
    table: &TableInfo,
    allowed: &HashSet<String>,
    violations: &mut Vec<GroundingViolation>,
) {
    if allowed.is_empty() {
        return;
    }
    let fqn = table.fqn();
    let mut in_columns = false;
    let mut listed = 0usize;
    for line in entry.contexto.lines() {
        let trimmed = line.trim();
        if trimmed == "Colunas:" {
            in_columns = true;
            continue;
        }
        if trimmed == "Regras:" {
            in_columns = false;
            continue;
        }
        if in_columns && trimmed.starts_with("- ") {
            let token = leading_identifier(&trimmed[2..]);
            if token.is_empty() {
                continue;
            }
            if allowed.contains(&token.to_lowercase()) {
                listed += 1;
            } else {
                violations.push(GroundingViolation::new(
                    &fqn,
                    ArtifactField::Context,
                    token,
                    "column not present in schema",
                ));
            }
        }
    }
    if listed == 0 {
        violations.push(GroundingViolation::new(
            &fqn,
            ArtifactField::Context,
            "Colunas:",
            "no real columns listed",
        ));
    }
}

/// Leading identifier of a `- ` column line: everything up to the first
/// whitespace, `(` or `:`, minus a trailing period.
fn leading_identifier(text: &str) -> &str {
    text.trim()
        .split(|c: char| c.is_whitespace() || c == '(' || c == ':')
        .next()
        .unwrap_or("")
        .trim_end_matches('.')
}

fn scan_tokens(
    field: ArtifactField,
    text: &str,
    table: &TableInfo,
    allowed: &HashSet<String>,
    violations: &mut Vec<GroundingViolation>,
) {
    let fqn = table.fqn();
    for token in QUALIFIED_RE.find_iter(text) {
        if !qualified_token_is_grounded(token.as_str(), table, allowed) {
            violations.push(GroundingViolation::new(
                &fqn,
                field,
                token.as_str(),
                "qualified reference does not resolve to this table",
            ));
        }
    }
    for token in SNAKE_RE.find_iter(text) {
        if !bare_token_is_grounded(token.as_str(), table, allowed) {
            violations.push(GroundingViolation::new(
                &fqn,
                field,
                token.as_str(),
                "identifier not present in schema",
            ));
        }
    }
}

/// A dotted chain is grounded when it is the FQN (or its table-ending
/// suffix), optionally followed by one known column.
fn qualified_token_is_grounded(token: &str, table: &TableInfo, allowed: &HashSet<String>) -> bool {
    let segments: Vec<String> = token.split('.').map(str::to_lowercase).collect();
    let catalog = table.table_catalog.to_lowercase();
    let schema = table.table_schema.to_lowercase();
    let name = table.table_name.to_lowercase();

    let path_matches = |path: &[String]| -> bool {
        match path {
            [t] => *t == name,
            [s, t] => *s == schema && *t == name,
            [c, s, t] => *c == catalog && *s == schema && *t == name,
            _ => false,
        }
    };

    if path_matches(&segments) {
        return true;
    }
    if segments.len() >= 2 {
        let (path, last) = segments.split_at(segments.len() - 1);
        if path_matches(path) && allowed.contains(&last[0]) {
            return true;
        }
    }
    false
}

/// A bare snake_case word is grounded when it names a column of the table,
/// or the table/schema/catalog itself.
fn bare_token_is_grounded(token: &str, table: &TableInfo, allowed: &HashSet<String>) -> bool {
    let lowered = token.to_lowercase();
    allowed.contains(&lowered)
        || lowered == table.table_name.to_lowercase()
        || lowered == table.table_schema.to_lowercase()
        || lowered == table.table_catalog.to_lowercase()
}
