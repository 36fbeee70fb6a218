//! Table selection over the schema listing.
//!
//! The LIKE filter is pushed down to the warehouse query as well, but it is
//! re-applied here so any `SchemaSource` implementation (including the mock
//! ones in tests) goes through the same selection semantics.

use crate::error::{CatalogError, Result};
use crate::schema::{TableInfo, TableRef};
use regex::Regex;
use std::collections::HashSet;

/// Inclusion filters for the table listing.
///
/// The LIKE pattern is case-sensitive; the optional regex is an additional
/// AND filter with search (substring) semantics, so `mart` matches
/// `mart_a_core` while `^mart_.*_core$` only matches whole names.
#[derive(Debug)]
pub struct TableFilter {
    like: Regex,
    extra: Option<Regex>,
}

impl TableFilter {
    pub fn new(table_like: &str, table_regex: Option<&str>) -> Result<Self> {
        let extra = match table_regex {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                CatalogError::Config(format!("invalid table regex '{}': {}", pattern, e))
            })?),
            None => None,
        };
        Ok(Self {
            like: like_to_regex(table_like)?,
            extra,
        })
    }

    pub fn matches(&self, table_name: &str) -> bool {
        self.like.is_match(table_name)
            && self.extra.as_ref().map_or(true, |re| re.is_match(table_name))
    }
}

/// Compile a SQL LIKE pattern into an anchored regex (`%` -> `.*`,
/// `_` -> `.`, everything else literal).
pub fn like_to_regex(pattern: &str) -> Result<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => translated.push_str(".*"),
            '_' => translated.push('.'),
            other => translated.push_str(&regex::escape(&other.to_string())),
        }
    }
    translated.push('$');
    Regex::new(&translated)
        .map_err(|e| CatalogError::Config(format!("invalid LIKE pattern '{}': {}", pattern, e)))
}

/// Ordered, de-duplicated selection of the listing rows passing the filter.
pub fn select_tables(tables: Vec<TableInfo>, filter: &TableFilter) -> Vec<TableInfo> {
    let mut seen: HashSet<TableRef> = HashSet::new();
    let mut selected: Vec<TableInfo> = tables
        .into_iter()
        .filter(|t| filter.matches(&t.table_name))
        .filter(|t| seen.insert(t.table_ref()))
        .collect();
    selected.sort_by(|a, b| a.table_ref().cmp(&b.table_ref()));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> TableInfo {
        TableInfo {
            table_catalog: "dev".to_string(),
            table_schema: "diamond".to_string(),
            table_name: name.to_string(),
            comment: None,
        }
    }

    fn names(tables: &[TableInfo]) -> Vec<&str> {
        tables.iter().map(|t| t.table_name.as_str()).collect()
    }

    #[test]
    fn test_like_percent_wildcard() {
        let filter = TableFilter::new("mart_%", None).unwrap();
        let selected = select_tables(vec![table("mart_a"), table("mart_b"), table("fact_x")], &filter);
        assert_eq!(names(&selected), vec!["mart_a", "mart_b"]);
    }

    #[test]
    fn test_like_underscore_matches_single_char() {
        let filter = TableFilter::new("mart__", None).unwrap();
        assert!(filter.matches("mart_a"));
        assert!(!filter.matches("mart_ab"));
    }

    #[test]
    fn test_like_is_case_sensitive_and_anchored() {
        let filter = TableFilter::new("mart_%", None).unwrap();
        assert!(!filter.matches("MART_A"));
        assert!(!filter.matches("x_mart_a"));
    }

    #[test]
    fn test_regex_narrows_like_selection() {
        let filter = TableFilter::new("mart_%", Some("^mart_.*_core$")).unwrap();
        let selected = select_tables(vec![table("mart_a_core"), table("mart_b")], &filter);
        assert_eq!(names(&selected), vec!["mart_a_core"]);
    }

    #[test]
    fn test_regex_uses_search_semantics() {
        let filter = TableFilter::new("%", Some("core")).unwrap();
        assert!(filter.matches("mart_a_core"));
        assert!(filter.matches("core_mart"));
        assert!(!filter.matches("mart_b"));
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let err = TableFilter::new("%", Some("(")).unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }

    #[test]
    fn test_selection_is_ordered_and_deduplicated() {
        let filter = TableFilter::new("%", None).unwrap();
        let selected = select_tables(
            vec![table("mart_b"), table("mart_a"), table("mart_b")],
            &filter,
        );
        assert_eq!(names(&selected), vec!["mart_a", "mart_b"]);
    }

    #[test]
    fn test_empty_selection_is_not_an_error() {
        let filter = TableFilter::new("mart_%", None).unwrap();
        assert!(select_tables(vec![table("fact_x")], &filter).is_empty());
    }
}
