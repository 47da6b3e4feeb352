//! Query engine types.
//!
//! Type definitions for the query-string translation pipeline:
//! - FilterExpression: typed filter tree built from request parameters
//! - ControlDirectives: select/sort/page/limit extracted from the request
//! - Pagination / ResultEnvelope: the uniform list-response wrapper
//! - RelationSpec: caller-chosen relation population

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Comparison operators accepted in bracketed query keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Value in list.
    In,
}

impl ComparisonOp {
    /// Match a bracket segment against the operator keywords.
    ///
    /// Only an exact, whole-segment match is an operator; field names that
    /// merely contain an operator word (e.g. `budget`) never match.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            _ => None,
        }
    }
}

/// Filter value types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// UUID value.
    Uuid(Uuid),
    /// String value.
    Str(String),
    /// List of values (for the `in` operator).
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Parse a raw query-string scalar into the narrowest matching type.
    pub fn parse_scalar(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Self::Float(f);
        }
        if let Ok(u) = Uuid::parse_str(raw) {
            return Self::Uuid(u);
        }
        Self::Str(raw.to_string())
    }

    /// Parse a comma-separated list into a `List` of scalars.
    pub fn parse_list(raw: &str) -> Self {
        Self::List(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Self::parse_scalar)
                .collect(),
        )
    }

    /// String representation for text-typed comparisons (JSONB paths).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Uuid(u) => Some(u.to_string()),
            Self::Str(s) => Some(s.clone()),
            Self::List(_) => None,
        }
    }

    /// True for numeric variants (drives casts on JSONB comparisons).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }
}

/// A single condition on a field path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FilterCondition {
    /// Exact match.
    Equals(FilterValue),
    /// Comparison with one of the bracket operators.
    Compare {
        op: ComparisonOp,
        value: FilterValue,
    },
}

/// One clause of the filter tree: a dot-delimited field path plus condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterClause {
    pub path: String,
    pub condition: FilterCondition,
}

/// Structured filter built from the non-reserved query parameters.
///
/// Clauses are ANDed together, in request order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterExpression {
    pub clauses: Vec<FilterClause>,
}

impl FilterExpression {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort key parsed from the `sort` parameter (`-field` marks descending).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Control directives separated from the data filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlDirectives {
    /// Fields to project (empty = all non-hidden fields).
    pub select: Vec<String>,

    /// Sort order (empty = descending creation time).
    pub sort: Vec<SortKey>,

    /// Page number, 1-based.
    pub page: u32,

    /// Page size.
    pub limit: u32,
}

impl Default for ControlDirectives {
    fn default() -> Self {
        Self {
            select: Vec::new(),
            sort: Vec::new(),
            page: 1,
            limit: 20,
        }
    }
}

/// Link to an adjacent page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageLink {
    pub page: u32,
    pub limit: u32,
}

/// Pagination metadata for a list response.
///
/// `prev`/`next` are present only when the corresponding page exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
}

impl Pagination {
    /// Derive pagination links from the window and the filtered total.
    pub fn new(page: u32, limit: u32, total_count: u64) -> Self {
        let prev = (page > 1).then(|| PageLink {
            page: page - 1,
            limit,
        });
        let next = (u64::from(page) * u64::from(limit) < total_count).then(|| PageLink {
            page: page + 1,
            limit,
        });

        Self {
            page,
            limit,
            total_count,
            prev,
            next,
        }
    }
}

/// Uniform response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,

    /// Number of documents in this page (not the filtered total).
    pub count: usize,

    pub pagination: Pagination,

    pub data: Vec<serde_json::Value>,
}

impl ResultEnvelope {
    pub fn new(data: Vec<serde_json::Value>, pagination: Pagination) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination,
            data,
        }
    }
}

/// Caller-chosen relation population: which declared relation to resolve
/// and which fields of the related documents to keep.
#[derive(Debug, Clone)]
pub struct RelationSpec {
    /// Name of a relation declared on the target collection.
    pub field: String,

    /// Fields of the related document to return (empty = all).
    pub select: Vec<String>,
}

impl RelationSpec {
    pub fn new(field: &str, select: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            select: select.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn scalar_parsing_narrows_types() {
        assert_eq!(FilterValue::parse_scalar("true"), FilterValue::Bool(true));
        assert_eq!(FilterValue::parse_scalar("10000"), FilterValue::Int(10000));
        assert_eq!(FilterValue::parse_scalar("4.5"), FilterValue::Float(4.5));
        assert_eq!(
            FilterValue::parse_scalar("Boston"),
            FilterValue::Str("Boston".to_string())
        );

        let uuid = Uuid::now_v7();
        assert_eq!(
            FilterValue::parse_scalar(&uuid.to_string()),
            FilterValue::Uuid(uuid)
        );
    }

    #[test]
    fn list_parsing_splits_on_commas() {
        let parsed = FilterValue::parse_list("Business, Web Development,3");
        let FilterValue::List(items) = parsed else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], FilterValue::Str("Business".to_string()));
        assert_eq!(items[2], FilterValue::Int(3));
    }

    #[test]
    fn operator_matches_whole_segment_only() {
        assert_eq!(ComparisonOp::from_segment("gte"), Some(ComparisonOp::Gte));
        assert_eq!(ComparisonOp::from_segment("budget"), None);
        assert_eq!(ComparisonOp::from_segment("gt "), None);
        assert_eq!(ComparisonOp::from_segment("GTE"), None);
    }

    #[test]
    fn pagination_middle_page_has_both_links() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.prev, Some(PageLink { page: 1, limit: 10 }));
        assert_eq!(p.next, Some(PageLink { page: 3, limit: 10 }));
    }

    #[test]
    fn pagination_last_partial_page_has_no_next() {
        // 23 documents, page 3 of 10: skip 20, take up to 3.
        let p = Pagination::new(3, 10, 23);
        assert_eq!(p.prev, Some(PageLink { page: 2, limit: 10 }));
        assert!(p.next.is_none());
    }

    #[test]
    fn pagination_first_page_has_no_prev() {
        let p = Pagination::new(1, 10, 25);
        assert!(p.prev.is_none());
        assert!(p.next.is_some());
    }

    #[test]
    fn pagination_exact_boundary_has_no_next() {
        // page * limit == total: nothing beyond this page.
        let p = Pagination::new(2, 10, 20);
        assert!(p.next.is_none());
    }

    #[test]
    fn envelope_count_is_page_size_not_total() {
        let data = vec![serde_json::json!({"id": 1}), serde_json::json!({"id": 2})];
        let envelope = ResultEnvelope::new(data, Pagination::new(1, 10, 42));
        assert!(envelope.success);
        assert_eq!(envelope.count, 2);
        assert_eq!(envelope.pagination.total_count, 42);
    }

    #[test]
    fn absent_links_are_omitted_from_json() {
        let p = Pagination::new(1, 10, 5);
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("prev").is_none());
        assert!(json.get("next").is_none());
        assert_eq!(json["totalCount"], 5);
    }
}
