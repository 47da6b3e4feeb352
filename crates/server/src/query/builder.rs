//! SQL generation for the query engine, using SeaQuery.
//!
//! Translates a [`FilterExpression`] plus [`ControlDirectives`] into
//! SELECT and COUNT statements against a [`Collection`]:
//! - JSONB path extraction for document fields (`location.city`)
//! - numeric casts when comparing JSONB text to numbers
//! - projection honoring the collection's hidden-field policy
//! - sort mapping with a descending creation-time default
//! - LIMIT/OFFSET windowing

use sea_query::{
    Alias, Asterisk, Expr, ExprTrait, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr,
};

use super::types::{
    ComparisonOp, ControlDirectives, FilterClause, FilterCondition, FilterExpression, FilterValue,
    SortDirection,
};
use crate::storage::Collection;

/// Upper bound on relation sub-query sizes.
pub const POPULATE_LIMIT: u64 = 1000;

/// Query builder for one collection fetch.
pub struct SelectBuilder<'a> {
    collection: &'a Collection,
    filter: &'a FilterExpression,
    directives: &'a ControlDirectives,
}

impl<'a> SelectBuilder<'a> {
    pub fn new(
        collection: &'a Collection,
        filter: &'a FilterExpression,
        directives: &'a ControlDirectives,
    ) -> Self {
        Self {
            collection,
            filter,
            directives,
        }
    }

    /// Build the windowed SELECT statement.
    pub fn build(&self) -> String {
        let mut query = Query::select();

        self.add_projection(&mut query);
        query.from(Alias::new(self.collection.table));
        self.add_filters(&mut query);
        self.add_sorts(&mut query);

        let page = u64::from(self.directives.page);
        let limit = u64::from(self.directives.limit);
        query.limit(limit);
        query.offset(page.saturating_sub(1) * limit);

        query.to_string(PostgresQueryBuilder)
    }

    /// Build the COUNT statement over the same filter.
    pub fn build_count(&self) -> String {
        let mut query = Query::select();

        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(self.collection.table));
        self.add_filters(&mut query);

        query.to_string(PostgresQueryBuilder)
    }

    /// Add SELECT columns honoring the hidden-field policy.
    fn add_projection(&self, query: &mut SelectStatement) {
        let table = self.collection.table;

        if self.directives.select.is_empty() {
            if self.collection.hidden_fields.is_empty() {
                query.column((Alias::new(table), Asterisk));
            } else {
                for column in self.collection.columns {
                    if !self.collection.is_hidden(column) {
                        query.column((Alias::new(table), Alias::new(*column)));
                    }
                }
            }
            return;
        }

        // The identifier always rides along, selected or not.
        query.column((Alias::new(table), Alias::new("id")));
        for field in &self.directives.select {
            if field == "id"
                || self.collection.is_hidden(field)
                || !self.collection.has_column(field)
            {
                continue;
            }
            query.column((Alias::new(table), Alias::new(field.as_str())));
        }
    }

    /// Add WHERE conditions from the filter tree.
    fn add_filters(&self, query: &mut SelectStatement) {
        for clause in &self.filter.clauses {
            if let Some(condition) = self.condition_for(clause) {
                query.and_where(condition);
            }
        }
    }

    /// Build a single filter condition.
    ///
    /// Clauses over unknown or hidden fields are dropped rather than
    /// forwarded to the storage layer as invalid SQL.
    fn condition_for(&self, clause: &FilterClause) -> Option<SimpleExpr> {
        let (head, leaf) = split_path(&clause.path);

        if self.collection.is_hidden(head) {
            return None;
        }

        if self.collection.is_document_field(head) {
            return self.document_condition(head, leaf, &clause.condition);
        }

        if leaf.is_some() || !self.collection.has_column(head) {
            return None;
        }

        let column = Expr::col((Alias::new(self.collection.table), Alias::new(head))).into();
        Some(column_condition(column, &clause.condition))
    }

    /// Condition over a JSONB document field.
    fn document_condition(
        &self,
        column: &str,
        leaf: Option<&str>,
        condition: &FilterCondition,
    ) -> Option<SimpleExpr> {
        let table = self.collection.table;

        let Some(leaf) = leaf else {
            // Whole-field conditions treat the JSONB value as a set:
            // equality is membership, `in` is overlap.
            return match condition {
                FilterCondition::Equals(value) => {
                    let text = value.as_text()?;
                    Some(Expr::cust(format!(
                        "{table}.{column} ? '{}'",
                        escape_literal(&text)
                    )))
                }
                FilterCondition::Compare {
                    op: ComparisonOp::In,
                    value: FilterValue::List(items),
                } => {
                    let quoted: Vec<String> = items
                        .iter()
                        .filter_map(FilterValue::as_text)
                        .map(|s| format!("'{}'", escape_literal(&s)))
                        .collect();
                    if quoted.is_empty() {
                        return None;
                    }
                    Some(Expr::cust(format!(
                        "{table}.{column} ?| array[{}]",
                        quoted.join(", ")
                    )))
                }
                FilterCondition::Compare { .. } => None,
            };
        };

        // Numeric operands compare against a ::numeric cast of the
        // extracted text; everything else compares as text.
        let numeric = match condition {
            FilterCondition::Equals(v) => v.is_numeric(),
            FilterCondition::Compare { value, .. } => value.is_numeric(),
        };
        let extracted = jsonb_extract_expr(table, column, leaf, numeric);

        match condition {
            FilterCondition::Equals(value) => {
                if numeric {
                    Some(column_condition(extracted, condition))
                } else {
                    let text = value.as_text()?;
                    Some(extracted.eq(text))
                }
            }
            FilterCondition::Compare {
                op: ComparisonOp::In,
                value: FilterValue::List(items),
            } => {
                if numeric {
                    let values: Vec<sea_query::Value> = items.iter().map(sea_value).collect();
                    Some(extracted.is_in(values))
                } else {
                    let values: Vec<String> =
                        items.iter().filter_map(FilterValue::as_text).collect();
                    if values.is_empty() {
                        return None;
                    }
                    Some(extracted.is_in(values))
                }
            }
            FilterCondition::Compare { .. } => Some(column_condition(extracted, condition)),
        }
    }

    /// Add ORDER BY clauses, defaulting to descending creation time.
    fn add_sorts(&self, query: &mut SelectStatement) {
        let table = self.collection.table;

        if self.directives.sort.is_empty() {
            query.order_by(
                (
                    Alias::new(table),
                    Alias::new(self.collection.created_field),
                ),
                Order::Desc,
            );
            return;
        }

        for sort in &self.directives.sort {
            let order = match sort.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };

            let (head, leaf) = split_path(&sort.field);
            if self.collection.is_hidden(head) {
                continue;
            }
            if self.collection.is_document_field(head) {
                if let Some(leaf) = leaf {
                    query.order_by_expr(jsonb_extract_expr(table, head, leaf, false), order);
                }
                continue;
            }
            if leaf.is_none() && self.collection.has_column(head) {
                query.order_by((Alias::new(table), Alias::new(head)), order);
            }
        }
    }
}

/// Split a dot path into head column and remaining path.
fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) if !rest.is_empty() => (head, Some(rest)),
        _ => (path, None),
    }
}

/// Extract a value from a JSONB column as text (`->>`), walking nested
/// paths with `->`, optionally cast to numeric for comparisons.
fn jsonb_extract_expr(table: &str, column: &str, path: &str, numeric: bool) -> SimpleExpr {
    let mut expr = format!("{table}.{column}");
    let parts: Vec<&str> = path.split('.').collect();
    for (i, part) in parts.iter().enumerate() {
        let part = escape_literal(part);
        if i == parts.len() - 1 {
            expr = format!("({expr}->>'{part}')");
        } else {
            expr = format!("({expr}->'{part}')");
        }
    }
    if numeric {
        expr = format!("{expr}::numeric");
    }
    Expr::cust(expr)
}

/// Build a condition against an already-resolved column expression.
fn column_condition(column: SimpleExpr, condition: &FilterCondition) -> SimpleExpr {
    match condition {
        FilterCondition::Equals(value) => column.eq(sea_value(value)),
        FilterCondition::Compare { op, value } => match op {
            ComparisonOp::Gt => column.gt(sea_value(value)),
            ComparisonOp::Gte => column.gte(sea_value(value)),
            ComparisonOp::Lt => column.lt(sea_value(value)),
            ComparisonOp::Lte => column.lte(sea_value(value)),
            ComparisonOp::In => {
                let values: Vec<sea_query::Value> = match value {
                    FilterValue::List(items) => items.iter().map(sea_value).collect(),
                    scalar => vec![sea_value(scalar)],
                };
                column.is_in(values)
            }
        },
    }
}

/// Convert a scalar filter value into a SeaQuery value.
fn sea_value(value: &FilterValue) -> sea_query::Value {
    match value {
        FilterValue::Bool(b) => (*b).into(),
        FilterValue::Int(i) => (*i).into(),
        FilterValue::Float(f) => (*f).into(),
        FilterValue::Uuid(u) => (*u).into(),
        FilterValue::Str(s) => s.clone().into(),
        // Lists are unpacked by the caller; a stray list degrades to text.
        FilterValue::List(_) => String::new().into(),
    }
}

/// Escape a string for inline use inside a single-quoted SQL literal.
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::normalize::normalize;
    use crate::storage::{BOOTCAMPS, USERS};

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn bare_query_defaults() {
        let (filter, directives) = normalize(&[]);
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("FROM \"bootcamp\""));
        assert!(sql.contains("LIMIT 20"));
        assert!(sql.contains("OFFSET 0"));
        assert!(sql.contains("ORDER BY \"bootcamp\".\"created_at\" DESC"));
    }

    #[test]
    fn count_query_has_no_window() {
        let (filter, directives) = normalize(&pairs(&[("housing", "true"), ("page", "3")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build_count();

        assert!(sql.contains("COUNT(*)"));
        assert!(sql.contains("FROM \"bootcamp\""));
        assert!(sql.contains("housing"));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("OFFSET"));
    }

    #[test]
    fn pagination_window_math() {
        let (filter, directives) = normalize(&pairs(&[("page", "3"), ("limit", "10")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
    }

    #[test]
    fn numeric_comparison_on_plain_column() {
        let (filter, directives) = normalize(&pairs(&[("average_cost[lte]", "10000")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("\"average_cost\" <= 10000"), "sql: {sql}");
    }

    #[test]
    fn jsonb_path_filter_extracts_text() {
        let (filter, directives) = normalize(&pairs(&[("location[city]", "Boston")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("location->>'city'"), "sql: {sql}");
        assert!(sql.contains("Boston"));
    }

    #[test]
    fn jsonb_numeric_comparison_casts() {
        let (filter, directives) = normalize(&pairs(&[("location[lat]", "42.3")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("location->>'lat'"), "sql: {sql}");
        assert!(sql.contains("::numeric"), "sql: {sql}");
    }

    #[test]
    fn jsonb_array_in_uses_overlap() {
        let (filter, directives) = normalize(&pairs(&[("careers[in]", "Business,UI/UX")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("careers ?| array['Business', 'UI/UX']"), "sql: {sql}");
    }

    #[test]
    fn projection_always_carries_id() {
        let (filter, directives) = normalize(&pairs(&[("select", "name,description")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("\"bootcamp\".\"id\""));
        assert!(sql.contains("\"bootcamp\".\"name\""));
        assert!(sql.contains("\"bootcamp\".\"description\""));
        assert!(!sql.contains("\"bootcamp\".\"website\""));
    }

    #[test]
    fn hidden_field_cannot_be_selected_or_filtered() {
        let (filter, directives) =
            normalize(&pairs(&[("select", "name,password"), ("password", "x")]));
        let builder = SelectBuilder::new(&USERS, &filter, &directives);
        let sql = builder.build();

        assert!(!sql.contains("password"), "sql: {sql}");
    }

    #[test]
    fn default_projection_excludes_hidden_fields() {
        let (filter, directives) = normalize(&[]);
        let builder = SelectBuilder::new(&USERS, &filter, &directives);
        let sql = builder.build();

        assert!(!sql.contains("password"), "sql: {sql}");
        assert!(sql.contains("\"users\".\"email\""));
    }

    #[test]
    fn unknown_fields_are_dropped_not_forwarded() {
        let (filter, directives) =
            normalize(&pairs(&[("nonexistent", "1"), ("sort", "alsonothere")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(!sql.contains("nonexistent"));
        assert!(!sql.contains("alsonothere"));
    }

    #[test]
    fn sort_directions_map_to_sql() {
        let (filter, directives) = normalize(&pairs(&[("sort", "-average_rating,name")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("\"average_rating\" DESC"), "sql: {sql}");
        assert!(sql.contains("\"name\" ASC"), "sql: {sql}");
    }

    #[test]
    fn quotes_in_values_are_escaped() {
        let (filter, directives) = normalize(&pairs(&[("careers[in]", "O'Reilly")]));
        let builder = SelectBuilder::new(&BOOTCAMPS, &filter, &directives);
        let sql = builder.build();

        assert!(sql.contains("'O''Reilly'"), "sql: {sql}");
    }
}
