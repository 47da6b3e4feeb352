//! Result Assembler.
//!
//! Executes a normalized query against a collection: a filtered COUNT, a
//! filtered/projected/sorted/windowed fetch (as JSON documents via
//! `row_to_json`), optional relation population as one batched sub-query
//! distributed into the returned documents, and the uniform
//! [`ResultEnvelope`].
//!
//! The count and the fetch are two separate reads with no transaction
//! linking them; the total may drift under concurrent writes. Storage
//! errors are propagated untranslated — HTTP classification happens at
//! the error boundary.

use std::collections::HashSet;

use anyhow::{Context, Result};
use sea_query::{Alias, Asterisk, Expr, ExprTrait, PostgresQueryBuilder, Query};
use sqlx::PgPool;
use uuid::Uuid;

use super::builder::{POPULATE_LIMIT, SelectBuilder};
use super::normalize::normalize;
use super::types::{
    ControlDirectives, FilterExpression, Pagination, RelationSpec, ResultEnvelope,
};
use crate::storage::{Collection, Relation};

/// Executes normalized queries against the database.
#[derive(Clone)]
pub struct ResultAssembler {
    pool: PgPool,
}

impl ResultAssembler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Normalize raw query pairs and assemble the envelope in one step.
    ///
    /// This is the composition every list endpoint uses.
    pub async fn advanced_results(
        &self,
        collection: &Collection,
        raw: &[(String, String)],
        populate: Option<&RelationSpec>,
    ) -> Result<ResultEnvelope> {
        let (filter, directives) = normalize(raw);
        self.assemble(collection, &filter, &directives, populate)
            .await
    }

    /// Assemble the result envelope for a normalized query.
    pub async fn assemble(
        &self,
        collection: &Collection,
        filter: &FilterExpression,
        directives: &ControlDirectives,
        populate: Option<&RelationSpec>,
    ) -> Result<ResultEnvelope> {
        let builder = SelectBuilder::new(collection, filter, directives);

        let count_sql = builder.build_count();
        let total: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&self.pool)
            .await
            .context("failed to execute count query")?;

        let main_sql = builder.build();
        let mut rows: Vec<serde_json::Value> =
            sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({main_sql}) t"))
                .fetch_all(&self.pool)
                .await
                .context("failed to execute list query")?;

        if let Some(spec) = populate {
            self.populate(collection, &mut rows, spec).await?;
        }

        let pagination = Pagination::new(directives.page, directives.limit, total.max(0) as u64);
        Ok(ResultEnvelope::new(rows, pagination))
    }

    /// Resolve one declared relation for every returned document.
    ///
    /// One batched query loads all related documents, which are then
    /// distributed into their parents by join value.
    async fn populate(
        &self,
        collection: &Collection,
        rows: &mut [serde_json::Value],
        spec: &RelationSpec,
    ) -> Result<()> {
        let relation = collection.relation(&spec.field).ok_or_else(|| {
            anyhow::anyhow!("unknown relation '{}' on {}", spec.field, collection.name)
        })?;

        // Collect and deduplicate parent join values.
        let mut seen = HashSet::new();
        let parent_values: Vec<String> = rows
            .iter()
            .filter_map(|row| extract_field_value(row, relation.local_key))
            .filter(|v| seen.insert(v.clone()))
            .collect();

        if parent_values.is_empty() {
            embed_empty(rows, relation);
            return Ok(());
        }

        let sql = child_query(relation, spec, &parent_values);
        let children: Vec<serde_json::Value> =
            sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({sql}) t"))
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("failed to resolve relation '{}'", relation.field))?;

        distribute(rows, &children, relation);
        Ok(())
    }
}

/// Build the batched sub-query loading related documents.
fn child_query(relation: &Relation, spec: &RelationSpec, parent_values: &[String]) -> String {
    let table = Alias::new(relation.target_table);
    let mut query = Query::select();

    if spec.select.is_empty() {
        query.column((table.clone(), Asterisk));
    } else {
        // The join key (and id) must ride along for distribution.
        let mut projected: Vec<&str> = vec!["id", relation.foreign_key];
        for field in &spec.select {
            if !projected.contains(&field.as_str()) {
                projected.push(field);
            }
        }
        for column in projected {
            query.column((table.clone(), Alias::new(column)));
        }
    }

    query.from(table.clone());

    let values: Vec<sea_query::Value> = parent_values
        .iter()
        .map(|v| match Uuid::parse_str(v) {
            Ok(uuid) => uuid.into(),
            Err(_) => v.clone().into(),
        })
        .collect();
    query.and_where(Expr::col((table, Alias::new(relation.foreign_key))).is_in(values));
    query.limit(POPULATE_LIMIT);

    query.to_string(PostgresQueryBuilder)
}

/// Embed the empty relation value on every parent.
fn embed_empty(rows: &mut [serde_json::Value], relation: &Relation) {
    for row in rows.iter_mut() {
        if let Some(obj) = row.as_object_mut() {
            let empty = if relation.singular {
                serde_json::Value::Null
            } else {
                serde_json::json!([])
            };
            obj.insert(relation.field.to_string(), empty);
        }
    }
}

/// Distribute loaded child documents into their parents by join value.
fn distribute(rows: &mut [serde_json::Value], children: &[serde_json::Value], relation: &Relation) {
    for row in rows.iter_mut() {
        let parent_value = extract_field_value(row, relation.local_key);

        let matching: Vec<&serde_json::Value> = children
            .iter()
            .filter(|child| {
                parent_value.is_some()
                    && extract_field_value(child, relation.foreign_key) == parent_value
            })
            .collect();

        let Some(obj) = row.as_object_mut() else {
            continue;
        };
        if relation.singular {
            obj.insert(
                relation.field.to_string(),
                matching
                    .first()
                    .map(|v| (*v).clone())
                    .unwrap_or(serde_json::Value::Null),
            );
        } else {
            obj.insert(
                relation.field.to_string(),
                serde_json::Value::Array(matching.into_iter().cloned().collect()),
            );
        }
    }
}

/// Extract a document field as a comparable string.
fn extract_field_value(item: &serde_json::Value, field: &str) -> Option<String> {
    match item.get(field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::{BOOTCAMPS, COURSES};
    use serde_json::json;

    #[test]
    fn child_query_projects_join_key_and_fields() {
        let relation = BOOTCAMPS.relation("courses").unwrap();
        let spec = RelationSpec::new("courses", &["title", "tuition"]);
        let sql = child_query(relation, &spec, &["a".to_string()]);

        assert!(sql.contains("FROM \"course\""));
        assert!(sql.contains("\"course\".\"id\""));
        assert!(sql.contains("\"course\".\"bootcamp_id\""));
        assert!(sql.contains("\"course\".\"title\""));
        assert!(sql.contains("\"course\".\"tuition\""));
        assert!(!sql.contains("\"course\".\"description\""));
        assert!(sql.contains("IN"));
    }

    #[test]
    fn child_query_without_selection_takes_all_fields() {
        let relation = COURSES.relation("bootcamp").unwrap();
        let spec = RelationSpec::new("bootcamp", &[]);
        let uuid = Uuid::now_v7().to_string();
        let sql = child_query(relation, &spec, &[uuid.clone()]);

        assert!(sql.contains("\"bootcamp\".*"));
        assert!(sql.contains(&uuid));
    }

    #[test]
    fn distribute_groups_children_under_parents() {
        let relation = BOOTCAMPS.relation("courses").unwrap();
        let mut rows = vec![json!({"id": "b1"}), json!({"id": "b2"})];
        let children = vec![
            json!({"id": "c1", "bootcamp_id": "b1"}),
            json!({"id": "c2", "bootcamp_id": "b1"}),
            json!({"id": "c3", "bootcamp_id": "b3"}),
        ];

        distribute(&mut rows, &children, relation);

        assert_eq!(rows[0]["courses"].as_array().unwrap().len(), 2);
        assert_eq!(rows[1]["courses"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn distribute_singular_embeds_object_or_null() {
        let relation = COURSES.relation("bootcamp").unwrap();
        let mut rows = vec![
            json!({"id": "c1", "bootcamp_id": "b1"}),
            json!({"id": "c2", "bootcamp_id": "missing"}),
        ];
        let children = vec![json!({"id": "b1", "name": "Devworks"})];

        distribute(&mut rows, &children, relation);

        assert_eq!(rows[0]["bootcamp"]["name"], "Devworks");
        assert!(rows[1]["bootcamp"].is_null());
    }

    #[test]
    fn embed_empty_matches_relation_shape() {
        let many = BOOTCAMPS.relation("courses").unwrap();
        let one = COURSES.relation("bootcamp").unwrap();

        let mut rows = vec![json!({"id": "x"})];
        embed_empty(&mut rows, many);
        assert!(rows[0]["courses"].as_array().unwrap().is_empty());

        let mut rows = vec![json!({"id": "x", "bootcamp_id": "y"})];
        embed_empty(&mut rows, one);
        assert!(rows[0]["bootcamp"].is_null());
    }

    #[test]
    fn field_extraction_handles_scalar_shapes() {
        let item = json!({"s": "text", "n": 7, "b": true, "o": {"nested": 1}});
        assert_eq!(extract_field_value(&item, "s"), Some("text".to_string()));
        assert_eq!(extract_field_value(&item, "n"), Some("7".to_string()));
        assert_eq!(extract_field_value(&item, "b"), Some("true".to_string()));
        assert_eq!(extract_field_value(&item, "o"), None);
        assert_eq!(extract_field_value(&item, "missing"), None);
    }
}
