//! Bootcamp model and CRUD operations.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Earth radius in miles, for the haversine radius search.
const EARTH_RADIUS_MILES: f64 = 3963.0;

/// Bootcamp record.
///
/// `location` is the geocoder output document (`lat`, `lng`, `city`,
/// `state`, `zipcode`, …); `careers` is a JSON array of career names.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bootcamp {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub location: Option<serde_json::Value>,
    pub careers: serde_json::Value,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub average_rating: Option<f64>,
    pub average_cost: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a bootcamp.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBootcamp {
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    #[serde(default)]
    pub careers: Vec<String>,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

/// Input for updating a bootcamp.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBootcamp {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl Bootcamp {
    /// Create a bootcamp owned by `user_id`.
    ///
    /// `location` carries the already-geocoded address document.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        input: CreateBootcamp,
        location: Option<serde_json::Value>,
    ) -> Result<Self> {
        let id = Uuid::now_v7();
        let slug = slugify(&input.name);
        let careers = serde_json::json!(input.careers);

        let bootcamp = sqlx::query_as::<_, Bootcamp>(
            r#"
            INSERT INTO bootcamp (
                id, user_id, name, slug, description, website, phone, email,
                address, location, careers, housing, job_assistance,
                job_guarantee, accept_gi
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&input.name)
        .bind(&slug)
        .bind(&input.description)
        .bind(&input.website)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&location)
        .bind(&careers)
        .bind(input.housing)
        .bind(input.job_assistance)
        .bind(input.job_guarantee)
        .bind(input.accept_gi)
        .fetch_one(pool)
        .await
        .context("failed to create bootcamp")?;

        Ok(bootcamp)
    }

    /// Find a bootcamp by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let bootcamp = sqlx::query_as::<_, Bootcamp>("SELECT * FROM bootcamp WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch bootcamp by id")?;

        Ok(bootcamp)
    }

    /// Find the bootcamp owned by a user, if any.
    pub async fn find_by_owner(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>> {
        let bootcamp = sqlx::query_as::<_, Bootcamp>("SELECT * FROM bootcamp WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch bootcamp by owner")?;

        Ok(bootcamp)
    }

    /// Update a bootcamp, merging provided fields over the existing record.
    pub async fn update(pool: &PgPool, id: Uuid, input: UpdateBootcamp) -> Result<Option<Self>> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let name = input.name.unwrap_or(existing.name);
        let slug = slugify(&name);
        let description = input.description.unwrap_or(existing.description);
        let website = input.website.or(existing.website);
        let phone = input.phone.or(existing.phone);
        let email = input.email.or(existing.email);
        let careers = input
            .careers
            .map(|c| serde_json::json!(c))
            .unwrap_or(existing.careers);
        let housing = input.housing.unwrap_or(existing.housing);
        let job_assistance = input.job_assistance.unwrap_or(existing.job_assistance);
        let job_guarantee = input.job_guarantee.unwrap_or(existing.job_guarantee);
        let accept_gi = input.accept_gi.unwrap_or(existing.accept_gi);

        let bootcamp = sqlx::query_as::<_, Bootcamp>(
            r#"
            UPDATE bootcamp
            SET name = $1, slug = $2, description = $3, website = $4, phone = $5,
                email = $6, careers = $7, housing = $8, job_assistance = $9,
                job_guarantee = $10, accept_gi = $11
            WHERE id = $12
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(&slug)
        .bind(&description)
        .bind(&website)
        .bind(&phone)
        .bind(&email)
        .bind(&careers)
        .bind(housing)
        .bind(job_assistance)
        .bind(job_guarantee)
        .bind(accept_gi)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update bootcamp")?;

        Ok(bootcamp)
    }

    /// Delete a bootcamp (courses and reviews cascade).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bootcamp WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete bootcamp")?;

        Ok(result.rows_affected() > 0)
    }

    /// Bootcamps within `distance_miles` of a point, by great-circle
    /// distance over the JSONB location coordinates.
    pub async fn within_radius(
        pool: &PgPool,
        lat: f64,
        lng: f64,
        distance_miles: f64,
    ) -> Result<Vec<Self>> {
        let bootcamps = sqlx::query_as::<_, Bootcamp>(&format!(
            r#"
            SELECT * FROM bootcamp
            WHERE location IS NOT NULL
              AND {EARTH_RADIUS_MILES} * acos(
                    least(1.0, greatest(-1.0,
                        cos(radians($1)) * cos(radians((location->>'lat')::float8))
                      * cos(radians((location->>'lng')::float8) - radians($2))
                      + sin(radians($1)) * sin(radians((location->>'lat')::float8))
                    ))
                  ) <= $3
            "#
        ))
        .bind(lat)
        .bind(lng)
        .bind(distance_miles)
        .fetch_all(pool)
        .await
        .context("failed to search bootcamps by radius")?;

        Ok(bootcamps)
    }
}

/// Derive a URL slug from a bootcamp name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("ModernTech  Bootcamp!"), "moderntech-bootcamp");
        assert_eq!(slugify("-- Front End --"), "front-end");
    }

    #[test]
    fn slugify_collapses_runs_of_separators() {
        assert_eq!(slugify("a &*() b"), "a-b");
        assert_eq!(slugify(""), "");
    }
}
