//! Review model and CRUD operations.
//!
//! Each user may leave at most one review per bootcamp (unique index);
//! the storage layer surfaces violations as uniqueness conflicts.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Review record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a review.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReview {
    pub title: String,
    pub body: String,
    pub rating: i32,
}

/// Input for updating a review.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReview {
    pub title: Option<String>,
    pub body: Option<String>,
    pub rating: Option<i32>,
}

impl Review {
    /// Create a review for a bootcamp.
    pub async fn create(
        pool: &PgPool,
        bootcamp_id: Uuid,
        user_id: Uuid,
        input: CreateReview,
    ) -> Result<Self> {
        let id = Uuid::now_v7();

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO review (id, bootcamp_id, user_id, title, body, rating)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(bootcamp_id)
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.body)
        .bind(input.rating)
        .fetch_one(pool)
        .await
        .context("failed to create review")?;

        Ok(review)
    }

    /// Find a review by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM review WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch review by id")?;

        Ok(review)
    }

    /// List all reviews of one bootcamp, newest first.
    pub async fn list_for_bootcamp(pool: &PgPool, bootcamp_id: Uuid) -> Result<Vec<Self>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM review WHERE bootcamp_id = $1 ORDER BY created_at DESC",
        )
        .bind(bootcamp_id)
        .fetch_all(pool)
        .await
        .context("failed to list reviews for bootcamp")?;

        Ok(reviews)
    }

    /// Update a review, merging provided fields over the existing record.
    pub async fn update(pool: &PgPool, id: Uuid, input: UpdateReview) -> Result<Option<Self>> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let title = input.title.unwrap_or(existing.title);
        let body = input.body.unwrap_or(existing.body);
        let rating = input.rating.unwrap_or(existing.rating);

        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE review
            SET title = $1, body = $2, rating = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&body)
        .bind(rating)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update review")?;

        Ok(review)
    }

    /// Delete a review.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM review WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete review")?;

        Ok(result.rows_affected() > 0)
    }

    /// Recompute the bootcamp's average rating from its reviews.
    ///
    /// One decimal place; NULL when the bootcamp has no reviews left.
    pub async fn recalculate_average_rating(pool: &PgPool, bootcamp_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bootcamp
            SET average_rating = (
                SELECT ROUND(AVG(rating)::numeric, 1)::float8
                FROM review
                WHERE bootcamp_id = $1
            )
            WHERE id = $1
            "#,
        )
        .bind(bootcamp_id)
        .execute(pool)
        .await
        .context("failed to recalculate average rating")?;

        Ok(())
    }
}
