//! Course model and CRUD operations.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Course record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: i32,
    pub minimum_skill: String,
    pub scholarship_available: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: i32,
    pub minimum_skill: String,
    #[serde(default)]
    pub scholarship_available: bool,
}

/// Input for updating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<String>,
    pub tuition: Option<i32>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
}

impl Course {
    /// Create a course under a bootcamp.
    pub async fn create(
        pool: &PgPool,
        bootcamp_id: Uuid,
        user_id: Uuid,
        input: CreateCourse,
    ) -> Result<Self> {
        let id = Uuid::now_v7();

        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO course (
                id, bootcamp_id, user_id, title, description, weeks, tuition,
                minimum_skill, scholarship_available
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(bootcamp_id)
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.weeks)
        .bind(input.tuition)
        .bind(&input.minimum_skill)
        .bind(input.scholarship_available)
        .fetch_one(pool)
        .await
        .context("failed to create course")?;

        Ok(course)
    }

    /// Find a course by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM course WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch course by id")?;

        Ok(course)
    }

    /// List all courses of one bootcamp, newest first.
    pub async fn list_for_bootcamp(pool: &PgPool, bootcamp_id: Uuid) -> Result<Vec<Self>> {
        let courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM course WHERE bootcamp_id = $1 ORDER BY created_at DESC",
        )
        .bind(bootcamp_id)
        .fetch_all(pool)
        .await
        .context("failed to list courses for bootcamp")?;

        Ok(courses)
    }

    /// Update a course, merging provided fields over the existing record.
    pub async fn update(pool: &PgPool, id: Uuid, input: UpdateCourse) -> Result<Option<Self>> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let title = input.title.unwrap_or(existing.title);
        let description = input.description.unwrap_or(existing.description);
        let weeks = input.weeks.unwrap_or(existing.weeks);
        let tuition = input.tuition.unwrap_or(existing.tuition);
        let minimum_skill = input.minimum_skill.unwrap_or(existing.minimum_skill);
        let scholarship_available = input
            .scholarship_available
            .unwrap_or(existing.scholarship_available);

        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE course
            SET title = $1, description = $2, weeks = $3, tuition = $4,
                minimum_skill = $5, scholarship_available = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&description)
        .bind(&weeks)
        .bind(tuition)
        .bind(&minimum_skill)
        .bind(scholarship_available)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update course")?;

        Ok(course)
    }

    /// Delete a course.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM course WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete course")?;

        Ok(result.rows_affected() > 0)
    }

    /// Recompute the owning bootcamp's average cost from its courses.
    ///
    /// Rounded up to the nearest ten; NULL when the bootcamp has no
    /// courses left.
    pub async fn recalculate_average_cost(pool: &PgPool, bootcamp_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bootcamp
            SET average_cost = (
                SELECT (CEIL(AVG(tuition) / 10) * 10)::int
                FROM course
                WHERE bootcamp_id = $1
            )
            WHERE id = $1
            "#,
        )
        .bind(bootcamp_id)
        .execute(pool)
        .await
        .context("failed to recalculate average cost")?;

        Ok(())
    }
}
