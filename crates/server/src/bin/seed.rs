//! Development data seeder.
//!
//! Imports JSON fixture data into the database, or wipes it:
//!
//! ```text
//! seed --import  [--data-dir ./_data]
//! seed --destroy
//! ```
//!
//! Fixtures carry explicit UUIDs so records can reference each other:
//! `users.json`, `bootcamps.json`, `courses.json`, `reviews.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use uuid::Uuid;

use campdir_server::models::bootcamp::slugify;
use campdir_server::models::user::hash_password;

#[derive(Parser)]
#[command(name = "seed", about = "Import or destroy CampDir fixture data")]
struct Args {
    /// Import fixture data.
    #[arg(short = 'i', long, conflicts_with = "destroy")]
    import: bool,

    /// Delete all data.
    #[arg(short = 'd', long)]
    destroy: bool,

    /// Directory containing the fixture JSON files.
    #[arg(long, default_value = "./_data")]
    data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    #[serde(default = "default_role")]
    role: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize)]
struct SeedBootcamp {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: String,
    website: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: String,
    location: Option<serde_json::Value>,
    #[serde(default)]
    careers: Vec<String>,
    #[serde(default)]
    housing: bool,
    #[serde(default)]
    job_assistance: bool,
    #[serde(default)]
    job_guarantee: bool,
    #[serde(default)]
    accept_gi: bool,
}

#[derive(Debug, Deserialize)]
struct SeedCourse {
    id: Uuid,
    bootcamp_id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    weeks: String,
    tuition: i32,
    minimum_skill: String,
    #[serde(default)]
    scholarship_available: bool,
}

#[derive(Debug, Deserialize)]
struct SeedReview {
    id: Uuid,
    bootcamp_id: Uuid,
    user_id: Uuid,
    title: String,
    body: String,
    rating: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL environment variable is required")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    if args.destroy {
        destroy(&pool).await?;
        info!("Data destroyed");
    } else if args.import {
        import(&pool, &args.data_dir).await?;
        info!("Data imported");
    } else {
        anyhow::bail!("pass --import or --destroy");
    }

    Ok(())
}

/// Load one fixture file; a missing file is an empty fixture.
fn load_fixture<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>> {
    let path = dir.join(file);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

async fn import(pool: &PgPool, data_dir: &Path) -> Result<()> {
    let users: Vec<SeedUser> = load_fixture(data_dir, "users.json")?;
    let bootcamps: Vec<SeedBootcamp> = load_fixture(data_dir, "bootcamps.json")?;
    let courses: Vec<SeedCourse> = load_fixture(data_dir, "courses.json")?;
    let reviews: Vec<SeedReview> = load_fixture(data_dir, "reviews.json")?;

    for user in &users {
        let password = hash_password(&user.password)?;
        sqlx::query(
            "INSERT INTO users (id, name, email, password, role) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&password)
        .bind(&user.role)
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert user {}", user.email))?;
    }
    info!(count = users.len(), "users imported");

    for bootcamp in &bootcamps {
        sqlx::query(
            r#"
            INSERT INTO bootcamp (
                id, user_id, name, slug, description, website, phone, email,
                address, location, careers, housing, job_assistance,
                job_guarantee, accept_gi
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(bootcamp.id)
        .bind(bootcamp.user_id)
        .bind(&bootcamp.name)
        .bind(slugify(&bootcamp.name))
        .bind(&bootcamp.description)
        .bind(&bootcamp.website)
        .bind(&bootcamp.phone)
        .bind(&bootcamp.email)
        .bind(&bootcamp.address)
        .bind(&bootcamp.location)
        .bind(serde_json::json!(bootcamp.careers))
        .bind(bootcamp.housing)
        .bind(bootcamp.job_assistance)
        .bind(bootcamp.job_guarantee)
        .bind(bootcamp.accept_gi)
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert bootcamp {}", bootcamp.name))?;
    }
    info!(count = bootcamps.len(), "bootcamps imported");

    for course in &courses {
        sqlx::query(
            r#"
            INSERT INTO course (
                id, bootcamp_id, user_id, title, description, weeks, tuition,
                minimum_skill, scholarship_available
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(course.id)
        .bind(course.bootcamp_id)
        .bind(course.user_id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.weeks)
        .bind(course.tuition)
        .bind(&course.minimum_skill)
        .bind(course.scholarship_available)
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert course {}", course.title))?;
    }
    info!(count = courses.len(), "courses imported");

    for review in &reviews {
        sqlx::query(
            "INSERT INTO review (id, bootcamp_id, user_id, title, body, rating) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(review.id)
        .bind(review.bootcamp_id)
        .bind(review.user_id)
        .bind(&review.title)
        .bind(&review.body)
        .bind(review.rating)
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert review {}", review.title))?;
    }
    info!(count = reviews.len(), "reviews imported");

    // Derive the aggregates the API maintains incrementally.
    sqlx::query(
        r#"
        UPDATE bootcamp b
        SET average_cost = sub.cost, average_rating = sub.rating
        FROM (
            SELECT b2.id,
                   (SELECT (CEIL(AVG(tuition) / 10) * 10)::int
                    FROM course WHERE bootcamp_id = b2.id) AS cost,
                   (SELECT ROUND(AVG(rating)::numeric, 1)::float8
                    FROM review WHERE bootcamp_id = b2.id) AS rating
            FROM bootcamp b2
        ) sub
        WHERE b.id = sub.id
        "#,
    )
    .execute(pool)
    .await
    .context("failed to derive aggregates")?;

    Ok(())
}

async fn destroy(pool: &PgPool) -> Result<()> {
    for table in [
        "password_reset_tokens",
        "review",
        "course",
        "bootcamp",
        "users",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(pool)
            .await
            .with_context(|| format!("failed to clear {table}"))?;
    }

    Ok(())
}
