use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::FavoriteInput;
use crate::nutrition::Macros;

#[derive(Debug, FromRow)]
pub struct FavoriteRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub carbs: f64,
    pub protein: f64,
    pub fats: f64,
    pub calories: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub cholesterol: Option<f64>,
    pub sodium: Option<f64>,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
}

/// A user's saved copy of a meal, independent of the recipe catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub macros: Macros,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
}

impl From<FavoriteRow> for Favorite {
    fn from(r: FavoriteRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            description: r.description,
            instructions: r.instructions,
            macros: Macros {
                carbs: r.carbs,
                protein: r.protein,
                fats: r.fats,
                calories: r.calories,
                fiber: r.fiber,
                sugar: r.sugar,
                cholesterol: r.cholesterol,
                sodium: r.sodium,
            },
            tags: r.tags,
            created_at: r.created_at,
        }
    }
}

const FAVORITE_COLUMNS: &str = "id, user_id, name, description, instructions, carbs, protein, fats, \
     calories, fiber, sugar, cholesterol, sodium, tags, created_at";

pub async fn list(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Favorite>> {
    let sql = format!(
        "SELECT {FAVORITE_COLUMNS} FROM favorites WHERE user_id = $1 ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, FavoriteRow>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list favorites")?;
    Ok(rows.into_iter().map(Favorite::from).collect())
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    input: &FavoriteInput,
    tags: &[String],
) -> anyhow::Result<Favorite> {
    let sql = format!(
        r#"
        INSERT INTO favorites (user_id, name, description, instructions, carbs, protein, fats,
                               calories, fiber, sugar, cholesterol, sodium, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {FAVORITE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, FavoriteRow>(&sql)
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.description.trim())
        .bind(input.instructions.trim())
        .bind(input.macros.carbs)
        .bind(input.macros.protein)
        .bind(input.macros.fats)
        .bind(input.macros.calories)
        .bind(input.macros.fiber)
        .bind(input.macros.sugar)
        .bind(input.macros.cholesterol)
        .bind(input.macros.sodium)
        .bind(tags)
        .fetch_one(db)
        .await
        .context("insert favorite")?;
    Ok(row.into())
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM favorites WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete favorite")?;
    Ok(res.rows_affected() > 0)
}

pub async fn update_tags(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    tags: &[String],
) -> anyhow::Result<Option<Favorite>> {
    let sql = format!(
        "UPDATE favorites SET tags = $3 WHERE id = $1 AND user_id = $2 RETURNING {FAVORITE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, FavoriteRow>(&sql)
        .bind(id)
        .bind(user_id)
        .bind(tags)
        .fetch_optional(db)
        .await
        .context("update favorite tags")?;
    Ok(row.map(Favorite::from))
}

/// Case-insensitive (user, name) lookup; duplicates are not prevented.
pub async fn is_favorite(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND lower(name) = lower($2))",
    )
    .bind(user_id)
    .bind(name.trim())
    .fetch_one(db)
    .await
    .context("check favorite")?;
    Ok(exists)
}
