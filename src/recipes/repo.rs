use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    dto::RecipeInput,
    repo_types::{Recipe, RecipeRow},
};
use crate::nutrition::DietaryPreference;

const RECIPE_COLUMNS: &str = "id, user_id, name, description, instructions, carbs, protein, fats, \
     calories, fiber, sugar, cholesterol, sodium, prep_time_minutes, cook_time_minutes, \
     nutrient_tags, dietary_restriction, created_at, updated_at";

/// Read access to the recipes a user may draw suggestions from.
#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    /// The user's own recipes plus global ones.
    async fn recipes_for(&self, user_id: Uuid) -> anyhow::Result<Vec<Recipe>>;
}

#[async_trait]
impl RecipeCatalog for PgPool {
    async fn recipes_for(&self, user_id: Uuid) -> anyhow::Result<Vec<Recipe>> {
        list_visible(self, user_id, None).await
    }
}

fn into_recipes(rows: Vec<RecipeRow>) -> anyhow::Result<Vec<Recipe>> {
    rows.into_iter().map(Recipe::try_from).collect()
}

pub async fn list_visible(
    db: &PgPool,
    user_id: Uuid,
    dietary: Option<DietaryPreference>,
) -> anyhow::Result<Vec<Recipe>> {
    let sql = format!(
        r#"
        SELECT {RECIPE_COLUMNS}
          FROM recipes
         WHERE (user_id = $1 OR user_id IS NULL)
           AND ($2::text IS NULL OR dietary_restriction = $2)
         ORDER BY created_at DESC
        "#
    );
    let rows = sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(user_id)
        .bind(dietary.map(DietaryPreference::as_str))
        .fetch_all(db)
        .await
        .context("list recipes")?;
    into_recipes(rows)
}

pub async fn find_visible(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Recipe>> {
    let sql = format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND (user_id = $2 OR user_id IS NULL)"
    );
    let row = sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("get recipe")?;
    row.map(Recipe::try_from).transpose()
}

pub async fn create(db: &PgPool, user_id: Uuid, input: &RecipeInput) -> anyhow::Result<Recipe> {
    let sql = format!(
        r#"
        INSERT INTO recipes (user_id, name, description, instructions, carbs, protein, fats,
                             calories, fiber, sugar, cholesterol, sodium, prep_time_minutes,
                             cook_time_minutes, nutrient_tags, dietary_restriction)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING {RECIPE_COLUMNS}
        "#
    );
    let row = bind_input(sqlx::query_as::<_, RecipeRow>(&sql).bind(user_id), input)
        .fetch_one(db)
        .await
        .context("insert recipe")?;
    row.try_into()
}

/// Updates a recipe owned by `user_id`. Global recipes are never matched.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    input: &RecipeInput,
) -> anyhow::Result<Option<Recipe>> {
    let sql = format!(
        r#"
        UPDATE recipes
           SET name = $3, description = $4, instructions = $5, carbs = $6, protein = $7,
               fats = $8, calories = $9, fiber = $10, sugar = $11, cholesterol = $12,
               sodium = $13, prep_time_minutes = $14, cook_time_minutes = $15,
               nutrient_tags = $16, dietary_restriction = $17, updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING {RECIPE_COLUMNS}
        "#
    );
    let query = sqlx::query_as::<_, RecipeRow>(&sql).bind(id).bind(user_id);
    let row = bind_input(query, input)
        .fetch_optional(db)
        .await
        .context("update recipe")?;
    row.map(Recipe::try_from).transpose()
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(res.rows_affected() > 0)
}

type RecipeQuery<'q> = sqlx::query::QueryAs<'q, sqlx::Postgres, RecipeRow, sqlx::postgres::PgArguments>;

fn bind_input<'q>(query: RecipeQuery<'q>, input: &'q RecipeInput) -> RecipeQuery<'q> {
    let m = &input.macros;
    let tags: Vec<String> = input
        .nutrient_tags
        .iter()
        .map(|t| t.trim().to_owned())
        .collect();
    query
        .bind(input.name.trim())
        .bind(input.description.trim())
        .bind(input.instructions.trim())
        .bind(m.carbs)
        .bind(m.protein)
        .bind(m.fats)
        .bind(m.calories)
        .bind(m.fiber)
        .bind(m.sugar)
        .bind(m.cholesterol)
        .bind(m.sodium)
        .bind(input.prep_time_minutes)
        .bind(input.cook_time_minutes)
        .bind(tags)
        .bind(input.dietary_restriction.as_str())
}
