use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::{DietaryPreference, Macros};

#[derive(Debug, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
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
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub nutrient_tags: Vec<String>,
    pub dietary_restriction: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A stored recipe. `user_id == None` marks a global recipe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub macros: Macros,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub nutrient_tags: Vec<String>,
    pub dietary_restriction: DietaryPreference,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = anyhow::Error;

    fn try_from(r: RecipeRow) -> Result<Self, Self::Error> {
        Ok(Self {
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
            prep_time_minutes: r.prep_time_minutes,
            cook_time_minutes: r.cook_time_minutes,
            nutrient_tags: r.nutrient_tags,
            dietary_restriction: r.dietary_restriction.parse()?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
