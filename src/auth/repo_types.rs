use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String, // stored lowercased
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub name: Option<String>,
    pub height_cm: Option<f64>,
    pub sex: Option<String>,
    pub birth_date: Option<Date>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub target_carbs: Option<f64>,
    pub target_protein: Option<f64>,
    pub target_fats: Option<f64>,
    pub created_at: OffsetDateTime,
}
