use crate::auth::{dto::UpdateProfileRequest, repo_types::User};
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, password_hash, name, height_cm, sex, birth_date, \
     locale, timezone, target_carbs, target_protein, target_fats, created_at";

/// True when `err` wraps a Postgres unique-constraint violation (23505).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

impl User {
    /// Find a user by (lowercased) username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(db)
            .await
            .context("find user by username")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        username: &str,
        password_hash: &str,
        name: Option<&str>,
    ) -> anyhow::Result<User> {
        let sql = format!(
            "INSERT INTO users (username, password_hash, name) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(password_hash)
            .bind(name)
            .fetch_one(db)
            .await
            .context("insert user")?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        profile: &UpdateProfileRequest,
    ) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET name = $2, height_cm = $3, sex = $4, birth_date = $5, locale = $6,
                   timezone = $7, target_carbs = $8, target_protein = $9, target_fats = $10
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(profile.name.as_deref().map(str::trim))
            .bind(profile.height_cm)
            .bind(profile.sex.map(|s| s.as_str()))
            .bind(profile.birth_date)
            .bind(profile.locale.as_deref().map(str::trim))
            .bind(profile.timezone.as_deref().map(str::trim))
            .bind(profile.target_carbs)
            .bind(profile.target_protein)
            .bind(profile.target_fats)
            .fetch_optional(db)
            .await
            .context("update user profile")?;
        Ok(user)
    }

    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await
            .context("update user password")?;
        Ok(())
    }
}
