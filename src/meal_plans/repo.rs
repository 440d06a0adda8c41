use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::dto::{CreateMealPlanRequest, MealSnapshot};
use crate::nutrition::MealType;

#[derive(Debug, FromRow)]
pub struct MealPlanRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub date: Date,
    pub meal_type: String,
    pub meal: Json<MealSnapshot>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub date: Date,
    pub meal_type: MealType,
    pub meal: MealSnapshot,
    pub created_at: OffsetDateTime,
}

impl TryFrom<MealPlanRow> for MealPlan {
    type Error = anyhow::Error;

    fn try_from(r: MealPlanRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            date: r.date,
            meal_type: r.meal_type.parse()?,
            meal: r.meal.0,
            created_at: r.created_at,
        })
    }
}

/// Storage for calendar entries, scoped per user.
#[async_trait]
pub trait MealPlanStore: Send + Sync {
    async fn list(
        &self,
        user_id: Uuid,
        from: Option<Date>,
        to: Option<Date>,
    ) -> anyhow::Result<Vec<MealPlan>>;

    async fn create(&self, user_id: Uuid, req: &CreateMealPlanRequest) -> anyhow::Result<MealPlan>;

    /// Succeeds whether or not a matching row existed.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<()>;
}

#[async_trait]
impl MealPlanStore for PgPool {
    async fn list(
        &self,
        user_id: Uuid,
        from: Option<Date>,
        to: Option<Date>,
    ) -> anyhow::Result<Vec<MealPlan>> {
        list(self, user_id, from, to).await
    }

    async fn create(&self, user_id: Uuid, req: &CreateMealPlanRequest) -> anyhow::Result<MealPlan> {
        create(self, user_id, req).await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<()> {
        delete(self, user_id, id).await
    }
}

/// Trimmed copy of the requested meal.
pub fn snapshot_of(req: &CreateMealPlanRequest) -> MealSnapshot {
    MealSnapshot {
        name: req.meal.name.trim().to_owned(),
        description: req.meal.description.trim().to_owned(),
        macros: req.meal.macros,
    }
}

const MEAL_PLAN_COLUMNS: &str = "id, user_id, date, meal_type, meal, created_at";

/// Plans in the inclusive `[from, to]` range, by date then breakfast..snack.
pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    from: Option<Date>,
    to: Option<Date>,
) -> anyhow::Result<Vec<MealPlan>> {
    let sql = format!(
        r#"
        SELECT {MEAL_PLAN_COLUMNS}
          FROM meal_plans
         WHERE user_id = $1
           AND ($2::date IS NULL OR date >= $2)
           AND ($3::date IS NULL OR date <= $3)
         ORDER BY date ASC,
                  CASE meal_type
                      WHEN 'breakfast' THEN 0
                      WHEN 'lunch' THEN 1
                      WHEN 'dinner' THEN 2
                      ELSE 3
                  END,
                  created_at ASC
        "#
    );
    let rows = sqlx::query_as::<_, MealPlanRow>(&sql)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(db)
        .await
        .context("list meal plans")?;
    rows.into_iter().map(MealPlan::try_from).collect()
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    req: &CreateMealPlanRequest,
) -> anyhow::Result<MealPlan> {
    let snapshot = snapshot_of(req);
    let sql = format!(
        "INSERT INTO meal_plans (user_id, date, meal_type, meal) VALUES ($1, $2, $3, $4) \
         RETURNING {MEAL_PLAN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, MealPlanRow>(&sql)
        .bind(user_id)
        .bind(req.date)
        .bind(req.meal_type.as_str())
        .bind(Json(snapshot))
        .fetch_one(db)
        .await
        .context("insert meal plan")?;
    row.try_into()
}

/// Deleting an id that does not exist (or belongs to someone else) is not an error.
pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<()> {
    let res = sqlx::query("DELETE FROM meal_plans WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete meal plan")?;
    debug!(%user_id, meal_plan_id = %id, rows = res.rows_affected(), "meal plan delete");
    Ok(())
}
