use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    nutrition::{Macros, MealType},
    validation::{FieldError, FieldErrors, Validate},
};

/// Denormalized copy of the scheduled meal. Later edits to the source recipe
/// or favorite do not reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSnapshot {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub macros: Macros,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMealPlanRequest {
    pub date: Date,
    pub meal_type: MealType,
    pub meal: MealSnapshot,
}

impl Validate for CreateMealPlanRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        errors.non_blank(&self.meal.name, "meal.name", 200);
        errors.macros(&self.meal.macros, "meal.macros");
        errors.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl Validate for DateRangeQuery {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(vec![FieldError::new(
                "from",
                "must not be after `to`",
            )]),
            _ => Ok(()),
        }
    }
}
