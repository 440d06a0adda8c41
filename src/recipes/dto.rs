use serde::Deserialize;

use crate::{
    nutrition::{DietaryPreference, Macros},
    validation::{FieldError, FieldErrors, Validate},
};

/// Body of recipe create and update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipeInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    pub macros: Macros,
    #[serde(default)]
    pub prep_time_minutes: Option<i32>,
    #[serde(default)]
    pub cook_time_minutes: Option<i32>,
    #[serde(default)]
    pub nutrient_tags: Vec<String>,
    #[serde(default)]
    pub dietary_restriction: DietaryPreference,
}

impl Validate for RecipeInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        errors.non_blank(&self.name, "name", 200);
        errors.require(
            self.description.chars().count() <= 2000,
            "description",
            "must be at most 2000 characters",
        );
        errors.macros(&self.macros, "macros");
        for (field, minutes) in [
            ("prepTimeMinutes", self.prep_time_minutes),
            ("cookTimeMinutes", self.cook_time_minutes),
        ] {
            if let Some(m) = minutes {
                errors.require((0..=24 * 60).contains(&m), field, "must be between 0 and 1440");
            }
        }
        for (i, tag) in self.nutrient_tags.iter().enumerate() {
            errors.non_blank(tag, &format!("nutrientTags[{i}]"), 50);
        }
        errors.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeListQuery {
    pub dietary_restriction: Option<DietaryPreference>,
}

impl Validate for RecipeListQuery {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Ok(())
    }
}
