use serde::{Deserialize, Serialize};

use crate::{
    nutrition::Macros,
    validation::{FieldError, FieldErrors, Validate},
};

const MAX_TAGS: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FavoriteInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    pub macros: Macros,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for FavoriteInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        errors.non_blank(&self.name, "name", 200);
        errors.macros(&self.macros, "macros");
        check_tags(&self.tags, &mut errors);
        errors.finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagsUpdate {
    pub tags: Vec<String>,
}

impl Validate for TagsUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        check_tags(&self.tags, &mut errors);
        errors.finish()
    }
}

fn check_tags(tags: &[String], errors: &mut FieldErrors) {
    errors.require(
        tags.len() <= MAX_TAGS,
        "tags",
        "must contain at most 20 tags",
    );
    for (i, tag) in tags.iter().enumerate() {
        errors.require(
            tag.trim().chars().count() <= 50,
            &format!("tags[{i}]"),
            "must be at most 50 characters",
        );
    }
}

/// Trims tags, drops blanks and keeps the first occurrence of each
/// (case-insensitive).
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_owned)
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct FavoriteCheckQuery {
    pub name: String,
}

impl Validate for FavoriteCheckQuery {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::default();
        errors.non_blank(&self.name, "name", 200);
        errors.finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCheckResponse {
    pub is_favorite: bool,
}
