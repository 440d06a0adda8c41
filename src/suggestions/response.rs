//! Shape checks on the generated text before anything reaches a client.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::{dto::SuggestedMeal, prompt::name_key};
use crate::{nutrition::Macros, recipes::Recipe};

#[derive(Debug, Deserialize)]
struct GeneratedMeal {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    instructions: Instructions,
    macros: Macros,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Instructions {
    Text(String),
    Steps(Vec<String>),
}

impl Default for Instructions {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<Instructions> for String {
    fn from(value: Instructions) -> Self {
        match value {
            Instructions::Text(text) => text.trim().to_owned(),
            Instructions::Steps(steps) => steps
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parses `{"meals": [...]}`. A missing or non-array `meals` is an error,
/// never an empty list.
pub fn parse_meals(raw: &str) -> Result<Vec<SuggestedMeal>, String> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| format!("response is not valid JSON: {e}"))?;
    let meals = value
        .get("meals")
        .and_then(Value::as_array)
        .ok_or_else(|| "response has no `meals` array".to_owned())?;

    meals
        .iter()
        .enumerate()
        .map(|(i, meal)| {
            let meal: GeneratedMeal = serde_json::from_value(meal.clone())
                .map_err(|e| format!("meal {i} is malformed: {e}"))?;
            if meal.name.trim().is_empty() {
                return Err(format!("meal {i} has no name"));
            }
            let invalid = meal.macros.invalid_fields();
            if !invalid.is_empty() {
                return Err(format!(
                    "meal {i} has invalid macro values: {}",
                    invalid.join(", ")
                ));
            }
            Ok(SuggestedMeal {
                name: meal.name.trim().to_owned(),
                description: meal.description.trim().to_owned(),
                instructions: meal.instructions.into(),
                macros: meal.macros,
                is_stored_recipe: None,
            })
        })
        .collect()
}

/// Marks each meal whose name matches a catalog entry, ignoring case.
pub fn annotate_stored(meals: &mut [SuggestedMeal], catalog: &[Recipe]) {
    let stored: HashSet<String> = catalog.iter().map(|r| name_key(&r.name)).collect();
    for meal in meals {
        meal.is_stored_recipe = Some(stored.contains(&name_key(&meal.name)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nutrition::DietaryPreference, test_support::recipe};

    #[test]
    fn missing_meals_array_is_an_error() {
        assert!(parse_meals(r#"{"recipes": []}"#).unwrap_err().contains("meals"));
        assert!(parse_meals(r#"{"meals": {"name": "x"}}"#).is_err());
        assert!(parse_meals("[]").is_err());
        assert!(parse_meals("Sure! Here are some meals").unwrap_err().contains("not valid JSON"));
    }

    #[test]
    fn empty_meals_array_is_accepted() {
        assert!(parse_meals(r#"{"meals": []}"#).unwrap().is_empty());
    }

    #[test]
    fn instructions_may_be_a_list() {
        let meals = parse_meals(
            r#"{"meals":[{"name":" Chicken rice ","description":"Simple",
                "instructions":["Cook rice.", " ", "Grill chicken."],
                "macros":{"carbs":60,"protein":40,"fats":12,"calories":520}}]}"#,
        )
        .unwrap();
        assert_eq!(meals[0].name, "Chicken rice");
        assert_eq!(meals[0].instructions, "Cook rice.\nGrill chicken.");
        assert_eq!(meals[0].macros.calories, Some(520.0));
        assert_eq!(meals[0].is_stored_recipe, None);
    }

    #[test]
    fn negative_macros_are_rejected() {
        let err = parse_meals(
            r#"{"meals":[{"name":"Odd","instructions":"x","macros":{"carbs":-3,"protein":1,"fats":1}}]}"#,
        )
        .unwrap_err();
        assert!(err.contains("carbs"));
    }

    #[test]
    fn code_fences_are_stripped() {
        let raw = "```json\n{\"meals\":[{\"name\":\"Oats\",\"macros\":{\"carbs\":1,\"protein\":1,\"fats\":1}}]}\n```";
        assert_eq!(parse_meals(raw).unwrap()[0].name, "Oats");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn annotation_matches_names_case_insensitively() {
        let mut meals = parse_meals(
            r#"{"meals":[
                {"name":"greek salad","macros":{"carbs":1,"protein":1,"fats":1}},
                {"name":"Beef stew","macros":{"carbs":1,"protein":1,"fats":1}}]}"#,
        )
        .unwrap();
        annotate_stored(&mut meals, &[recipe("Greek Salad", DietaryPreference::None)]);
        assert_eq!(meals[0].is_stored_recipe, Some(true));
        assert_eq!(meals[1].is_stored_recipe, Some(false));
    }
}
