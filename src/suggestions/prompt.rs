//! Prompt assembly for macro-mode and pantry-mode suggestions.

use std::{collections::HashSet, fmt::Write as _};

use super::dto::{MacroSuggestionRequest, PantrySuggestionRequest};
use crate::{
    llm::ChatMessage,
    nutrition::DietaryPreference,
    recipes::Recipe,
};

/// Stored recipes embedded as hints, at most.
const MAX_CANDIDATES: usize = 20;

/// Shape the model is told to answer with. Checked again on the way back.
pub const OUTPUT_CONTRACT: &str = r#"{"meals": [{"name": string, "description": string, "instructions": string, "macros": {"carbs": number, "protein": number, "fats": number, "calories": number}}]}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionPrompt {
    pub system: String,
    pub user: String,
}

impl SuggestionPrompt {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

/// Case- and whitespace-insensitive key used for every recipe-name comparison.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Stored recipes offered to the model as candidate material.
pub fn select_candidates<'a>(catalog: &'a [Recipe], req: &MacroSuggestionRequest) -> Vec<&'a Recipe> {
    if !req.include_user_recipes {
        return Vec::new();
    }
    let excluded: HashSet<String> = req.exclude_recipes.iter().map(|n| name_key(n)).collect();
    catalog
        .iter()
        .filter(|r| {
            req.dietary_preference == DietaryPreference::None
                || r.dietary_restriction == req.dietary_preference
        })
        .filter(|r| !excluded.contains(&name_key(&r.name)))
        .take(MAX_CANDIDATES)
        .collect()
}

fn system_instruction() -> String {
    format!(
        "You are a nutrition-focused chef who designs meals that hit macro-nutrient targets. \
         Respond with a single JSON object and nothing else, shaped exactly like: {OUTPUT_CONTRACT}. \
         Macro values are grams and must be non-negative numbers."
    )
}

pub fn build_macro_prompt(req: &MacroSuggestionRequest, candidates: &[&Recipe]) -> SuggestionPrompt {
    let meal_types = req
        .meal_types()
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut user = format!(
        "Suggest up to {} meals for: {meal_types}.\n\
         Each meal should provide roughly {}g carbohydrates, {}g protein and {}g fat.\n",
        req.suggestion_limit(),
        req.carbs,
        req.protein,
        req.fats,
    );

    match req.dietary_preference {
        DietaryPreference::None => user.push_str("No dietary restrictions.\n"),
        pref => {
            let _ = writeln!(user, "Every meal must be {pref}.");
        }
    }

    if !req.exclude_recipes.is_empty() {
        let names = req
            .exclude_recipes
            .iter()
            .map(|n| n.trim())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(user, "Do not suggest any of these meals: {names}.");
    }

    if !candidates.is_empty() {
        user.push_str(
            "The user has these stored recipes. Reuse one under its exact name when it fits the targets:\n",
        );
        for r in candidates {
            let _ = writeln!(
                user,
                "- {} (carbs {}g, protein {}g, fats {}g)",
                r.name, r.macros.carbs, r.macros.protein, r.macros.fats
            );
        }
    }

    SuggestionPrompt {
        system: system_instruction(),
        user,
    }
}

pub fn build_pantry_prompt(req: &PantrySuggestionRequest) -> SuggestionPrompt {
    let user = format!(
        "Create exactly one {} recipe built around these ingredients:\n\
         - carbohydrate source: {}\n\
         - protein source: {}\n\
         - fat source: {}\n\
         Return it as the only element of the meals array.\n",
        req.meal_type,
        req.carb_source.trim(),
        req.protein_source.trim(),
        req.fat_source.trim(),
    );
    SuggestionPrompt {
        system: system_instruction(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nutrition::MealType, test_support::recipe};

    fn macro_request(json: &str) -> MacroSuggestionRequest {
        serde_json::from_str(json).unwrap()
    }

    fn names<'a>(recipes: &[&'a Recipe]) -> Vec<&'a str> {
        recipes.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn dietary_preference_filters_by_exact_tag() {
        let catalog = vec![
            recipe("Tofu scramble", DietaryPreference::Vegan),
            recipe("Omelette", DietaryPreference::Vegetarian),
            recipe("Steak", DietaryPreference::None),
            recipe("Lentil soup", DietaryPreference::Vegan),
        ];
        let req = macro_request(
            r#"{"carbs":40,"protein":20,"fats":10,"mealTypes":["lunch"],"dietaryPreference":"vegan"}"#,
        );
        assert_eq!(
            names(&select_candidates(&catalog, &req)),
            vec!["Tofu scramble", "Lentil soup"]
        );
    }

    #[test]
    fn no_preference_keeps_every_recipe() {
        let catalog = vec![
            recipe("Tofu scramble", DietaryPreference::Vegan),
            recipe("Steak", DietaryPreference::Keto),
        ];
        let req = macro_request(r#"{"carbs":1,"protein":1,"fats":1,"mealTypes":["lunch"]}"#);
        assert_eq!(select_candidates(&catalog, &req).len(), 2);
    }

    #[test]
    fn exclusions_match_ignoring_case_and_whitespace() {
        let catalog = vec![
            recipe("Chicken Curry", DietaryPreference::None),
            recipe("Greek Salad", DietaryPreference::None),
        ];
        let req = macro_request(
            r#"{"carbs":1,"protein":1,"fats":1,"mealTypes":["dinner"],"excludeRecipes":["  chicken curry "]}"#,
        );
        assert_eq!(names(&select_candidates(&catalog, &req)), vec!["Greek Salad"]);
    }

    #[test]
    fn excluding_everything_yields_no_hints() {
        let catalog = vec![recipe("Porridge", DietaryPreference::None)];
        let req = macro_request(
            r#"{"carbs":1,"protein":1,"fats":1,"mealTypes":["breakfast"],"excludeRecipes":["Porridge"]}"#,
        );
        let candidates = select_candidates(&catalog, &req);
        assert!(candidates.is_empty());
        let prompt = build_macro_prompt(&req, &candidates);
        assert!(!prompt.user.contains("stored recipes"));
    }

    #[test]
    fn opting_out_of_user_recipes_drops_the_catalog() {
        let catalog = vec![recipe("Porridge", DietaryPreference::None)];
        let req = macro_request(
            r#"{"carbs":1,"protein":1,"fats":1,"mealTypes":["breakfast"],"includeUserRecipes":false}"#,
        );
        assert!(select_candidates(&catalog, &req).is_empty());
    }

    #[test]
    fn large_catalogs_are_capped_in_order() {
        let catalog: Vec<_> = (0..25)
            .map(|i| recipe(&format!("Recipe {i}"), DietaryPreference::None))
            .collect();
        let req = macro_request(r#"{"carbs":1,"protein":1,"fats":1,"mealTypes":["lunch"]}"#);
        let candidates = select_candidates(&catalog, &req);
        assert_eq!(candidates.len(), MAX_CANDIDATES);
        assert_eq!(candidates[0].name, "Recipe 0");
        assert_eq!(candidates[MAX_CANDIDATES - 1].name, "Recipe 19");
    }

    #[test]
    fn macro_prompt_mentions_targets_types_and_candidates() {
        let catalog = vec![recipe("Overnight oats", DietaryPreference::Vegetarian)];
        let req = macro_request(
            r#"{"carbs":50,"protein":30,"fats":10,"mealTypes":["lunch","breakfast"],
                "dietaryPreference":"vegetarian","maxSuggestions":2,"excludeRecipes":["Pancakes"]}"#,
        );
        let candidates = select_candidates(&catalog, &req);
        let prompt = build_macro_prompt(&req, &candidates);
        assert!(prompt.system.contains(OUTPUT_CONTRACT));
        assert!(prompt.user.contains("up to 2 meals for: breakfast, lunch"));
        assert!(prompt.user.contains("50g carbohydrates, 30g protein and 10g fat"));
        assert!(prompt.user.contains("must be vegetarian"));
        assert!(prompt.user.contains("Do not suggest any of these meals: Pancakes."));
        assert!(prompt.user.contains("- Overnight oats"));
    }

    #[test]
    fn pantry_prompt_embeds_sources_and_single_meal_type() {
        let req = PantrySuggestionRequest {
            carb_source: "rice".into(),
            protein_source: "chicken".into(),
            fat_source: " olive oil ".into(),
            meal_type: MealType::Dinner,
        };
        let prompt = build_pantry_prompt(&req);
        assert!(prompt.user.starts_with("Create exactly one dinner recipe"));
        assert!(prompt.user.contains("protein source: chicken"));
        assert!(prompt.user.contains("fat source: olive oil\n"));
        let messages = prompt.into_messages();
        assert_eq!(messages.len(), 2);
    }
}
