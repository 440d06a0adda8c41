use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Dietary restriction tag shared by recipes, suggestion requests and filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietaryPreference {
    #[default]
    None,
    Vegetarian,
    Vegan,
    Pescatarian,
    Keto,
    Paleo,
    GlutenFree,
    DairyFree,
}

impl DietaryPreference {
    pub const ALL: [DietaryPreference; 8] = [
        Self::None,
        Self::Vegetarian,
        Self::Vegan,
        Self::Pescatarian,
        Self::Keto,
        Self::Paleo,
        Self::GlutenFree,
        Self::DairyFree,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::Pescatarian => "pescatarian",
            Self::Keto => "keto",
            Self::Paleo => "paleo",
            Self::GlutenFree => "gluten-free",
            Self::DairyFree => "dairy-free",
        }
    }
}

impl fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DietaryPreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown dietary preference `{s}`"))
    }
}

/// Slot a meal occupies in a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown meal type `{s}`"))
    }
}

/// Macro-nutrient breakdown in grams (sodium and cholesterol in milligrams).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Macros {
    pub carbs: f64,
    pub protein: f64,
    pub fats: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cholesterol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
}

impl Macros {
    pub fn new(carbs: f64, protein: f64, fats: f64) -> Self {
        Self {
            carbs,
            protein,
            fats,
            ..Self::default()
        }
    }

    /// Names of the fields holding a negative or non-finite value.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        let required = [
            ("carbs", Some(self.carbs)),
            ("protein", Some(self.protein)),
            ("fats", Some(self.fats)),
            ("calories", self.calories),
            ("fiber", self.fiber),
            ("sugar", self.sugar),
            ("cholesterol", self.cholesterol),
            ("sodium", self.sodium),
        ];
        required
            .into_iter()
            .filter_map(|(name, value)| match value {
                Some(v) if !is_valid_amount(v) => Some(name),
                _ => None,
            })
            .collect()
    }
}

pub fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
