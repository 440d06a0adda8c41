//! Fakes for the outbound seams, shared by unit and router tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    llm::{CompletionClient, CompletionRequest, LlmError},
    meal_plans::{
        dto::CreateMealPlanRequest,
        repo::{snapshot_of, MealPlan, MealPlanStore},
    },
    nutrition::{DietaryPreference, Macros},
    recipes::{Recipe, RecipeCatalog},
};

pub const CANNED_MEALS: &str = r#"{"meals":[
    {"name":"Banana oat pancakes","description":"Fluffy and filling","instructions":["Blend.","Fry."],
     "macros":{"carbs":52,"protein":28,"fats":11,"calories":459}},
    {"name":"Greek yogurt bowl","description":"No cooking","instructions":"Stir together.",
     "macros":{"carbs":45,"protein":32,"fats":9}}
]}"#;

pub fn recipe(name: &str, dietary: DietaryPreference) -> Recipe {
    let now = OffsetDateTime::now_utc();
    Recipe {
        id: Uuid::new_v4(),
        user_id: None,
        name: name.to_owned(),
        description: format!("{name} description"),
        instructions: "Cook it.".into(),
        macros: Macros::new(30.0, 20.0, 10.0),
        prep_time_minutes: Some(10),
        cook_time_minutes: None,
        nutrient_tags: Vec::new(),
        dietary_restriction: dietary,
        created_at: now,
        updated_at: now,
    }
}

pub enum FakeReply {
    Text(String),
    InvalidKey,
    Overloaded,
    /// Never answers.
    Hang,
}

pub struct FakeLlm {
    reply: FakeReply,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeLlm {
    pub fn new(reply: FakeReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for FakeLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            FakeReply::Text(text) => Ok(text.clone()),
            FakeReply::InvalidKey => Err(LlmError::InvalidCredentials("Incorrect API key".into())),
            FakeReply::Overloaded => Err(LlmError::RateLimited("Rate limit reached".into())),
            FakeReply::Hang => {
                std::future::pending::<()>().await;
                Ok(String::new())
            }
        }
    }
}

/// Catalog that serves queued snapshots in order, repeating the last one.
#[derive(Default)]
pub struct InMemoryCatalog {
    snapshots: Mutex<VecDeque<Vec<Recipe>>>,
    reads: AtomicUsize,
    fail: bool,
}

impl InMemoryCatalog {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self {
            snapshots: Mutex::new(VecDeque::from([recipes])),
            ..Self::default()
        }
    }

    pub fn changing(first: Vec<Recipe>, then: Vec<Recipe>) -> Self {
        Self {
            snapshots: Mutex::new(VecDeque::from([first, then])),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeCatalog for InMemoryCatalog {
    async fn recipes_for(&self, _user_id: Uuid) -> anyhow::Result<Vec<Recipe>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("catalog unavailable");
        }
        let mut snapshots = self.snapshots.lock().unwrap();
        let current = if snapshots.len() > 1 {
            snapshots.pop_front().unwrap_or_default()
        } else {
            snapshots.front().cloned().unwrap_or_default()
        };
        Ok(current)
    }
}

#[derive(Default)]
pub struct InMemoryMealPlans {
    plans: Mutex<Vec<MealPlan>>,
}

#[async_trait]
impl MealPlanStore for InMemoryMealPlans {
    async fn list(
        &self,
        user_id: Uuid,
        from: Option<Date>,
        to: Option<Date>,
    ) -> anyhow::Result<Vec<MealPlan>> {
        let mut plans: Vec<MealPlan> = self
            .plans
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == Some(user_id))
            .filter(|p| from.map_or(true, |d| p.date >= d) && to.map_or(true, |d| p.date <= d))
            .cloned()
            .collect();
        plans.sort_by_key(|p| (p.date, p.meal_type));
        Ok(plans)
    }

    async fn create(&self, user_id: Uuid, req: &CreateMealPlanRequest) -> anyhow::Result<MealPlan> {
        let plan = MealPlan {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            date: req.date,
            meal_type: req.meal_type,
            meal: snapshot_of(req),
            created_at: OffsetDateTime::now_utc(),
        };
        self.plans.lock().unwrap().push(plan.clone());
        Ok(plan)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<()> {
        self.plans
            .lock()
            .unwrap()
            .retain(|p| !(p.id == id && p.user_id == Some(user_id)));
        Ok(())
    }
}
