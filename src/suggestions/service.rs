use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ChatRequest, MacroSuggestionRequest, PantrySuggestionRequest, SuggestedMeal},
    prompt::{build_macro_prompt, build_pantry_prompt, select_candidates},
    rate_limit::RateLimiter,
    response::{annotate_stored, parse_meals},
};
use crate::{
    llm::{ChatMessage, CompletionClient, CompletionRequest, LlmError},
    recipes::RecipeCatalog,
};

const CHAT_PERSONA: &str = "You are a friendly meal-planning assistant. You help users plan meals, \
     hit their macro-nutrient targets and cook with what they have. Keep answers short and practical, \
     and say so when a question is outside food and nutrition.";

#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("Too many suggestion requests. Please wait {wait_secs} seconds before trying again.")]
    RateLimited { wait_secs: u64 },

    #[error("The suggestion service did not answer within {0} seconds.")]
    Timeout(u64),

    #[error("The suggestion service rejected our API key.")]
    InvalidCredentials,

    #[error("The suggestion service is over capacity. Please try again later.")]
    UpstreamRateLimited,

    #[error("The suggestion service returned an unexpected response: {0}")]
    Parse(String),

    #[error("The suggestion service failed: {0}")]
    Upstream(String),

    #[error("could not read the recipe catalog: {0:#}")]
    Catalog(anyhow::Error),
}

impl From<LlmError> for SuggestionError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::InvalidCredentials(_) => Self::InvalidCredentials,
            LlmError::RateLimited(_) => Self::UpstreamRateLimited,
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// Builds prompts, calls the model under admission control and a deadline,
/// and validates what comes back.
pub struct SuggestionService {
    llm: Arc<dyn CompletionClient>,
    limiter: Arc<dyn RateLimiter>,
    catalog: Arc<dyn RecipeCatalog>,
    timeout: Duration,
    temperature: f32,
}

impl SuggestionService {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        limiter: Arc<dyn RateLimiter>,
        catalog: Arc<dyn RecipeCatalog>,
        timeout: Duration,
        temperature: f32,
    ) -> Self {
        Self {
            llm,
            limiter,
            catalog,
            timeout,
            temperature,
        }
    }

    fn admit(&self) -> Result<(), SuggestionError> {
        self.limiter.try_acquire().map_err(|e| {
            debug!(wait_secs = e.retry_after_secs, "suggestion call rejected locally");
            SuggestionError::RateLimited {
                wait_secs: e.retry_after_secs,
            }
        })
    }

    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        json_output: bool,
    ) -> Result<String, SuggestionError> {
        let request = CompletionRequest {
            messages,
            temperature: self.temperature,
            json_output,
        };
        match tokio::time::timeout(self.timeout, self.llm.complete(&request)).await {
            Ok(result) => result.map_err(SuggestionError::from),
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "completion timed out");
                Err(SuggestionError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    async fn generate_meals(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<Vec<SuggestedMeal>, SuggestionError> {
        let raw = self.generate(messages, true).await?;
        parse_meals(&raw).map_err(|reason| {
            warn!(%reason, "generated meals failed validation");
            SuggestionError::Parse(reason)
        })
    }

    #[instrument(skip(self, req), fields(meal_types = req.meal_types.len(), dietary = %req.dietary_preference))]
    pub async fn suggest_from_macros(
        &self,
        user_id: Uuid,
        req: &MacroSuggestionRequest,
    ) -> Result<Vec<SuggestedMeal>, SuggestionError> {
        let catalog = self
            .catalog
            .recipes_for(user_id)
            .await
            .map_err(SuggestionError::Catalog)?;
        // Admit only once the catalog read has succeeded.
        self.admit()?;

        let candidates = select_candidates(&catalog, req);
        let prompt = build_macro_prompt(req, &candidates);

        let mut meals = self.generate_meals(prompt.into_messages()).await?;
        meals.truncate(req.suggestion_limit());

        // Re-read for annotation; may differ from the snapshot used for the prompt.
        let stored = self
            .catalog
            .recipes_for(user_id)
            .await
            .map_err(SuggestionError::Catalog)?;
        annotate_stored(&mut meals, &stored);

        info!(
            candidates = candidates.len(),
            meals = meals.len(),
            "macro suggestions generated"
        );
        Ok(meals)
    }

    #[instrument(skip(self, req), fields(meal_type = %req.meal_type))]
    pub async fn suggest_from_pantry(
        &self,
        req: &PantrySuggestionRequest,
    ) -> Result<SuggestedMeal, SuggestionError> {
        self.admit()?;

        let prompt = build_pantry_prompt(req);
        let meal = self
            .generate_meals(prompt.into_messages())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SuggestionError::Parse("response contained no meals".into()))?;

        info!(name = %meal.name, "pantry recipe generated");
        Ok(meal)
    }

    #[instrument(skip(self, req), fields(history = req.history.len()))]
    pub async fn chat(&self, req: &ChatRequest) -> Result<String, SuggestionError> {
        self.admit()?;

        let mut messages = Vec::with_capacity(req.history.len() + 2);
        messages.push(ChatMessage::system(CHAT_PERSONA));
        messages.extend(req.history.iter().cloned());
        messages.push(ChatMessage::user(req.message.trim()));

        let reply = self.generate(messages, false).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(SuggestionError::Parse("empty chat reply".into()));
        }
        Ok(reply.to_owned())
    }
}
