//! Gemini-backed implementation of the [`Planner`] trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{
    build_planner_prompt, estimate_tokens, parse_plan, Plan, PlanRequest, Planner, PlannerError,
};
use crate::PlannerConfig;

const API_KEY_ENV: &str = "GEMINI_API_KEY";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiPlanner {
    client: reqwest::Client,
    api_key: String,
    config: PlannerConfig,
    resume_path: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiPlanner {
    /// Reads the API key from the environment. Fails fast at construction so
    /// a misconfigured run dies before a browser is launched.
    pub fn new(config: PlannerConfig, resume_path: String) -> Result<Self, PlannerError> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| PlannerError::MissingApiKey(API_KEY_ENV))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PlannerError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            config,
            resume_path,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, PlannerError> {
        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.config.model, self.api_key
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlannerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = %status, detail = %detail, "planning request rejected");
            return Err(PlannerError::Http(status.as_u16()));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                PlannerError::MalformedResponse("response carried no candidate text".into())
            })?;

        Ok(text)
    }
}

#[async_trait]
impl Planner for GeminiPlanner {
    async fn next_plan(&self, request: PlanRequest<'_>) -> Result<Plan, PlannerError> {
        let prompt = build_planner_prompt(
            request.markup,
            request.memory,
            request.context,
            &self.resume_path,
        );
        info!(
            approx_tokens = estimate_tokens(&prompt),
            model = %self.config.model,
            "requesting next plan"
        );

        let raw = self.generate(&prompt).await?;
        debug!(bytes = raw.len(), "received planner response");
        parse_plan(&raw)
    }
}
