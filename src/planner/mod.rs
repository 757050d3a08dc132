//! Planning collaborator boundary
//!
//! The planner is a black box: it receives the current page markup, the
//! candidate's memory and the job context accumulated so far, and returns a
//! structured [`Plan`]. Anything malformed — transport failure, non-JSON
//! payload, a plan that fails validation — is an error, which the session
//! loop treats uniformly as "no plan".

mod gemini;
mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use gemini::GeminiPlanner;
pub use prompts::{build_planner_prompt, estimate_tokens};

use crate::session::JobContext;

/// Terminal/continuation status reported by the planner each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    ActionRequired,
    HumanInterventionRequired,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Kind of UI operation an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Type,
    Select,
    DynamicSelect,
    Check,
    Upload,
}

/// One abstract UI operation. Stateless value object, executed at most once
/// per appearance in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// One round's structured planner output. Produced fresh each round; never
/// mutated in place.
#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub status: PlanStatus,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub job_summary: Map<String, Value>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub cover_letter_text: Option<String>,
}

impl Plan {
    /// Boundary validation. A response failing this is normalized to the
    /// "no plan" sentinel rather than letting partial data into the loop.
    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.status == PlanStatus::HumanInterventionRequired
            && self.reason.as_deref().map_or(true, |r| r.trim().is_empty())
        {
            return Err(PlannerError::InvalidPlan(
                "human_intervention_required without a reason".into(),
            ));
        }
        Ok(())
    }
}

/// Errors from the planning collaborator. The session loop does not
/// distinguish these: any of them means the round produced no usable plan.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("planner transport failed: {0}")]
    Transport(String),

    #[error("planner returned HTTP {0}")]
    Http(u16),

    #[error("planner response malformed: {0}")]
    MalformedResponse(String),

    #[error("plan failed validation: {0}")]
    InvalidPlan(String),

    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),
}

/// Everything the planner gets to look at for one round.
pub struct PlanRequest<'a> {
    /// Full rendered markup of the current page
    pub markup: &'a str,
    /// Read-only candidate profile/FAQ data
    pub memory: &'a Map<String, Value>,
    /// Job fields accumulated over previous rounds of this link
    pub context: &'a JobContext,
}

/// The decision-making collaborator.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_plan(&self, request: PlanRequest<'_>) -> Result<Plan, PlannerError>;
}

/// Parse raw planner text into a validated [`Plan`].
///
/// LLMs routinely wrap JSON in triple-backtick fences; strip those before
/// parsing.
pub fn parse_plan(raw: &str) -> Result<Plan, PlannerError> {
    let cleaned = strip_code_fences(raw);
    let plan: Plan = serde_json::from_str(cleaned)
        .map_err(|e| PlannerError::MalformedResponse(e.to_string()))?;
    plan.validate()?;
    Ok(plan)
}

fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = text.rfind("```") {
            text = &text[..end];
        }
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_plain_action_plan() {
        let raw = r##"{
            "status": "action_required",
            "actions": [
                {"type": "type", "selector": "//input[@name='email']", "text": "a@b.c"},
                {"type": "click", "selector": "#submit"}
            ],
            "job_summary": {"Job Title": "MTS"}
        }"##;

        let plan = parse_plan(raw).expect("plan should parse");
        assert_eq!(plan.status, PlanStatus::ActionRequired);
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.actions[0].kind, ActionKind::Type);
        assert_eq!(plan.job_summary.get("Job Title"), Some(&json!("MTS")));
    }

    #[test]
    fn parses_a_fenced_plan() {
        let raw = "```json\n{\"status\": \"success\", \"actions\": []}\n```";
        let plan = parse_plan(raw).expect("fenced plan should parse");
        assert_eq!(plan.status, PlanStatus::Success);
    }

    #[test]
    fn unknown_status_is_preserved_as_unknown() {
        let plan = parse_plan(r#"{"status": "wat"}"#).expect("should parse");
        assert_eq!(plan.status, PlanStatus::Unknown);
    }

    #[test]
    fn human_intervention_requires_a_reason() {
        let err = parse_plan(r#"{"status": "human_intervention_required"}"#);
        assert!(matches!(err, Err(PlannerError::InvalidPlan(_))));

        let plan = parse_plan(
            r#"{"status": "human_intervention_required", "reason": "CAPTCHA"}"#,
        )
        .expect("with reason should parse");
        assert_eq!(plan.reason.as_deref(), Some("CAPTCHA"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_plan("I could not find a form on this page."),
            Err(PlannerError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unknown_action_kind_rejects_the_plan() {
        let raw = r##"{
            "status": "action_required",
            "actions": [{"type": "hover", "selector": "#x"}]
        }"##;
        assert!(matches!(
            parse_plan(raw),
            Err(PlannerError::MalformedResponse(_))
        ));
    }
}
