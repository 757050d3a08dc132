//! Prompt assembly for the planning model.

use serde_json::{Map, Value};

use crate::session::JobContext;

/// Build the single-turn prompt handed to the planning model each round.
///
/// The contract is strict JSON-only output; the example block anchors the
/// schema so the model does not improvise field names.
pub fn build_planner_prompt(
    markup: &str,
    memory: &Map<String, Value>,
    context: &JobContext,
    resume_path: &str,
) -> String {
    let memory_json =
        serde_json::to_string_pretty(memory).unwrap_or_else(|_| "{}".to_string());
    let context_json = serde_json::to_string_pretty(context.as_map())
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"You are a strict agentic assistant driving a job-application form.

# Current Page DOM:
-----
{markup}
-----

# Candidate Memory (for filling forms):
-----
{memory_json}
-----

# Job Context gathered so far:
-----
{context_json}
-----

# Your Task:
1. Analyze the DOM carefully.
2. Plan a step-by-step list of actions needed (click, type, select, dynamic_select, check, upload).
3. If visible, scrape key job data (Job Title, Company Name, Location, Salary, Tech Stack / Skills, Summary) into "job_summary".
4. If the page confirms the application was submitted, report status "success".
5. If the application is clearly impossible (job closed, page broken), report status "failed".

# Output Requirements:
- Return ONLY valid JSON.
- Must contain:
    - "status": one of "action_required", "human_intervention_required", "success", "failed"
    - "actions": [list of action objects] (may be empty)
    - "job_summary": object (optional if no job info found)
    - "reason": string (required when status is "human_intervention_required")
    - "cover_letter_text": string (optional, only when a cover letter is requested by the form)

- Each action object must have:
    - "type": one of ["click", "type", "select", "dynamic_select", "check", "upload"]
    - "selector": XPath or CSS
    - "text" (for typing)
    - "option_text" (for selects)
    - "file_path" = "{resume_path}" (for uploads)

# Important Rules:
- Prefer XPath selectors.
- Match labels and fields exactly from the DOM.
- If human verification (CAPTCHA, email OTP, login wall) is detected, set status "human_intervention_required" and give a reason.

# Example JSON Output:

{{
  "status": "action_required",
  "actions": [
    {{"type": "type", "selector": "//input[@name='email']", "text": "test@example.com"}},
    {{"type": "dynamic_select", "selector": "//input[@placeholder='Select country']", "option_text": "United States"}},
    {{"type": "click", "selector": "//button[@id='submit-button']"}}
  ],
  "job_summary": {{
    "Company Name": "Moondream",
    "Job Title": "MTS - Full Stack",
    "Location": "Seattle, WA",
    "Salary": "50000-180000 USD",
    "Tech Stack / Skills": ["Full Stack", "Cloud"],
    "Summary": "Moondream is hiring a full stack engineer..."
  }}
}}

Strictly output valid JSON. No extra text or explanations."#
    )
}

/// Rough token estimate for log visibility. Four characters per token is the
/// usual back-of-envelope ratio for English plus markup.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() / 4).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_embeds_all_inputs() {
        let mut memory = Map::new();
        memory.insert("email".into(), json!("a@b.c"));
        let mut context = JobContext::new();
        let mut found = Map::new();
        found.insert("Job Title".into(), json!("MTS"));
        context.merge(&found);

        let prompt =
            build_planner_prompt("<form id='apply'>", &memory, &context, "docs/resume.pdf");
        assert!(prompt.contains("<form id='apply'>"));
        assert!(prompt.contains("a@b.c"));
        assert!(prompt.contains("MTS"));
        assert!(prompt.contains("docs/resume.pdf"));
    }

    #[test]
    fn token_estimate_is_floored_at_one() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
    }
}
