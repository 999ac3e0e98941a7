//! Prompt assembly for the three generation jobs.
//!
//! Handlers map database rows into the plain argument structs here so the
//! builders stay usable (and testable) without the `database` feature.

use serde_json::Value as JsonValue;

use super::TextRequest;

/// The slice of an agent row the chat tester needs.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub system_prompt: String,
}

/// Chat-agent testing: exercise an agent's configured system prompt with a
/// single admin-supplied message. Nothing is persisted.
pub fn chat_request(agent: &AgentProfile, message: &str) -> TextRequest {
    let system = format!(
        "You are the conversational agent \"{}\". Stay in character and follow the \
         agent instructions below exactly.\n\nAGENT INSTRUCTIONS:\n{}",
        agent.name, agent.system_prompt
    );
    TextRequest::new(system, message.to_string())
}

/// Survey analysis: summarize a client's onboarding survey answers into an
/// automation assessment the proposal step can build on.
pub fn survey_analysis_request(client_name: &str, answers: &JsonValue) -> TextRequest {
    let system = "You are an automation consultant reviewing a client onboarding survey. \
                  Identify the client's main workflows, pain points, and automation \
                  opportunities. Respond with a short plain-text assessment, no markdown."
        .to_string();
    let user = format!(
        "Survey answers for client \"{}\":\n{}",
        client_name,
        serde_json::to_string_pretty(answers).unwrap_or_else(|_| answers.to_string())
    );
    TextRequest::new(system, user)
}

/// Proposal drafting: turn the survey assessment and plan context into a
/// client-facing proposal document in markdown.
pub fn proposal_request(
    client_name: &str,
    plan_name: Option<&str>,
    analysis: Option<&str>,
) -> TextRequest {
    let system = "You are drafting a client-facing automation proposal. Produce a complete \
                  markdown document with sections for Overview, Recommended Workflows, \
                  Timeline, and Pricing. Address the client by name. Do not invent prices \
                  beyond the named plan."
        .to_string();
    let mut request = TextRequest::new(system, format!("Draft a proposal for \"{}\".", client_name))
        .with_context("client", client_name.to_string());
    if let Some(plan) = plan_name {
        request = request.with_context("plan", plan.to_string());
    }
    if let Some(analysis) = analysis {
        request = request.with_context("survey_analysis", analysis.to_string());
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_carries_agent_instructions() {
        let agent = AgentProfile {
            name: "Support Bot".to_string(),
            system_prompt: "Always answer politely.".to_string(),
        };
        let request = chat_request(&agent, "What are your hours?");
        assert!(request.system_prompt.contains("Support Bot"));
        assert!(request.system_prompt.contains("Always answer politely."));
        assert_eq!(request.user_prompt, "What are your hours?");
    }

    #[test]
    fn survey_analysis_request_embeds_answers() {
        let answers = json!({"team_size": 12, "tools": ["sheets", "email"]});
        let request = survey_analysis_request("Acme Corp", &answers);
        assert!(request.user_prompt.contains("Acme Corp"));
        assert!(request.user_prompt.contains("team_size"));
        assert!(request.system_prompt.contains("automation"));
    }

    #[test]
    fn proposal_request_includes_optional_context() {
        let request = proposal_request("Acme Corp", Some("Growth"), Some("Heavy manual invoicing"));
        let rendered = request.rendered_user_prompt();
        assert!(rendered.contains("Acme Corp"));
        assert!(rendered.contains("Growth"));
        assert!(rendered.contains("Heavy manual invoicing"));
    }

    #[test]
    fn proposal_request_without_context_still_names_client() {
        let request = proposal_request("Acme Corp", None, None);
        assert!(request.rendered_user_prompt().contains("Acme Corp"));
        assert!(!request.rendered_user_prompt().contains("survey_analysis"));
    }
}
