//! Interview-style challenge drafting.
//!
//! The transcript travels with the caller: each turn the full history comes in, one
//! user turn and one assistant turn are added, and the model is asked a second time
//! to fill the challenge record from everything said so far.

use std::path::Path;

use serde::Serialize;

use super::{ConversationTurn, LanguageModel, Role};
use crate::error::AppError;

/// Transcripts this short have not been bootstrapped with the system turn yet.
const BOOTSTRAP_THRESHOLD: usize = 2;

const LINE_BREAK: &str = "<br>";

const EXTRACTION_TEMPLATE: &str = r#"
    Populate an empty JSON dictionary based on our conversation.
    Use inferred values from the context we've discussed. Below is the empty JSON structure for reference:

    {}

    You can fill in keys and values as you understand from our dialogue, adding relevant fields and values as needed. Make sure the following keys are filled out. Put 'null' if you don't know.

    event_name: [some string]
    deadline: [date and time]
    short_desc: [some string less than 50 words]
    long_desc : [some longer string]
    cash_prize: [some number]
    required_skills: [a bunch of strings separated by commas]
    other_prizes: [a comma separated list of strings]

    Here is the conversation:
    "#;

#[derive(Debug, Clone, Serialize)]
pub struct ConversationOutcome {
    pub assistant_response: String,
    pub conversation_history: Vec<ConversationTurn>,
    /// Raw model output; not validated as JSON.
    pub filled_json: String,
}

/// Prepend the system turn to a transcript that has not been bootstrapped yet.
pub fn bootstrap(
    history: Vec<ConversationTurn>,
    initial_context: impl Into<String>,
) -> Vec<ConversationTurn> {
    if history.len() > BOOTSTRAP_THRESHOLD {
        return history;
    }

    let mut bootstrapped = Vec::with_capacity(history.len() + 2);
    bootstrapped.push(ConversationTurn::new(Role::System, initial_context));
    bootstrapped.extend(history);
    bootstrapped
}

pub fn needs_bootstrap(history: &[ConversationTurn]) -> bool {
    history.len() <= BOOTSTRAP_THRESHOLD
}

/// Role-prefixed log of the user and assistant turns, with newlines replaced by `<br>`.
pub fn render_transcript(history: &[ConversationTurn]) -> String {
    let mut log = String::new();
    for turn in history {
        let prefix = match turn.role {
            Role::User => "User: ",
            Role::Assistant => "Assistant: ",
            Role::System => continue,
        };
        log.push_str(prefix);
        log.push_str(&turn.content);
        log.push('\n');
    }
    log.replace('\n', LINE_BREAK)
}

pub fn extraction_prompt(rendered: &str) -> String {
    format!("{}{}", EXTRACTION_TEMPLATE, rendered)
}

/// Run one interview turn: bootstrap, reply, then extract the challenge record.
pub async fn advance_conversation(
    model: &dyn LanguageModel,
    initial_context_path: &Path,
    history: Vec<ConversationTurn>,
    user_input: String,
) -> Result<ConversationOutcome, AppError> {
    let mut history = if needs_bootstrap(&history) {
        let initial_context = tokio::fs::read_to_string(initial_context_path)
            .await
            .map_err(|e| {
                AppError::Internal(format!(
                    "Failed to read initial context {}: {}",
                    initial_context_path.display(),
                    e
                ))
            })?;
        bootstrap(history, initial_context)
    } else {
        history
    };

    history.push(ConversationTurn::new(Role::User, user_input));

    let assistant_response = model.complete(&history).await?;
    history.push(ConversationTurn::new(Role::Assistant, assistant_response.clone()));

    let rendered = render_transcript(&history);
    for turn in &mut history {
        turn.content = turn.content.replace('\n', LINE_BREAK);
    }

    let extraction = [ConversationTurn::new(Role::System, extraction_prompt(&rendered))];
    let filled_json = model.complete(&extraction).await?;
    tracing::debug!(turns = history.len(), "challenge record extracted");

    Ok(ConversationOutcome {
        assistant_response,
        conversation_history: history,
        filled_json,
    })
}
