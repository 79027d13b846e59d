use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::extract::JsonBody;
use crate::api::state::AppState;
use crate::llm::{advance_conversation, ConversationOutcome, ConversationTurn};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(default)]
    pub user_input: String,
}

/// POST /companies/challenge-generator
pub async fn challenge_generator(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ChallengeRequest>,
) -> Result<Json<ConversationOutcome>, AppError> {
    tracing::debug!(turns = req.conversation_history.len(), "handling conversation turn");

    let outcome = advance_conversation(
        &*state.llm,
        &state.config.initial_context_path,
        req.conversation_history,
        req.user_input,
    )
    .await?;

    Ok(Json(outcome))
}
