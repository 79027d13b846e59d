use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::auth::require_company;
use crate::api::extract::JsonBody;
use crate::api::state::AppState;
use crate::db::{Submission, SubmissionRepository, SubmissionWithEvent};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    pub access_code: Option<String>,
    pub id: Option<i64>,
    pub event_id: Option<i64>,
    pub submission_id: Option<i64>,
}

/// PUT /companies/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SubmissionRequest>,
) -> Result<Json<Vec<SubmissionWithEvent>>, AppError> {
    let company = require_company(&state.db, req.access_code, req.id).await?;
    let event_id = req
        .event_id
        .ok_or_else(|| AppError::InvalidBody("event_id is required".into()))?;

    let submissions = SubmissionRepository::list_for_event(&state.db, event_id, company.id).await?;
    Ok(Json(submissions))
}

/// DELETE /companies/submissions
pub async fn delete_submission(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SubmissionRequest>,
) -> Result<Json<Submission>, AppError> {
    let company = require_company(&state.db, req.access_code, req.id).await?;
    let submission_id = req
        .submission_id
        .ok_or_else(|| AppError::InvalidBody("cannot delete submission without its id".into()))?;

    let submission = SubmissionRepository::delete_owned(&state.db, submission_id, company.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("submission {}", submission_id)))?;

    tracing::info!(submission_id, company_id = company.id, "submission rejected");
    Ok(Json(submission))
}
