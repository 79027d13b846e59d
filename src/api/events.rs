use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::auth::{require_company, required};
use crate::api::extract::JsonBody;
use crate::api::state::AppState;
use crate::db::{Event, EventPatch, EventRepository, NewEvent};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub access_code: Option<String>,
    pub id: Option<i64>,
    /// Present for updates, absent for creation
    pub event_id: Option<i64>,
    #[serde(flatten)]
    pub fields: EventPatch,
}

/// PUT /companies/events
pub async fn list_events(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<EventRequest>,
) -> Result<Json<Vec<Event>>, AppError> {
    let company = require_company(&state.db, req.access_code, req.id).await?;

    let events = EventRepository::list_for_company(&state.db, company.id).await?;
    Ok(Json(events))
}

/// POST /companies/events
pub async fn save_event(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<EventRequest>,
) -> Result<Json<Event>, AppError> {
    let company = require_company(&state.db, req.access_code, req.id).await?;

    let event = match req.event_id {
        Some(event_id) => EventRepository::update(&state.db, event_id, company.id, req.fields)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {}", event_id)))?,
        None => {
            let fields = req.fields;
            let new_event = NewEvent {
                company_id: company.id,
                event_name: required(fields.event_name, "event_name")?,
                start_time: fields.start_time,
                end_time: fields.end_time,
                short_description: required(fields.short_description, "short_description")?,
                long_description: required(fields.long_description, "long_description")?,
                prize: fields
                    .prize
                    .ok_or_else(|| AppError::Validation("prize is required".into()))?,
            };
            EventRepository::create(&state.db, new_event).await?
        }
    };

    tracing::debug!(event_id = event.event_id, company_id = company.id, "event saved");
    Ok(Json(event))
}
