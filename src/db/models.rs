use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Company {
    pub company_id: i64,
    pub company_name: String,
    pub company_email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub first_name: String,
    pub last_name: String,
    pub verified: bool,
    pub last_login: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub company_name: String,
    pub company_email: String,
    pub hashed_password: String,
    pub salt: String,
    pub first_name: String,
    pub last_name: String,
}

/// Column-level changes for a company row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct CompanyUpdate {
    pub company_name: Option<String>,
    pub company_email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `(hashed_password, salt)`, always written together
    pub credentials: Option<(String, String)>,
    pub verified: Option<bool>,
}

impl CompanyUpdate {
    pub fn is_empty(&self) -> bool {
        self.company_name.is_none()
            && self.company_email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.credentials.is_none()
            && self.verified.is_none()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MachineAccess {
    pub machine_id: String,
    pub company_id: i64,
    pub access_code: String,
    pub valid_until: i64,
}

/// Public identity of a company as seen through a live machine-access row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CompanyIdentity {
    pub access_code: String,
    pub id: i64,
    pub name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub event_id: i64,
    pub company_id: i64,
    pub event_name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub short_description: String,
    pub long_description: String,
    pub prize: i64,
    pub payment_status: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub company_id: i64,
    pub event_name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub short_description: String,
    pub long_description: String,
    pub prize: i64,
}

/// Sparse update of an event: only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub event_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub prize: Option<i64>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.event_name.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.short_description.is_none()
            && self.long_description.is_none()
            && self.prize.is_none()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: i64,
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub project_name: String,
    pub project_description: String,
    pub project_link: String,
    pub project_video_link: Option<String>,
    pub resume_link: Option<String>,
    pub additional_links: Option<Json<serde_json::Value>>,
    pub submission_time: i64,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub project_name: String,
    pub project_description: String,
    pub project_link: String,
    pub project_video_link: Option<String>,
    pub resume_link: Option<String>,
    pub additional_links: Option<serde_json::Value>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: i64,
    pub event_name: String,
    pub company_id: i64,
}

/// A submission joined with the event it was made for
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubmissionWithEvent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub submission: Submission,
    #[sqlx(flatten)]
    pub events: EventSummary,
}
