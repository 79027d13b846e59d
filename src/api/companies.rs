use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::auth::require_company;
use crate::api::extract::JsonBody;
use crate::api::state::AppState;
use crate::crypto::{generate_salt, hash_password, PasswordScheme};
use crate::db::{CompanyIdentity, CompanyRepository, CompanyUpdate};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CompanyPatchRequest {
    pub access_code: Option<String>,
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub verified: Option<bool>,
}

fn optional_text(value: Option<String>, field: &str) -> Result<Option<String>, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(AppError::Validation(format!("{} must not be blank", field))),
        other => Ok(other),
    }
}

impl CompanyPatchRequest {
    fn into_update(self, scheme: PasswordScheme) -> Result<CompanyUpdate, AppError> {
        let credentials = match optional_text(self.password, "password")? {
            Some(password) => {
                let salt = generate_salt();
                Some((hash_password(scheme, &password, &salt)?, salt))
            }
            None => None,
        };

        Ok(CompanyUpdate {
            company_name: optional_text(self.company_name, "company_name")?,
            company_email: optional_text(self.email, "email")?,
            first_name: optional_text(self.first_name, "first_name")?,
            last_name: optional_text(self.last_name, "last_name")?,
            credentials,
            verified: self.verified,
        })
    }
}

/// POST /companies/companies
pub async fn update_company(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CompanyPatchRequest>,
) -> Result<Json<CompanyIdentity>, AppError> {
    let caller = require_company(&state.db, req.access_code.clone(), req.id).await?;

    let update = req.into_update(state.config.password_scheme)?;
    if update.is_empty() {
        return Err(AppError::Validation(
            "at least one of first_name, last_name, company_name, email, password, verified is required"
                .into(),
        ));
    }

    let company = CompanyRepository::update(&state.db, caller.id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("company {}", caller.id)))?;
    tracing::info!(company_id = company.company_id, "company profile updated");

    Ok(Json(CompanyIdentity {
        access_code: caller.access_code,
        id: company.company_id,
        name: company.company_name,
        email: company.company_email,
        first_name: company.first_name,
        last_name: company.last_name,
    }))
}
