use axum::{extract::State, Json};
use serde::Deserialize;
use sqlx::{Pool, Sqlite};

use crate::api::extract::JsonBody;
use crate::api::state::AppState;
use crate::crypto::{generate_salt, hash_password, verify_password};
use crate::db::{now, CompanyIdentity, CompanyRepository, MachineAccess, MachineRepository, NewCompany};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub machine_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub machine_id: Option<String>,
    pub access_code: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    pub machine_id: Option<String>,
    pub access_code: Option<String>,
}

/// What a caller presents to prove an existing session. The access code wins when
/// both are supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessKey {
    AccessCode(String),
    MachineId(String),
}

impl AccessKey {
    pub fn from_parts(access_code: Option<String>, machine_id: Option<String>) -> Option<Self> {
        access_code
            .map(AccessKey::AccessCode)
            .or_else(|| machine_id.map(AccessKey::MachineId))
    }
}

/// Trimmed, non-blank value of a required text field
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// Resolve a session key to the company it is bound to.
pub async fn lookup_access(pool: &Pool<Sqlite>, key: &AccessKey) -> Result<CompanyIdentity, AppError> {
    let identity = match key {
        AccessKey::AccessCode(code) => MachineRepository::find_by_access_code(pool, code).await?,
        AccessKey::MachineId(machine_id) => {
            MachineRepository::find_by_machine_id(pool, machine_id).await?
        }
    };

    identity.ok_or(AppError::InvalidAccess)
}

/// Token gate for resource endpoints: the access code must be live and bound to the
/// company the caller claims to be.
pub async fn require_company(
    pool: &Pool<Sqlite>,
    access_code: Option<String>,
    claimed_id: Option<i64>,
) -> Result<CompanyIdentity, AppError> {
    let (Some(access_code), Some(claimed_id)) = (access_code, claimed_id) else {
        return Err(AppError::InvalidToken);
    };

    match lookup_access(pool, &AccessKey::AccessCode(access_code)).await {
        Ok(identity) if identity.id == claimed_id => Ok(identity),
        Ok(identity) => {
            tracing::warn!(claimed_id, actual_id = identity.id, "access code bound to another company");
            Err(AppError::InvalidToken)
        }
        Err(AppError::InvalidAccess) => Err(AppError::InvalidToken),
        Err(e) => Err(e),
    }
}

async fn issue_access(
    state: &AppState,
    machine_id: &str,
    company_id: i64,
) -> Result<MachineAccess, AppError> {
    let valid_until = now() + state.config.session_expiry_hours * 3600;
    MachineRepository::upsert(&state.db, machine_id, company_id, valid_until).await
}

/// POST /companies/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Json<CompanyIdentity>, AppError> {
    let email = required(req.email, "email")?;
    let password = required(req.password, "password")?;
    let name = required(req.name, "name")?;
    let first_name = required(req.first_name, "first_name")?;
    let last_name = required(req.last_name, "last_name")?;
    let machine_id = required(req.machine_id, "machine_id")?;

    let salt = generate_salt();
    let hashed_password = hash_password(state.config.password_scheme, &password, &salt)?;

    let company = CompanyRepository::create(
        &state.db,
        NewCompany {
            company_name: name,
            company_email: email,
            hashed_password,
            salt,
            first_name,
            last_name,
        },
    )
    .await?;

    // not atomic with the insert above: a failure here leaves the company without a session
    let access = issue_access(&state, &machine_id, company.company_id).await?;
    tracing::info!(company_id = company.company_id, "company registered");

    Ok(Json(CompanyIdentity {
        access_code: access.access_code,
        id: company.company_id,
        name: company.company_name,
        email: company.company_email,
        first_name: company.first_name,
        last_name: company.last_name,
    }))
}

/// PUT /companies/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<CompanyIdentity>, AppError> {
    let has_password_pair = req.email.is_some() && req.password.is_some();
    if req.access_code.is_none() && req.machine_id.is_none() && !has_password_pair {
        return Err(AppError::InvalidBody(
            "expected access_code, machine_id, or email and password".into(),
        ));
    }

    if let Some(access_code) = req.access_code {
        return lookup_access(&state.db, &AccessKey::AccessCode(access_code)).await.map(Json);
    }

    let (Some(email), Some(password)) = (req.email, req.password) else {
        // silent re-auth from a known machine
        let machine_id = req.machine_id.ok_or_else(|| AppError::InvalidBody("machine_id is required".into()))?;
        return lookup_access(&state.db, &AccessKey::MachineId(machine_id)).await.map(Json);
    };

    let machine_id = req
        .machine_id
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::InvalidBody("machine_id is required".into()))?;

    let Some(company) = CompanyRepository::get_by_email(&state.db, email.trim()).await? else {
        tracing::warn!("login failed: no company with this email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password.trim(), &company.hashed_password, &company.salt)? {
        tracing::warn!(company_id = company.company_id, "login failed: password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let access = issue_access(&state, &machine_id, company.company_id).await?;
    CompanyRepository::touch_last_login(&state.db, company.company_id).await?;
    tracing::info!(company_id = company.company_id, "company logged in");

    Ok(Json(CompanyIdentity {
        access_code: access.access_code,
        id: company.company_id,
        name: company.company_name,
        email: company.company_email,
        first_name: company.first_name,
        last_name: company.last_name,
    }))
}

/// PUT /companies/machine-access
pub async fn machine_access(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AccessRequest>,
) -> Result<Json<CompanyIdentity>, AppError> {
    let key = AccessKey::from_parts(req.access_code, req.machine_id).ok_or(AppError::InvalidAccess)?;
    lookup_access(&state.db, &key).await.map(Json)
}

/// PUT /companies/signout
pub async fn signout(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AccessRequest>,
) -> Result<Json<&'static str>, AppError> {
    let key = AccessKey::from_parts(req.access_code, req.machine_id)
        .ok_or_else(|| AppError::InvalidBody("expected access_code or machine_id".into()))?;

    let removed = match &key {
        AccessKey::AccessCode(code) => MachineRepository::delete_by_access_code(&state.db, code).await?,
        AccessKey::MachineId(machine_id) => {
            MachineRepository::delete_by_machine_id(&state.db, machine_id).await?
        }
    };
    tracing::info!(removed, "signed out");

    Ok(Json("Signed out"))
}
