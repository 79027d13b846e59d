pub mod companies;
pub mod events;
pub mod machines;
pub mod models;
pub mod submissions;

pub use companies::CompanyRepository;
pub use events::EventRepository;
pub use machines::MachineRepository;
pub use models::{
    Company, CompanyIdentity, CompanyUpdate, Event, EventPatch, EventSummary, MachineAccess,
    NewCompany, NewEvent, NewSubmission, Submission, SubmissionWithEvent,
};
pub use submissions::SubmissionRepository;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::Config;
use crate::error::AppError;

/// Connect to the configured database and bring the schema up to date.
pub async fn connect(config: &Config) -> Result<Pool<Sqlite>, AppError> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database with the schema applied (for testing).
pub async fn connect_in_memory() -> Result<Pool<Sqlite>, AppError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // every connection to :memory: is its own database, so keep exactly one alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Current time as unix seconds
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Unique violations on `companies` can only come from `company_email`.
pub(crate) fn map_company_write_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::DuplicateEmail,
        _ => AppError::Persistence(err),
    }
}
