use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::db::models::{CompanyIdentity, MachineAccess};
use crate::db::now;
use crate::error::AppError;

const IDENTITY_SELECT: &str = r#"
SELECT m.access_code, c.company_id AS id, c.company_name AS name, c.company_email AS email,
       c.first_name, c.last_name
FROM company_machines m
JOIN companies c ON c.company_id = m.company_id
"#;

pub struct MachineRepository;

impl MachineRepository {
    /// Grant `machine_id` access to a company until `valid_until`.
    ///
    /// An existing pairing keeps its access code and only has its expiry moved.
    pub async fn upsert(
        pool: &Pool<Sqlite>,
        machine_id: &str,
        company_id: i64,
        valid_until: i64,
    ) -> Result<MachineAccess, AppError> {
        let access = sqlx::query_as::<_, MachineAccess>(
            r#"
INSERT INTO company_machines (machine_id, company_id, access_code, valid_until)
VALUES (?, ?, ?, ?)
ON CONFLICT (machine_id, company_id) DO UPDATE SET valid_until = excluded.valid_until
RETURNING *
            "#,
        )
        .bind(machine_id)
        .bind(company_id)
        .bind(Uuid::new_v4().to_string())
        .bind(valid_until)
        .fetch_one(pool)
        .await?;

        Ok(access)
    }

    pub async fn find_by_access_code(
        pool: &Pool<Sqlite>,
        access_code: &str,
    ) -> Result<Option<CompanyIdentity>, AppError> {
        let identity = sqlx::query_as::<_, CompanyIdentity>(&format!(
            "{IDENTITY_SELECT} WHERE m.access_code = ? AND m.valid_until > ?"
        ))
        .bind(access_code)
        .bind(now())
        .fetch_optional(pool)
        .await?;

        Ok(identity)
    }

    /// A machine may be paired with several companies; the pairing that stays valid
    /// the longest wins.
    pub async fn find_by_machine_id(
        pool: &Pool<Sqlite>,
        machine_id: &str,
    ) -> Result<Option<CompanyIdentity>, AppError> {
        let identity = sqlx::query_as::<_, CompanyIdentity>(&format!(
            "{IDENTITY_SELECT} WHERE m.machine_id = ? AND m.valid_until > ? \
             ORDER BY m.valid_until DESC LIMIT 1"
        ))
        .bind(machine_id)
        .bind(now())
        .fetch_optional(pool)
        .await?;

        Ok(identity)
    }

    pub async fn delete_by_access_code(
        pool: &Pool<Sqlite>,
        access_code: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM company_machines WHERE access_code = ?")
            .bind(access_code)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_by_machine_id(
        pool: &Pool<Sqlite>,
        machine_id: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM company_machines WHERE machine_id = ?")
            .bind(machine_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn cleanup_expired(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM company_machines WHERE valid_until <= ?")
            .bind(now())
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
