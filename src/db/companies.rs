use sqlx::{Pool, QueryBuilder, Sqlite};

use crate::db::models::{Company, CompanyUpdate, NewCompany};
use crate::db::{map_company_write_error, now};
use crate::error::AppError;

pub struct CompanyRepository;

impl CompanyRepository {
    pub async fn create(pool: &Pool<Sqlite>, company: NewCompany) -> Result<Company, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
INSERT INTO companies (company_name, company_email, verified, hashed_password, salt, first_name, last_name, created_at)
VALUES (?, ?, FALSE, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&company.company_name)
        .bind(&company.company_email)
        .bind(&company.hashed_password)
        .bind(&company.salt)
        .bind(&company.first_name)
        .bind(&company.last_name)
        .bind(now())
        .fetch_one(pool)
        .await
        .map_err(map_company_write_error)?;

        Ok(company)
    }

    pub async fn get_by_email(
        pool: &Pool<Sqlite>,
        email: &str,
    ) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE company_email = ?"
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }

    pub async fn get_by_id(
        pool: &Pool<Sqlite>,
        company_id: i64,
    ) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE company_id = ?"
        )
        .bind(company_id)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }

    pub async fn touch_last_login(pool: &Pool<Sqlite>, company_id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE companies SET last_login = ? WHERE company_id = ?")
            .bind(now())
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Apply the non-empty columns of `update` to one company.
    /// Returns `None` when no such company exists.
    pub async fn update(
        pool: &Pool<Sqlite>,
        company_id: i64,
        update: CompanyUpdate,
    ) -> Result<Option<Company>, AppError> {
        if update.is_empty() {
            return Self::get_by_id(pool, company_id).await;
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE companies SET ");
        let mut columns = query.separated(", ");
        if let Some(name) = update.company_name {
            columns.push("company_name = ").push_bind_unseparated(name);
        }
        if let Some(email) = update.company_email {
            columns.push("company_email = ").push_bind_unseparated(email);
        }
        if let Some(first_name) = update.first_name {
            columns.push("first_name = ").push_bind_unseparated(first_name);
        }
        if let Some(last_name) = update.last_name {
            columns.push("last_name = ").push_bind_unseparated(last_name);
        }
        if let Some((hashed_password, salt)) = update.credentials {
            columns.push("hashed_password = ").push_bind_unseparated(hashed_password);
            columns.push("salt = ").push_bind_unseparated(salt);
        }
        if let Some(verified) = update.verified {
            columns.push("verified = ").push_bind_unseparated(verified);
        }
        query
            .push(" WHERE company_id = ")
            .push_bind(company_id)
            .push(" RETURNING *");

        let company = query
            .build_query_as::<Company>()
            .fetch_optional(pool)
            .await
            .map_err(map_company_write_error)?;

        Ok(company)
    }
}
