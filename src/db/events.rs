use sqlx::{Pool, QueryBuilder, Sqlite};

use crate::db::models::{Event, EventPatch, NewEvent};
use crate::db::now;
use crate::error::AppError;

pub struct EventRepository;

impl EventRepository {
    pub async fn list_for_company(
        pool: &Pool<Sqlite>,
        company_id: i64,
    ) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE company_id = ? ORDER BY event_id"
        )
        .bind(company_id)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    pub async fn create(pool: &Pool<Sqlite>, event: NewEvent) -> Result<Event, AppError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
INSERT INTO events (company_id, event_name, start_time, end_time, short_description, long_description, prize, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(event.company_id)
        .bind(&event.event_name)
        .bind(&event.start_time)
        .bind(&event.end_time)
        .bind(&event.short_description)
        .bind(&event.long_description)
        .bind(event.prize)
        .bind(now())
        .fetch_one(pool)
        .await?;

        Ok(event)
    }

    pub async fn get_for_company(
        pool: &Pool<Sqlite>,
        event_id: i64,
        company_id: i64,
    ) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE event_id = ? AND company_id = ?"
        )
        .bind(event_id)
        .bind(company_id)
        .fetch_optional(pool)
        .await?;

        Ok(event)
    }

    /// Write the fields present in `patch` to an event owned by `company_id`.
    /// Returns `None` when the event does not exist or belongs to someone else.
    pub async fn update(
        pool: &Pool<Sqlite>,
        event_id: i64,
        company_id: i64,
        patch: EventPatch,
    ) -> Result<Option<Event>, AppError> {
        if patch.is_empty() {
            return Self::get_for_company(pool, event_id, company_id).await;
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE events SET ");
        let mut columns = query.separated(", ");
        if let Some(event_name) = patch.event_name {
            columns.push("event_name = ").push_bind_unseparated(event_name);
        }
        if let Some(start_time) = patch.start_time {
            columns.push("start_time = ").push_bind_unseparated(start_time);
        }
        if let Some(end_time) = patch.end_time {
            columns.push("end_time = ").push_bind_unseparated(end_time);
        }
        if let Some(short_description) = patch.short_description {
            columns.push("short_description = ").push_bind_unseparated(short_description);
        }
        if let Some(long_description) = patch.long_description {
            columns.push("long_description = ").push_bind_unseparated(long_description);
        }
        if let Some(prize) = patch.prize {
            columns.push("prize = ").push_bind_unseparated(prize);
        }
        query
            .push(" WHERE event_id = ")
            .push_bind(event_id)
            .push(" AND company_id = ")
            .push_bind(company_id)
            .push(" RETURNING *");

        let event = query.build_query_as::<Event>().fetch_optional(pool).await?;
        Ok(event)
    }
}
