use sqlx::types::Json;
use sqlx::{Pool, Sqlite};

use crate::db::models::{NewSubmission, Submission, SubmissionWithEvent};
use crate::db::now;
use crate::error::AppError;

pub struct SubmissionRepository;

impl SubmissionRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        submission: NewSubmission,
    ) -> Result<Submission, AppError> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
INSERT INTO submissions (event_id, user_id, project_name, project_description, project_link,
                         project_video_link, resume_link, additional_links, submission_time)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(submission.event_id)
        .bind(submission.user_id)
        .bind(&submission.project_name)
        .bind(&submission.project_description)
        .bind(&submission.project_link)
        .bind(&submission.project_video_link)
        .bind(&submission.resume_link)
        .bind(submission.additional_links.map(Json))
        .bind(now())
        .fetch_one(pool)
        .await?;

        Ok(submission)
    }

    /// Submissions for `event_id`, but only if that event is owned by `company_id`.
    pub async fn list_for_event(
        pool: &Pool<Sqlite>,
        event_id: i64,
        company_id: i64,
    ) -> Result<Vec<SubmissionWithEvent>, AppError> {
        let submissions = sqlx::query_as::<_, SubmissionWithEvent>(
            r#"
SELECT s.*, e.event_name, e.company_id
FROM submissions s
INNER JOIN events e ON e.event_id = s.event_id
WHERE e.event_id = ? AND e.company_id = ?
ORDER BY s.submission_id
            "#,
        )
        .bind(event_id)
        .bind(company_id)
        .fetch_all(pool)
        .await?;

        Ok(submissions)
    }

    /// Delete one submission made to an event owned by `company_id`.
    pub async fn delete_owned(
        pool: &Pool<Sqlite>,
        submission_id: i64,
        company_id: i64,
    ) -> Result<Option<Submission>, AppError> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
DELETE FROM submissions
WHERE submission_id = ?
  AND event_id IN (SELECT event_id FROM events WHERE company_id = ?)
RETURNING *
            "#,
        )
        .bind(submission_id)
        .bind(company_id)
        .fetch_optional(pool)
        .await?;

        Ok(submission)
    }
}
