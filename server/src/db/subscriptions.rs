use sqlx::error::ErrorKind;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::violation_kind;
use crate::models::Subscription;
use crate::utils::error::{AppError, AppResult};

#[tracing::instrument(skip(executor))]
pub async fn subscription_exists(
    executor: impl PgExecutor<'_>,
    event_id: Uuid,
    user_id: Uuid,
) -> AppResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM subscribed_events WHERE event_id = $1 AND user_id = $2)",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(exists)
}

#[tracing::instrument(skip(executor))]
pub async fn insert_subscription(
    executor: impl PgExecutor<'_>,
    event_id: Uuid,
    user_id: Uuid,
) -> AppResult<Subscription> {
    sqlx::query_as::<_, Subscription>(
        "INSERT INTO subscribed_events (user_id, event_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_one(executor)
    .await
    .map_err(|err| match violation_kind(&err) {
        Some(ErrorKind::UniqueViolation) => {
            AppError::Conflict("Already subscribed to this event".to_string())
        }
        Some(ErrorKind::ForeignKeyViolation) => AppError::NotFound("Event not found".to_string()),
        _ => err.into(),
    })
}

#[tracing::instrument(skip(executor))]
pub async fn delete_subscription(
    executor: impl PgExecutor<'_>,
    event_id: Uuid,
    user_id: Uuid,
) -> AppResult<Subscription> {
    sqlx::query_as::<_, Subscription>(
        "DELETE FROM subscribed_events WHERE user_id = $1 AND event_id = $2 RETURNING *",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))
}
