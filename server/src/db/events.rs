use sqlx::error::ErrorKind;
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::violation_kind;
use crate::models::event::{Event, EventFilters, EventPatch, EventQuery, ListedEvent, NewEvent};
use crate::utils::error::{AppError, AppResult};

fn event_not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

/// Appends the `WHERE` clause for `filters`.
///
/// The listing and the count both go through here, so a page total always
/// agrees with the rows that can be paged through.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &EventFilters) {
    builder.push(" WHERE 1=1");

    if let Some(start) = filters.start_date {
        builder.push(" AND date >= ").push_bind(start);
    }

    if let Some(latest) = filters.latest_date {
        builder.push(" AND date <= ").push_bind(latest);
    }

    if let Some(pattern) = filters.search_pattern() {
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR text ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR location ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Relevance rank: 1 title, 2 description, 3 location, 4 no match.
fn push_search_priority(builder: &mut QueryBuilder<'_, Postgres>, filters: &EventFilters) {
    match filters.search_pattern() {
        Some(pattern) => {
            builder
                .push("CASE WHEN title ILIKE ")
                .push_bind(pattern.clone())
                .push(" THEN 1 WHEN text ILIKE ")
                .push_bind(pattern.clone())
                .push(" THEN 2 WHEN location ILIKE ")
                .push_bind(pattern)
                .push(" THEN 3 ELSE 4 END");
        }
        // Nothing can match an absent search.
        None => {
            builder.push("4");
        }
    }
    builder.push(" AS search_priority");
}

pub fn build_list_query(query: &EventQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT *, ");
    push_search_priority(&mut builder, &query.filters);
    builder.push(" FROM events");
    push_filters(&mut builder, &query.filters);

    // Both fragments come from closed enums, never from the request.
    builder
        .push(" ORDER BY ")
        .push(query.sort_key.column())
        .push(" ")
        .push(query.sort_order.keyword())
        .push(", event_id ASC LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset());

    builder
}

pub fn build_count_query(filters: &EventFilters) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM events");
    push_filters(&mut builder, filters);
    builder
}

/// `None` when the patch carries no value to write.
pub fn build_update_query(
    event_id: Uuid,
    patch: EventPatch,
) -> Option<QueryBuilder<'static, Postgres>> {
    if patch.is_empty() {
        return None;
    }

    let mut builder = QueryBuilder::new("UPDATE events SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(title) = patch.title.into_value() {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(date) = patch.date.into_value() {
            set.push("date = ").push_bind_unseparated(date.into_inner());
        }
        if let Some(end_date) = patch.finish_date.into_value() {
            set.push("end_date = ")
                .push_bind_unseparated(end_date.into_inner());
        }
        if let Some(location) = patch.location.into_value() {
            set.push("location = ").push_bind_unseparated(location);
        }
        if let Some(description) = patch.description.into_value() {
            set.push("text = ").push_bind_unseparated(description);
        }
        if let Some(pictures) = patch.pictures.into_value() {
            set.push("pictures = ").push_bind_unseparated(pictures);
        }
        if let Some(fb_link) = patch.fb_event.into_value() {
            set.push("fb_link = ").push_bind_unseparated(fb_link);
        }
        if let Some(instagram) = patch.insta_link.into_value() {
            set.push("instagram = ").push_bind_unseparated(instagram);
        }
        if let Some(twitter_link) = patch.twitter_link.into_value() {
            set.push("twitter_link = ").push_bind_unseparated(twitter_link);
        }
        if let Some(calendar_event_id) = patch.calendar_event_id.into_value() {
            set.push("calendar_event_id = ")
                .push_bind_unseparated(calendar_event_id);
        }
    }
    builder
        .push(" WHERE event_id = ")
        .push_bind(event_id)
        .push(" RETURNING *");

    Some(builder)
}

#[tracing::instrument(skip(executor))]
pub async fn select_events(
    executor: impl PgExecutor<'_>,
    query: &EventQuery,
) -> AppResult<Vec<ListedEvent>> {
    let mut builder = build_list_query(query);
    let events = builder
        .build_query_as::<ListedEvent>()
        .fetch_all(executor)
        .await?;
    Ok(events)
}

#[tracing::instrument(skip(executor))]
pub async fn count_events(executor: impl PgExecutor<'_>, filters: &EventFilters) -> AppResult<i64> {
    let mut builder = build_count_query(filters);
    let total = builder
        .build_query_scalar::<i64>()
        .fetch_one(executor)
        .await?;
    Ok(total)
}

#[tracing::instrument(skip(executor))]
pub async fn select_event_by_id(
    executor: impl PgExecutor<'_>,
    event_id: Uuid,
) -> AppResult<Option<Event>> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE event_id = $1")
        .bind(event_id)
        .fetch_optional(executor)
        .await?;
    Ok(event)
}

/// Upcoming events `user_id` is subscribed to, soonest first.
#[tracing::instrument(skip(executor))]
pub async fn select_user_events(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
) -> AppResult<Vec<Event>> {
    let events = sqlx::query_as::<_, Event>(
        r#"
        SELECT e.*
        FROM subscribed_events se
        JOIN events e ON se.event_id = e.event_id
        WHERE se.user_id = $1
          AND e.date >= CURRENT_DATE
        ORDER BY e.date ASC, e.event_id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;
    Ok(events)
}

#[tracing::instrument(skip(executor, event), fields(title = %event.title))]
pub async fn insert_event(
    executor: impl PgExecutor<'_>,
    event: &NewEvent,
    capacity: i32,
) -> AppResult<Event> {
    sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (
            title, date, end_date, location, capacity, text, event_owner,
            pictures, fb_link, twitter_link, instagram, calendar_event_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(&event.title)
    .bind(event.date)
    .bind(event.end_date)
    .bind(&event.location)
    .bind(capacity)
    .bind(&event.description)
    .bind(event.owner)
    .bind(&event.pictures)
    .bind(&event.fb_link)
    .bind(&event.twitter_link)
    .bind(&event.instagram)
    .bind(&event.calendar_event_id)
    .fetch_one(executor)
    .await
    .map_err(|err| match violation_kind(&err) {
        Some(ErrorKind::ForeignKeyViolation) => {
            AppError::ValidationError("owner must reference an existing user".to_string())
        }
        _ => err.into(),
    })
}

/// Applies the values present in `patch`; absent and null fields are left alone.
#[tracing::instrument(skip(executor, patch))]
pub async fn update_event(
    executor: impl PgExecutor<'_>,
    event_id: Uuid,
    patch: EventPatch,
) -> AppResult<Event> {
    let Some(mut builder) = build_update_query(event_id, patch) else {
        return select_event_by_id(executor, event_id)
            .await?
            .ok_or_else(event_not_found);
    };

    builder
        .build_query_as::<Event>()
        .fetch_optional(executor)
        .await
        .map_err(|err| match violation_kind(&err) {
            Some(ErrorKind::CheckViolation) => {
                AppError::ValidationError("finishDate must not be before date".to_string())
            }
            _ => err.into(),
        })?
        .ok_or_else(event_not_found)
}

/// Deletes the event; its subscriptions go with it.
#[tracing::instrument(skip(executor))]
pub async fn delete_event(executor: impl PgExecutor<'_>, event_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM events WHERE event_id = $1")
        .bind(event_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(event_not_found());
    }
    Ok(())
}
