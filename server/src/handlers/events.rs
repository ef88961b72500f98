use axum::extract::State;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::events as store;
use crate::models::event::{CreateEventRequest, Event, EventPage, EventPatch, ListEventsParams};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::{AppJson, AppPath, AppQuery};
use crate::utils::response::{created, empty_success, success};

/// GET /events
pub async fn list_events(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListEventsParams>,
) -> AppResult<Response> {
    let query = params.resolve()?;

    let events = store::select_events(&state.pool, &query).await?;
    let total = store::count_events(&state.pool, &query.filters).await?;

    Ok(success(
        EventPage::new(events, total, &query),
        "Events retrieved successfully",
    ))
}

/// GET /events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    AppPath(event_id): AppPath<Uuid>,
) -> AppResult<Response> {
    let event = find_event(&state, event_id).await?;
    Ok(success(event, "Event retrieved successfully"))
}

async fn find_event(state: &AppState, event_id: Uuid) -> AppResult<Event> {
    store::select_event_by_id(&state.pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

/// POST /events
pub async fn create_event(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(body): AppJson<CreateEventRequest>,
) -> AppResult<Response> {
    let new_event = body.validate(caller.id())?;
    caller.ensure_can_manage(new_event.owner)?;
    let event = store::insert_event(&state.pool, &new_event, state.default_event_capacity).await?;

    tracing::info!(event_id = %event.event_id, owner = %event.event_owner, "Event created");
    Ok(created(event, "Event created successfully"))
}

/// PATCH /events/:event_id
pub async fn update_event(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(event_id): AppPath<Uuid>,
    AppJson(patch): AppJson<EventPatch>,
) -> AppResult<Response> {
    patch.validate()?;
    let current = find_event(&state, event_id).await?;
    caller.ensure_can_manage(current.event_owner)?;

    let event = store::update_event(&state.pool, event_id, patch).await?;

    Ok(success(event, "Event updated successfully"))
}

/// DELETE /events/:event_id
pub async fn delete_event(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(event_id): AppPath<Uuid>,
) -> AppResult<Response> {
    let current = find_event(&state, event_id).await?;
    caller.ensure_can_manage(current.event_owner)?;

    store::delete_event(&state.pool, event_id).await?;

    tracing::info!(%event_id, "Event deleted");
    Ok(empty_success("Event deleted successfully"))
}

/// GET /users/:user_id/events
pub async fn list_user_events(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
) -> AppResult<Response> {
    let events = store::select_user_events(&state.pool, user_id).await?;
    Ok(success(events, "Subscribed events retrieved successfully"))
}
