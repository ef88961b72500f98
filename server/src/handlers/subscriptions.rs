use axum::extract::State;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::{events, subscriptions};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::AppPath;
use crate::utils::response::{created, success};

/// POST /events/:event_id/subscriptions
pub async fn subscribe(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(event_id): AppPath<Uuid>,
) -> AppResult<Response> {
    if events::select_event_by_id(&state.pool, event_id).await?.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    if subscriptions::subscription_exists(&state.pool, event_id, caller.id()).await? {
        return Err(AppError::Conflict(
            "Already subscribed to this event".to_string(),
        ));
    }

    let subscription = subscriptions::insert_subscription(&state.pool, event_id, caller.id()).await?;
    Ok(created(subscription, "Subscribed to event"))
}

/// DELETE /events/:event_id/subscriptions
pub async fn unsubscribe(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(event_id): AppPath<Uuid>,
) -> AppResult<Response> {
    let subscription = subscriptions::delete_subscription(&state.pool, event_id, caller.id()).await?;
    Ok(success(subscription, "Unsubscribed from event"))
}
