use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers, Config};
use crate::handlers::{events, health_check, subscriptions, users};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:event_id",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/:event_id/subscriptions",
            post(subscriptions::subscribe).delete(subscriptions::unsubscribe),
        )
        .route("/users/:user_id/events", get(events::list_user_events))
        .with_state(state);

    with_security_headers(api, config.production)
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
