use axum::extract::State;
use axum::response::Response;

use crate::auth::{hash_password, verify_password};
use crate::db::users as store;
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::AppJson;
use crate::utils::response::{created, success};

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<Response> {
    let new_user = body.validate()?;

    if store::email_exists(&state.pool, &new_user.email).await? {
        return Err(store::email_taken());
    }

    let password_hash = hash_password(new_user.password.clone(), state.bcrypt_cost).await?;
    let user = store::insert_user(&state.pool, &new_user, &password_hash).await?;

    tracing::info!(user_id = %user.user_id, "User registered");
    Ok(created(user, "User registered successfully"))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Response> {
    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let user = store::select_user_by_email(&state.pool, body.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(body.password, user.password.clone()).await? {
        return Err(invalid());
    }

    let token = state.tokens.issue(&user)?;
    Ok(success(LoginResponse { token, user }, "Login successful"))
}
