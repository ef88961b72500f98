use sqlx::error::ErrorKind;
use sqlx::PgExecutor;

use super::violation_kind;
use crate::models::user::{NewUser, User};
use crate::utils::error::{AppError, AppResult};

pub(crate) fn email_taken() -> AppError {
    AppError::Conflict("Email already exists".to_string())
}

#[tracing::instrument(skip(executor))]
pub async fn email_exists(executor: impl PgExecutor<'_>, email: &str) -> AppResult<bool> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(executor)
            .await?;
    Ok(exists)
}

#[tracing::instrument(skip(executor))]
pub async fn select_user_by_email(
    executor: impl PgExecutor<'_>,
    email: &str,
) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

/// Inserts a user with an already hashed password.
#[tracing::instrument(skip(executor, user, password_hash), fields(email = %user.email))]
pub async fn insert_user(
    executor: impl PgExecutor<'_>,
    user: &NewUser,
    password_hash: &str,
) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (forename, surname, email, gmail, password, avatar_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&user.forename)
    .bind(&user.surname)
    .bind(&user.email)
    .bind(&user.gmail)
    .bind(password_hash)
    .bind(&user.avatar_url)
    .fetch_one(executor)
    .await
    .map_err(|err| match violation_kind(&err) {
        // Lost a race with a concurrent registration.
        Some(ErrorKind::UniqueViolation) => email_taken(),
        _ => err.into(),
    })
}
