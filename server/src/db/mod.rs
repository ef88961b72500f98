//! Data access for users, events and subscriptions.
//!
//! Every function takes any Postgres executor (pool, connection or
//! transaction) and runs a single statement. Only "not found" and constraint
//! violations with a client-facing meaning are translated; every other store
//! failure is returned as `AppError::DatabaseError` untouched.

pub mod events;
pub mod subscriptions;
pub mod users;

use sqlx::error::ErrorKind;

/// The constraint kind behind a failed statement, if any.
pub(crate) fn violation_kind(err: &sqlx::Error) -> Option<ErrorKind> {
    match err {
        sqlx::Error::Database(db_err) => Some(db_err.kind()),
        _ => None,
    }
}
