use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub forename: String,
    pub surname: String,
    pub email: String,
    pub gmail: Option<String>,
    #[serde(skip_serializing)]
    pub password: String,
    pub avatar_url: Option<String>,
    pub staff: bool,
}

/// Body of `POST /register`.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub forename: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub gmail: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub forename: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub gmail: Option<String>,
    pub avatar_url: Option<String>,
}

impl RegisterRequest {
    pub fn validate(self) -> AppResult<NewUser> {
        Ok(NewUser {
            forename: required("forename", self.forename)?,
            surname: required("surname", self.surname)?,
            email: required("email", self.email)?.trim().to_string(),
            password: required("password", self.password)?,
            gmail: self.gmail.filter(|g| !g.is_empty()),
            avatar_url: self.avatar_url.filter(|a| !a.is_empty()),
        })
    }
}

fn required(field: &str, value: Option<String>) -> AppResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::missing_field(field))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}
