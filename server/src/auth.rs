//! Password hashing, token issuance and the bearer-token extractor.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// Token payload: the public profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub forename: String,
    pub surname: String,
    pub email: String,
    pub gmail: Option<String>,
    pub avatar_url: Option<String>,
    pub staff: bool,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(&self, user: &User) -> AppResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            id: user.user_id,
            forename: user.forename.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
            gmail: user.gmail.clone(),
            avatar_url: user.avatar_url.clone(),
            staff: user.staff,
            iat: now,
            exp: now + self.ttl_secs,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(format!("token signing failed: {}", e)))
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::Forbidden("Invalid or expired token.".to_string())
            })
    }
}

pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::InternalServerError(format!("hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalServerError(format!("password hashing failed: {}", e)))
}

pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::InternalServerError(format!("hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalServerError(format!("password check failed: {}", e)))
}

/// The caller identified by `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn is_staff(&self) -> bool {
        self.0.staff
    }

    /// Only the owner of an event, or staff, may act on its behalf.
    pub fn ensure_can_manage(&self, owner: Uuid) -> AppResult<()> {
        if owner == self.id() || self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have permission to manage this event.".to_string(),
            ))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::AuthError("Access denied. No token provided.".to_string()))?;

        state.tokens.verify(token).map(AuthUser)
    }
}
