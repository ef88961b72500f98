use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::TokenKeys;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: Arc<TokenKeys>,
    pub bcrypt_cost: u32,
    pub default_event_capacity: i32,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            tokens: Arc::new(TokenKeys::new(&config.jwt_secret, config.token_ttl_secs)),
            bcrypt_cost: config.bcrypt_cost,
            default_event_capacity: config.default_event_capacity,
        }
    }
}
