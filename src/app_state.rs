use sqlx::PgPool;

use crate::config;
use crate::events::EventSink;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub env: config::Config,
    pub events: EventSink,
}

impl AppState {
    pub fn new(db: PgPool, env: config::Config, events: EventSink) -> Self {
        Self { db, env, events }
    }
}
