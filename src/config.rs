//! Runtime settings.
//!
//! Defaults are overridden by environment variables prefixed `TICKET_DESK_`,
//! with `__` separating nested keys (`TICKET_DESK_DATABASE__URL`,
//! `TICKET_DESK_EVENTS__CHANNEL_CAPACITY`, `TICKET_DESK_LOG_FILTER`).

use config::{Config, Environment};
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub events: EventSettings,
    /// `tracing` env-filter directive, e.g. `info,pleme_ticket_desk=debug`
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    /// Buffered "ticket created" events before publishing waits for the consumer
    pub channel_capacity: usize,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(
            Environment::with_prefix("TICKET_DESK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    /// Load defaults layered under `env`.
    pub fn load_from(env: Environment) -> Result<Self> {
        let settings = Config::builder()
            .set_default("database.url", "postgres://localhost:5432/ticket_desk")?
            .set_default("database.max_connections", 10_i64)?
            .set_default("events.channel_capacity", 1024_i64)?
            .set_default("log_filter", "info")?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
