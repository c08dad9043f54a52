//! # pleme-ticket-desk
//!
//! Access-controlled support ticket desk for Pleme platform services.
//!
//! ## Features
//!
//! - **Scoped Ticket Queries** - Users see their own tickets, staff see everything
//! - **Role Projections** - Owners get a reduced view, staff get assignees populated
//! - **Comments** - Threaded on tickets, inheriting the ticket's access rule
//! - **Dashboard Analytics** - Status/priority breakdowns, 7-day trend, top skills
//! - **Triage Events** - Fire-and-forget "ticket created" event for async triage
//! - **GraphQL API** - Queries and mutations for the whole desk
//! - **Repository Pattern** - PostgreSQL data access layer behind `TicketStore`
//!
//! ## Usage
//!
//! ### In a Service
//!
//! ```rust,no_run
//! use pleme_ticket_desk::{ChannelPublisher, PgTicketStore, Settings, TicketDesk};
//! use std::sync::Arc;
//!
//! # async fn example() -> pleme_ticket_desk::Result<()> {
//! let settings = Settings::load()?;
//! let store = PgTicketStore::connect(&settings.database).await?;
//! store.migrate().await?;
//!
//! let (publisher, _events) = ChannelPublisher::new(settings.events.channel_capacity);
//! let desk = Arc::new(TicketDesk::new(Arc::new(store), Arc::new(publisher)));
//!
//! // Schema::build(TicketQueries, TicketMutations, EmptySubscription)
//! //     .data(desk)
//! //     .finish()
//! # Ok(())
//! # }
//! ```
//!
//! ### Models
//!
//! ```rust
//! use pleme_ticket_desk::{CreateTicketInput, Identity, Role};
//! use uuid::Uuid;
//!
//! let caller = Identity::new(Uuid::new_v4(), Role::User);
//! let input = CreateTicketInput {
//!     title: "Printer broken".to_string(),
//!     description: "Office printer jammed".to_string(),
//! };
//! assert!(!caller.is_staff());
//! ```

pub mod access;
pub mod analytics;
pub mod config;
pub mod events;
pub mod graphql;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use access::{AccessGuard, Action, AnalyticsRequest, Scope};
pub use crate::config::Settings;
pub use events::{ChannelPublisher, CreationEventEmitter, EventEnvelope, EventPublisher, TicketCreated};
pub use graphql::{TicketMutations, TicketQueries};
pub use models::*;
pub use repository::PgTicketStore;
pub use service::TicketDesk;
pub use store::{InMemoryStore, TicketStore};

use thiserror::Error;

/// Ticket desk errors
#[derive(Error, Debug)]
pub enum TicketDeskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ticket not found: {0}")]
    TicketNotFound(uuid::Uuid),

    #[error("Comment not found: {0}")]
    CommentNotFound(uuid::Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Access denied")]
    Forbidden,

    #[error("Event delivery failed: {0}")]
    EventDelivery(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-facing classification of a [`TicketDeskError`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "BAD_REQUEST",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::Internal => 500,
        }
    }
}

impl TicketDeskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TicketDeskError::Validation(_) => ErrorKind::Validation,
            TicketDeskError::TicketNotFound(_) | TicketDeskError::CommentNotFound(_) => ErrorKind::NotFound,
            TicketDeskError::Forbidden => ErrorKind::Forbidden,
            TicketDeskError::Database(_)
            | TicketDeskError::EventDelivery(_)
            | TicketDeskError::Config(_)
            | TicketDeskError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, TicketDeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_statuses() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(TicketDeskError::Validation("title".into()).kind().http_status(), 400);
        assert_eq!(TicketDeskError::TicketNotFound(id).kind().http_status(), 404);
        assert_eq!(TicketDeskError::CommentNotFound(id).kind().code(), "NOT_FOUND");
        assert_eq!(TicketDeskError::Forbidden.kind().http_status(), 403);
        assert_eq!(TicketDeskError::Database(sqlx::Error::RowNotFound).kind(), ErrorKind::Internal);
        assert_eq!(TicketDeskError::EventDelivery("closed".into()).kind().http_status(), 500);
    }
}
