//! "Ticket created" event for the asynchronous triage worker.
//!
//! Emission happens after the ticket is persisted and never blocks or fails
//! the creation response. A failed publish, including one rejected by a full
//! channel, is logged and dropped; retries are the transport's business. Delivery is at-least-once from the worker's point
//! of view and no deduplication key is attached, so consumers must be
//! idempotent on `ticketId`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::Ticket;
use crate::{Result, TicketDeskError};

pub const TICKET_CREATED: &str = "ticket/created";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreated {
    pub ticket_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
}

impl From<&Ticket> for TicketCreated {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            created_by: ticket.created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub data: TicketCreated,
}

impl EventEnvelope {
    pub fn ticket_created(ticket: &Ticket) -> Self {
        Self {
            name: TICKET_CREATED.to_string(),
            occurred_at: Utc::now(),
            data: TicketCreated::from(ticket),
        }
    }
}

/// Transport that hands events to the downstream worker.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<()>;
}

/// Publishes onto a bounded in-process channel. The receiving half is owned
/// by whatever bridges events to the triage worker.
///
/// Publishing never waits for capacity: when the channel is full the event is
/// rejected with [`TicketDeskError::EventDelivery`] and the emitter logs it.
#[derive(Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<EventEnvelope>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<()> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => TicketDeskError::EventDelivery("event channel full".to_string()),
            TrySendError::Closed(_) => TicketDeskError::EventDelivery("event channel closed".to_string()),
        })
    }
}

#[derive(Clone)]
pub struct CreationEventEmitter {
    publisher: Arc<dyn EventPublisher>,
}

impl CreationEventEmitter {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Fire and forget. The returned handle only exists so callers that care
    /// (tests, graceful shutdown) can wait for the publish attempt; dropping
    /// it does not cancel anything.
    pub fn emit_ticket_created(&self, ticket: &Ticket) -> JoinHandle<()> {
        let publisher = Arc::clone(&self.publisher);
        let event = EventEnvelope::ticket_created(ticket);

        tokio::spawn(async move {
            let ticket_id = event.data.ticket_id;
            match publisher.publish(event).await {
                Ok(()) => tracing::debug!(%ticket_id, "Published ticket created event"),
                Err(e) => tracing::error!(%ticket_id, error = %e, "Failed to publish ticket created event"),
            }
        })
    }
}
