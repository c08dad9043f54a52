//! Boundary operations of the ticket desk.
//!
//! Every operation takes the caller's [`Identity`] explicitly, asks the
//! [`AccessGuard`] for a scope, and only then touches the store. Results are
//! projected for the caller's role before they leave this module.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::access::{AccessGuard, Action, AnalyticsRequest, Scope};
use crate::analytics;
use crate::events::{CreationEventEmitter, EventPublisher};
use crate::models::{
    AddCommentInput, AnalyticsView, Comment, CommentView, CreateTicketInput, DashboardAnalytics, Identity,
    NewComment, NewTicket, Ticket, TicketListParams, TicketView, UpdateTicketInput, UserRef, UserStats,
};
use crate::query::{Projection, TicketFilter, TicketQuery, TicketSort};
use crate::store::TicketStore;
use crate::{Result, TicketDeskError};

pub struct TicketDesk {
    store: Arc<dyn TicketStore>,
    events: CreationEventEmitter,
    guard: AccessGuard,
}

impl TicketDesk {
    pub fn new(store: Arc<dyn TicketStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            events: CreationEventEmitter::new(publisher),
            guard: AccessGuard::new(),
        }
    }

    /// Create a ticket owned by the caller and hand it to triage.
    pub async fn create_ticket(&self, identity: &Identity, input: CreateTicketInput) -> Result<TicketView> {
        required(&input.title, "title")?;
        required(&input.description, "description")?;

        let ticket = self
            .store
            .insert_ticket(NewTicket {
                title: input.title,
                description: input.description,
                created_by: identity.user_id,
            })
            .await?;

        tracing::info!(ticket_id = %ticket.id, created_by = %identity.user_id, "Ticket created");

        // persisted before the event goes out; the response never waits on it
        self.events.emit_ticket_created(&ticket);

        let scope = self.guard.authorize(identity, Action::ReadOne, Some(ticket.created_by))?;
        self.project(Projection::for_scope(scope), vec![ticket])
            .await?
            .pop()
            .ok_or_else(|| TicketDeskError::Internal("created ticket lost during projection".to_string()))
    }

    pub async fn list_tickets(&self, identity: &Identity, params: &TicketListParams) -> Result<Vec<TicketView>> {
        let scope = self.guard.authorize(identity, Action::ReadList, None)?;
        let query = TicketQuery::list(identity, scope, params);

        let tickets = self.store.find_tickets(&query.filter, &query.sort).await?;
        self.project(query.projection, tickets).await
    }

    /// Fetch one ticket. A ticket the caller may not see is reported exactly
    /// like a missing one.
    pub async fn get_ticket(&self, identity: &Identity, ticket_id: Uuid) -> Result<TicketView> {
        let scope = self.guard.authorize(identity, Action::ReadOne, None)?;
        let query = TicketQuery::single(identity, scope, ticket_id);

        let ticket = self
            .store
            .find_ticket(&query.filter)
            .await?
            .ok_or(TicketDeskError::TicketNotFound(ticket_id))?;

        self.project(query.projection, vec![ticket])
            .await?
            .pop()
            .ok_or(TicketDeskError::TicketNotFound(ticket_id))
    }

    /// Staff triage: status, priority, assignee, skills.
    pub async fn update_ticket(
        &self,
        identity: &Identity,
        ticket_id: Uuid,
        input: &UpdateTicketInput,
    ) -> Result<TicketView> {
        let scope = self.guard.authorize(identity, Action::Triage, None)?;
        if input.is_empty() {
            return Err(TicketDeskError::Validation("No ticket fields to update".to_string()));
        }
        if let Some(assignee) = input.new_assignee() {
            if !self.store.find_users(&[assignee]).await?.contains_key(&assignee) {
                return Err(TicketDeskError::Validation(format!("Unknown assignee: {assignee}")));
            }
        }

        let ticket = self.store.update_ticket(ticket_id, input).await?;
        tracing::info!(%ticket_id, updated_by = %identity.user_id, "Ticket updated");

        self.project(Projection::for_scope(scope), vec![ticket])
            .await?
            .pop()
            .ok_or(TicketDeskError::TicketNotFound(ticket_id))
    }

    pub async fn add_comment(&self, identity: &Identity, input: AddCommentInput) -> Result<CommentView> {
        if input.content.trim().is_empty() {
            return Err(TicketDeskError::Validation("Comment content is required".to_string()));
        }

        let ticket = self.parent_ticket(input.ticket_id).await?;
        self.guard.authorize(identity, Action::Write, Some(ticket.created_by))?;

        let comment = self
            .store
            .insert_comment(NewComment {
                ticket_id: ticket.id,
                author_id: identity.user_id,
                content: input.content,
            })
            .await?;

        self.populate_authors(vec![comment])
            .await?
            .pop()
            .ok_or_else(|| TicketDeskError::Internal("created comment lost during projection".to_string()))
    }

    /// Comments on a ticket, oldest first.
    pub async fn list_comments(&self, identity: &Identity, ticket_id: Uuid) -> Result<Vec<CommentView>> {
        let ticket = self.parent_ticket(ticket_id).await?;
        self.guard.authorize(identity, Action::ReadList, Some(ticket.created_by))?;

        let comments = self.store.list_comments(ticket.id).await?;
        self.populate_authors(comments).await
    }

    pub async fn delete_comment(&self, identity: &Identity, comment_id: Uuid) -> Result<()> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or(TicketDeskError::CommentNotFound(comment_id))?;

        self.guard.authorize(identity, Action::Delete, Some(comment.author_id))?;

        self.store.delete_comment(comment_id).await?;
        tracing::info!(%comment_id, deleted_by = %identity.user_id, "Comment deleted");
        Ok(())
    }

    /// Corpus-wide dashboard. Staff only.
    pub async fn dashboard(&self, identity: &Identity) -> Result<DashboardAnalytics> {
        self.guard
            .authorize(identity, Action::Analytics(AnalyticsRequest::Corpus), None)?;
        self.compute_dashboard().await
    }

    /// Stats over the caller's own tickets.
    pub async fn user_stats(&self, identity: &Identity) -> Result<UserStats> {
        self.guard
            .authorize(identity, Action::Analytics(AnalyticsRequest::Personal), None)?;
        self.compute_user_stats(identity).await
    }

    /// Dashboard for staff, personal stats for everyone else.
    pub async fn analytics(&self, identity: &Identity) -> Result<AnalyticsView> {
        match self
            .guard
            .authorize(identity, Action::Analytics(AnalyticsRequest::Auto), None)?
        {
            Scope::All => Ok(AnalyticsView::Dashboard(self.compute_dashboard().await?)),
            Scope::Own => Ok(AnalyticsView::Personal(self.compute_user_stats(identity).await?)),
        }
    }

    async fn compute_dashboard(&self) -> Result<DashboardAnalytics> {
        let tickets = self
            .store
            .find_tickets(&TicketFilter::default(), &TicketSort::default())
            .await?;
        let users_by_role = self.store.count_users_by_role().await?;

        Ok(analytics::compute_dashboard(&tickets, &users_by_role, Utc::now()))
    }

    async fn compute_user_stats(&self, identity: &Identity) -> Result<UserStats> {
        let tickets = self
            .store
            .find_tickets(&TicketFilter::owned_by(Some(identity.user_id)), &TicketSort::default())
            .await?;

        Ok(analytics::compute_user_stats(&tickets, identity.user_id))
    }

    async fn parent_ticket(&self, ticket_id: Uuid) -> Result<Ticket> {
        let filter = TicketFilter {
            id: Some(ticket_id),
            ..Default::default()
        };
        self.store
            .find_ticket(&filter)
            .await?
            .ok_or(TicketDeskError::TicketNotFound(ticket_id))
    }

    async fn project(&self, projection: Projection, tickets: Vec<Ticket>) -> Result<Vec<TicketView>> {
        let users = if projection.needs_assignees() {
            let mut assignees: Vec<Uuid> = tickets.iter().filter_map(|t| t.assigned_to).collect();
            assignees.sort();
            assignees.dedup();
            self.store.find_users(&assignees).await?
        } else {
            HashMap::new()
        };

        Ok(tickets
            .into_iter()
            .map(|ticket| projection.apply(ticket, &users))
            .collect())
    }

    async fn populate_authors(&self, comments: Vec<Comment>) -> Result<Vec<CommentView>> {
        let mut authors: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
        authors.sort();
        authors.dedup();
        let users: HashMap<Uuid, UserRef> = self.store.find_users(&authors).await?;

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                id: comment.id,
                ticket_id: comment.ticket_id,
                author: users.get(&comment.author_id).cloned(),
                content: comment.content,
                created_at: comment.created_at,
            })
            .collect())
    }
}

/// Blank or whitespace-only text is missing. Accepted text is stored as given.
fn required(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TicketDeskError::Validation(format!("{field} is required")));
    }
    Ok(())
}
