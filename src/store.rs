//! Storage seam for the ticket desk.
//!
//! [`TicketStore`] is everything the desk needs from persistence. The
//! PostgreSQL implementation lives in [`crate::repository`]; [`InMemoryStore`]
//! backs tests and local development.

use std::collections::HashMap;

use async_graphql::MaybeUndefined;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Comment, NewComment, NewTicket, Role, Ticket, UpdateTicketInput, User, UserRef};
use crate::query::{TicketFilter, TicketSort};
use crate::{Result, TicketDeskError};

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Persist a new ticket with default status and no priority, assignee or skills.
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket>;

    async fn find_tickets(&self, filter: &TicketFilter, sort: &TicketSort) -> Result<Vec<Ticket>>;

    async fn update_ticket(&self, ticket_id: Uuid, input: &UpdateTicketInput) -> Result<Ticket>;

    /// Resolve user ids to id + email. Unknown ids are absent from the map.
    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserRef>>;

    async fn count_users_by_role(&self) -> Result<Vec<(Role, i64)>>;

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;

    /// Comments on a ticket, oldest first.
    async fn list_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>>;

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()>;

    async fn find_ticket(&self, filter: &TicketFilter) -> Result<Option<Ticket>> {
        Ok(self.find_tickets(filter, &TicketSort::default()).await?.into_iter().next())
    }
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    tickets: HashMap<Uuid, Ticket>,
    comments: HashMap<Uuid, Comment>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. Registration itself happens outside the desk.
    pub async fn insert_user(&self, email: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        };
        self.state.write().await.users.insert(user.id, user.clone());
        user
    }

    /// Insert a fully formed ticket, e.g. one with a backdated `created_at`.
    pub async fn seed_ticket(&self, ticket: Ticket) {
        self.state.write().await.tickets.insert(ticket.id, ticket);
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
        let ticket = Ticket {
            id: Uuid::new_v4(),
            title: ticket.title,
            description: ticket.description,
            status: Default::default(),
            priority: None,
            created_by: ticket.created_by,
            assigned_to: None,
            related_skills: Vec::new(),
            created_at: Utc::now(),
        };
        self.state.write().await.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn find_tickets(&self, filter: &TicketFilter, sort: &TicketSort) -> Result<Vec<Ticket>> {
        let state = self.state.read().await;
        let mut tickets: Vec<Ticket> = state.tickets.values().filter(|t| filter.matches(t)).cloned().collect();
        tickets.sort_by(|a, b| sort.compare(a, b));
        Ok(tickets)
    }

    async fn update_ticket(&self, ticket_id: Uuid, input: &UpdateTicketInput) -> Result<Ticket> {
        let mut state = self.state.write().await;
        let ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or(TicketDeskError::TicketNotFound(ticket_id))?;

        if let Some(status) = input.status {
            ticket.status = status;
        }
        match input.priority {
            MaybeUndefined::Undefined => {}
            MaybeUndefined::Null => ticket.priority = None,
            MaybeUndefined::Value(priority) => ticket.priority = Some(priority),
        }
        match input.assigned_to {
            MaybeUndefined::Undefined => {}
            MaybeUndefined::Null => ticket.assigned_to = None,
            MaybeUndefined::Value(assignee) => ticket.assigned_to = Some(assignee),
        }
        if let Some(skills) = &input.related_skills {
            ticket.related_skills = skills.clone();
        }
        Ok(ticket.clone())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserRef>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id))
            .map(|user| (user.id, UserRef::from(user)))
            .collect())
    }

    async fn count_users_by_role(&self) -> Result<Vec<(Role, i64)>> {
        let state = self.state.read().await;
        let mut counts: HashMap<Role, i64> = HashMap::new();
        for user in state.users.values() {
            *counts.entry(user.role).or_insert(0) += 1;
        }
        let mut counts: Vec<(Role, i64)> = counts.into_iter().collect();
        counts.sort();
        Ok(counts)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut state = self.state.write().await;
        if !state.tickets.contains_key(&comment.ticket_id) {
            return Err(TicketDeskError::TicketNotFound(comment.ticket_id));
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            ticket_id: comment.ticket_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: Utc::now(),
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&comment_id).cloned())
    }

    async fn list_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.ticket_id == ticket_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        self.state
            .write()
            .await
            .comments
            .remove(&comment_id)
            .map(|_| ())
            .ok_or(TicketDeskError::CommentNotFound(comment_id))
    }
}
