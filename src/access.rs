//! Access control for tickets, comments and analytics.
//!
//! Every entry point asks [`AccessGuard::authorize`] before touching storage.
//! The guard is purely decisional: it either returns the [`Scope`] the caller
//! may operate in, or [`TicketDeskError::Forbidden`]. Nothing is ever silently
//! filtered here; ownership narrowing of queries happens in
//! [`crate::query`] from the returned scope.

use uuid::Uuid;

use crate::models::{Identity, Role};
use crate::{Result, TicketDeskError};

/// Whether a caller is restricted to their own records or sees the corpus.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Scope {
    Own,
    All,
}

/// Which analytics view the caller is asking for.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AnalyticsRequest {
    /// Explicit corpus-wide dashboard. Staff only.
    Corpus,
    /// Caller's own tickets. Always allowed.
    Personal,
    /// Corpus for staff, personal for everyone else.
    Auto,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Action {
    ReadList,
    ReadOne,
    /// Writing under a ticket the caller can read (comments).
    Write,
    /// Deleting a record; the resource owner is the record's author.
    Delete,
    /// Staff mutation of ticket status, priority, assignee or skills.
    Triage,
    Analytics(AnalyticsRequest),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `identity` may perform `action`.
    ///
    /// `resource_owner` is the owning user of the record involved: the
    /// ticket creator for reads and writes, the comment author for deletes.
    /// Reads without an owner yield the scope the caller's queries must be
    /// narrowed to.
    pub fn authorize(&self, identity: &Identity, action: Action, resource_owner: Option<Uuid>) -> Result<Scope> {
        let decision = match action {
            Action::ReadList | Action::ReadOne | Action::Write => match resource_owner {
                _ if identity.is_staff() => Some(Scope::All),
                None => Some(Scope::Own),
                Some(owner) if owner == identity.user_id => Some(Scope::Own),
                Some(_) => None,
            },
            Action::Delete => match resource_owner {
                _ if identity.role == Role::Admin => Some(Scope::All),
                Some(owner) if owner == identity.user_id => Some(Scope::Own),
                _ => None,
            },
            Action::Triage => identity.is_staff().then_some(Scope::All),
            Action::Analytics(request) => match request {
                AnalyticsRequest::Personal => Some(Scope::Own),
                AnalyticsRequest::Auto if identity.is_staff() => Some(Scope::All),
                AnalyticsRequest::Auto => Some(Scope::Own),
                AnalyticsRequest::Corpus => identity.is_staff().then_some(Scope::All),
            },
        };

        decision.ok_or_else(|| {
            tracing::warn!(
                user_id = %identity.user_id,
                role = identity.role.as_str(),
                ?action,
                "Access denied"
            );
            TicketDeskError::Forbidden
        })
    }
}
