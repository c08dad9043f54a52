//! Ticket query composition.
//!
//! Turns caller-supplied list parameters plus the guard's [`Scope`] into a
//! backend-neutral [`TicketQuery`]: a filter, a sort and a projection. The
//! in-memory store evaluates it directly via [`TicketFilter::matches`] and
//! [`TicketSort::compare`]; the PostgreSQL repository translates it to SQL.

use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use crate::access::Scope;
use crate::models::{
    Identity, OwnTicketView, StaffTicketView, Ticket, TicketListParams, TicketPriority, TicketStatus, TicketView,
    UserRef,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    /// Case-insensitive substring matched against title or description.
    pub search: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

impl TicketFilter {
    /// Every ticket, or only those created by `owner`.
    pub fn owned_by(owner: Option<Uuid>) -> Self {
        Self {
            created_by: owner,
            ..Default::default()
        }
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.id.is_some_and(|id| id != ticket.id) {
            return false;
        }
        if self.created_by.is_some_and(|owner| owner != ticket.created_by) {
            return false;
        }
        if self.status.is_some_and(|status| status != ticket.status) {
            return false;
        }
        if self.priority.is_some() && self.priority != ticket.priority {
            return false;
        }
        match &self.search {
            Some(search) => {
                let needle = search.to_lowercase();
                ticket.title.to_lowercase().contains(&needle) || ticket.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SortField {
    #[default]
    CreatedAt,
    Title,
    Status,
    Priority,
}

impl SortField {
    /// Parse a caller-supplied field name. Unknown names fall back to
    /// `createdAt` instead of failing.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "createdAt" | "created_at" => SortField::CreatedAt,
            "title" => SortField::Title,
            "status" => SortField::Status,
            "priority" => SortField::Priority,
            other => {
                tracing::debug!(sort_by = other, "Unknown sort field, using createdAt");
                SortField::CreatedAt
            }
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Anything other than `asc` sorts descending.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct TicketSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl TicketSort {
    /// Order two tickets. Enums order by declaration (TODO before DONE, low
    /// before high) and missing priorities sort before present ones in
    /// ascending order; ties break on id ascending regardless of direction.
    pub fn compare(&self, a: &Ticket, b: &Ticket) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Status => a.status.cmp(&b.status),
            SortField::Priority => a.priority.cmp(&b.priority),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Shape of the records returned for a scope.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Projection {
    /// title, description, status, priority, createdAt
    Owner,
    /// Full record with the assignee populated.
    Staff,
}

impl Projection {
    pub fn for_scope(scope: Scope) -> Self {
        match scope {
            Scope::Own => Projection::Owner,
            Scope::All => Projection::Staff,
        }
    }

    /// Project a ticket. `users` resolves assignee ids for the staff view;
    /// an assignee missing from it is rendered as `None`.
    pub fn apply(&self, ticket: Ticket, users: &HashMap<Uuid, UserRef>) -> TicketView {
        match self {
            Projection::Owner => TicketView::Own(OwnTicketView {
                id: ticket.id,
                title: ticket.title,
                description: ticket.description,
                status: ticket.status,
                priority: ticket.priority,
                created_at: ticket.created_at,
            }),
            Projection::Staff => TicketView::Staff(StaffTicketView {
                id: ticket.id,
                assigned_to: ticket.assigned_to.and_then(|id| users.get(&id).cloned()),
                title: ticket.title,
                description: ticket.description,
                status: ticket.status,
                priority: ticket.priority,
                created_by: ticket.created_by,
                related_skills: ticket.related_skills,
                created_at: ticket.created_at,
            }),
        }
    }

    pub fn needs_assignees(&self) -> bool {
        matches!(self, Projection::Staff)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketQuery {
    pub filter: TicketFilter,
    pub sort: TicketSort,
    pub projection: Projection,
}

impl TicketQuery {
    /// Compose a list query for `identity` within the guard-granted `scope`.
    pub fn list(identity: &Identity, scope: Scope, params: &TicketListParams) -> Self {
        let search = params
            .search
            .as_deref()
            .filter(|search| !search.is_empty())
            .map(str::to_string);

        Self {
            filter: TicketFilter {
                id: None,
                created_by: owner_constraint(identity, scope),
                search,
                status: params.status,
                priority: params.priority,
            },
            sort: TicketSort {
                field: params.sort_by.as_deref().map(SortField::parse).unwrap_or_default(),
                order: params.order.as_deref().map(SortOrder::parse).unwrap_or_default(),
            },
            projection: Projection::for_scope(scope),
        }
    }

    /// Compose a single-ticket fetch. Under `Own` scope a ticket owned by
    /// someone else simply does not match.
    pub fn single(identity: &Identity, scope: Scope, ticket_id: Uuid) -> Self {
        Self {
            filter: TicketFilter {
                id: Some(ticket_id),
                created_by: owner_constraint(identity, scope),
                ..Default::default()
            },
            sort: TicketSort::default(),
            projection: Projection::for_scope(scope),
        }
    }
}

fn owner_constraint(identity: &Identity, scope: Scope) -> Option<Uuid> {
    match scope {
        Scope::Own => Some(identity.user_id),
        Scope::All => None,
    }
}
