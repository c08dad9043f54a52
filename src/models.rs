use std::collections::BTreeMap;

use async_graphql::{Enum, InputObject, MaybeUndefined, SimpleObject, Union};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Enum, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Moderators and admins.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::User)
    }
}

/// Verified caller attached to every request by the authentication layer.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Reference to a user as exposed in populated fields (id + email only).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, FromRow, SimpleObject)]
pub struct UserRef {
    pub id: Uuid,
    pub email: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Enum, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Todo => "TODO",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::Done => "DONE",
        }
    }
}

#[derive(Debug, Clone, Copy, Enum, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
        }
    }
}

/// Full ticket record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Option<TicketPriority>,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub related_skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
}

/// Staff-side changes to a ticket. Omitted fields are left untouched;
/// `priority` and `assignedTo` may be set to null to clear them.
#[derive(Debug, Clone, Default, InputObject)]
pub struct UpdateTicketInput {
    pub status: Option<TicketStatus>,
    pub priority: MaybeUndefined<TicketPriority>,
    pub assigned_to: MaybeUndefined<Uuid>,
    pub related_skills: Option<Vec<String>>,
}

impl UpdateTicketInput {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_undefined()
            && self.assigned_to.is_undefined()
            && self.related_skills.is_none()
    }

    /// The user being assigned, if this update assigns someone.
    pub fn new_assignee(&self) -> Option<Uuid> {
        match self.assigned_to {
            MaybeUndefined::Value(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}

// Projected views

/// Ticket as seen by its (non-staff) owner.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct OwnTicketView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Option<TicketPriority>,
    pub created_at: DateTime<Utc>,
}

/// Full ticket as seen by staff, with the assignee populated.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct StaffTicketView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Option<TicketPriority>,
    pub created_by: Uuid,
    pub assigned_to: Option<UserRef>,
    pub related_skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Union)]
#[serde(untagged)]
pub enum TicketView {
    Staff(StaffTicketView),
    Own(OwnTicketView),
}

impl TicketView {
    pub fn id(&self) -> Uuid {
        match self {
            TicketView::Own(view) => view.id,
            TicketView::Staff(view) => view.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            TicketView::Own(view) => &view.title,
            TicketView::Staff(view) => &view.title,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author: Option<UserRef>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// Analytics structures

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct DailyTicketCount {
    /// UTC calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct SkillCount {
    pub skill: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub total_tickets: i64,
    pub tickets_by_status: BTreeMap<String, i64>,
    pub tickets_by_priority: BTreeMap<String, i64>,
    pub unassigned_tickets: i64,
    pub users_by_role: BTreeMap<String, i64>,
    pub recent_tickets: i64,
    pub tickets_per_day: Vec<DailyTicketCount>,
    pub top_skills: Vec<SkillCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_tickets: i64,
    pub tickets_by_status: BTreeMap<String, i64>,
}

/// Result of the role-branching analytics entry point.
#[derive(Debug, Clone, Serialize, Deserialize, Union)]
#[serde(untagged)]
pub enum AnalyticsView {
    Dashboard(DashboardAnalytics),
    Personal(UserStats),
}

// Input types

#[derive(Debug, Clone, Default, InputObject)]
pub struct CreateTicketInput {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, InputObject)]
pub struct AddCommentInput {
    pub ticket_id: Uuid,
    pub content: String,
}

/// Raw list parameters as supplied by the caller.
#[derive(Debug, Clone, Default, InputObject)]
pub struct TicketListParams {
    pub search: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}
