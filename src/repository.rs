use std::collections::HashMap;

use async_graphql::MaybeUndefined;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::models::{Comment, NewComment, NewTicket, Role, Ticket, UpdateTicketInput, UserRef};
use crate::query::{SortOrder, TicketFilter, TicketSort};
use crate::store::TicketStore;
use crate::{Result, TicketDeskError};

const TICKET_COLUMNS: &str =
    "id, title, description, status, priority, created_by, assigned_to, related_skills, created_at";

const COMMENT_COLUMNS: &str = "id, ticket_id, author_id, content, created_at";

pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.url)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to ticket database: {}", e);
                TicketDeskError::Database(e)
            })?;

        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TicketDeskError::Database(e.into()))
    }
}

/// Append the WHERE clause for `filter` to a query selecting from `tickets`.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
    qb.push(" WHERE TRUE");

    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id);
    }

    if let Some(owner) = filter.created_by {
        qb.push(" AND created_by = ").push_bind(owner);
    }

    if let Some(search) = &filter.search {
        // strpos keeps the match literal, unlike LIKE patterns
        qb.push(" AND (strpos(lower(title), lower(")
            .push_bind(search.clone())
            .push(")) > 0 OR strpos(lower(description), lower(")
            .push_bind(search.clone())
            .push(")) > 0)");
    }

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }

    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
}

/// Split a nullable patch into (`should write`, `value`) bind parameters.
fn patch_binds<T: Copy>(patch: &MaybeUndefined<T>) -> (bool, Option<T>) {
    match patch {
        MaybeUndefined::Undefined => (false, None),
        MaybeUndefined::Null => (true, None),
        MaybeUndefined::Value(value) => (true, Some(*value)),
    }
}

fn push_sort(qb: &mut QueryBuilder<'_, Postgres>, sort: &TicketSort) {
    qb.push(" ORDER BY ").push(sort.field.column());
    match sort.order {
        SortOrder::Asc => qb.push(" ASC NULLS FIRST"),
        SortOrder::Desc => qb.push(" DESC NULLS LAST"),
    };
    qb.push(", id ASC");
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO tickets (title, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create ticket: {}", e);
            TicketDeskError::Database(e)
        })?;

        Ok(ticket)
    }

    async fn find_tickets(&self, filter: &TicketFilter, sort: &TicketSort) -> Result<Vec<Ticket>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TICKET_COLUMNS} FROM tickets"));
        push_filter(&mut qb, filter);
        push_sort(&mut qb, sort);

        let tickets = qb
            .build_query_as::<Ticket>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query tickets: {}", e);
                TicketDeskError::Database(e)
            })?;

        Ok(tickets)
    }

    async fn update_ticket(&self, ticket_id: Uuid, input: &UpdateTicketInput) -> Result<Ticket> {
        let (set_priority, priority) = patch_binds(&input.priority);
        let (set_assignee, assignee) = patch_binds(&input.assigned_to);

        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets SET
                status = COALESCE($2, status),
                priority = CASE WHEN $3 THEN $4 ELSE priority END,
                assigned_to = CASE WHEN $5 THEN $6 ELSE assigned_to END,
                related_skills = COALESCE($7, related_skills)
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket_id)
        .bind(input.status)
        .bind(set_priority)
        .bind(priority)
        .bind(set_assignee)
        .bind(assignee)
        .bind(&input.related_skills)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => TicketDeskError::TicketNotFound(ticket_id),
            _ => {
                tracing::error!("Failed to update ticket: {}", e);
                TicketDeskError::Database(e)
            }
        })?;

        Ok(ticket)
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserRef>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = sqlx::query_as::<_, UserRef>("SELECT id, email FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(TicketDeskError::Database)?;

        Ok(users.into_iter().map(|user| (user.id, user)).collect())
    }

    async fn count_users_by_role(&self) -> Result<Vec<(Role, i64)>> {
        let counts = sqlx::query_as::<_, (Role, i64)>(
            r#"
            SELECT role, COUNT(*)::BIGINT as count
            FROM users
            GROUP BY role
            ORDER BY role
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(TicketDeskError::Database)?;

        Ok(counts)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO ticket_comments (ticket_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(comment.ticket_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to add comment: {}", e);
            TicketDeskError::Database(e)
        })?;

        Ok(comment)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM ticket_comments WHERE id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(TicketDeskError::Database)?;

        Ok(comment)
    }

    async fn list_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM ticket_comments WHERE ticket_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(TicketDeskError::Database)?;

        Ok(comments)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM ticket_comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(TicketDeskError::Database)?;

        if result.rows_affected() == 0 {
            return Err(TicketDeskError::CommentNotFound(comment_id));
        }

        Ok(())
    }
}
