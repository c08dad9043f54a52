//! GraphQL API for the ticket desk
//!
//! Provides TicketQueries and TicketMutations that can be integrated
//! into any service's GraphQL schema.
//!
//! ## Usage in Services
//!
//! Services provide `Arc<TicketDesk>` as schema data and attach the verified
//! caller as an [`Identity`] to each request
//! (`Request::new(query).data(identity)`). Authorization is enforced by
//! the desk itself; resolvers never see unscoped data.
//!
//! Errors carry `code` (`BAD_REQUEST`, `NOT_FOUND`, `FORBIDDEN`,
//! `INTERNAL_SERVER_ERROR`) and `status` extensions. Internal failures are
//! logged here and reported with a generic message.

use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions, Object, Result as GraphQLResult};
use uuid::Uuid;

use crate::models::{
    AddCommentInput, AnalyticsView, CommentView, CreateTicketInput, DashboardAnalytics, Identity, TicketListParams,
    TicketView, UpdateTicketInput, UserStats,
};
use crate::service::TicketDesk;
use crate::{ErrorKind, TicketDeskError};

impl ErrorExtensions for TicketDeskError {
    fn extend(&self) -> async_graphql::Error {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "Ticket desk request failed");
                "Internal Server Error".to_string()
            }
            _ => self.to_string(),
        };

        async_graphql::Error::new(message).extend_with(|_, e| {
            e.set("code", kind.code());
            e.set("status", i32::from(kind.http_status()));
        })
    }
}

fn desk_and_caller<'a>(ctx: &'a Context<'_>) -> GraphQLResult<(&'a Arc<TicketDesk>, &'a Identity)> {
    let desk = ctx.data::<Arc<TicketDesk>>()?;
    let identity = ctx.data::<Identity>().map_err(|_| {
        async_graphql::Error::new("Authentication required").extend_with(|_, e| {
            e.set("code", "UNAUTHENTICATED");
            e.set("status", 401);
        })
    })?;
    Ok((desk, identity))
}

pub struct TicketQueries;

#[Object(name = "Query", extends)]
impl TicketQueries {
    /// List tickets visible to the caller, filtered and sorted
    async fn tickets(&self, ctx: &Context<'_>, params: Option<TicketListParams>) -> GraphQLResult<Vec<TicketView>> {
        let (desk, identity) = desk_and_caller(ctx)?;

        let params = params.unwrap_or_default();
        desk.list_tickets(identity, &params).await.map_err(|e| e.extend())
    }

    /// Get a single ticket. Tickets the caller cannot see are reported as not found
    async fn ticket(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<TicketView> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.get_ticket(identity, id).await.map_err(|e| e.extend())
    }

    /// Get comments for a ticket, oldest first
    async fn ticket_comments(&self, ctx: &Context<'_>, ticket_id: Uuid) -> GraphQLResult<Vec<CommentView>> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.list_comments(identity, ticket_id).await.map_err(|e| e.extend())
    }

    /// Corpus-wide dashboard metrics (moderators and admins only)
    async fn dashboard_analytics(&self, ctx: &Context<'_>) -> GraphQLResult<DashboardAnalytics> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.dashboard(identity).await.map_err(|e| e.extend())
    }

    /// Ticket stats for the caller's own tickets
    async fn user_stats(&self, ctx: &Context<'_>) -> GraphQLResult<UserStats> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.user_stats(identity).await.map_err(|e| e.extend())
    }

    /// Dashboard for staff, personal stats for everyone else
    async fn analytics(&self, ctx: &Context<'_>) -> GraphQLResult<AnalyticsView> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.analytics(identity).await.map_err(|e| e.extend())
    }
}

pub struct TicketMutations;

#[Object(name = "Mutation", extends)]
impl TicketMutations {
    /// Create a new ticket owned by the caller
    async fn create_ticket(&self, ctx: &Context<'_>, input: CreateTicketInput) -> GraphQLResult<TicketView> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.create_ticket(identity, input).await.map_err(|e| e.extend())
    }

    /// Update ticket triage fields (moderators and admins only)
    async fn update_ticket(&self, ctx: &Context<'_>, id: Uuid, input: UpdateTicketInput) -> GraphQLResult<TicketView> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.update_ticket(identity, id, &input).await.map_err(|e| e.extend())
    }

    /// Add a comment to a ticket the caller can read
    async fn add_comment(&self, ctx: &Context<'_>, input: AddCommentInput) -> GraphQLResult<CommentView> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.add_comment(identity, input).await.map_err(|e| e.extend())
    }

    /// Delete a comment (its author or an admin)
    async fn delete_comment(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<bool> {
        let (desk, identity) = desk_and_caller(ctx)?;

        desk.delete_comment(identity, id).await.map_err(|e| e.extend())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_details() {
        let err = TicketDeskError::Internal("connection refused to 10.0.0.3".to_string()).extend();
        assert_eq!(err.message, "Internal Server Error");

        let err = TicketDeskError::Forbidden.extend();
        assert_eq!(err.message, "Access denied");
        let extensions = err.extensions.expect("extensions set");
        assert_eq!(extensions.get("code"), Some(&async_graphql::Value::from("FORBIDDEN")));
        assert_eq!(extensions.get("status"), Some(&async_graphql::Value::from(403)));
    }
}
