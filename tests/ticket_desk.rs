use std::sync::Arc;

use async_graphql::{EmptySubscription, Request, Schema, Value};
use chrono::{Duration, Utc};
use pleme_ticket_desk::{
    ChannelPublisher, CreateTicketInput, EventEnvelope, Identity, InMemoryStore, Role, Ticket, TicketDesk, TicketDeskError,
    TicketListParams, TicketMutations, TicketQueries, TicketStatus, TicketView,
};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

type DeskSchema = Schema<TicketQueries, TicketMutations, EmptySubscription>;

struct Harness {
    store: Arc<InMemoryStore>,
    desk: Arc<TicketDesk>,
    schema: DeskSchema,
    _events: mpsc::Receiver<EventEnvelope>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let (publisher, events) = ChannelPublisher::new(64);
        let desk = Arc::new(TicketDesk::new(store.clone(), Arc::new(publisher)));
        let schema = Schema::build(TicketQueries, TicketMutations, EmptySubscription)
            .data(desk.clone())
            .finish();
        Self {
            store,
            desk,
            schema,
            _events: events,
        }
    }

    async fn identity(&self, email: &str, role: Role) -> Identity {
        let user = self.store.insert_user(email, role).await;
        Identity::new(user.id, role)
    }

    async fn run(&self, identity: Identity, query: &str) -> async_graphql::Response {
        self.schema.execute(Request::new(query).data(identity)).await
    }
}

fn error_code(response: &async_graphql::Response) -> Option<Value> {
    response
        .errors
        .first()
        .and_then(|e| e.extensions.as_ref())
        .and_then(|ext| ext.get("code").cloned())
}

const LIST_TICKETS: &str = r#"
    {
        tickets {
            __typename
            ... on OwnTicketView { id title status priority }
            ... on StaffTicketView { id title status priority assignedTo { id email } }
        }
    }
"#;

#[tokio::test]
async fn printer_ticket_is_scoped_per_caller() {
    let harness = Harness::new();
    let u1 = harness.identity("u1@pleme.io", Role::User).await;
    let u2 = harness.identity("u2@pleme.io", Role::User).await;
    let moderator = harness.identity("mod@pleme.io", Role::Moderator).await;

    let created = harness
        .run(
            u1,
            r#"mutation {
                createTicket(input: { title: "Printer broken", description: "Office printer jammed" }) {
                    ... on OwnTicketView { id status }
                }
            }"#,
        )
        .await;
    assert!(created.errors.is_empty(), "{:?}", created.errors);

    let own = harness.run(u1, LIST_TICKETS).await.data.into_json().unwrap();
    assert_eq!(
        own["tickets"],
        json!([{
            "__typename": "OwnTicketView",
            "id": own["tickets"][0]["id"],
            "title": "Printer broken",
            "status": "TODO",
            "priority": null,
        }])
    );

    let other = harness.run(u2, LIST_TICKETS).await.data.into_json().unwrap();
    assert_eq!(other["tickets"], json!([]));

    let staff = harness.run(moderator, LIST_TICKETS).await.data.into_json().unwrap();
    assert_eq!(staff["tickets"][0]["__typename"], "StaffTicketView");
    assert_eq!(staff["tickets"][0]["assignedTo"], json!(null));
    assert_eq!(staff["tickets"][0]["title"], "Printer broken");
}

#[tokio::test]
async fn foreign_ticket_reads_as_not_found() {
    let harness = Harness::new();
    let owner = harness.identity("u1@pleme.io", Role::User).await;
    let stranger = harness.identity("u2@pleme.io", Role::User).await;

    let ticket = harness
        .desk
        .create_ticket(&owner, CreateTicketInput {
            title: "VPN".to_string(),
            description: "Cannot connect".to_string(),
        })
        .await
        .unwrap();

    let response = harness
        .run(stranger, &format!(r#"{{ ticket(id: "{}") {{ __typename }} }}"#, ticket.id()))
        .await;
    assert_eq!(error_code(&response), Some(Value::from("NOT_FOUND")));
}

#[tokio::test]
async fn missing_fields_are_rejected_as_bad_request() {
    let harness = Harness::new();
    let caller = harness.identity("u1@pleme.io", Role::User).await;

    let response = harness
        .run(
            caller,
            r#"mutation { createTicket(input: { title: "", description: "x" }) { __typename } }"#,
        )
        .await;
    assert_eq!(error_code(&response), Some(Value::from("BAD_REQUEST")));
}

#[tokio::test]
async fn search_matches_title_or_description_within_scope() {
    let harness = Harness::new();
    let owner = harness.identity("u1@pleme.io", Role::User).await;
    let other = harness.identity("u2@pleme.io", Role::User).await;

    for (caller, title, description) in [
        (&owner, "Foo bar", "first"),
        (&owner, "Second", "contains FOO inside"),
        (&owner, "Third", "nothing here"),
        (&other, "foo for someone else", "x"),
    ] {
        harness
            .desk
            .create_ticket(caller, CreateTicketInput {
                title: title.to_string(),
                description: description.to_string(),
            })
            .await
            .unwrap();
    }

    let params = TicketListParams {
        search: Some("foo".to_string()),
        sort_by: Some("title".to_string()),
        order: Some("asc".to_string()),
        ..Default::default()
    };
    let titles: Vec<String> = harness
        .desk
        .list_tickets(&owner, &params)
        .await
        .unwrap()
        .iter()
        .map(|t| t.title().to_string())
        .collect();
    assert_eq!(titles, vec!["Foo bar", "Second"]);
}

#[tokio::test]
async fn status_filter_is_exact() {
    let harness = Harness::new();
    let owner = harness.identity("u1@pleme.io", Role::User).await;
    let admin = harness.identity("admin@pleme.io", Role::Admin).await;

    let first = harness
        .desk
        .create_ticket(&owner, CreateTicketInput { title: "a".into(), description: "a".into() })
        .await
        .unwrap();
    harness
        .desk
        .create_ticket(&owner, CreateTicketInput { title: "b".into(), description: "b".into() })
        .await
        .unwrap();
    harness
        .desk
        .update_ticket(&admin, first.id(), &pleme_ticket_desk::UpdateTicketInput {
            status: Some(TicketStatus::Done),
            ..Default::default()
        })
        .await
        .unwrap();

    let params = TicketListParams {
        status: Some(TicketStatus::Done),
        ..Default::default()
    };
    let done = harness.desk.list_tickets(&owner, &params).await.unwrap();
    assert_eq!(done.len(), 1);
    assert!(matches!(&done[0], TicketView::Own(view) if view.id == first.id()));
}

fn seeded_ticket(status: TicketStatus, assigned: bool, age: Duration) -> Ticket {
    Ticket {
        id: Uuid::new_v4(),
        title: "seeded".to_string(),
        description: "seeded".to_string(),
        status,
        priority: None,
        created_by: Uuid::new_v4(),
        assigned_to: assigned.then(Uuid::new_v4),
        related_skills: vec!["networking".to_string()],
        created_at: Utc::now() - age,
    }
}

#[tokio::test]
async fn dashboard_reports_corpus_metrics_to_staff() {
    let harness = Harness::new();
    let admin = harness.identity("admin@pleme.io", Role::Admin).await;
    let user = harness.identity("u1@pleme.io", Role::User).await;

    for i in 0..10 {
        let status = if i < 3 { TicketStatus::Done } else { TicketStatus::Todo };
        let assigned = i >= 2;
        harness.store.seed_ticket(seeded_ticket(status, assigned, Duration::days(30))).await;
    }

    let response = harness
        .run(
            admin,
            r#"{ dashboardAnalytics { totalTickets ticketsByStatus unassignedTickets recentTickets topSkills { skill count } } }"#,
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let data = response.data.into_json().unwrap();
    let dashboard = &data["dashboardAnalytics"];
    assert_eq!(dashboard["totalTickets"], 10);
    assert_eq!(dashboard["ticketsByStatus"], json!({ "DONE": 3, "TODO": 7 }));
    assert_eq!(dashboard["unassignedTickets"], 2);
    assert_eq!(dashboard["recentTickets"], 0);
    assert_eq!(dashboard["topSkills"], json!([{ "skill": "networking", "count": 10 }]));

    let denied = harness.run(user, "{ dashboardAnalytics { totalTickets } }").await;
    assert_eq!(error_code(&denied), Some(Value::from("FORBIDDEN")));
}

#[tokio::test]
async fn recent_metrics_cover_only_trailing_week() {
    let harness = Harness::new();
    let admin = harness.identity("admin@pleme.io", Role::Admin).await;

    harness.store.seed_ticket(seeded_ticket(TicketStatus::Todo, false, Duration::hours(1))).await;
    harness.store.seed_ticket(seeded_ticket(TicketStatus::Todo, false, Duration::days(2))).await;
    harness.store.seed_ticket(seeded_ticket(TicketStatus::Todo, false, Duration::days(8))).await;

    let dashboard = harness.desk.dashboard(&admin).await.unwrap();
    assert_eq!(dashboard.recent_tickets, 2);

    let days: Vec<&str> = dashboard.tickets_per_day.iter().map(|d| d.date.as_str()).collect();
    let mut sorted = days.clone();
    sorted.sort();
    assert_eq!(days, sorted);
    assert_eq!(dashboard.tickets_per_day.iter().map(|d| d.count).sum::<i64>(), 2);
    assert_eq!(dashboard.tickets_by_status.values().sum::<i64>(), dashboard.total_tickets);
}

#[tokio::test]
async fn analytics_entry_point_never_forbids() {
    let harness = Harness::new();
    let user = harness.identity("u1@pleme.io", Role::User).await;
    let moderator = harness.identity("mod@pleme.io", Role::Moderator).await;
    harness
        .desk
        .create_ticket(&user, CreateTicketInput { title: "a".into(), description: "b".into() })
        .await
        .unwrap();

    let query = r#"{ analytics { __typename ... on UserStats { totalTickets ticketsByStatus } } }"#;
    let personal = harness.run(user, query).await.data.into_json().unwrap();
    assert_eq!(personal["analytics"]["__typename"], "UserStats");
    assert_eq!(personal["analytics"]["totalTickets"], 1);
    assert_eq!(personal["analytics"]["ticketsByStatus"], json!({ "TODO": 1 }));

    let staff = harness.run(moderator, query).await.data.into_json().unwrap();
    assert_eq!(staff["analytics"]["__typename"], "DashboardAnalytics");
}

#[tokio::test]
async fn comment_survives_unauthorized_delete() {
    let harness = Harness::new();
    let owner = harness.identity("u1@pleme.io", Role::User).await;
    let moderator = harness.identity("mod@pleme.io", Role::Moderator).await;

    let ticket = harness
        .desk
        .create_ticket(&owner, CreateTicketInput { title: "a".into(), description: "b".into() })
        .await
        .unwrap();
    let comment = harness
        .desk
        .add_comment(&owner, pleme_ticket_desk::AddCommentInput {
            ticket_id: ticket.id(),
            content: "please help".to_string(),
        })
        .await
        .unwrap();

    let result = harness.desk.delete_comment(&moderator, comment.id).await;
    assert!(matches!(result, Err(TicketDeskError::Forbidden)));

    let comments = harness.desk.list_comments(&owner, ticket.id()).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, comment.id);
}

#[tokio::test]
async fn explicit_null_unassigns_over_graphql() {
    let harness = Harness::new();
    let owner = harness.identity("u1@pleme.io", Role::User).await;
    let admin = harness.identity("admin@pleme.io", Role::Admin).await;
    let ticket = harness
        .desk
        .create_ticket(&owner, CreateTicketInput { title: "a".into(), description: "b".into() })
        .await
        .unwrap();

    let assign = format!(
        r#"mutation {{ updateTicket(id: "{}", input: {{ assignedTo: "{}", priority: HIGH }}) {{ __typename }} }}"#,
        ticket.id(),
        admin.user_id
    );
    let response = harness.run(admin, &assign).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let status_only = format!(
        r#"mutation {{ updateTicket(id: "{}", input: {{ status: IN_PROGRESS }}) {{
            ... on StaffTicketView {{ priority assignedTo {{ email }} }}
        }} }}"#,
        ticket.id()
    );
    let kept = harness.run(admin, &status_only).await.data.into_json().unwrap();
    assert_eq!(kept["updateTicket"]["priority"], "HIGH");
    assert_eq!(kept["updateTicket"]["assignedTo"]["email"], "admin@pleme.io");

    let clear = format!(
        r#"mutation {{ updateTicket(id: "{}", input: {{ assignedTo: null, priority: null }}) {{
            ... on StaffTicketView {{ priority assignedTo {{ email }} }}
        }} }}"#,
        ticket.id()
    );
    let cleared = harness.run(admin, &clear).await.data.into_json().unwrap();
    assert_eq!(cleared["updateTicket"]["priority"], json!(null));
    assert_eq!(cleared["updateTicket"]["assignedTo"], json!(null));

    let unknown = format!(
        r#"mutation {{ updateTicket(id: "{}", input: {{ assignedTo: "{}" }}) {{ __typename }} }}"#,
        ticket.id(),
        Uuid::new_v4()
    );
    let rejected = harness.run(admin, &unknown).await;
    assert_eq!(error_code(&rejected), Some(Value::from("BAD_REQUEST")));
    assert_eq!(harness.desk.dashboard(&admin).await.unwrap().unassigned_tickets, 1);
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let harness = Harness::new();
    let response = harness.schema.execute(Request::new(LIST_TICKETS)).await;
    assert_eq!(error_code(&response), Some(Value::from("UNAUTHENTICATED")));
}
