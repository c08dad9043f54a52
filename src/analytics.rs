//! Operational metrics over a ticket snapshot.
//!
//! Each metric is its own stage over the same slice of tickets so the
//! breakdowns stay consistent with each other (`sum(ticketsByStatus) ==
//! totalTickets` always holds for one call).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{DailyTicketCount, DashboardAnalytics, Role, SkillCount, Ticket, UserStats};

/// Length of the trailing window for `recentTickets` and `ticketsPerDay`.
pub const RECENT_WINDOW_DAYS: i64 = 7;

pub const TOP_SKILLS_LIMIT: usize = 5;

/// Label for a grouping key that is absent on the record.
pub const UNKNOWN_KEY: &str = "unknown";

/// Corpus-wide dashboard, computed as of `now`.
pub fn compute_dashboard(tickets: &[Ticket], users_by_role: &[(Role, i64)], now: DateTime<Utc>) -> DashboardAnalytics {
    let recent: Vec<&Ticket> = tickets.iter().filter(|t| in_recent_window(t, now)).collect();

    DashboardAnalytics {
        total_tickets: tickets.len() as i64,
        tickets_by_status: count_by_status(tickets),
        tickets_by_priority: count_by_priority(tickets),
        unassigned_tickets: tickets.iter().filter(|t| t.assigned_to.is_none()).count() as i64,
        users_by_role: count_users_by_role(users_by_role),
        recent_tickets: recent.len() as i64,
        tickets_per_day: tickets_per_day(&recent),
        top_skills: top_skills(tickets, TOP_SKILLS_LIMIT),
    }
}

/// Personal stats for `owner`. Tickets created by anyone else are ignored.
pub fn compute_user_stats(tickets: &[Ticket], owner: Uuid) -> UserStats {
    let own: Vec<Ticket> = tickets.iter().filter(|t| t.created_by == owner).cloned().collect();

    UserStats {
        total_tickets: own.len() as i64,
        tickets_by_status: count_by_status(&own),
    }
}

pub fn count_by_status(tickets: &[Ticket]) -> BTreeMap<String, i64> {
    group_count(tickets.iter().map(|t| Some(t.status.as_str())))
}

/// Only tickets with a priority are grouped.
pub fn count_by_priority(tickets: &[Ticket]) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for priority in tickets.iter().filter_map(|t| t.priority) {
        *counts.entry(priority.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

fn count_users_by_role(rows: &[(Role, i64)]) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for (role, count) in rows {
        *counts.entry(role.as_str().to_string()).or_insert(0) += count;
    }
    counts
}

fn group_count<'a>(keys: impl Iterator<Item = Option<&'a str>>) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.unwrap_or(UNKNOWN_KEY).to_string()).or_insert(0) += 1;
    }
    counts
}

/// `now - 7d <= created_at < now`
pub fn in_recent_window(ticket: &Ticket, now: DateTime<Utc>) -> bool {
    let start = now - Duration::days(RECENT_WINDOW_DAYS);
    ticket.created_at >= start && ticket.created_at < now
}

/// One entry per UTC day with at least one ticket, ascending by day.
fn tickets_per_day(recent: &[&Ticket]) -> Vec<DailyTicketCount> {
    let mut days: BTreeMap<String, i64> = BTreeMap::new();
    for ticket in recent {
        *days.entry(ticket.created_at.format("%Y-%m-%d").to_string()).or_insert(0) += 1;
    }
    days.into_iter()
        .map(|(date, count)| DailyTicketCount { date, count })
        .collect()
}

/// Most frequent skill tags, each occurrence counted. Ties break on tag
/// ascending.
pub fn top_skills(tickets: &[Ticket], limit: usize) -> Vec<SkillCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for skill in tickets.iter().flat_map(|t| t.related_skills.iter()) {
        *counts.entry(skill.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<SkillCount> = counts
        .into_iter()
        .map(|(skill, count)| SkillCount { skill: skill.to_string(), count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
    ranked.truncate(limit);
    ranked
}
