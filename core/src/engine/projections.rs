//! Read-side aggregations for display boards and reporting.
//!
//! Pure reads over current committed state, computed on demand - no caching
//! and no incremental maintenance. Daily figures are bucketed at UTC
//! midnight.

use super::QueueEngine;
use crate::environment::start_of_day;
use crate::error::QueueError;
use crate::ticket_code::TicketCode;
use crate::types::TicketStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One ticket currently at a counter, for the display board.
#[derive(Clone, Debug, Serialize)]
pub struct ServingEntry {
    /// Ticket code being served or called.
    pub ticket_number: TicketCode,
    /// Counter the ticket is at.
    pub counter_number: Option<u32>,
    /// Called or serving.
    pub status: TicketStatus,
}

/// Live queue status for the display screen.
#[derive(Clone, Debug, Serialize)]
pub struct QueueStatus {
    /// Tickets currently called or serving.
    pub now_serving: Vec<ServingEntry>,
    /// Number of waiting tickets.
    pub waiting_count: u64,
    /// Completions since UTC midnight.
    pub total_served_today: u64,
    /// Mean service duration in minutes over today's completions.
    pub average_wait_minutes: Option<f64>,
}

/// Daily operational statistics.
#[derive(Clone, Debug, Serialize)]
pub struct Statistics {
    /// Tickets created since UTC midnight.
    pub total_tickets_today: u64,
    /// Completions since UTC midnight.
    pub total_served_today: u64,
    /// Tickets currently waiting.
    pub total_waiting: u64,
    /// Expired tickets created since UTC midnight.
    pub total_expired_today: u64,
    /// Counters currently active.
    pub active_counters: u64,
    /// Mean served-to-completed span in minutes over today's completions.
    pub average_service_time_minutes: f64,
}

/// One waiting ticket on the dashboard listing.
#[derive(Clone, Debug, Serialize)]
pub struct WaitingEntry {
    /// Ticket code.
    pub ticket_number: TicketCode,
    /// Display name.
    pub full_name: String,
    /// Human-readable service label.
    pub service: &'static str,
    /// Always waiting; kept for board rendering.
    pub status: TicketStatus,
    /// When the ticket was created.
    pub created_at: DateTime<Utc>,
    /// 1-based position in the overall waiting queue.
    pub position: u64,
    /// Truncated identity digest; never the raw identifier.
    pub identity_display: String,
}

impl QueueEngine {
    /// Live queue status for the display screen.
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn queue_status(&self) -> Result<QueueStatus, QueueError> {
        let now = self.clock.now();
        let today = start_of_day(now);
        let mut tx = self.store.begin().await?;

        let now_serving = tx
            .serving_tickets()
            .await?
            .into_iter()
            .map(|ticket| ServingEntry {
                ticket_number: ticket.code,
                counter_number: ticket.counter_number,
                status: ticket.status,
            })
            .collect();
        let waiting_count = tx.count_waiting().await?;
        let total_served_today = tx.count_completed_since(today).await?;
        let durations = tx.service_durations_since(today).await?;
        tx.commit().await?;

        Ok(QueueStatus {
            now_serving,
            waiting_count,
            total_served_today,
            average_wait_minutes: mean_minutes(&durations),
        })
    }

    /// Daily operational statistics.
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn statistics(&self) -> Result<Statistics, QueueError> {
        let now = self.clock.now();
        let today = start_of_day(now);
        let mut tx = self.store.begin().await?;

        let total_tickets_today = tx.count_created_since(today).await?;
        let total_served_today = tx.count_completed_since(today).await?;
        let total_waiting = tx.count_waiting().await?;
        let total_expired_today = tx.count_expired_created_since(today).await?;
        let active_counters = tx.count_active_counters().await?;
        let durations = tx.service_durations_since(today).await?;
        tx.commit().await?;

        Ok(Statistics {
            total_tickets_today,
            total_served_today,
            total_waiting,
            total_expired_today,
            active_counters,
            average_service_time_minutes: mean_minutes(&durations).unwrap_or(0.0),
        })
    }

    /// Waiting tickets with live deadlines, oldest first, for the dashboard.
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn waiting_tickets(&self) -> Result<Vec<WaitingEntry>, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let tickets = tx.waiting_tickets_ordered(now).await?;
        tx.commit().await?;

        Ok(tickets
            .into_iter()
            .enumerate()
            .map(|(index, ticket)| WaitingEntry {
                ticket_number: ticket.code,
                full_name: ticket.full_name,
                service: ticket.category.display_name(),
                status: ticket.status,
                created_at: ticket.created_at,
                position: index as u64 + 1,
                identity_display: ticket.identity_hash.truncated(),
            })
            .collect())
    }
}

/// Mean of `durations` (seconds) in minutes, rounded to two decimals.
fn mean_minutes(durations: &[i64]) -> Option<f64> {
    if durations.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let total_seconds: f64 = durations.iter().map(|&s| s as f64).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = durations.len() as f64;
    Some((total_seconds / count / 60.0 * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_no_durations_is_none() {
        assert_eq!(mean_minutes(&[]), None);
    }

    #[test]
    fn mean_is_in_minutes_rounded_to_two_decimals() {
        // 300s and 400s average to 350s = 5.83 minutes.
        assert_eq!(mean_minutes(&[300, 400]), Some(5.83));
    }
}
