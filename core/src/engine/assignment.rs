//! Counter assignment operations.
//!
//! Two claim flows produce the same effect - a waiting ticket becomes
//! called, stamped with the counter number and call time, and the counter
//! is occupied - under different selection policies:
//!
//! - **call-next** is counter-initiated: strict FIFO over the waiting,
//!   unexpired tickets in the counter's configured categories.
//! - **assign-to-next-free-counter** is ticket-initiated: a specific
//!   waiting ticket (or the globally oldest one) goes to the lowest-numbered
//!   free active counter. This flow does not filter by category
//!   compatibility; the asymmetry against call-next is intentional and
//!   pinned by test.
//!
//! Claims are atomic: the candidate ticket and the chosen counter are both
//! locked inside the claiming transaction, so two concurrent claims can
//! never take the same ticket or double-book a counter.

use super::{QueueEngine, claim};
use crate::error::QueueError;
use crate::ticket_code::TicketCode;
use crate::types::{AuditAction, AuditEntry, CounterId, Ticket, TicketStatus};

/// Result of a call-next attempt.
#[derive(Clone, Debug)]
pub enum CallOutcome {
    /// A ticket was claimed and called to the counter.
    Called(Ticket),
    /// No eligible ticket is waiting; a normal outcome, not a failure.
    NothingWaiting {
        /// Number of the counter that found nothing to call.
        counter_number: u32,
    },
}

impl QueueEngine {
    /// Call the next waiting ticket eligible for this counter.
    ///
    /// The counter must be active and must not already hold a ticket.
    /// Candidates are the waiting, unexpired tickets in the counter's
    /// configured categories, oldest first.
    ///
    /// # Errors
    ///
    /// [`QueueError::CounterNotFound`], [`QueueError::CounterInactive`],
    /// [`QueueError::CounterOccupied`], or a store fault.
    pub async fn call_next(&self, counter_id: CounterId) -> Result<CallOutcome, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut counter = tx
            .find_counter(counter_id)
            .await?
            .ok_or(QueueError::CounterNotFound(counter_id))?;
        if !counter.active {
            return Err(QueueError::CounterInactive(counter.number));
        }
        let busy = tx.busy_counter_numbers().await?;
        if counter.current_ticket.is_some() || busy.contains(&counter.number) {
            return Err(QueueError::CounterOccupied(counter.number));
        }

        let Some(mut ticket) = tx.next_waiting_in_categories(&counter.categories, now).await?
        else {
            tracing::debug!(counter = counter.number, "call-next found nothing to call");
            return Ok(CallOutcome::NothingWaiting {
                counter_number: counter.number,
            });
        };

        claim(&mut ticket, &mut counter, now);
        tx.update_ticket(&ticket).await?;
        tx.update_counter(&counter).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::TicketCalled, now)
                .with_citizen(ticket.citizen_id)
                .with_ticket(ticket.id)
                .with_counter(counter.id)
                .with_details(format!(
                    "Ticket {} called to counter {}",
                    ticket.code, counter.number
                )),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket = %ticket.code, counter = counter.number, "ticket called");
        Ok(CallOutcome::Called(ticket))
    }

    /// Manually assign a specific waiting ticket to a specific counter.
    ///
    /// # Errors
    ///
    /// [`QueueError::CounterNotFound`], [`QueueError::CounterInactive`],
    /// [`QueueError::CounterOccupied`], [`QueueError::TicketNotFound`],
    /// [`QueueError::InvalidTransition`] when the ticket is not waiting, or
    /// a store fault.
    pub async fn assign_ticket(
        &self,
        counter_id: CounterId,
        code: &TicketCode,
    ) -> Result<Ticket, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut counter = tx
            .find_counter(counter_id)
            .await?
            .ok_or(QueueError::CounterNotFound(counter_id))?;
        if !counter.active {
            return Err(QueueError::CounterInactive(counter.number));
        }
        let busy = tx.busy_counter_numbers().await?;
        if counter.current_ticket.is_some() || busy.contains(&counter.number) {
            return Err(QueueError::CounterOccupied(counter.number));
        }

        let mut ticket = tx
            .find_ticket(code)
            .await?
            .ok_or_else(|| QueueError::TicketNotFound(code.clone()))?;
        ensure_claimable(&ticket, now)?;

        claim(&mut ticket, &mut counter, now);
        tx.update_ticket(&ticket).await?;
        tx.update_counter(&counter).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::TicketAssigned, now)
                .with_citizen(ticket.citizen_id)
                .with_ticket(ticket.id)
                .with_counter(counter.id)
                .with_details(format!(
                    "Ticket {} manually assigned to counter {}",
                    ticket.code, counter.number
                )),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket = %ticket.code, counter = counter.number, "ticket assigned");
        Ok(ticket)
    }

    /// Assign a waiting ticket to the next free active counter.
    ///
    /// With `code` given, that specific ticket is assigned; otherwise the
    /// globally oldest waiting unexpired ticket is taken. Active counters
    /// are scanned in ascending counter-number order and the first one not
    /// holding a called or serving ticket is claimed. No category
    /// compatibility check is applied in this flow.
    ///
    /// # Errors
    ///
    /// [`QueueError::NoCountersConfigured`], [`QueueError::NoWaitingTickets`],
    /// [`QueueError::TicketNotFound`], [`QueueError::InvalidTransition`],
    /// [`QueueError::AllCountersBusy`], or a store fault.
    pub async fn assign_next(&self, code: Option<&TicketCode>) -> Result<Ticket, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let counters = tx.active_counters().await?;
        if counters.is_empty() {
            return Err(QueueError::NoCountersConfigured);
        }
        let busy = tx.busy_counter_numbers().await?;

        let mut ticket = match code {
            Some(code) => {
                let ticket = tx
                    .find_ticket(code)
                    .await?
                    .ok_or_else(|| QueueError::TicketNotFound(code.clone()))?;
                ensure_claimable(&ticket, now)?;
                ticket
            }
            None => tx
                .next_waiting_global(now)
                .await?
                .ok_or(QueueError::NoWaitingTickets)?,
        };

        for candidate in counters {
            if busy.contains(&candidate.number) || candidate.current_ticket.is_some() {
                continue;
            }
            // Re-read under lock: the list scan above is not a claim.
            let Some(mut counter) = tx.find_counter_by_number(candidate.number).await? else {
                continue;
            };
            if !counter.active || counter.current_ticket.is_some() {
                continue;
            }

            claim(&mut ticket, &mut counter, now);
            tx.update_ticket(&ticket).await?;
            tx.update_counter(&counter).await?;
            tx.append_audit(
                &AuditEntry::new(AuditAction::TicketAssigned, now)
                    .with_citizen(ticket.citizen_id)
                    .with_ticket(ticket.id)
                    .with_counter(counter.id)
                    .with_details(format!(
                        "Ticket {} auto-assigned to counter {}",
                        ticket.code, counter.number
                    )),
            )
            .await?;
            tx.commit().await?;

            tracing::info!(ticket = %ticket.code, counter = counter.number, "ticket auto-assigned");
            return Ok(ticket);
        }

        Err(QueueError::AllCountersBusy)
    }

    /// Verify the citizen at the counter by hash-matching the presented raw
    /// identifier against the called ticket, then start service.
    ///
    /// A mismatch is refused as forbidden and itself audited as suspicious.
    ///
    /// # Errors
    ///
    /// [`QueueError::CounterNotFound`], [`QueueError::TicketNotFound`],
    /// [`QueueError::IdentityMismatch`], [`QueueError::InvalidTransition`]
    /// when the ticket is not in called state, or a store fault.
    pub async fn verify_at_counter(
        &self,
        counter_id: CounterId,
        code: &TicketCode,
        raw_id: &str,
    ) -> Result<Ticket, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let counter = tx
            .find_counter(counter_id)
            .await?
            .ok_or(QueueError::CounterNotFound(counter_id))?;
        let mut ticket = tx
            .find_ticket(code)
            .await?
            .ok_or_else(|| QueueError::TicketNotFound(code.clone()))?;

        if !ticket.identity_hash.matches_raw(raw_id) {
            tx.append_audit(
                &AuditEntry::new(AuditAction::VerificationFailed, now)
                    .with_citizen(ticket.citizen_id)
                    .with_ticket(ticket.id)
                    .with_counter(counter.id)
                    .with_details(format!("Identity mismatch for ticket {}", ticket.code))
                    .flag_suspicious(),
            )
            .await?;
            tx.commit().await?;
            tracing::warn!(ticket = %ticket.code, counter = counter.number, "verification failed");
            return Err(QueueError::IdentityMismatch);
        }

        if !ticket.status.can_transition_to(TicketStatus::Serving) {
            return Err(QueueError::InvalidTransition {
                code: ticket.code,
                from: ticket.status,
                to: TicketStatus::Serving,
            });
        }

        ticket.status = TicketStatus::Serving;
        ticket.served_at = Some(now);
        tx.update_ticket(&ticket).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::VerificationSucceeded, now)
                .with_citizen(ticket.citizen_id)
                .with_ticket(ticket.id)
                .with_counter(counter.id)
                .with_details(format!("Ticket {} verified", ticket.code)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket = %ticket.code, counter = counter.number, "verification succeeded");
        Ok(ticket)
    }

}

/// Check that a specific ticket is claimable right now.
///
/// A waiting ticket past its deadline is already expired for claim
/// purposes, whether or not a read has transitioned it yet; the stored
/// status catches up on the next status read.
fn ensure_claimable(ticket: &Ticket, now: chrono::DateTime<chrono::Utc>) -> Result<(), QueueError> {
    let effective = if ticket.status == TicketStatus::Waiting && ticket.is_expired(now) {
        TicketStatus::Expired
    } else {
        ticket.status
    };
    if effective == TicketStatus::Waiting {
        Ok(())
    } else {
        Err(QueueError::InvalidTransition {
            code: ticket.code.clone(),
            from: effective,
            to: TicketStatus::Called,
        })
    }
}
