//! Ticket lifecycle operations.
//!
//! Owns the invariant "one active ticket per citizen": creation re-checks it
//! inside the same transaction that inserts the ticket, anchored on the
//! citizen row so two racing kiosk requests for one identity cannot both
//! pass. Expiry is lazy - a waiting ticket past its deadline is transitioned
//! on first read, never by a background job.

use super::{QueueEngine, release_holding_counter};
use crate::error::QueueError;
use crate::identity::IdentityHash;
use crate::ticket_code::TicketCode;
use crate::token;
use crate::types::{AuditAction, AuditEntry, CounterId, ServiceCategory, Ticket, TicketId, TicketStatus};
use serde::{Deserialize, Serialize};

/// A kiosk request for a new ticket.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TicketRequest {
    /// Raw citizen identifier; hashed immediately, never stored.
    pub raw_id: String,
    /// Display name.
    pub full_name: String,
    /// Requested service category.
    pub category: ServiceCategory,
    /// Optional contact number.
    pub phone_number: Option<String>,
}

/// A ticket together with its queue placement, when it is waiting.
#[derive(Clone, Debug)]
pub struct TicketDetails {
    /// The ticket record.
    pub ticket: Ticket,
    /// 1-based position among waiting tickets of the same category.
    pub queue_position: Option<u64>,
    /// Estimated wait in minutes derived from the position.
    pub estimated_wait_minutes: Option<i64>,
}

impl QueueEngine {
    /// Create a ticket for a kiosk request.
    ///
    /// Rejects, in order: malformed input; an already-held active ticket
    /// (naming its code); a blacklisted citizen; a request pattern the fraud
    /// policy flags (audited as suspicious, no ticket created).
    ///
    /// # Errors
    ///
    /// [`QueueError::Validation`], [`QueueError::DuplicateActiveTicket`],
    /// [`QueueError::Blacklisted`], [`QueueError::SuspiciousActivity`], or a
    /// store fault.
    pub async fn create_ticket(&self, request: TicketRequest) -> Result<TicketDetails, QueueError> {
        validate_request(&request)?;

        let hash = IdentityHash::from_raw(&request.raw_id);
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        // The citizen row doubles as the serialization anchor for this
        // identity: created lazily on first request, locked on every one.
        let citizen = tx
            .find_or_create_citizen(
                &hash,
                &request.full_name,
                request.phone_number.as_deref(),
                now,
            )
            .await?;

        if let Some(existing) = tx.active_tickets_for_identity(&hash).await?.into_iter().next() {
            return Err(QueueError::DuplicateActiveTicket {
                existing: existing.code,
            });
        }

        if citizen.blacklisted {
            return Err(QueueError::Blacklisted {
                reason: citizen.blacklist_reason,
            });
        }

        let window_start = now - self.config.fraud.activity_window;
        let recent_active = tx.count_active_created_since(&hash, window_start).await?;
        let terminal_failures = tx.count_terminal_failures(&hash).await?;
        if self
            .config
            .fraud
            .is_suspicious(recent_active, terminal_failures)
        {
            tx.append_audit(
                &AuditEntry::new(AuditAction::SuspiciousTicketRequest, now)
                    .with_citizen(citizen.id)
                    .with_details(format!(
                        "{recent_active} active tickets within window, \
                         {terminal_failures} cancelled/expired overall"
                    ))
                    .flag_suspicious(),
            )
            .await?;
            tx.commit().await?;
            tracing::warn!(
                identity = %hash.truncated(),
                recent_active,
                terminal_failures,
                "ticket request flagged as suspicious"
            );
            return Err(QueueError::SuspiciousActivity);
        }

        let sequence = tx.next_ticket_sequence().await?;
        let code = TicketCode::assign(request.category, sequence);
        let queue_position = tx.count_waiting_in_category(request.category).await? + 1;
        let payload_token = token::issue(
            &self.config.token_secret,
            &code,
            &request.full_name,
            request.category,
            now,
        );

        let ticket = Ticket {
            id: TicketId::new(sequence),
            code: code.clone(),
            citizen_id: citizen.id,
            identity_hash: hash,
            full_name: request.full_name,
            category: request.category,
            status: TicketStatus::Waiting,
            counter_number: None,
            created_at: now,
            called_at: None,
            served_at: None,
            completed_at: None,
            expires_at: now + self.config.expiry_window,
            payload_token,
        };
        tx.insert_ticket(&ticket).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::TicketCreated, now)
                .with_citizen(citizen.id)
                .with_ticket(ticket.id)
                .with_details(format!(
                    "Ticket {code} created for {}",
                    request.category
                )),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket = %code, category = %request.category, queue_position, "ticket created");
        Ok(TicketDetails {
            estimated_wait_minutes: Some(self.estimated_wait(queue_position)),
            queue_position: Some(queue_position),
            ticket,
        })
    }

    /// Current status of a ticket.
    ///
    /// A waiting ticket past its deadline is transitioned to `expired` as a
    /// side effect of this read before being reported.
    ///
    /// # Errors
    ///
    /// [`QueueError::TicketNotFound`] or a store fault.
    pub async fn ticket_status(&self, code: &TicketCode) -> Result<TicketDetails, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut ticket = tx
            .find_ticket(code)
            .await?
            .ok_or_else(|| QueueError::TicketNotFound(code.clone()))?;

        if ticket.status == TicketStatus::Waiting && ticket.is_expired(now) {
            ticket.status = TicketStatus::Expired;
            ticket.completed_at = Some(now);
            tx.update_ticket(&ticket).await?;
            tx.append_audit(
                &AuditEntry::new(AuditAction::TicketExpired, now)
                    .with_citizen(ticket.citizen_id)
                    .with_ticket(ticket.id)
                    .with_details(format!("Ticket {} expired at read", ticket.code)),
            )
            .await?;
            tx.commit().await?;
            return Ok(TicketDetails {
                ticket,
                queue_position: None,
                estimated_wait_minutes: None,
            });
        }

        let details = if ticket.status == TicketStatus::Waiting {
            let position = tx.count_waiting_ahead(ticket.category, ticket.id).await? + 1;
            TicketDetails {
                queue_position: Some(position),
                estimated_wait_minutes: Some(self.estimated_wait(position)),
                ticket,
            }
        } else {
            TicketDetails {
                ticket,
                queue_position: None,
                estimated_wait_minutes: None,
            }
        };
        tx.commit().await?;
        Ok(details)
    }

    /// Cancel a ticket, self-service.
    ///
    /// The caller proves ownership by presenting the raw identifier; a
    /// digest mismatch is refused as forbidden and audited as suspicious
    /// without touching the ticket.
    ///
    /// # Errors
    ///
    /// [`QueueError::TicketNotFound`], [`QueueError::IdentityMismatch`],
    /// [`QueueError::InvalidTransition`] for terminal tickets, or a store
    /// fault.
    pub async fn cancel_ticket(
        &self,
        code: &TicketCode,
        raw_id: &str,
    ) -> Result<Ticket, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut ticket = tx
            .find_ticket(code)
            .await?
            .ok_or_else(|| QueueError::TicketNotFound(code.clone()))?;

        if !ticket.identity_hash.matches_raw(raw_id) {
            tx.append_audit(
                &AuditEntry::new(AuditAction::CancellationRefused, now)
                    .with_citizen(ticket.citizen_id)
                    .with_ticket(ticket.id)
                    .with_details(format!("Identity mismatch cancelling {}", ticket.code))
                    .flag_suspicious(),
            )
            .await?;
            tx.commit().await?;
            return Err(QueueError::IdentityMismatch);
        }

        if !ticket.status.can_transition_to(TicketStatus::Cancelled) {
            return Err(QueueError::InvalidTransition {
                code: ticket.code,
                from: ticket.status,
                to: TicketStatus::Cancelled,
            });
        }

        release_holding_counter(&mut *tx, &ticket).await?;
        ticket.status = TicketStatus::Cancelled;
        ticket.completed_at = Some(now);
        tx.update_ticket(&ticket).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::TicketCancelled, now)
                .with_citizen(ticket.citizen_id)
                .with_ticket(ticket.id)
                .with_details(format!("Ticket {} cancelled by owner", ticket.code)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket = %ticket.code, "ticket cancelled");
        Ok(ticket)
    }

    /// Cancel every active ticket belonging to an identity.
    ///
    /// Useful for stuck tickets. Zero active matches reports not-found;
    /// each cancellation is audited individually.
    ///
    /// # Errors
    ///
    /// [`QueueError::NoActiveTickets`] or a store fault.
    pub async fn cancel_all_for_identity(
        &self,
        raw_id: &str,
    ) -> Result<Vec<TicketCode>, QueueError> {
        let hash = IdentityHash::from_raw(raw_id);
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let active = tx.active_tickets_for_identity(&hash).await?;
        if active.is_empty() {
            return Err(QueueError::NoActiveTickets);
        }

        let mut cancelled = Vec::with_capacity(active.len());
        for mut ticket in active {
            release_holding_counter(&mut *tx, &ticket).await?;
            ticket.status = TicketStatus::Cancelled;
            ticket.completed_at = Some(now);
            tx.update_ticket(&ticket).await?;
            tx.append_audit(
                &AuditEntry::new(AuditAction::TicketCancelledByIdentity, now)
                    .with_citizen(ticket.citizen_id)
                    .with_ticket(ticket.id)
                    .with_details(format!("Ticket {} cancelled via identity lookup", ticket.code)),
            )
            .await?;
            cancelled.push(ticket.code);
        }
        tx.commit().await?;

        tracing::info!(count = cancelled.len(), "cancelled all tickets for identity");
        Ok(cancelled)
    }

    /// Force-expire any non-terminal ticket. Operator override: no identity
    /// check, audited as administrative.
    ///
    /// # Errors
    ///
    /// [`QueueError::TicketNotFound`], [`QueueError::InvalidTransition`] for
    /// terminal tickets, or a store fault.
    pub async fn force_expire(&self, code: &TicketCode) -> Result<Ticket, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut ticket = tx
            .find_ticket(code)
            .await?
            .ok_or_else(|| QueueError::TicketNotFound(code.clone()))?;

        if !ticket.status.can_transition_to(TicketStatus::Expired) {
            return Err(QueueError::InvalidTransition {
                code: ticket.code,
                from: ticket.status,
                to: TicketStatus::Expired,
            });
        }

        release_holding_counter(&mut *tx, &ticket).await?;
        ticket.status = TicketStatus::Expired;
        ticket.completed_at = Some(now);
        tx.update_ticket(&ticket).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::TicketForceExpired, now)
                .with_citizen(ticket.citizen_id)
                .with_ticket(ticket.id)
                .with_details(format!("Ticket {} force-expired by operator", ticket.code)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket = %ticket.code, "ticket force-expired");
        Ok(ticket)
    }

    /// Complete service for a ticket at a counter.
    ///
    /// The ticket must be serving. The addressed counter's held-ticket
    /// reference is cleared even when the caller did not know which ticket
    /// the counter holds.
    ///
    /// # Errors
    ///
    /// [`QueueError::CounterNotFound`], [`QueueError::TicketNotFound`],
    /// [`QueueError::InvalidTransition`], or a store fault.
    pub async fn complete_service(
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
        let mut ticket = tx
            .find_ticket(code)
            .await?
            .ok_or_else(|| QueueError::TicketNotFound(code.clone()))?;

        if !ticket.status.can_transition_to(TicketStatus::Completed) {
            return Err(QueueError::InvalidTransition {
                code: ticket.code,
                from: ticket.status,
                to: TicketStatus::Completed,
            });
        }

        ticket.status = TicketStatus::Completed;
        ticket.completed_at = Some(now);
        tx.update_ticket(&ticket).await?;

        if counter.current_ticket.is_some() {
            counter.current_ticket = None;
            tx.update_counter(&counter).await?;
        }
        // The ticket may have been called at a different counter than the
        // one completing it; release that one too.
        if ticket.counter_number != Some(counter.number) {
            release_holding_counter(&mut *tx, &ticket).await?;
        }

        tx.append_audit(
            &AuditEntry::new(AuditAction::ServiceCompleted, now)
                .with_citizen(ticket.citizen_id)
                .with_ticket(ticket.id)
                .with_counter(counter.id)
                .with_details(format!(
                    "Ticket {} completed at counter {}",
                    ticket.code, counter.number
                )),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket = %ticket.code, counter = counter.number, "service completed");
        Ok(ticket)
    }

    /// All active tickets for an identity. An empty list is a normal result,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn active_tickets_for_identity(
        &self,
        raw_id: &str,
    ) -> Result<Vec<Ticket>, QueueError> {
        let hash = IdentityHash::from_raw(raw_id);
        let mut tx = self.store.begin().await?;
        let tickets = tx.active_tickets_for_identity(&hash).await?;
        tx.commit().await?;
        Ok(tickets)
    }
}

fn validate_request(request: &TicketRequest) -> Result<(), QueueError> {
    if request.raw_id.trim().len() < 5 {
        return Err(QueueError::Validation(
            "identifier must be at least 5 characters".to_string(),
        ));
    }
    let name_len = request.full_name.trim().chars().count();
    if !(2..=100).contains(&name_len) {
        return Err(QueueError::Validation(
            "full name must be between 2 and 100 characters".to_string(),
        ));
    }
    Ok(())
}
