//! Counter provisioning and operator updates.

use super::QueueEngine;
use crate::error::QueueError;
use crate::types::{AuditAction, AuditEntry, Counter, CounterId, ServiceCategory};
use serde::{Deserialize, Serialize};

/// Operator request to provision a counter.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CounterSpec {
    /// Operator-visible counter number; must be unique.
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Service categories this counter can serve.
    pub categories: Vec<ServiceCategory>,
    /// Staff label shown on the board.
    pub staff_name: Option<String>,
}

/// Operator update to an existing counter; `None` fields are left unchanged.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CounterUpdate {
    /// Activate or deactivate the counter.
    pub active: Option<bool>,
    /// Replace the staff label.
    pub staff_name: Option<String>,
}

impl QueueEngine {
    /// Provision a new counter, active by default.
    ///
    /// # Errors
    ///
    /// [`QueueError::DuplicateCounterNumber`] or a store fault.
    pub async fn create_counter(&self, spec: CounterSpec) -> Result<Counter, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        if tx.find_counter_by_number(spec.number).await?.is_some() {
            return Err(QueueError::DuplicateCounterNumber(spec.number));
        }

        let counter = Counter {
            id: CounterId::new(),
            number: spec.number,
            name: spec.name,
            categories: spec.categories,
            active: true,
            current_ticket: None,
            staff_name: spec.staff_name,
        };
        tx.insert_counter(&counter).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::CounterCreated, now)
                .with_counter(counter.id)
                .with_details(format!("Counter {} provisioned", counter.number)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(counter = counter.number, "counter created");
        Ok(counter)
    }

    /// Apply an operator update (activate/deactivate, staff label).
    ///
    /// # Errors
    ///
    /// [`QueueError::CounterNotFound`] or a store fault.
    pub async fn update_counter(
        &self,
        id: CounterId,
        update: CounterUpdate,
    ) -> Result<Counter, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut counter = tx
            .find_counter(id)
            .await?
            .ok_or(QueueError::CounterNotFound(id))?;

        if let Some(active) = update.active {
            counter.active = active;
        }
        if let Some(staff_name) = update.staff_name {
            counter.staff_name = Some(staff_name);
        }
        tx.update_counter(&counter).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::CounterUpdated, now)
                .with_counter(counter.id)
                .with_details(format!(
                    "Counter {} updated (active: {})",
                    counter.number, counter.active
                )),
        )
        .await?;
        tx.commit().await?;

        Ok(counter)
    }

    /// All provisioned counters, ordered by number.
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn list_counters(&self) -> Result<Vec<Counter>, QueueError> {
        let mut tx = self.store.begin().await?;
        let counters = tx.list_counters().await?;
        tx.commit().await?;
        Ok(counters)
    }
}
