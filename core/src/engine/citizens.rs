//! Admin actions on citizen records.
//!
//! Citizen records are created lazily by ticket creation and mutated only
//! here: blacklisting. The identity is addressed by its digest so the raw
//! identifier never transits the admin surface.

use super::QueueEngine;
use crate::error::QueueError;
use crate::identity::IdentityHash;
use crate::types::{AuditAction, AuditEntry, Citizen};

impl QueueEngine {
    /// Set or clear a citizen's blacklist flag.
    ///
    /// Clearing the flag also clears the stored reason. Audited as an
    /// administrative action either way.
    ///
    /// # Errors
    ///
    /// [`QueueError::CitizenNotFound`] or a store fault.
    pub async fn set_blacklist(
        &self,
        hash: &IdentityHash,
        blacklisted: bool,
        reason: Option<String>,
    ) -> Result<Citizen, QueueError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut citizen = tx
            .find_citizen(hash)
            .await?
            .ok_or(QueueError::CitizenNotFound)?;

        citizen.blacklisted = blacklisted;
        citizen.blacklist_reason = if blacklisted { reason } else { None };
        tx.update_citizen(&citizen).await?;
        tx.append_audit(
            &AuditEntry::new(AuditAction::CitizenBlacklisted, now)
                .with_citizen(citizen.id)
                .with_details(format!(
                    "Blacklist {} for identity {}",
                    if blacklisted { "set" } else { "cleared" },
                    citizen.identity_hash.truncated()
                )),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            identity = %citizen.identity_hash.truncated(),
            blacklisted,
            "blacklist updated"
        );
        Ok(citizen)
    }
}
