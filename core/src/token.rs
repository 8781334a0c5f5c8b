//! Opaque ticket payload tokens.
//!
//! Each ticket commits a payload token at creation: the data a printed QR
//! code encodes, plus a keyed SHA-256 signature so a kiosk printout cannot
//! be forged by editing the text. Rendering the QR image itself is outside
//! this system.

use crate::ticket_code::TicketCode;
use crate::types::ServiceCategory;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Build the signed payload token for a freshly created ticket.
///
/// Layout: `TICKET:<code>|NAME:<name>|SERVICE:<category>|TIME:<rfc3339>|SIG:<hex>`
/// where the signature is `SHA-256(secret || payload)` over everything
/// before the `SIG` field.
#[must_use]
pub fn issue(
    secret: &str,
    code: &TicketCode,
    full_name: &str,
    category: ServiceCategory,
    created_at: DateTime<Utc>,
) -> String {
    let payload = format!(
        "TICKET:{code}|NAME:{full_name}|SERVICE:{category}|TIME:{}",
        created_at.to_rfc3339()
    );
    let signature = sign(secret, &payload);
    format!("{payload}|SIG:{signature}")
}

/// Whether `token` carries a valid signature under `secret`.
#[must_use]
pub fn verify(secret: &str, token: &str) -> bool {
    match token.rsplit_once("|SIG:") {
        Some((payload, signature)) => sign(secret, payload) == signature,
        None => false,
    }
}

fn sign(secret: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(payload.as_bytes());
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> String {
        issue(
            "test-secret",
            &TicketCode::new("IM-001"),
            "Tesfaye Bekele",
            ServiceCategory::Immigration,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    #[test]
    fn token_embeds_the_ticket_fields() {
        let token = sample_token();
        assert!(token.starts_with("TICKET:IM-001|NAME:Tesfaye Bekele|SERVICE:immigration|TIME:"));
        assert!(token.contains("|SIG:"));
    }

    #[test]
    fn issued_tokens_verify() {
        assert!(verify("test-secret", &sample_token()));
    }

    #[test]
    fn tampering_breaks_verification() {
        let token = sample_token().replace("IM-001", "IM-002");
        assert!(!verify("test-secret", &token));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        assert!(!verify("other-secret", &sample_token()));
    }

    #[test]
    fn missing_signature_fails_verification() {
        assert!(!verify("test-secret", "TICKET:IM-001"));
    }
}
