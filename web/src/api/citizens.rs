//! Admin endpoints for citizen records.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use wereda_core::IdentityHash;

/// Request to set or clear a blacklist flag.
///
/// The citizen is addressed by identity digest (as shown in audit records)
/// so the raw identifier never transits the admin surface.
#[derive(Debug, Deserialize)]
pub struct BlacklistRequest {
    /// Full hex identity digest.
    pub identity_hash: String,
    /// New blacklist state.
    pub blacklisted: bool,
    /// Reason, recorded when blacklisting.
    pub reason: Option<String>,
}

/// Response after a blacklist change.
#[derive(Debug, Serialize)]
pub struct BlacklistResponse {
    /// Message for the admin.
    pub message: String,
    /// Truncated identity digest.
    pub identity_display: String,
    /// Blacklist state after the change.
    pub blacklisted: bool,
}

/// `POST /api/citizens/blacklist` - set or clear the blacklist flag.
pub async fn set_blacklist(
    State(state): State<AppState>,
    Json(request): Json<BlacklistRequest>,
) -> Result<Json<BlacklistResponse>, AppError> {
    let citizen = state
        .engine
        .set_blacklist(
            &IdentityHash::from_hex(request.identity_hash),
            request.blacklisted,
            request.reason,
        )
        .await?;
    Ok(Json(BlacklistResponse {
        message: if citizen.blacklisted {
            "Citizen blacklisted".to_string()
        } else {
            "Blacklist cleared".to_string()
        },
        identity_display: citizen.identity_hash.truncated(),
        blacklisted: citizen.blacklisted,
    }))
}
