/// Short-lived activation tokens
///
/// A token seals `{license_id, expires_at, nonce}` with the payload
/// cipher. Single-use bookkeeping is not enforced here; the persistence
/// collaborator owns consumption tracking (see DESIGN.md).
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::error::ValidationError;
use crate::security::cipher::{decrypt_payload, encrypt_payload};

/// Default token lifetime: 24 hours.
pub const ACTIVATION_TOKEN_TTL_SECS: i64 = 86_400;

#[derive(Debug, Serialize, Deserialize)]
struct ActivationToken {
    license_id: String,
    expires_at: i64,
    nonce: String,
}

/// Issue an activation token for a license. `ttl` falls back to
/// [`ACTIVATION_TOKEN_TTL_SECS`] when not given.
pub fn issue_activation_token(
    config: &SecurityConfig,
    license_id: &str,
    ttl: Option<Duration>,
) -> Result<String, ValidationError> {
    let ttl = ttl.unwrap_or_else(|| Duration::seconds(ACTIVATION_TOKEN_TTL_SECS));
    let token = ActivationToken {
        license_id: license_id.to_string(),
        expires_at: (Utc::now() + ttl).timestamp(),
        nonce: Uuid::new_v4().simple().to_string(),
    };

    let plaintext = serde_json::to_vec(&token).map_err(|_| ValidationError::DecryptionFailure)?;
    encrypt_payload(&plaintext, config.cipher_key())
}

/// Redeem an activation token, returning the bound license id.
///
/// Tampered or undecryptable tokens yield `DecryptionFailure`; a token
/// past its expiry yields `InvalidSignature` (merged with the stale-
/// timestamp case so callers learn nothing beyond "not acceptable").
pub fn redeem_activation_token(
    config: &SecurityConfig,
    token: &str,
) -> Result<String, ValidationError> {
    let plaintext = decrypt_payload(token, config.cipher_key())?;
    let token: ActivationToken =
        serde_json::from_slice(&plaintext).map_err(|_| ValidationError::DecryptionFailure)?;

    if token.expires_at < Utc::now().timestamp() {
        log::warn!("Expired activation token for license {}", token.license_id);
        return Err(ValidationError::InvalidSignature);
    }

    Ok(token.license_id)
}
