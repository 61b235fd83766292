/// HMAC-based request signing with timestamp-bounded anti-replay
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::ValidationError;

type HmacSha256 = Hmac<Sha256>;

/// Canonical signing payload: `key|timestamp|fingerprint`, with
/// `|sorted_json(extra)` appended only when extras are present. Absent
/// extras add nothing, not an empty segment, so the two forms can never
/// collide. BTreeMap serialization keeps the JSON key order canonical.
fn canonical_payload(
    license_key: &str,
    timestamp: i64,
    fingerprint: &str,
    extra: Option<&BTreeMap<String, String>>,
) -> Result<String, ValidationError> {
    let mut payload = format!("{}|{}|{}", license_key, timestamp, fingerprint);
    if let Some(extra) = extra {
        let json =
            serde_json::to_string(extra).map_err(|_| ValidationError::InvalidSignature)?;
        payload.push('|');
        payload.push_str(&json);
    }
    Ok(payload)
}

/// Sign a validation request under the master secret.
///
/// Returns the hex-encoded HMAC-SHA256 over the canonical payload.
pub fn sign_request(
    master_secret: &[u8],
    license_key: &str,
    timestamp: i64,
    fingerprint: &str,
    extra: Option<&BTreeMap<String, String>>,
) -> Result<String, ValidationError> {
    let payload = canonical_payload(license_key, timestamp, fingerprint, extra)?;

    let mut mac = HmacSha256::new_from_slice(master_secret)
        .map_err(|_| ValidationError::InvalidSignature)?;
    mac.update(payload.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signed validation request.
///
/// Freshness is checked first: a timestamp outside `max_age_secs` of now
/// fails closed regardless of the signature math. The signature compare
/// is constant time.
pub fn verify_request(
    master_secret: &[u8],
    license_key: &str,
    timestamp: i64,
    fingerprint: &str,
    extra: Option<&BTreeMap<String, String>>,
    signature: &str,
    max_age_secs: i64,
) -> bool {
    if !validate_timestamp(timestamp, max_age_secs) {
        return false;
    }

    let expected = match sign_request(master_secret, license_key, timestamp, fingerprint, extra) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    let provided = signature.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        return false;
    }

    provided.ct_eq(expected).into()
}

/// Check that a request timestamp is within the anti-replay window.
pub fn validate_timestamp(timestamp: i64, max_age_secs: i64) -> bool {
    let diff = (unix_now() - timestamp).abs();
    if diff > max_age_secs {
        log::warn!(
            "Timestamp outside freshness window: diff={}s (max={}s)",
            diff,
            max_age_secs
        );
        return false;
    }
    true
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
