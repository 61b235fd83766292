/// Per-call validation request and outcome types
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request-origin metadata the fingerprint is derived from.
///
/// Raw header values live only for the duration of the call; the engine
/// persists nothing but the composite hash.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestMetadata {
    /// Caller IP address as seen by the transport layer.
    pub ip: String,
    /// Raw User-Agent header (empty string when absent).
    pub user_agent: String,
    /// Raw Accept-Language header (empty string when absent).
    pub accept_language: String,
}

impl RequestMetadata {
    pub fn new(ip: &str, user_agent: &str, accept_language: &str) -> Self {
        Self {
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            accept_language: accept_language.to_string(),
        }
    }
}

/// One inbound validation call. Ephemeral: constructed per call and
/// discarded after the outcome is produced.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationRequest {
    /// License key being validated.
    pub license_key: String,

    /// Feature the client is about to use (quota is checked against it).
    pub feature: String,

    /// Client-supplied unix timestamp, bounded by the freshness window
    /// when a signature is present.
    pub timestamp: i64,

    /// Optional HMAC signature. Absent means the caller opted out of
    /// anti-replay and relies on store-backed checks only.
    pub signature: Option<String>,

    /// Request-origin metadata used for fingerprinting.
    pub metadata: RequestMetadata,

    /// Optional structured extras included in the signed payload.
    /// BTreeMap keeps the canonical JSON deterministic.
    pub additional_data: Option<BTreeMap<String, String>>,
}

/// Final pass/fail decision for one validation call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,

    /// Machine-readable error code when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Remaining quota for the requested feature (None = unlimited or
    /// not applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_quota: Option<i64>,
}

impl ValidationOutcome {
    pub fn ok(remaining_quota: Option<i64>) -> Self {
        Self {
            valid: true,
            error: None,
            remaining_quota,
        }
    }

    pub fn fail(error: &crate::error::ValidationError) -> Self {
        Self {
            valid: false,
            error: Some(error.code().to_string()),
            remaining_quota: None,
        }
    }
}
