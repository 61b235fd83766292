/// Durable license record, owned by the persistence collaborator
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::security::IssuedLicense;

/// Why a license was flagged for operator review. Closed set of known
/// reasons plus a free-text fallback for ad-hoc operator notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspiciousReason {
    /// Validation-call rate exceeded the anomaly threshold.
    HighValidationRate,
    /// A fingerprint outside the primary/allow-list was observed.
    UnrecognizedFingerprint,
    /// Flagged by an operator.
    ManualFlag,
    Other(String),
}

/// License entity as stored by the external record store.
///
/// Mutated exclusively by the validation orchestrator (through the
/// store interface) after a validation attempt. Lifecycle:
/// create-at-issuance, mutate-on-every-validation, soft-suspend only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Internal identifier, distinct from the customer-facing key.
    pub license_id: String,

    /// Human-readable key. Never reused across licenses.
    pub license_key: String,

    /// Sealed issuance payload (opened server-side only).
    pub encrypted_secret: String,

    /// Truncated issuance HMAC for operator spot checks.
    pub authenticity_tag: String,

    /// Owner and plan references in the external billing domain.
    pub user_ref: String,
    pub plan_ref: String,

    /// Primary fingerprint, adopted from the first successful
    /// validation. None until then.
    pub hardware_fingerprint: Option<String>,

    /// Operator-managed allow-list of additional fingerprints.
    #[serde(default)]
    pub allowed_fingerprints: Vec<String>,

    /// Unrecognized fingerprints recorded for audit.
    #[serde(default)]
    pub observed_fingerprints: Vec<String>,

    /// Monotonically non-decreasing outcome counters.
    pub validation_count: i64,
    pub failed_validation_count: i64,

    pub last_validation_at: Option<DateTime<Utc>>,
    pub last_validation_ip: Option<String>,

    /// Non-blocking review flag set by the anomaly detector or an operator.
    pub is_suspicious: bool,
    pub suspicious_reason: Option<SuspiciousReason>,

    /// Feature quota: current usage (maintained by the consuming CRUD
    /// modules) against the licensed maximum (None = unlimited).
    pub quota_used: i64,
    pub quota_max: Option<i64>,

    /// Soft suspension. Revoked licenses validate as unknown.
    pub revoked: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LicenseRecord {
    /// Build a fresh record from issuance output.
    pub fn new(
        issued: &IssuedLicense,
        user_ref: &str,
        plan_ref: &str,
        quota_max: Option<i64>,
    ) -> Self {
        Self {
            license_id: format!("lic_{}", Uuid::new_v4().simple()),
            license_key: issued.license_key.clone(),
            encrypted_secret: issued.encrypted_secret.clone(),
            authenticity_tag: issued.authenticity_tag.clone(),
            user_ref: user_ref.to_string(),
            plan_ref: plan_ref.to_string(),
            hardware_fingerprint: None,
            allowed_fingerprints: Vec::new(),
            observed_fingerprints: Vec::new(),
            validation_count: 0,
            failed_validation_count: 0,
            last_validation_at: None,
            last_validation_ip: None,
            is_suspicious: false,
            suspicious_reason: None,
            quota_used: 0,
            quota_max,
            revoked: false,
            created_at: issued.issued_at,
            updated_at: issued.issued_at,
        }
    }

    /// Active means not revoked.
    pub fn is_active(&self) -> bool {
        !self.revoked
    }

    /// Whether feature usage is still under the licensed maximum.
    pub fn has_quota(&self) -> bool {
        match self.quota_max {
            Some(max) => self.quota_used < max,
            None => true,
        }
    }

    /// Remaining feature quota (None = unlimited).
    pub fn remaining_quota(&self) -> Option<i64> {
        self.quota_max.map(|max| (max - self.quota_used).max(0))
    }

    /// Whether a fingerprint matches the primary or the allow-list.
    /// A record with no primary yet accepts any fingerprint.
    pub fn is_fingerprint_known(&self, fingerprint: &str) -> bool {
        match &self.hardware_fingerprint {
            None => true,
            Some(primary) => {
                primary == fingerprint
                    || self.allowed_fingerprints.iter().any(|f| f == fingerprint)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::security::generate;

    fn record() -> LicenseRecord {
        let config = SecurityConfig::new(b"model-test-master-secret-32byte!");
        let issued = generate(&config, "u1", "p1").unwrap();
        LicenseRecord::new(&issued, "u1", "p1", Some(10))
    }

    #[test]
    fn test_new_record_defaults() {
        let rec = record();
        assert!(rec.license_id.starts_with("lic_"));
        assert_eq!(rec.validation_count, 0);
        assert_eq!(rec.failed_validation_count, 0);
        assert!(!rec.is_suspicious);
        assert!(!rec.revoked);
        assert!(rec.hardware_fingerprint.is_none());
        assert!(rec.is_active());
    }

    #[test]
    fn test_quota_checks() {
        let mut rec = record();
        assert!(rec.has_quota());
        assert_eq!(rec.remaining_quota(), Some(10));

        rec.quota_used = 10;
        assert!(!rec.has_quota());
        assert_eq!(rec.remaining_quota(), Some(0));

        rec.quota_max = None;
        assert!(rec.has_quota());
        assert_eq!(rec.remaining_quota(), None);
    }

    #[test]
    fn test_fingerprint_policy_helpers() {
        let mut rec = record();
        // No primary yet: everything is acceptable.
        assert!(rec.is_fingerprint_known("anything"));

        rec.hardware_fingerprint = Some("fp-primary".to_string());
        assert!(rec.is_fingerprint_known("fp-primary"));
        assert!(!rec.is_fingerprint_known("fp-other"));

        rec.allowed_fingerprints.push("fp-other".to_string());
        assert!(rec.is_fingerprint_known("fp-other"));
    }

    #[test]
    fn test_revoked_record_is_inactive() {
        let mut rec = record();
        rec.revoked = true;
        assert!(!rec.is_active());
    }

    #[test]
    fn test_suspicious_reason_serialization() {
        let json = serde_json::to_string(&SuspiciousReason::HighValidationRate).unwrap();
        assert_eq!(json, r#""high_validation_rate""#);

        let other: SuspiciousReason =
            serde_json::from_str(r#"{"other":"manual note"}"#).unwrap();
        assert_eq!(other, SuspiciousReason::Other("manual note".to_string()));
    }
}
