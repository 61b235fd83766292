/// Validation orchestrator: the end-to-end pipeline behind `validate()`
///
/// Pipeline order is cheapest-first: structure, then signature, then the
/// store lookup, fingerprint policy, quota, and finally the statistics
/// update with the anomaly check. Every failure exit is terminal and maps
/// to exactly one `ValidationError` code; nothing in here retries.
use chrono::Utc;

use crate::config::{FingerprintStrictness, SecurityConfig};
use crate::error::ValidationError;
use crate::models::{LicenseRecord, SuspiciousReason, ValidationOutcome, ValidationRequest};
use crate::security::{
    decrypt_payload, fingerprint, generate, is_anomalous, issue_activation_token,
    redeem_activation_token, validate_key_structure, verify_request, SealedPayload,
};
use crate::store::LicenseStore;

/// Anomaly detection is skipped for licenses younger than this, where
/// the elapsed-time window is too small to give a meaningful rate.
pub const MIN_ANOMALY_WINDOW_SECS: i64 = 60;

pub struct LicenseValidator<S> {
    config: SecurityConfig,
    store: S,
}

impl<S: LicenseStore> LicenseValidator<S> {
    pub fn new(config: SecurityConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Issue a new license and persist its record.
    ///
    /// The key space (31^16 per prefix) makes collisions practically
    /// impossible; should one ever occur the insert fails and the error
    /// propagates rather than silently reusing a key.
    pub async fn issue(
        &self,
        user_ref: &str,
        plan_ref: &str,
        quota_max: Option<i64>,
    ) -> Result<LicenseRecord, ValidationError> {
        let issued = generate(&self.config, user_ref, plan_ref)?;
        let record = LicenseRecord::new(&issued, user_ref, plan_ref, quota_max);

        self.store.insert_license(record.clone()).await?;

        log::info!(
            "Issued license {} ({}) for user {} on plan {}",
            record.license_id,
            record.license_key,
            user_ref,
            plan_ref
        );
        Ok(record)
    }

    /// Run the full validation pipeline for one request.
    ///
    /// Infallible at the API level: persistence failures are logged
    /// verbosely server-side and surfaced as a generic failed outcome,
    /// like every other terminal failure.
    pub async fn validate(&self, request: &ValidationRequest) -> ValidationOutcome {
        match self.run_pipeline(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let ValidationError::Persistence(detail) = &err {
                    log::error!(
                        "Persistence failure while validating {}: {}",
                        request.license_key,
                        detail
                    );
                }
                ValidationOutcome::fail(&err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationOutcome, ValidationError> {
        // Stage 1: structure. Rejects obviously bogus keys before any
        // crypto or store access.
        validate_key_structure(&request.license_key, &self.config.key_prefix)?;

        let fp = fingerprint(&request.metadata);
        let now = Utc::now();

        // Stage 2: signature, when the caller supplied one. Verification
        // failure and staleness are deliberately indistinguishable.
        if let Some(signature) = &request.signature {
            let fresh_and_valid = verify_request(
                self.config.master_secret(),
                &request.license_key,
                request.timestamp,
                &fp,
                request.additional_data.as_ref(),
                signature,
                self.config.freshness_window_secs,
            );
            if !fresh_and_valid {
                log::warn!(
                    "❌ Signature rejected for key {} (feature {})",
                    request.license_key,
                    request.feature
                );
                // Count the failure against the record when one exists.
                if let Some(record) =
                    self.store.find_license_by_key(&request.license_key).await?
                {
                    self.store
                        .increment_validation_stats(
                            &record.license_id,
                            false,
                            &request.metadata.ip,
                            now,
                        )
                        .await?;
                }
                return Err(ValidationError::InvalidSignature);
            }
        }

        // Stage 3: record lookup. Unknown and revoked keys produce the
        // same caller-visible failure.
        let record = self
            .store
            .find_license_by_key(&request.license_key)
            .await?
            .ok_or(ValidationError::UnknownLicense)?;

        if !record.is_active() {
            log::info!("❌ Revoked license {} presented", record.license_id);
            self.record_failure(&record, &request.metadata.ip, now).await?;
            return Err(ValidationError::UnknownLicense);
        }

        // Stage 4: fingerprint policy. Unrecognized fingerprints are
        // always recorded for audit; strictness decides anything further.
        if !record.is_fingerprint_known(&fp) {
            self.store.record_fingerprint(&record.license_id, &fp).await?;
            match self.config.fingerprint_strictness {
                FingerprintStrictness::Record => {}
                FingerprintStrictness::Flag => {
                    log::warn!(
                        "⚠️  Unrecognized fingerprint on license {}, flagging",
                        record.license_id
                    );
                    if !record.is_suspicious {
                        self.store
                            .update_suspicious_flag(
                                &record.license_id,
                                SuspiciousReason::UnrecognizedFingerprint,
                            )
                            .await?;
                    }
                }
                FingerprintStrictness::Enforce => {
                    log::warn!(
                        "❌ Unrecognized fingerprint on license {}, rejecting",
                        record.license_id
                    );
                    self.record_failure(&record, &request.metadata.ip, now).await?;
                    return Err(ValidationError::UnknownLicense);
                }
            }
        }

        // Stage 5: quota. Distinct from authentication failure.
        if !record.has_quota() {
            log::info!(
                "❌ Quota exceeded on license {} for feature {}",
                record.license_id,
                request.feature
            );
            self.record_failure(&record, &request.metadata.ip, now).await?;
            return Err(ValidationError::QuotaExceeded);
        }

        // Stage 6: statistics. The success counter bump is atomic in the
        // store; a first successful validation also binds the primary
        // fingerprint.
        self.store
            .increment_validation_stats(&record.license_id, true, &request.metadata.ip, now)
            .await?;
        if record.hardware_fingerprint.is_none() {
            self.store.record_fingerprint(&record.license_id, &fp).await?;
        }

        // Anomaly check over the updated counter. A positive flag marks
        // the record for review but never blocks this request.
        let window_secs = (now - record.created_at).num_seconds();
        if window_secs >= MIN_ANOMALY_WINDOW_SECS && !record.is_suspicious {
            let updated_count = record.validation_count + 1;
            if is_anomalous(
                updated_count,
                window_secs,
                self.config.anomaly_baseline_per_hour,
            ) {
                log::warn!(
                    "⚠️  Anomalous validation rate on license {}: {} calls in {}s",
                    record.license_id,
                    updated_count,
                    window_secs
                );
                self.store
                    .update_suspicious_flag(
                        &record.license_id,
                        SuspiciousReason::HighValidationRate,
                    )
                    .await?;
            }
        }

        Ok(ValidationOutcome::ok(record.remaining_quota()))
    }

    async fn record_failure(
        &self,
        record: &LicenseRecord,
        ip: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.store
            .increment_validation_stats(&record.license_id, false, ip, now)
            .await
    }

    /// Decrypt and return the sealed issuance payload for a key.
    /// Server-side only; the plaintext never travels to clients.
    pub async fn recover_secret(&self, key: &str) -> Result<SealedPayload, ValidationError> {
        validate_key_structure(key, &self.config.key_prefix)?;

        let record = self
            .store
            .find_license_by_key(key)
            .await?
            .ok_or(ValidationError::UnknownLicense)?;

        let plaintext = decrypt_payload(&record.encrypted_secret, self.config.cipher_key())?;
        serde_json::from_slice(&plaintext).map_err(|_| ValidationError::DecryptionFailure)
    }

    /// Issue an activation token for a license id (default 24 h TTL).
    pub fn activation_token(&self, license_id: &str) -> Result<String, ValidationError> {
        issue_activation_token(&self.config, license_id, None)
    }

    /// Redeem an activation token, returning the bound license id.
    /// Consumption tracking is left to the persistence collaborator.
    pub fn activate(&self, token: &str) -> Result<String, ValidationError> {
        redeem_activation_token(&self.config, token)
    }
}
