// Common test utilities for validation pipeline integration tests

use std::collections::BTreeMap;

use license_engine::security::{fingerprint, sign_request, unix_now};
use license_engine::{
    LicenseValidator, MemoryStore, RequestMetadata, SecurityConfig, ValidationRequest,
};

pub const TEST_MASTER_SECRET: &[u8] = b"integration-test-master-secret!!";

/// Config with the default prefix and windows used across the scenarios.
/// Also wires engine logs into the test harness output.
pub fn test_config() -> SecurityConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    SecurityConfig::new(TEST_MASTER_SECRET)
}

/// Fresh validator over an empty in-memory store.
pub fn test_validator() -> LicenseValidator<MemoryStore> {
    LicenseValidator::new(test_config(), MemoryStore::new())
}

/// Metadata for the canonical test client.
pub fn client_metadata() -> RequestMetadata {
    RequestMetadata::new("203.0.113.42", "panel-agent/3.0 (linux)", "en-US,en;q=0.8")
}

/// Unsigned validation request for `key`.
pub fn unsigned_request(key: &str, feature: &str) -> ValidationRequest {
    ValidationRequest {
        license_key: key.to_string(),
        feature: feature.to_string(),
        timestamp: unix_now(),
        signature: None,
        metadata: client_metadata(),
        additional_data: None,
    }
}

/// Signed validation request for `key` at `timestamp`, built the way a
/// remote panel installation would build it.
pub fn signed_request(
    key: &str,
    feature: &str,
    timestamp: i64,
    extra: Option<BTreeMap<String, String>>,
) -> ValidationRequest {
    let metadata = client_metadata();
    let fp = fingerprint(&metadata);
    let signature = sign_request(
        test_config().master_secret(),
        key,
        timestamp,
        &fp,
        extra.as_ref(),
    )
    .expect("signing cannot fail with a valid secret");

    ValidationRequest {
        license_key: key.to_string(),
        feature: feature.to_string(),
        timestamp,
        signature: Some(signature),
        metadata,
        additional_data: extra,
    }
}
