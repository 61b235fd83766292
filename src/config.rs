/// Process-wide security configuration
///
/// Constructed once at startup and passed by reference into the engine.
/// Holds the normalized master secret and the cipher key derived from it,
/// so the expensive KDF runs exactly once per process.
use sha2::{Digest, Sha256};
use std::env;

use crate::error::ConfigError;
use crate::security::cipher::derive_cipher_key;

/// Default anti-replay window for signed validation requests (seconds).
pub const DEFAULT_FRESHNESS_WINDOW_SECS: i64 = 300;

/// Default anomaly baseline: expected validations per hour for a healthy license.
pub const DEFAULT_ANOMALY_BASELINE_PER_HOUR: f64 = 100.0;

/// Default product prefix for issued license keys.
pub const DEFAULT_KEY_PREFIX: &str = "HPL";

/// How the orchestrator treats a fingerprint it has not seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintStrictness {
    /// Record the fingerprint for audit, allow the request.
    #[default]
    Record,
    /// Record it and mark the license suspicious, allow the request.
    Flag,
    /// Reject the request (callers see a generic unknown-license failure).
    Enforce,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    master_secret: [u8; 32],
    cipher_key: [u8; 32],
    pub key_prefix: String,
    pub freshness_window_secs: i64,
    pub anomaly_baseline_per_hour: f64,
    pub fingerprint_strictness: FingerprintStrictness,
}

impl SecurityConfig {
    /// Build a config from a raw master secret.
    ///
    /// A secret of exactly 32 bytes is used as-is; any other length is
    /// hashed whole with SHA-256, so no part of a long secret is ever
    /// discarded. The payload cipher key is derived here, once.
    pub fn new(master_secret: &[u8]) -> Self {
        let master_secret = normalize_secret(master_secret);
        let cipher_key = derive_cipher_key(&master_secret);
        Self {
            master_secret,
            cipher_key,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            anomaly_baseline_per_hour: DEFAULT_ANOMALY_BASELINE_PER_HOUR,
            fingerprint_strictness: FingerprintStrictness::default(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// `LICENSE_MASTER_SECRET` is required; everything else falls back
    /// to defaults:
    /// - `LICENSE_KEY_PREFIX`
    /// - `LICENSE_FRESHNESS_WINDOW_SECS`
    /// - `LICENSE_ANOMALY_BASELINE_PER_HOUR`
    /// - `LICENSE_FINGERPRINT_STRICT` (`record` | `flag` | `enforce`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret =
            env::var("LICENSE_MASTER_SECRET").map_err(|_| ConfigError::MissingMasterSecret)?;
        let mut config = Self::new(secret.as_bytes());

        if let Ok(prefix) = env::var("LICENSE_KEY_PREFIX") {
            config = config
                .with_key_prefix(&prefix)
                .map_err(|_| ConfigError::InvalidSetting("LICENSE_KEY_PREFIX"))?;
        }

        if let Ok(window) = env::var("LICENSE_FRESHNESS_WINDOW_SECS") {
            config.freshness_window_secs = window
                .parse()
                .map_err(|_| ConfigError::InvalidSetting("LICENSE_FRESHNESS_WINDOW_SECS"))?;
        }

        if let Ok(baseline) = env::var("LICENSE_ANOMALY_BASELINE_PER_HOUR") {
            config.anomaly_baseline_per_hour = baseline
                .parse()
                .map_err(|_| ConfigError::InvalidSetting("LICENSE_ANOMALY_BASELINE_PER_HOUR"))?;
        }

        if let Ok(strictness) = env::var("LICENSE_FINGERPRINT_STRICT") {
            config.fingerprint_strictness = match strictness.to_lowercase().as_str() {
                "record" => FingerprintStrictness::Record,
                "flag" => FingerprintStrictness::Flag,
                "enforce" => FingerprintStrictness::Enforce,
                _ => return Err(ConfigError::InvalidSetting("LICENSE_FINGERPRINT_STRICT")),
            };
        }

        Ok(config)
    }

    /// Normalized 32-byte master secret (HMAC signing key).
    pub fn master_secret(&self) -> &[u8; 32] {
        &self.master_secret
    }

    /// Derived AES-256 key for the payload cipher.
    pub fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }

    /// Set the product prefix for issued keys. An empty or
    /// dash-containing prefix would make generated keys fail their own
    /// structure check, so those are rejected here just like in
    /// [`SecurityConfig::from_env`].
    pub fn with_key_prefix(mut self, prefix: &str) -> Result<Self, ConfigError> {
        if !valid_key_prefix(prefix) {
            return Err(ConfigError::InvalidSetting("key prefix"));
        }
        self.key_prefix = prefix.to_string();
        Ok(self)
    }

    pub fn with_freshness_window(mut self, secs: i64) -> Self {
        self.freshness_window_secs = secs;
        self
    }

    pub fn with_anomaly_baseline(mut self, per_hour: f64) -> Self {
        self.anomaly_baseline_per_hour = per_hour;
        self
    }

    pub fn with_fingerprint_strictness(mut self, strictness: FingerprintStrictness) -> Self {
        self.fingerprint_strictness = strictness;
        self
    }
}

fn normalize_secret(secret: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    if secret.len() == 32 {
        out.copy_from_slice(secret);
    } else {
        // Hash the whole secret: every input byte contributes to the key.
        let digest = Sha256::digest(secret);
        out.copy_from_slice(&digest);
    }
    out
}

fn valid_key_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && !prefix.contains('-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_is_stretched() {
        let config = SecurityConfig::new(b"short");
        // Stretched secret is a full 32 bytes and stable across calls.
        let again = SecurityConfig::new(b"short");
        assert_eq!(config.master_secret(), again.master_secret());
        assert_ne!(config.master_secret(), &[0u8; 32]);
    }

    #[test]
    fn test_exact_32_byte_secret_passes_through() {
        let exact = [0x41u8; 32];
        let config = SecurityConfig::new(&exact);
        assert_eq!(config.master_secret(), &exact);
    }

    #[test]
    fn test_long_secret_uses_every_byte() {
        // Two 64-byte secrets sharing a 32-byte prefix and differing only
        // in the final byte must not derive the same keys.
        let mut a = [0x41u8; 64];
        let mut b = [0x41u8; 64];
        a[63] = 0x00;
        b[63] = 0x01;

        let config_a = SecurityConfig::new(&a);
        let config_b = SecurityConfig::new(&b);
        assert_ne!(config_a.master_secret(), config_b.master_secret());
        assert_ne!(config_a.cipher_key(), config_b.cipher_key());
    }

    #[test]
    fn test_different_secrets_derive_different_cipher_keys() {
        let a = SecurityConfig::new(b"secret-a-secret-a-secret-a-32b!!");
        let b = SecurityConfig::new(b"secret-b-secret-b-secret-b-32b!!");
        assert_ne!(a.cipher_key(), b.cipher_key());
    }

    #[test]
    fn test_builder_setters() {
        let config = SecurityConfig::new(b"test")
            .with_key_prefix("ZZ")
            .unwrap()
            .with_freshness_window(60)
            .with_anomaly_baseline(10.0)
            .with_fingerprint_strictness(FingerprintStrictness::Enforce);
        assert_eq!(config.key_prefix, "ZZ");
        assert_eq!(config.freshness_window_secs, 60);
        assert_eq!(config.anomaly_baseline_per_hour, 10.0);
        assert_eq!(
            config.fingerprint_strictness,
            FingerprintStrictness::Enforce
        );
    }

    #[test]
    fn test_builder_rejects_unusable_prefixes() {
        // A dash inside the prefix would split into an extra key group;
        // empty would drop the prefix group entirely.
        assert!(SecurityConfig::new(b"test").with_key_prefix("A-B").is_err());
        assert!(SecurityConfig::new(b"test").with_key_prefix("").is_err());
        assert!(SecurityConfig::new(b"test").with_key_prefix("HPX").is_ok());
    }
}
