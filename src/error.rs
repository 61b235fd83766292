/// Error taxonomy for the validation engine
use thiserror::Error;

/// Failure kinds a validation attempt can end in.
///
/// Every fallible operation in this crate converts internal failures
/// (crypto, parsing, persistence) into one of these variants before it
/// crosses the engine boundary. The display strings are deliberately
/// generic: callers relay them to remote clients and must not learn
/// whether a signature was wrong or merely stale, or whether a key is
/// unknown versus revoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Key does not match the `PREFIX-XXXX-XXXX-XXXX-XXXX` shape.
    #[error("invalid license key format")]
    MalformedKey,

    /// Bad signature or timestamp outside the freshness window.
    /// Intentionally merged so callers cannot distinguish the two.
    #[error("invalid signature or expired timestamp")]
    InvalidSignature,

    /// No active license for this key. Also covers revoked licenses.
    #[error("license not found or inactive")]
    UnknownLicense,

    /// The requested feature's usage has reached the licensed maximum.
    #[error("feature quota exceeded")]
    QuotaExceeded,

    /// Sealed payload was tampered with or encrypted under another key.
    #[error("invalid license data")]
    DecryptionFailure,

    /// Underlying store failed. The detail is logged server-side only.
    #[error("internal persistence error: {0}")]
    Persistence(String),
}

impl ValidationError {
    /// Stable machine-readable code surfaced in validation outcomes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedKey => "MalformedKey",
            Self::InvalidSignature => "InvalidSignature",
            Self::UnknownLicense => "UnknownLicense",
            Self::QuotaExceeded => "QuotaExceeded",
            Self::DecryptionFailure => "DecryptionFailure",
            Self::Persistence(_) => "InternalPersistenceError",
        }
    }
}

/// Startup configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LICENSE_MASTER_SECRET is not set")]
    MissingMasterSecret,

    #[error("invalid value for {0}")]
    InvalidSetting(&'static str),
}
