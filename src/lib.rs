// License security and validation engine for the hosting panel.
// Transport and persistence live outside; this crate covers key
// issuance, payload sealing, request signing, fingerprinting, anomaly
// detection and the validation pipeline that ties them together.
pub mod config;
pub mod error;
pub mod models;
pub mod security;
pub mod store;
pub mod validator;

pub use config::{FingerprintStrictness, SecurityConfig};
pub use error::{ConfigError, ValidationError};
pub use models::{
    LicenseRecord, RequestMetadata, SuspiciousReason, ValidationOutcome, ValidationRequest,
};
pub use store::{LicenseStore, MemoryStore};
pub use validator::LicenseValidator;
