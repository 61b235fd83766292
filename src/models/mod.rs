pub mod license;
pub mod request;

pub use license::{LicenseRecord, SuspiciousReason};
pub use request::{RequestMetadata, ValidationOutcome, ValidationRequest};
