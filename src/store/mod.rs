/// Persistence boundary for license records
///
/// The engine never talks to a database directly; it consumes this
/// interface. Implementations must apply counter increments atomically
/// (a single-statement `count = count + 1`, not read-modify-write in
/// the caller) so concurrent validations of the same key never lose
/// updates.
pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::models::{LicenseRecord, SuspiciousReason};

pub trait LicenseStore: Send + Sync {
    /// Fetch a license by its customer-facing key.
    fn find_license_by_key(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<LicenseRecord>, ValidationError>> + Send;

    /// Persist a freshly issued license. Fails if the key already exists.
    fn insert_license(
        &self,
        record: LicenseRecord,
    ) -> impl std::future::Future<Output = Result<(), ValidationError>> + Send;

    /// Atomically bump the success or failure counter and stamp
    /// `last_validation_at` / `last_validation_ip`.
    fn increment_validation_stats(
        &self,
        license_id: &str,
        success: bool,
        ip: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), ValidationError>> + Send;

    /// Flag a license for operator review. Never unsets the flag.
    fn update_suspicious_flag(
        &self,
        license_id: &str,
        reason: SuspiciousReason,
    ) -> impl std::future::Future<Output = Result<(), ValidationError>> + Send;

    /// Record an observed fingerprint: adopted as the primary when none
    /// is set yet, appended to the audit trail otherwise.
    fn record_fingerprint(
        &self,
        license_id: &str,
        fingerprint: &str,
    ) -> impl std::future::Future<Output = Result<(), ValidationError>> + Send;
}
