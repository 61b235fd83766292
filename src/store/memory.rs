/// In-memory reference implementation of [`LicenseStore`]
///
/// Backs the test suite and small embedded deployments. All mutations
/// run under a single lock, which gives the same atomicity guarantee a
/// real store provides with single-statement updates.
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ValidationError;
use crate::models::{LicenseRecord, SuspiciousReason};
use crate::store::LicenseStore;

#[derive(Default)]
pub struct MemoryStore {
    // Keyed by license key; id lookups scan.
    records: Mutex<HashMap<String, LicenseRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a record by key. Test and embedding convenience.
    pub fn get(&self, key: &str) -> Option<LicenseRecord> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutate a record in place by key. Lets tests and embedders adjust
    /// quota, revocation or timestamps without widening the store trait.
    pub fn modify<F>(&self, key: &str, f: F) -> Result<(), ValidationError>
    where
        F: FnOnce(&mut LicenseRecord),
    {
        let mut records = lock(&self.records)?;
        let record = records
            .get_mut(key)
            .ok_or(ValidationError::UnknownLicense)?;
        f(record);
        record.updated_at = Utc::now();
        Ok(())
    }

    fn with_record_by_id<F>(&self, license_id: &str, f: F) -> Result<(), ValidationError>
    where
        F: FnOnce(&mut LicenseRecord),
    {
        let mut records = lock(&self.records)?;
        let record = records
            .values_mut()
            .find(|r| r.license_id == license_id)
            .ok_or(ValidationError::UnknownLicense)?;
        f(record);
        Ok(())
    }
}

fn lock(
    records: &Mutex<HashMap<String, LicenseRecord>>,
) -> Result<std::sync::MutexGuard<'_, HashMap<String, LicenseRecord>>, ValidationError> {
    records
        .lock()
        .map_err(|_| ValidationError::Persistence("memory store lock poisoned".to_string()))
}

impl LicenseStore for MemoryStore {
    async fn find_license_by_key(
        &self,
        key: &str,
    ) -> Result<Option<LicenseRecord>, ValidationError> {
        Ok(lock(&self.records)?.get(key).cloned())
    }

    async fn insert_license(&self, record: LicenseRecord) -> Result<(), ValidationError> {
        let mut records = lock(&self.records)?;
        if records.contains_key(&record.license_key) {
            return Err(ValidationError::Persistence(format!(
                "duplicate license key: {}",
                record.license_key
            )));
        }
        records.insert(record.license_key.clone(), record);
        Ok(())
    }

    async fn increment_validation_stats(
        &self,
        license_id: &str,
        success: bool,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.with_record_by_id(license_id, |record| {
            if success {
                record.validation_count += 1;
            } else {
                record.failed_validation_count += 1;
            }
            record.last_validation_at = Some(now);
            record.last_validation_ip = Some(ip.to_string());
            record.updated_at = now;
        })
    }

    async fn update_suspicious_flag(
        &self,
        license_id: &str,
        reason: SuspiciousReason,
    ) -> Result<(), ValidationError> {
        self.with_record_by_id(license_id, |record| {
            record.is_suspicious = true;
            record.suspicious_reason = Some(reason);
            record.updated_at = Utc::now();
        })
    }

    async fn record_fingerprint(
        &self,
        license_id: &str,
        fingerprint: &str,
    ) -> Result<(), ValidationError> {
        self.with_record_by_id(license_id, |record| {
            if record.hardware_fingerprint.is_none() {
                record.hardware_fingerprint = Some(fingerprint.to_string());
            } else if !record
                .observed_fingerprints
                .iter()
                .any(|f| f == fingerprint)
            {
                record.observed_fingerprints.push(fingerprint.to_string());
            }
            record.updated_at = Utc::now();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::security::generate;

    fn seeded() -> (MemoryStore, LicenseRecord) {
        let config = SecurityConfig::new(b"store-test-master-secret-32byte!");
        let issued = generate(&config, "u1", "p1").unwrap();
        let record = LicenseRecord::new(&issued, "u1", "p1", None);
        (MemoryStore::new(), record)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (store, record) = seeded();
        let key = record.license_key.clone();

        store.insert_license(record).await.unwrap();
        let found = store.find_license_by_key(&key).await.unwrap();
        assert_eq!(found.map(|r| r.license_key), Some(key));

        let missing = store
            .find_license_by_key("HPL-2222-3333-4444-5555")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_insert_fails() {
        let (store, record) = seeded();
        store.insert_license(record.clone()).await.unwrap();
        let err = store.insert_license(record).await.unwrap_err();
        assert!(matches!(err, ValidationError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_increment_stats() {
        let (store, record) = seeded();
        let key = record.license_key.clone();
        let id = record.license_id.clone();
        store.insert_license(record).await.unwrap();

        let now = Utc::now();
        store
            .increment_validation_stats(&id, true, "198.51.100.1", now)
            .await
            .unwrap();
        store
            .increment_validation_stats(&id, false, "198.51.100.2", now)
            .await
            .unwrap();

        let rec = store.get(&key).unwrap();
        assert_eq!(rec.validation_count, 1);
        assert_eq!(rec.failed_validation_count, 1);
        assert_eq!(rec.last_validation_ip.as_deref(), Some("198.51.100.2"));
        assert_eq!(rec.last_validation_at, Some(now));
    }

    #[tokio::test]
    async fn test_suspicious_flag() {
        let (store, record) = seeded();
        let key = record.license_key.clone();
        let id = record.license_id.clone();
        store.insert_license(record).await.unwrap();

        store
            .update_suspicious_flag(&id, SuspiciousReason::ManualFlag)
            .await
            .unwrap();

        let rec = store.get(&key).unwrap();
        assert!(rec.is_suspicious);
        assert_eq!(rec.suspicious_reason, Some(SuspiciousReason::ManualFlag));
    }

    #[tokio::test]
    async fn test_record_fingerprint_adopts_then_audits() {
        let (store, record) = seeded();
        let key = record.license_key.clone();
        let id = record.license_id.clone();
        store.insert_license(record).await.unwrap();

        store.record_fingerprint(&id, "fp-one").await.unwrap();
        let rec = store.get(&key).unwrap();
        assert_eq!(rec.hardware_fingerprint.as_deref(), Some("fp-one"));
        assert!(rec.observed_fingerprints.is_empty());

        store.record_fingerprint(&id, "fp-two").await.unwrap();
        store.record_fingerprint(&id, "fp-two").await.unwrap();
        let rec = store.get(&key).unwrap();
        assert_eq!(rec.observed_fingerprints, vec!["fp-two".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_id_errors() {
        let (store, _) = seeded();
        let err = store
            .increment_validation_stats("lic_missing", true, "ip", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownLicense);
    }
}
