/// Request fingerprinting: a stable pseudo-identity for the caller
///
/// The raw User-Agent and Accept-Language values are hashed individually
/// before entering the composite, so the stored fingerprint reveals the
/// IP at most and never the raw headers.
use sha2::{Digest, Sha256};

use crate::models::RequestMetadata;

/// Compute the composite fingerprint for a request.
///
/// `SHA-256(ip | hex(SHA-256(user_agent)) | hex(SHA-256(accept_language)))`,
/// hex encoded. Deterministic across processes: no per-process salt, so
/// fingerprints recorded over a license's lifetime stay comparable.
pub fn fingerprint(metadata: &RequestMetadata) -> String {
    let ua_hash = hex::encode(Sha256::digest(metadata.user_agent.as_bytes()));
    let lang_hash = hex::encode(Sha256::digest(metadata.accept_language.as_bytes()));

    let composite = format!("{}|{}|{}", metadata.ip, ua_hash, lang_hash);
    hex::encode(Sha256::digest(composite.as_bytes()))
}
