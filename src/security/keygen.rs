/// License key generation and structural validation
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::error::ValidationError;
use crate::security::cipher::encrypt_payload;

type HmacSha256 = Hmac<Sha256>;

/// 31-symbol alphabet for key groups. Excludes 0/O, 1/I and L so keys
/// survive being read aloud or retyped from a screenshot.
pub const KEY_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Symbols per group and random groups per key (`PREFIX-XXXX-XXXX-XXXX-XXXX`).
pub const GROUP_LEN: usize = 4;
pub const GROUP_COUNT: usize = 4;

/// Display length of the truncated authenticity tag (hex chars).
pub const AUTH_TAG_LEN: usize = 16;

/// How many characters of user/plan refs go into the sealed payload.
const REF_PREFIX_LEN: usize = 8;

/// Everything produced at issuance time. The caller persists the whole
/// of it; nothing here touches storage.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    /// Human-readable key handed to the customer.
    pub license_key: String,
    /// Sealed `SealedPayload`, stored next to the key, opened server-side only.
    pub encrypted_secret: String,
    /// Truncated HMAC over key + refs + issue time. Informational
    /// defense-in-depth for operator spot checks, not verified per request.
    pub authenticity_tag: String,
    pub issued_at: DateTime<Utc>,
}

/// Plaintext of the encrypted secret. Refs are truncated so the sealed
/// blob identifies the owner without carrying the full references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub user_ref_prefix: String,
    pub plan_ref_prefix: String,
    pub issued_at: i64,
    pub nonce: String,
}

/// Generate a license key plus its sealed secret and authenticity tag.
///
/// Pure apart from secure randomness: no store or network access.
pub fn generate(
    config: &SecurityConfig,
    user_ref: &str,
    plan_ref: &str,
) -> Result<IssuedLicense, ValidationError> {
    let license_key = generate_license_key(&config.key_prefix);
    let issued_at = Utc::now();

    let authenticity_tag = authenticity_tag(
        config.master_secret(),
        &license_key,
        user_ref,
        plan_ref,
        issued_at.timestamp(),
    )?;

    let payload = SealedPayload {
        user_ref_prefix: truncate_ref(user_ref),
        plan_ref_prefix: truncate_ref(plan_ref),
        issued_at: issued_at.timestamp(),
        nonce: Uuid::new_v4().simple().to_string(),
    };
    let plaintext =
        serde_json::to_vec(&payload).map_err(|_| ValidationError::DecryptionFailure)?;
    let encrypted_secret = encrypt_payload(&plaintext, config.cipher_key())?;

    Ok(IssuedLicense {
        license_key,
        encrypted_secret,
        authenticity_tag,
        issued_at,
    })
}

/// Assemble `PREFIX-XXXX-XXXX-XXXX-XXXX` from the restricted alphabet
/// using the OS CSPRNG.
pub fn generate_license_key(prefix: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + GROUP_COUNT * (GROUP_LEN + 1));
    key.push_str(prefix);

    for _ in 0..GROUP_COUNT {
        key.push('-');
        for _ in 0..GROUP_LEN {
            let idx = OsRng.gen_range(0..KEY_ALPHABET.len());
            key.push(KEY_ALPHABET[idx] as char);
        }
    }

    key
}

/// Validate a key against the structural invariant: exactly five
/// dash-separated groups, the first being the literal product prefix,
/// the rest exactly four symbols from the restricted alphabet.
///
/// This is the cheapest rejection in the pipeline and runs before any
/// crypto or store access.
pub fn validate_key_structure(key: &str, prefix: &str) -> Result<(), ValidationError> {
    let mut groups = key.split('-');

    if groups.next() != Some(prefix) {
        return Err(ValidationError::MalformedKey);
    }

    let mut count = 0;
    for group in groups {
        count += 1;
        if group.len() != GROUP_LEN
            || !group.bytes().all(|b| KEY_ALPHABET.contains(&b))
        {
            return Err(ValidationError::MalformedKey);
        }
    }

    if count != GROUP_COUNT {
        return Err(ValidationError::MalformedKey);
    }

    Ok(())
}

/// `HMAC-SHA256(master, key:user:plan:issued_at)`, hex, truncated for display.
fn authenticity_tag(
    master_secret: &[u8],
    license_key: &str,
    user_ref: &str,
    plan_ref: &str,
    issued_at: i64,
) -> Result<String, ValidationError> {
    let mut mac = HmacSha256::new_from_slice(master_secret)
        .map_err(|_| ValidationError::DecryptionFailure)?;
    mac.update(
        format!("{}:{}:{}:{}", license_key, user_ref, plan_ref, issued_at).as_bytes(),
    );

    let mut tag = hex::encode(mac.finalize().into_bytes());
    tag.truncate(AUTH_TAG_LEN);
    Ok(tag)
}

fn truncate_ref(reference: &str) -> String {
    reference.chars().take(REF_PREFIX_LEN).collect()
}
