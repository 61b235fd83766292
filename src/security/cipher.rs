/// Payload cipher: AES-256-GCM keyed from the master secret
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::ValidationError;

/// PBKDF2-HMAC-SHA256 iteration count for the master-key derivation.
/// Fixed so the derived key is stable across process restarts; changing
/// it is a key rotation and requires re-encrypting stored secrets.
pub const KDF_ITERATIONS: u32 = 100_000;

/// Application-specific KDF salt. Versioned so a future rotation can
/// bump it deliberately.
pub const KDF_SALT: &[u8] = b"license-engine/payload-cipher/v1";

const NONCE_LEN: usize = 12;

/// Derive the 256-bit payload-cipher key from the master secret.
pub fn derive_cipher_key(master_secret: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(master_secret, KDF_SALT, KDF_ITERATIONS, &mut key);
    key
}

/// Seal a payload. Output is base64url(nonce || ciphertext) with a fresh
/// random 96-bit nonce per call.
pub fn encrypt_payload(plaintext: &[u8], key: &[u8; 32]) -> Result<String, ValidationError> {
    let cipher = Aes256Gcm::new(key.into());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| ValidationError::DecryptionFailure)?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);

    Ok(general_purpose::URL_SAFE_NO_PAD.encode(&combined))
}

/// Open a sealed payload. Any malformed encoding, truncation, tampering
/// or wrong key yields `DecryptionFailure`; callers never see garbage
/// plaintext or cipher internals.
pub fn decrypt_payload(encoded: &str, key: &[u8; 32]) -> Result<Vec<u8>, ValidationError> {
    let combined = general_purpose::URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| ValidationError::DecryptionFailure)?;

    if combined.len() < NONCE_LEN {
        return Err(ValidationError::DecryptionFailure);
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new(key.into());
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| ValidationError::DecryptionFailure)
}
