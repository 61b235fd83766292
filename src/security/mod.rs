/// Security primitives: key generation, sealing, fingerprinting,
/// request signing and anomaly detection
pub mod anomaly;
pub mod cipher;
pub mod fingerprint;
pub mod keygen;
pub mod signing;
pub mod token;

pub use anomaly::{is_anomalous, ANOMALY_MULTIPLIER};
pub use cipher::{decrypt_payload, derive_cipher_key, encrypt_payload, KDF_ITERATIONS, KDF_SALT};
pub use fingerprint::fingerprint;
pub use keygen::{
    generate, generate_license_key, validate_key_structure, IssuedLicense, SealedPayload,
    KEY_ALPHABET,
};
pub use signing::{sign_request, unix_now, validate_timestamp, verify_request};
pub use token::{
    issue_activation_token, redeem_activation_token, ACTIVATION_TOKEN_TTL_SECS,
};
