use platform_models::{MIN_KEY_LENGTH, MIN_SECRET_LENGTH};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// A freshly minted API key pair. The cleartext `key` and `secret` are
/// returned to the caller exactly once; only their hashes are persisted.
pub struct IssuedApiKey {
    pub key: String,
    pub secret: String,
    pub key_hash: String,
    pub secret_hash: String,
}

pub fn generate() -> IssuedApiKey {
    let key = random_token(MIN_KEY_LENGTH);
    let secret = random_token(MIN_SECRET_LENGTH.max(32));
    let key_hash = hash(&key);
    let secret_hash = hash(&secret);
    IssuedApiKey {
        key,
        secret,
        key_hash,
        secret_hash,
    }
}

pub fn hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_token(min_len: usize) -> String {
    let mut bytes = vec![0u8; min_len.max(16)];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
