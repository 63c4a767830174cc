use once_cell_regexes::*;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Strips volatile substrings (timestamps, UUIDs, addresses, numbers) from
/// an error message so that transient, functionally-identical failures hash
/// to the same fingerprint.
pub fn normalize_error_message(message: &str) -> String {
    let mut normalized = message.to_string();
    normalized = rfc3339_re().replace_all(&normalized, "<ts>").into_owned();
    normalized = uuid_re().replace_all(&normalized, "<uuid>").into_owned();
    normalized = ipv4_re().replace_all(&normalized, "<ip>").into_owned();
    normalized = number_re().replace_all(&normalized, "<n>").into_owned();
    normalized.trim().to_string()
}

/// Stable fingerprint of `(check_id, normalized_error_message)`.
pub fn error_hash(check_id: Uuid, error_message: &str) -> String {
    let normalized = normalize_error_message(error_message);
    let mut hasher = Sha256::new();
    hasher.update(check_id.as_bytes());
    hasher.update(b":");
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

mod once_cell_regexes {
    use regex::Regex;
    use std::sync::OnceLock;

    pub fn rfc3339_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| {
            Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?").unwrap()
        })
    }

    pub fn uuid_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| {
            Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}").unwrap()
        })
    }

    pub fn ipv4_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap())
    }

    pub fn number_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"\b\d+\b").unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_timestamps_and_ports() {
        let a = normalize_error_message("connect to 10.0.0.5:8080 failed at 2026-07-29T10:00:00Z");
        let b = normalize_error_message("connect to 10.0.0.5:8081 failed at 2026-07-29T10:00:05Z");
        assert_eq!(a, b);
    }

    #[test]
    fn different_error_text_hashes_differently() {
        let check_id = Uuid::new_v4();
        let a = error_hash(check_id, "connection refused");
        let b = error_hash(check_id, "timed out");
        assert_ne!(a, b);
    }

    #[test]
    fn same_check_and_normalized_message_hash_identically() {
        let check_id = Uuid::new_v4();
        let a = error_hash(check_id, "request id abc123 failed after 503 ms");
        let b = error_hash(check_id, "request id xyz987 failed after 612 ms");
        assert_eq!(a, b);
    }

    #[test]
    fn different_checks_hash_differently_for_same_message() {
        let a = error_hash(Uuid::new_v4(), "connection refused");
        let b = error_hash(Uuid::new_v4(), "connection refused");
        assert_ne!(a, b);
    }
}
