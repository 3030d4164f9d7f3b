//! Utility functions and helpers

use chrono::{DateTime, Utc};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of a base58check encoded Tezos address
const ADDRESS_LENGTH: usize = 36;

/// Length of a base58check encoded operation hash
const OPERATION_HASH_LENGTH: usize = 51;

fn is_base58(s: &str) -> bool {
    s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// Validate Tezos address format (implicit or originated account)
pub fn is_valid_address(address: &str) -> bool {
    is_valid_implicit_address(address) || is_valid_contract_address(address)
}

/// Validate an implicit account address (tz1, tz2, tz3)
pub fn is_valid_implicit_address(address: &str) -> bool {
    let prefixed = ["tz1", "tz2", "tz3"].iter().any(|p| address.starts_with(p));
    prefixed && address.len() == ADDRESS_LENGTH && is_base58(address)
}

/// Validate an originated contract address (KT1)
pub fn is_valid_contract_address(address: &str) -> bool {
    address.starts_with("KT1") && address.len() == ADDRESS_LENGTH && is_base58(address)
}

/// Validate operation hash format
pub fn is_valid_operation_hash(hash: &str) -> bool {
    hash.starts_with('o') && hash.len() == OPERATION_HASH_LENGTH && is_base58(hash)
}

/// Generate a run ID for log correlation
pub fn generate_run_id() -> uuid::Uuid {
    uuid::Uuid::new_v4()
}

/// Calculate time difference in milliseconds
pub fn time_diff_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    end.timestamp_millis() - start.timestamp_millis()
}

/// Sanitize string for logging (shorten addresses and hashes)
pub fn sanitize_for_logging(s: &str) -> String {
    if s.len() <= 12 {
        return s.to_string();
    }

    if is_valid_address(s) || is_valid_operation_hash(s) {
        format!("{}...{}", &s[..7], &s[s.len() - 4..])
    } else {
        let cut = s
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        format!("{}...", &s[..cut])
    }
}
