use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid wallet address: {0}")]
pub struct InvalidAddress(pub String);

/// Trim and lower-case a wallet address, requiring `0x` followed by 40 hex digits.
///
/// # Errors
/// Returns [`InvalidAddress`] when the input is not a 20-byte hex address.
pub fn normalize_address(address: &str) -> Result<String, InvalidAddress> {
    let normalized = address.trim().to_ascii_lowercase();
    let valid = normalized
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));

    if valid {
        Ok(normalized)
    } else {
        Err(InvalidAddress(address.to_string()))
    }
}
