//! Ethereum `personal_sign` verification.

use crate::auth::AuthError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

const PERSONAL_SIGN_PREFIX: &str = "\x19Ethereum Signed Message:\n";
const SIGNATURE_LEN: usize = 65;

/// `keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)`
#[must_use]
pub fn personal_sign_digest(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_SIGN_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Lower-case `0x` address of a public key: the last 20 bytes of the Keccak-256 hash of
/// the uncompressed point without its `0x04` tag.
#[must_use]
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Decode an `r || s || v` hex signature. `v` may be 0/1 or 27/28.
///
/// A high-S signature is folded into its low-S twin with the parity of the recovery id
/// flipped, so both recover the same key.
///
/// # Errors
/// Returns [`AuthError::InvalidSignature`] on bad hex or an unusable `r`, `s` or `v`, and
/// [`AuthError::InvalidSignatureLength`] when the bytes are not exactly 65 long.
pub fn decode_signature(signature_hex: &str) -> Result<(Signature, RecoveryId), AuthError> {
    let trimmed = signature_hex.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(hex_part).map_err(|e| AuthError::InvalidSignature(e.to_string()))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(AuthError::InvalidSignatureLength(bytes.len()));
    }

    let mut v = bytes[64];
    if v >= 27 {
        v -= 27;
    }
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| AuthError::InvalidSignature(format!("invalid recovery id {v}")))?;
    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;

    match signature.normalize_s() {
        Some(low) => Ok((
            low,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        )),
        None => Ok((signature, recovery_id)),
    }
}

/// Recover the address that signed `message`.
///
/// # Errors
/// Returns a malformed-signature error when decoding or key recovery fails.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<String, AuthError> {
    let (signature, recovery_id) = decode_signature(signature_hex)?;
    let digest = personal_sign_digest(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;
    Ok(address_of(&key))
}

/// # Errors
/// Returns [`AuthError::SignatureMismatch`] when the recovered address differs from
/// `expected` (compared case-insensitively), or a decoding error.
pub fn verify_signature(
    expected: &str,
    message: &str,
    signature_hex: &str,
) -> Result<(), AuthError> {
    let recovered = recover_address(message, signature_hex)?;
    if recovered.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(AuthError::SignatureMismatch {
            expected: expected.trim().to_ascii_lowercase(),
            recovered,
        })
    }
}
