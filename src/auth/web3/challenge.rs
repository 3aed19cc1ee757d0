use chrono::{DateTime, SecondsFormat, Utc};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

const NONCE_BYTES: usize = 32;

/// A nonce a wallet must sign to prove it owns `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub address: String,
    pub nonce: String,
    pub message: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// `address` must already be normalized.
    #[must_use]
    pub fn new(address: &str, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        let nonce = generate_nonce();
        let message = sign_message(address, &nonce, issued_at, expires_at);
        Self {
            address: address.to_string(),
            nonce,
            message,
            issued_at,
            expires_at,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// 32 random bytes, hex encoded.
#[must_use]
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[must_use]
pub fn sign_message(
    address: &str,
    nonce: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> String {
    format!(
        "Sign this message to authenticate with web3dav.\n\n\
         Address: {address}\n\
         Nonce: {nonce}\n\
         Issued At: {}\n\
         Expiration Time: {}",
        issued_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// Live challenges keyed by lower-cased address, at most one per address.
///
/// Issue and take both hold the write lock, so a verification sees either the
/// challenge it was answering or none at all.
#[derive(Debug, Default)]
pub struct ChallengeStore {
    challenges: RwLock<HashMap<String, Challenge>>,
}

impl ChallengeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `challenge`, replacing any previous one for the address, and drop expired
    /// entries for other addresses.
    pub async fn issue(&self, challenge: Challenge, now: DateTime<Utc>) {
        let mut challenges = self.challenges.write().await;
        let before = challenges.len();
        challenges.retain(|_, c| !c.is_expired(now));
        let purged = before - challenges.len();
        if purged > 0 {
            debug!(purged, "expired challenges purged");
        }
        challenges.insert(challenge.address.clone(), challenge);
    }

    /// Remove and return the challenge for `address`.
    pub async fn take(&self, address: &str) -> Option<Challenge> {
        self.challenges.write().await.remove(address)
    }

    pub async fn get(&self, address: &str) -> Option<Challenge> {
        self.challenges.read().await.get(address).cloned()
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut challenges = self.challenges.write().await;
        let before = challenges.len();
        challenges.retain(|_, c| !c.is_expired(now));
        before - challenges.len()
    }

    pub async fn len(&self) -> usize {
        self.challenges.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.challenges.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ADDR: &str = "0x1111111111111111111111111111111111111111";
    const OTHER: &str = "0x2222222222222222222222222222222222222222";

    #[test]
    fn nonce_is_random_hex() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), NONCE_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn message_embeds_address_and_nonce() {
        let now = Utc::now();
        let challenge = Challenge::new(ADDR, now, now + Duration::minutes(5));
        assert!(challenge.message.contains(&format!("Address: {ADDR}")));
        assert!(challenge
            .message
            .contains(&format!("Nonce: {}", challenge.nonce)));
        assert!(challenge.message.contains("Expiration Time: "));
    }

    #[test]
    fn expiry_is_inclusive_of_deadline() {
        let now = Utc::now();
        let challenge = Challenge::new(ADDR, now, now + Duration::seconds(10));
        assert!(!challenge.is_expired(now + Duration::seconds(9)));
        assert!(challenge.is_expired(now + Duration::seconds(10)));
    }

    #[tokio::test]
    async fn issuing_replaces_previous_challenge() {
        let store = ChallengeStore::new();
        let now = Utc::now();
        let first = Challenge::new(ADDR, now, now + Duration::minutes(5));
        let second = Challenge::new(ADDR, now, now + Duration::minutes(5));

        store.issue(first.clone(), now).await;
        store.issue(second.clone(), now).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(ADDR).await.unwrap().nonce, second.nonce);
    }

    #[tokio::test]
    async fn take_consumes() {
        let store = ChallengeStore::new();
        let now = Utc::now();
        store
            .issue(Challenge::new(ADDR, now, now + Duration::minutes(5)), now)
            .await;

        assert!(store.take(ADDR).await.is_some());
        assert!(store.take(ADDR).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expired_entries_are_purged_on_issue() {
        let store = ChallengeStore::new();
        let now = Utc::now();
        store
            .issue(Challenge::new(ADDR, now, now + Duration::seconds(1)), now)
            .await;

        let later = now + Duration::seconds(2);
        store
            .issue(Challenge::new(OTHER, later, later + Duration::minutes(5)), later)
            .await;

        assert!(store.get(ADDR).await.is_none());
        assert!(store.get(OTHER).await.is_some());
        assert_eq!(store.purge_expired(later + Duration::minutes(10)).await, 1);
    }
}
