//! Users, their CRUD permissions and the in-memory directory that owns them.

pub mod address;
pub mod directory;
pub mod permissions;
pub mod rule;

pub use self::address::{normalize_address, InvalidAddress};
pub use self::directory::{DirectoryError, UserDirectory};
pub use self::permissions::{Permission, PermissionError, Permissions};
pub use self::rule::{PathMatcher, Rule};

use uuid::Uuid;

/// An account allowed to reach the protected surface.
///
/// `username` and `wallet_address` are identity keys and cannot change once the user
/// exists; permissions and rules can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: Uuid,
    username: String,
    password_hash: Option<String>,
    wallet_address: Option<String>,
    pub directory: String,
    pub permissions: Permissions,
    pub rules: Vec<Rule>,
}

impl User {
    /// New user with read-only defaults and no rules.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: None,
            wallet_address: None,
            directory: String::from("/"),
            permissions: Permissions::default(),
            rules: Vec::new(),
        }
    }

    /// Tagged hash as produced by [`crate::auth::PasswordHasher::hash`].
    #[must_use]
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// # Errors
    /// Returns [`InvalidAddress`] when the address is not 20 bytes of hex.
    pub fn with_wallet_address(mut self, address: &str) -> Result<Self, InvalidAddress> {
        self.wallet_address = Some(normalize_address(address)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    #[must_use]
    pub const fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    /// Always lower-cased.
    #[must_use]
    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet_address.as_deref()
    }

    #[must_use]
    pub const fn has_credential(&self) -> bool {
        self.password_hash.is_some() || self.wallet_address.is_some()
    }

    /// Permissions in force for `path`: the first matching rule, else the defaults.
    #[must_use]
    pub fn effective_permissions(&self, path: &str) -> Permissions {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map_or(self.permissions, |rule| rule.permissions)
    }

    #[must_use]
    pub fn can_access(&self, path: &str, permission: Permission) -> bool {
        self.effective_permissions(path).has(permission)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new("alice")
            .with_permissions(Permissions::parse("R").unwrap())
            .with_rules(vec![Rule::prefix(
                "/private",
                Permissions::parse("RW").unwrap(),
            )])
    }

    #[test]
    fn new_user_is_read_only() {
        let user = User::new("bob");
        assert_eq!(user.permissions, Permissions::read_only());
        assert!(user.rules.is_empty());
        assert!(!user.has_credential());
    }

    #[test]
    fn rule_overrides_defaults() {
        let alice = alice();
        assert!(alice.can_access("/private/x", Permission::Update));
        assert!(!alice.can_access("/public/x", Permission::Update));
        assert!(alice.can_access("/public/x", Permission::Read));
    }

    #[test]
    fn first_matching_rule_wins() {
        let user = User::new("carol")
            .with_permissions(Permissions::all())
            .with_rules(vec![
                Rule::prefix("/shared/readonly", Permissions::read_only()),
                Rule::prefix("/shared", Permissions::all()),
            ]);
        assert!(!user.can_access("/shared/readonly/a", Permission::Delete));
        assert!(user.can_access("/shared/other", Permission::Delete));
    }

    #[test]
    fn rule_can_revoke_default_grants() {
        let user = User::new("dave")
            .with_permissions(Permissions::all())
            .with_rules(vec![Rule::pattern(r"\.secret$", Permissions::none()).unwrap()]);
        assert!(!user.can_access("/notes.secret", Permission::Read));
        assert!(user.can_access("/notes.txt", Permission::Read));
    }

    #[test]
    fn zero_rules_fall_back_to_defaults() {
        let defaults = Permissions::parse("CD").unwrap();
        let user = User::new("erin").with_permissions(defaults);
        for path in ["/", "/a", "/a/b/c"] {
            assert_eq!(user.effective_permissions(path), defaults);
        }
    }

    #[test]
    fn wallet_address_is_lowercased() {
        let user = User::new("frank")
            .with_wallet_address("0xABCDEF0123456789ABCDEF0123456789ABCDEF01")
            .unwrap();
        assert_eq!(
            user.wallet_address(),
            Some("0xabcdef0123456789abcdef0123456789abcdef01")
        );
        assert!(user.has_credential());
    }

    #[test]
    fn invalid_wallet_address_rejected() {
        assert!(User::new("gina").with_wallet_address("0x1234").is_err());
    }
}
