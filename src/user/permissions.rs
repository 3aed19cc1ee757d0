use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("invalid permission letter '{0}', expected a subset of C, R, U, D (W = C + U)")]
    InvalidLetter(char),
    #[error("unknown permission: {0}")]
    Unknown(String),
}

/// One of the four operations a rule can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
}

impl Permission {
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Create => 'C',
            Self::Read => 'R',
            Self::Update => 'U',
            Self::Delete => 'D',
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "create" => Ok(Self::Create),
            "r" | "read" => Ok(Self::Read),
            "u" | "update" => Ok(Self::Update),
            "d" | "delete" => Ok(Self::Delete),
            _ => Err(PermissionError::Unknown(s.to_string())),
        }
    }
}

/// CRUD flags, written as a letter code such as `"CRUD"` or `"r"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permissions {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self::read_only()
    }
}

impl Permissions {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            create: false,
            read: false,
            update: false,
            delete: false,
        }
    }

    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read: true,
            ..Self::none()
        }
    }

    #[must_use]
    pub const fn all() -> Self {
        Self {
            create: true,
            read: true,
            update: true,
            delete: true,
        }
    }

    /// Parse a letter code. Letters may appear in any order and case, whitespace is
    /// ignored and `W` grants both create and update.
    ///
    /// # Errors
    /// Returns an error on any other character.
    pub fn parse(code: &str) -> Result<Self, PermissionError> {
        let mut permissions = Self::none();
        for c in code.chars().filter(|c| !c.is_whitespace()) {
            match c.to_ascii_uppercase() {
                'C' => permissions.create = true,
                'R' => permissions.read = true,
                'U' => permissions.update = true,
                'D' => permissions.delete = true,
                'W' => {
                    permissions.create = true;
                    permissions.update = true;
                }
                _ => return Err(PermissionError::InvalidLetter(c)),
            }
        }
        Ok(permissions)
    }

    #[must_use]
    pub const fn has(&self, permission: Permission) -> bool {
        match permission {
            Permission::Create => self.create,
            Permission::Read => self.read,
            Permission::Update => self.update,
            Permission::Delete => self.delete,
        }
    }

    pub fn granted(&self) -> impl Iterator<Item = Permission> + '_ {
        [
            Permission::Create,
            Permission::Read,
            Permission::Update,
            Permission::Delete,
        ]
        .into_iter()
        .filter(|p| self.has(*p))
    }

    /// Canonical `CRUD`-ordered letter code.
    #[must_use]
    pub fn code(&self) -> String {
        self.granted().map(Permission::letter).collect()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.granted().map(|p| p.name().to_string()).collect()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for Permissions {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Permissions {
    type Error = PermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Permissions> for String {
    fn from(value: Permissions) -> Self {
        value.code()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_read_only() {
        let p = Permissions::default();
        assert!(p.read);
        assert!(!p.create && !p.update && !p.delete);
        assert_eq!(p.code(), "R");
    }

    #[test]
    fn parse_is_case_and_order_insensitive() {
        assert_eq!(Permissions::parse("durc").unwrap(), Permissions::all());
        assert_eq!(Permissions::parse("CRUD").unwrap(), Permissions::all());
        assert_eq!(
            Permissions::parse(" r d ").unwrap(),
            Permissions {
                read: true,
                delete: true,
                ..Permissions::none()
            }
        );
        assert_eq!(Permissions::parse("").unwrap(), Permissions::none());
    }

    #[test]
    fn write_letter_grants_create_and_update() {
        let p = Permissions::parse("RW").unwrap();
        assert!(p.read && p.create && p.update);
        assert!(!p.delete);
        assert_eq!(p.code(), "CRU");
    }

    #[test]
    fn parse_rejects_unknown_letters() {
        assert_eq!(
            Permissions::parse("RX"),
            Err(PermissionError::InvalidLetter('X'))
        );
    }

    #[test]
    fn single_permission_long_and_short_forms() {
        assert_eq!("C".parse::<Permission>().unwrap(), Permission::Create);
        assert_eq!("create".parse::<Permission>().unwrap(), Permission::Create);
        assert_eq!("READ".parse::<Permission>().unwrap(), Permission::Read);
        assert_eq!("u".parse::<Permission>().unwrap(), Permission::Update);
        assert_eq!("Delete".parse::<Permission>().unwrap(), Permission::Delete);
        assert!("write".parse::<Permission>().is_err());
    }

    #[test]
    fn names_follow_crud_order() {
        let p = Permissions::parse("dr").unwrap();
        assert_eq!(p.names(), vec!["read".to_string(), "delete".to_string()]);
    }

    #[test]
    fn serde_uses_letter_code() -> anyhow::Result<()> {
        let p: Permissions = serde_json::from_str("\"ur\"")?;
        assert_eq!(serde_json::to_string(&p)?, "\"RU\"");
        assert!(serde_json::from_str::<Permissions>("\"Z\"").is_err());
        Ok(())
    }
}
