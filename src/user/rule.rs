use crate::user::permissions::Permissions;
use regex::Regex;

/// How a rule selects the paths it applies to.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Literal path prefix.
    Prefix(String),
    /// Unanchored regular expression over the request path.
    Pattern(Regex),
}

impl PathMatcher {
    /// Build a pattern matcher.
    ///
    /// # Errors
    /// Returns the compile error when the expression is invalid.
    pub fn pattern(expression: &str) -> Result<Self, regex::Error> {
        Regex::new(expression).map(Self::Pattern)
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Pattern(re) => re.is_match(path),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Prefix(prefix) => prefix,
            Self::Pattern(re) => re.as_str(),
        }
    }

    #[must_use]
    pub const fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.is_pattern() == other.is_pattern() && self.as_str() == other.as_str()
    }
}

impl Eq for PathMatcher {}

/// Path-scoped permission override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub matcher: PathMatcher,
    pub permissions: Permissions,
}

impl Rule {
    #[must_use]
    pub fn prefix(path: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            matcher: PathMatcher::Prefix(path.into()),
            permissions,
        }
    }

    /// # Errors
    /// Returns the compile error when the expression is invalid.
    pub fn pattern(expression: &str, permissions: Permissions) -> Result<Self, regex::Error> {
        Ok(Self {
            matcher: PathMatcher::pattern(expression)?,
            permissions,
        })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}
