//! Authentication strategies and the errors they produce.

pub mod authenticator;
pub mod basic;
pub mod credentials;
pub mod error;
pub mod password;
pub mod web3;

pub use self::authenticator::Authenticator;
pub use self::basic::BasicAuthenticator;
pub use self::credentials::Credentials;
pub use self::error::AuthError;
pub use self::password::{Argon2Hasher, PasswordError, PasswordHasher};
pub use self::web3::{Web3Authenticator, Web3Settings};
