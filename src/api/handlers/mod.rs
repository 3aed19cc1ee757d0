pub mod dav;
pub use self::dav::DavState;

pub mod health;
pub use self::health::{health, StartedAt};

pub mod types;

pub mod web3;
