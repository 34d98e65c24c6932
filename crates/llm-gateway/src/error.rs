use thiserror::Error;

use crate::auth::KeyFetchError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Key set error: {0}")]
    KeyFetch(#[from] KeyFetchError),
}

impl Error {
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    #[must_use]
    pub const fn is_key_fetch(&self) -> bool {
        matches!(self, Self::KeyFetch(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
