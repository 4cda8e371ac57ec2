use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("no instrument identity file provided")]
    MissingIdentity,

    #[error("cannot device-lock a pack with an empty instrument identity")]
    EmptyIdentity,

    #[error("Storage error: {0}")]
    Storage(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, PackError>;
