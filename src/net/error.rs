use thiserror::Error;

/// Errors from the networking layer: framing, command parsing, and anything
/// the storage engine surfaces while a command is being applied.
#[derive(Error, Debug)]
pub enum Error {
    #[error("connection reset by peer mid-frame")]
    ConnectionReset,

    #[error("malformed command: {0}")]
    Command(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] crate::Error),
}
