use thiserror::Error;

/// Error outcomes produced by the storage engine and by configuration loading.
///
/// Mirrors the three-category status model of the engine this crate descends
/// from: a key not being present, an I/O failure, and (for configuration)
/// deserialization failure. There is no fourth "unknown" variant: every
/// failure on the data path is classified as one of these.
#[derive(Error, Debug)]
pub enum Error {
    #[error("key not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] config::ConfigError),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
