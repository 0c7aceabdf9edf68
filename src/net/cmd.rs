use bytes::Bytes;

use crate::Bitcask;

use super::Error;

/// A parsed request: `set <key> <value>`, `get <key>`, or `del <key>`.
/// Whitespace is the only delimiter; multi-word values are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: Bytes, value: Bytes },
    Get { key: Bytes },
    Del { key: Bytes },
    Invalid,
}

impl Command {
    pub fn parse(request: &[u8]) -> Result<Self, Error> {
        let text =
            std::str::from_utf8(request).map_err(|_| Error::Command("request is not valid utf-8".into()))?;
        let mut parts = text.split_whitespace();

        Ok(match parts.next() {
            Some("set") => match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => Command::Set {
                    key: Bytes::copy_from_slice(key.as_bytes()),
                    value: Bytes::copy_from_slice(value.as_bytes()),
                },
                _ => Command::Invalid,
            },
            Some("get") => match parts.next() {
                Some(key) => Command::Get {
                    key: Bytes::copy_from_slice(key.as_bytes()),
                },
                None => Command::Invalid,
            },
            Some("del") => match parts.next() {
                Some(key) => Command::Del {
                    key: Bytes::copy_from_slice(key.as_bytes()),
                },
                None => Command::Invalid,
            },
            _ => Command::Invalid,
        })
    }

    /// Apply the parsed command to the engine and return the reply string.
    pub fn apply(self, db: &Bitcask) -> String {
        match self {
            Command::Set { key, value } => match db.set(key, value) {
                Ok(()) => "set success".to_string(),
                Err(_) => "set failed".to_string(),
            },
            Command::Get { key } => match db.get(&key) {
                Ok(value) => String::from_utf8_lossy(&value).into_owned(),
                Err(e) if e.is_not_found() => "key not found".to_string(),
                Err(_) => "get failed".to_string(),
            },
            Command::Del { key } => match db.del(&key) {
                Ok(()) => "del success".to_string(),
                Err(e) if e.is_not_found() => "key not found".to_string(),
                Err(_) => "del failed".to_string(),
            },
            Command::Invalid => "invalid command".to_string(),
        }
    }
}
