//! A Bitcask-inspired embedded key-value store with a length-prefixed TCP
//! protocol server sitting directly on top of it.

pub mod config;
pub mod error;
pub mod net;
pub mod storage;

pub use error::Error;
pub use storage::bitcask::{Bitcask, Config};
