//! TCP server and client for the length-prefixed wire protocol that fronts
//! the storage engine.

pub mod cmd;
pub mod connection;

mod client;
mod error;
mod server;
mod shutdown;

pub use client::Client;
pub use error::Error;
pub use server::Server;
pub use shutdown::Shutdown;
