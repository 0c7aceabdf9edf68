use tokio::net::TcpStream;

use super::{connection::Connection, Error};

/// A single framed connection to a server, for interactive or scripted use.
pub struct Client {
    connection: Connection,
}

impl Client {
    pub async fn connect(addr: &str, port: u16) -> Result<Self, Error> {
        let socket = TcpStream::connect((addr, port)).await?;
        Ok(Self {
            connection: Connection::new(socket),
        })
    }

    pub async fn send(&mut self, request: &str) -> Result<String, Error> {
        self.connection.write_frame(request.as_bytes()).await?;
        match self.connection.read_frame().await? {
            Some(reply) => Ok(String::from_utf8_lossy(&reply).into_owned()),
            None => Err(Error::ConnectionReset),
        }
    }
}
