//! Asynchronous TCP server that frames requests off the wire and dispatches
//! them to the storage engine.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, mpsc, Semaphore},
    time,
};
use tracing::{debug, error, info, warn};

use crate::Bitcask;

use super::{cmd::Command, connection::Connection, shutdown::Shutdown, Error};

/// Max number of concurrent connections the server will serve.
const MAX_CONNECTIONS: usize = 128;

/// Max number of seconds to wait when retrying to accept a new connection.
const MAX_BACKOFF: u64 = 64;

/// Owns the listener and the shared storage handle, and runs until
/// `shutdown` resolves.
pub struct Server<S: Future> {
    ctx: Context,
    shutdown: S,
}

impl<S: Future> Server<S> {
    pub fn new(listener: TcpListener, storage: Arc<Bitcask>, shutdown: S) -> Self {
        let (notify_shutdown, _) = broadcast::channel(1);
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);

        let ctx = Context {
            storage,
            listener,
            limit_connections: Arc::new(Semaphore::new(MAX_CONNECTIONS)),
            notify_shutdown,
            shutdown_complete_rx,
            shutdown_complete_tx,
        };

        Self { ctx, shutdown }
    }

    pub async fn run(mut self) {
        tokio::select! {
            result = self.ctx.listen() => {
                if let Err(err) = result {
                    error!(cause = %err, "failed to accept");
                }
            }
            _ = self.shutdown => {
                info!("shutting down");
            }
        }

        drop(self.ctx.notify_shutdown);
        drop(self.ctx.shutdown_complete_tx);
        self.ctx.shutdown_complete_rx.recv().await;
    }
}

struct Context {
    storage: Arc<Bitcask>,
    listener: TcpListener,
    limit_connections: Arc<Semaphore>,
    notify_shutdown: broadcast::Sender<()>,
    shutdown_complete_rx: mpsc::Receiver<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
}

struct Handler {
    storage: Arc<Bitcask>,
    connection: Connection,
    limit_connections: Arc<Semaphore>,
    shutdown: Shutdown,
    _shutdown_complete: mpsc::Sender<()>,
}

impl Context {
    async fn listen(&mut self) -> Result<(), Error> {
        info!("listening for new connections");

        loop {
            self.limit_connections.acquire().await.unwrap().forget();

            let socket = self.accept().await?;

            let mut handler = Handler {
                storage: self.storage.clone(),
                connection: Connection::new(socket),
                limit_connections: Arc::clone(&self.limit_connections),
                shutdown: Shutdown::new(self.notify_shutdown.subscribe()),
                _shutdown_complete: self.shutdown_complete_tx.clone(),
            };

            tokio::spawn(async move {
                if let Err(err) = handler.run().await {
                    error!(cause=?err, "connection error");
                }
            });
        }
    }

    /// Accepts a new connection, retrying with exponential backoff up to
    /// `MAX_BACKOFF` seconds before giving up.
    async fn accept(&mut self) -> Result<TcpStream, Error> {
        let mut backoff = 1;
        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => return Ok(socket),
                Err(err) => {
                    if backoff > MAX_BACKOFF {
                        return Err(err.into());
                    }
                    warn!(cause = %err, backoff, "accept failed, retrying");
                }
            }

            time::sleep(Duration::from_secs(backoff)).await;
            backoff <<= 1;
        }
    }
}

impl Handler {
    /// Process a single connection until it closes or the server shuts down.
    /// Pipelining (reading the next request before the previous reply is
    /// written) is not implemented.
    #[tracing::instrument(skip(self))]
    async fn run(&mut self) -> Result<(), Error> {
        while !self.shutdown.is_shutdown() {
            let maybe_frame = tokio::select! {
                res = self.connection.read_frame() => res?,
                _ = self.shutdown.recv() => {
                    return Ok(());
                }
            };

            let frame = match maybe_frame {
                Some(frame) => frame,
                None => return Ok(()),
            };

            let cmd = Command::parse(&frame)?;
            debug!(?cmd);

            let storage = self.storage.clone();
            let reply = tokio::task::spawn_blocking(move || cmd.apply(&storage))
                .await
                .expect("command dispatch task panicked");
            self.connection.write_frame(reply.as_bytes()).await?;
        }
        Ok(())
    }
}

impl Drop for Handler {
    fn drop(&mut self) {
        self.limit_connections.add_permits(1);
    }
}
