use tokio::sync::broadcast;

/// Listens for the server's shutdown signal.
///
/// Shutdown is signalled using a `broadcast::Sender`. Only a single value is
/// ever sent. Once a value has been sent via the broadcast channel, the
/// connection should shut down.
pub struct Shutdown {
    is_shutdown: bool,
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    pub fn new(notify: broadcast::Receiver<()>) -> Self {
        Self {
            is_shutdown: false,
            notify,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown
    }

    pub async fn recv(&mut self) {
        if self.is_shutdown {
            return;
        }
        let _ = self.notify.recv().await;
        self.is_shutdown = true;
    }
}
