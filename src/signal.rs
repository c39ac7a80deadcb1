//! Signal handling for graceful shutdown.
//!
//! The plugin server runs until SIGTERM or SIGINT, then stops accepting
//! connections and removes its socket.
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::info;

pub struct ShutdownSignal {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignal {
    /// Registers the handlers up front so a failure surfaces at startup.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Resolves when a shutdown signal is received. Cancel safe.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                info!("received SIGTERM");
            }
            _ = self.sigint.recv() => {
                info!("received SIGINT");
            }
        }
    }
}
