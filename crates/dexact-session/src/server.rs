//! Server role: accept simulation connections and run a coordinator for each.
//!
//! Every accepted connection gets its own task, its own aggregation buffer
//! and a fresh action taker from the factory. A failing connection is
//! logged and dropped; the listener keeps accepting.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use dexact_core::ActionTaker;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::channel::Channel;
use crate::config::SessionConfig;
use crate::coordinator::{ConnectionId, ConnectionReport, RoundCoordinator};
use crate::error::{Result, SessionError};
use crate::websocket;

/// Run a coordinator for `channel` on its own task.
pub fn spawn_connection<C, T>(
    channel: C,
    taker: T,
    config: SessionConfig,
) -> JoinHandle<Result<ConnectionReport>>
where
    C: Channel + 'static,
    T: ActionTaker,
{
    tokio::spawn(async move {
        RoundCoordinator::new(ConnectionId::next(), channel, taker, config)?
            .run()
            .await
    })
}

/// WebSocket listener hosting one coordinator per connection.
pub struct Server {
    listener: TcpListener,
    path: Option<String>,
    config: SessionConfig,
}

impl Server {
    /// Bind the listener. With `path` set, upgrades on other paths get 404.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        path: Option<String>,
        config: SessionConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            path,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    pub async fn serve<F, T>(self, factory: F) -> Result<()>
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: ActionTaker,
    {
        self.serve_until(factory, std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves, then abort the open
    /// ones and return.
    pub async fn serve_until<F, T, S>(self, factory: F, shutdown: S) -> Result<()>
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: ActionTaker,
        S: Future<Output = ()>,
    {
        let factory = Arc::new(factory);
        let path: Option<Arc<str>> = self.path.map(Arc::from);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        info!(addr = ?self.listener.local_addr().ok(), path = ?path, "listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => {
                    let (tcp, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    debug!(%addr, "tcp connection accepted");

                    let factory = Arc::clone(&factory);
                    let path = path.clone();
                    let config = self.config.clone();
                    connections.spawn(async move {
                        let channel = websocket::accept(tcp, addr.to_string(), path.as_deref()).await?;
                        let taker = (*factory)();
                        RoundCoordinator::new(ConnectionId::next(), channel, taker, config)?
                            .run()
                            .await
                    });
                }
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_finished(joined);
                }
            }
        }

        info!(open = connections.len(), "shutting down");
        connections.shutdown().await;
        Ok(())
    }
}

fn log_finished(joined: std::result::Result<Result<ConnectionReport>, JoinError>) {
    match joined {
        Ok(Ok(report)) => debug!(
            id = %report.id,
            rounds = report.stats.rounds_completed,
            "connection task finished"
        ),
        // coordinator failures are already logged inside the connection span
        Ok(Err(SessionError::Handshake(reason))) => warn!(%reason, "handshake rejected"),
        Ok(Err(e)) => debug!(error = %e, "connection task failed"),
        Err(e) if e.is_panic() => error!("connection task panicked"),
        Err(_) => {}
    }
}
