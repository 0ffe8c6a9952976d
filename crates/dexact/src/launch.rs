//! Process entry points: host or dial with a configured action taker.

use std::future::Future;

use dexact_core::{ActionTaker, CompletenessPolicy, DecisionError, FnTaker, StateMap};
use dexact_session::{run_client, Server};
use tracing::{info, warn};

use crate::config::{LaunchConfig, Role};
use crate::error::Result;

/// Serve `decision_fn` on `ws://host:port/simio` until interrupted.
///
/// Every connection gets its own clone of `decision_fn`, so captured state
/// is never shared between simulations.
pub async fn launch<F>(
    policy: CompletenessPolicy,
    decision_fn: F,
    host: &str,
    port: u16,
) -> Result<()>
where
    F: FnMut(f64, StateMap) -> std::result::Result<Vec<f64>, DecisionError>
        + Clone
        + Send
        + Sync
        + 'static,
{
    policy.validate()?;
    let taker = FnTaker::new(policy, decision_fn);
    let config = LaunchConfig {
        host: host.to_string(),
        port,
        ..LaunchConfig::default()
    };
    launch_with(&config, move || taker.clone()).await
}

/// Run the configured role until ctrl-c or SIGTERM.
pub async fn launch_with<F, T>(config: &LaunchConfig, factory: F) -> Result<()>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: ActionTaker,
{
    launch_until(config, factory, shutdown_signal()).await
}

/// Run the configured role until `shutdown` resolves.
///
/// In the server role `factory` is called once per accepted connection; in
/// the client role it is called once.
pub async fn launch_until<F, T, S>(config: &LaunchConfig, factory: F, shutdown: S) -> Result<()>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: ActionTaker,
    S: Future<Output = ()>,
{
    let policy = config.policy_override()?;
    let session = config.session_config();
    let endpoint = config.endpoint();
    let make = move || PolicyOverride::new(factory(), policy.clone());

    match config.role {
        Role::Server => {
            let server = Server::bind(endpoint.authority(), endpoint.path.clone(), session).await?;
            info!(addr = ?server.local_addr().ok(), url = %endpoint, "action server ready");
            server.serve_until(make, shutdown).await?;
        }
        Role::Client => {
            let url = endpoint.url();
            info!(%url, "dialing simulation");
            tokio::select! {
                report = run_client(&url, make(), session) => {
                    let report = report?;
                    info!(end = ?report.end, rounds = report.stats.rounds_completed, "simulation finished");
                }
                _ = shutdown => info!("interrupted"),
            }
        }
    }
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

/// An action taker whose completeness policy may be replaced by config.
pub struct PolicyOverride<T> {
    inner: T,
    policy: Option<CompletenessPolicy>,
}

impl<T: ActionTaker> PolicyOverride<T> {
    pub fn new(inner: T, policy: Option<CompletenessPolicy>) -> Self {
        Self { inner, policy }
    }
}

impl<T: ActionTaker> ActionTaker for PolicyOverride<T> {
    fn completeness(&self) -> CompletenessPolicy {
        match &self.policy {
            Some(policy) => policy.clone(),
            None => self.inner.completeness(),
        }
    }

    fn take_next_action(
        &mut self,
        time: f64,
        states: StateMap,
    ) -> std::result::Result<Vec<f64>, DecisionError> {
        self.inner.take_next_action(time, states)
    }
}
