//! Client role: dial a simulation that hosts the WebSocket endpoint.

use dexact_core::ActionTaker;

use crate::config::SessionConfig;
use crate::coordinator::{ConnectionId, ConnectionReport, RoundCoordinator};
use crate::error::Result;
use crate::websocket;

/// Connect to `url` and run rounds until the simulation closes the
/// connection or `config.max_rounds` is reached.
///
/// The completeness policy is validated before dialing.
pub async fn run_client<T: ActionTaker>(
    url: &str,
    taker: T,
    config: SessionConfig,
) -> Result<ConnectionReport> {
    taker.completeness().validate()?;
    let channel = websocket::connect(url).await?;
    RoundCoordinator::new(ConnectionId::next(), channel, taker, config)?
        .run()
        .await
}
