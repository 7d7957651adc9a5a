//! Periodic heartbeat task.
//!
//! The daemon refreshes one agent's heartbeat on a fixed interval until the
//! shutdown future resolves. Stopping only stops the timer; the agent record
//! is left in place so that explicit deregistration stays a separate step.

use super::registry::AgentRegistry;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Send a heartbeat for `agent_id` every `period` until `shutdown` resolves.
///
/// The first beat happens one period after start. A failed beat is logged
/// and the loop keeps going. Returns the number of successful beats.
pub async fn run_heartbeat<F>(
    registry: &AgentRegistry,
    agent_id: &str,
    period: Duration,
    shutdown: F,
) -> u64
where
    F: Future<Output = ()>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut beats = 0;
    loop {
        tokio::select! {
            () = &mut shutdown => {
                tracing::info!(agent = agent_id, beats, "heartbeat daemon stopped");
                return beats;
            }
            _ = ticker.tick() => {
                match registry.heartbeat(agent_id) {
                    Ok(_) => {
                        beats += 1;
                        tracing::debug!(agent = agent_id, beats, "heartbeat sent");
                    }
                    Err(e) => tracing::warn!(agent = agent_id, error = %e, "heartbeat failed"),
                }
            }
        }
    }
}

/// Resolves when the process receives SIGINT or SIGTERM (Ctrl+C elsewhere).
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).ok();
    let mut sigint = signal(SignalKind::interrupt()).ok();

    tokio::select! {
        () = async {
            match sigterm.as_mut() {
                Some(sig) => { sig.recv().await; }
                None => std::future::pending::<()>().await,
            }
        } => {
            tracing::info!("received SIGTERM");
        }
        () = async {
            match sigint.as_mut() {
                Some(sig) => { sig.recv().await; }
                None => std::future::pending::<()>().await,
            }
        } => {
            tracing::info!("received SIGINT");
        }
    }
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("received Ctrl+C");
}
