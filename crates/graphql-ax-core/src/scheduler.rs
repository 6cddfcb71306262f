// SPDX-License-Identifier: Apache-2.0

//! Periodic flush trigger. Runs on a detached tokio task so it never pins
//! the process; the cancellation token is the explicit stop hook, which also
//! gives tests deterministic shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawns a loop that awaits `tick` once per `period` until `shutdown` is
/// cancelled. Ticks are serial: a slow flush delays the next tick rather
/// than overlapping it.
pub fn spawn_flush_loop<F, Fut>(
    period: Duration,
    shutdown: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // discard first tick, which is instantaneous
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("flush loop stopped");
                    break;
                }
                _ = interval.tick() => tick().await,
            }
        }
    })
}
