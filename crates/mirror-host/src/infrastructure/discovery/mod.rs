//! Periodic device discovery tasks.
//!
//! Two independent tokio tasks keep the host in sync with the bridge:
//!
//! - [`spawn_registry_poll`] runs [`DevicePoller::poll`] every
//!   `poll_interval` (default 1 s) so the device list follows plugs and
//!   unplugs.
//! - [`spawn_reconnector`] runs [`Reconnector::tick`] every
//!   `reconnect_interval` (default 2 s) to bounce offline network devices.
//!
//! Each task has its own timer and its own failure handling: a failed tick
//! is logged with `warn!` and the loop carries on.  Neither task touches the
//! session controller.
//!
//! # Shutdown
//!
//! Both loops check a shared `running` flag before every tick, like the
//! other long-running loops in this crate.  Clearing it ends the task at its
//! next tick; aborting the returned handle ends it immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::manage_devices::DevicePoller;
use crate::application::reconnect::Reconnector;

/// Spawns the registry poll loop on the current tokio runtime.
pub fn spawn_registry_poll(
    poller: DevicePoller,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "device poll started");
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !running.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = poller.poll().await {
                warn!(error = %e, "device poll failed");
            }
        }
        info!("device poll stopped");
    })
}

/// Spawns the reconnect loop on the current tokio runtime.
pub fn spawn_reconnector(
    reconnector: Reconnector,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "reconnector started");
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !running.load(Ordering::Relaxed) {
                break;
            }
            match reconnector.tick().await {
                Ok(report) if !report.attempted.is_empty() => {
                    debug!(
                        attempted = report.attempted.len(),
                        failures = report.failures.len(),
                        "reconnect tick finished"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "reconnect tick failed"),
            }
        }
        info!("reconnector stopped");
    })
}
