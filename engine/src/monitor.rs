//! Background tasks: connectivity monitoring, periodic sync, reachability
//! probing.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::remote::RemoteStore;
use crate::SyncCoordinator;

/// Shortest period accepted by the background tasks. Shorter ones,
/// zero included, are raised to it.
pub const MIN_TASK_PERIOD: Duration = Duration::from_secs(1);

fn task_period(period: Duration) -> Duration {
    if period < MIN_TASK_PERIOD {
        tracing::warn!(?period, min = ?MIN_TASK_PERIOD, "Background task period too short, clamping");
        MIN_TASK_PERIOD
    } else {
        period
    }
}

impl SyncCoordinator {
    /// Follow a connectivity signal (`true` = reachable).
    ///
    /// Attaches at most once per coordinator; later calls log a warning and
    /// return `None`. The current value of the signal is applied right away.
    pub fn setup_network_monitoring(
        self: &Arc<Self>,
        mut signal: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        if self.monitoring.swap(true, Ordering::SeqCst) {
            tracing::warn!("Network monitoring already attached, ignoring duplicate call");
            return None;
        }

        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let initial = *signal.borrow_and_update();
            coordinator.update_online_status(initial).await;

            while signal.changed().await.is_ok() {
                let online = *signal.borrow_and_update();
                coordinator.update_online_status(online).await;
            }
            tracing::debug!("Connectivity signal closed, network monitoring stopped");
        });

        tracing::info!("Network monitoring attached");
        Some(handle)
    }

    /// Run [`sync_all`](Self::sync_all) every `period`, at least
    /// [`MIN_TASK_PERIOD`]. The first pass runs one period after the call.
    /// While offline each pass is a no-op.
    pub fn spawn_periodic_sync(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let period = task_period(period);
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                coordinator.sync_all().await;
            }
        })
    }

    /// Start both background tasks from the coordinator's configuration:
    /// a reachability probe against the remote store feeding network
    /// monitoring, and the periodic sync.
    pub fn start_background_sync(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let (signal, probe) = spawn_connectivity_probe(
            Arc::clone(self.remote()),
            self.config().probe_interval,
            self.status_board().is_online(),
        );

        let mut handles = vec![probe, self.spawn_periodic_sync(self.config().sync_interval)];
        if let Some(monitor) = self.setup_network_monitoring(signal) {
            handles.push(monitor);
        }
        handles
    }
}

/// Derive a connectivity signal by pinging the remote store every `period`,
/// at least [`MIN_TASK_PERIOD`].
///
/// The signal only changes when reachability flips.
pub fn spawn_connectivity_probe(
    remote: Arc<dyn RemoteStore>,
    period: Duration,
    assume_online: bool,
) -> (watch::Receiver<bool>, JoinHandle<()>) {
    let period = task_period(period);
    let (tx, rx) = watch::channel(assume_online);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = match tokio::time::timeout(period, remote.ping()).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "Remote store ping failed");
                    false
                }
                Err(_) => false,
            };

            tx.send_if_modified(|current| {
                if *current == reachable {
                    false
                } else {
                    *current = reachable;
                    true
                }
            });

            if tx.is_closed() {
                break;
            }
        }
    });

    (rx, handle)
}
