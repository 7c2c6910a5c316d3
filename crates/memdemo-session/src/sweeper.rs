use crate::store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic background eviction of expired sessions.
///
/// Runs independently of request traffic so an idle pool still frees
/// its engine handles within one interval. Sweeping shares the store's
/// mutex with the request path and is idempotent, so the two racing is
/// harmless. Stop is explicit; dropping the handle leaves the task
/// running for the process lifetime, which is fine for the binary but
/// tests should call [`Sweeper::stop`].
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns the sweep loop on the current runtime.
    pub fn start(store: Arc<SessionStore>, interval: Duration) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so a fresh
            // server does not sweep an empty store at startup.
            ticker.tick().await;
            info!(interval_secs = interval.as_secs(), "Session sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep().await;
                        if removed > 0 {
                            info!(removed, "Sweeper evicted expired sessions");
                        } else {
                            debug!("Sweep found nothing to evict");
                        }
                    }
                    _ = rx.changed() => break,
                }
            }
            info!("Session sweeper stopped");
        });
        Self { shutdown, handle }
    }

    /// Signals the loop to exit and waits for it.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
