use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

use crate::services::reconciler::Reconciler;

/// Default pause between two connectivity checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Background task re-probing the game store. Stops when dropped.
pub struct ConnectivityMonitor {
    handle: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// Refresh immediately, then every `period`.
    pub fn spawn(reconciler: Arc<Reconciler>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period = ?period, "connectivity monitor started");
            loop {
                ticker.tick().await;
                let connectivity = reconciler.refresh().await;
                debug!(?connectivity, "connectivity check finished");
            }
        });
        Self { handle }
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::local_cache::LocalCache, services::reconciler::Connectivity,
        test_support::FakeStore,
    };
    use tokio::{sync::watch, time::timeout};

    async fn wait_for(rx: &mut watch::Receiver<Connectivity>, wanted: Connectivity) {
        timeout(Duration::from_secs(2), rx.wait_for(|c| *c == wanted))
            .await
            .expect("connectivity did not change in time")
            .unwrap();
    }

    #[tokio::test]
    async fn monitor_tracks_store_and_stops_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::shared();
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            Arc::new(LocalCache::new(dir.path().join("cache.json"))),
            Duration::from_millis(200),
        ));
        let mut rx = reconciler.connectivity_watcher();

        let monitor = ConnectivityMonitor::spawn(reconciler.clone(), Duration::from_millis(20));
        wait_for(&mut rx, Connectivity::Connected).await;

        store.set_online(false);
        wait_for(&mut rx, Connectivity::Disconnected).await;

        drop(monitor);
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.set_online(true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reconciler.connectivity(), Connectivity::Disconnected);
    }
}
