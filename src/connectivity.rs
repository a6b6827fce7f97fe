use log::info;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Shared online/offline flag with change notifications.
#[derive(Clone, Debug)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns true if the value changed. Subscribers are only woken on a change.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Stream of subsequent values, skipping the current one.
    pub fn changes(&self) -> WatchStream<bool> {
        WatchStream::from_changes(self.subscribe())
    }
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn test_set_online_reports_changes_only() {
        let signal = ConnectivitySignal::default();
        assert!(signal.is_online());
        assert!(!signal.set_online(true));
        assert!(signal.set_online(false));
        assert!(!signal.is_online());
    }

    #[tokio::test]
    async fn test_changes_are_observed_by_clones() {
        let signal = ConnectivitySignal::new(true);
        let mut changes = signal.changes();
        let other = signal.clone();

        other.set_online(false);
        assert_eq!(changes.next().await, Some(false));
        other.set_online(true);
        assert_eq!(changes.next().await, Some(true));
    }
}
