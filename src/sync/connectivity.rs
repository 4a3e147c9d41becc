use std::sync::Arc;

use tokio::sync::watch;

/// Connectivity and foreground state as last reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnState {
    pub online: bool,
    pub visible: bool,
}

impl Default for ConnState {
    fn default() -> Self {
        Self {
            online: true,
            visible: true,
        }
    }
}

/// Shared handle to the connectivity signal.
///
/// The host app calls the setters from its platform events; the sync
/// engine and fetch controllers read the current state and subscribe
/// to transitions. Clones all share one underlying channel.
#[derive(Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<ConnState>>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.online != online;
            state.online = online;
            changed
        });
    }

    pub fn set_visible(&self, visible: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.visible != visible;
            state.visible = visible;
            changed
        });
    }

    pub fn state(&self) -> ConnState {
        *self.tx.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state().online
    }

    pub fn is_visible(&self) -> bool {
        self.state().visible
    }

    /// Subscribe to state transitions. The receiver observes the
    /// latest state only, which is all the reconnect logic needs.
    pub fn subscribe(&self) -> watch::Receiver<ConnState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_online_and_visible() {
        let conn = Connectivity::new();
        assert!(conn.is_online());
        assert!(conn.is_visible());
    }

    #[test]
    fn test_setters_update_shared_state() {
        let conn = Connectivity::new();
        let clone = conn.clone();

        conn.set_online(false);
        assert!(!clone.is_online());
        assert!(clone.is_visible());

        conn.set_visible(false);
        conn.set_online(true);
        assert_eq!(
            clone.state(),
            ConnState {
                online: true,
                visible: false
            }
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let conn = Connectivity::new();
        let mut rx = conn.subscribe();

        conn.set_online(false);
        rx.changed().await.unwrap();
        assert!(!rx.borrow().online);

        // No-op set does not wake subscribers.
        conn.set_online(false);
        assert!(!rx.has_changed().unwrap());
    }
}
