//! Wiring between the fetch controller, the live channel, and the
//! connectivity signal.
//!
//! The engine owns the active (year, semester, cycle) subscription
//! and reacts to three inputs: live-channel updates, connectivity or
//! visibility transitions (reconnect triggers), and a periodic tick
//! that serves as a degraded-mode polling fallback while the live
//! channel is down.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::api::ScheduleSource;
use crate::cache::ScheduleCache;
use crate::models::ScheduleScope;

use super::{Connectivity, FetchController, FetchOptions, LiveChannel, LiveUpdate};

/// Fallback polling period while the live channel is not connected.
const POLL_INTERVAL_SECS: u64 = 60;

pub struct SyncEngine {
    source: Arc<dyn ScheduleSource>,
    cache: ScheduleCache,
    connectivity: Connectivity,
    live: LiveChannel,
    updates: tokio::sync::Mutex<mpsc::Receiver<LiveUpdate>>,
    /// Set for students; forwarded to every controller so rendered
    /// and cached data never crosses groups.
    user_group: Option<String>,
    controller: Mutex<Option<Arc<FetchController>>>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        cache: ScheduleCache,
        connectivity: Connectivity,
        live: LiveChannel,
        updates: mpsc::Receiver<LiveUpdate>,
        user_group: Option<String>,
    ) -> Self {
        Self {
            source,
            cache,
            connectivity,
            live,
            updates: tokio::sync::Mutex::new(updates),
            user_group,
            controller: Mutex::new(None),
        }
    }

    /// Switch the active selection, replacing the previous
    /// controller.
    ///
    /// The old controller keeps its own scope, so a fetch still in
    /// flight under it writes only the old cache key. Callers usually
    /// follow up with `fetch` on the returned controller for the
    /// initial load.
    pub fn update_scope(&self, scope: ScheduleScope) -> Arc<FetchController> {
        let controller = Arc::new(FetchController::new(
            Arc::clone(&self.source),
            self.cache.clone(),
            scope,
            self.user_group.clone(),
            self.connectivity.clone(),
        ));
        *self.controller_slot() = Some(Arc::clone(&controller));
        info!(scope = %scope, "Active schedule scope changed");
        controller
    }

    /// The controller for the current selection, if one is active.
    pub fn controller(&self) -> Option<Arc<FetchController>> {
        self.controller_slot().clone()
    }

    pub fn live(&self) -> &LiveChannel {
        &self.live
    }

    /// Drive the engine until the live channel's sender side goes
    /// away. Intended to be spawned once per engine.
    pub async fn run(&self) {
        if self.connectivity.is_online() {
            self.live.connect();
        }

        let mut conn_rx = self.connectivity.subscribe();
        let mut poll = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately;
        // consume it so polling starts one period from now.
        poll.tick().await;

        loop {
            tokio::select! {
                update = async { self.updates.lock().await.recv().await } => {
                    match update {
                        Some(update) => self.handle_live_update(update).await,
                        None => break,
                    }
                }
                _ = poll.tick() => {
                    self.poll_fallback().await;
                }
                changed = conn_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *conn_rx.borrow_and_update();
                    if state.online && state.visible && !self.live.is_connected() {
                        debug!("Connectivity regained, reconnecting live channel");
                        self.live.connect();
                    }
                }
            }
        }
    }

    /// Tear the live channel down (view teardown / shutdown).
    pub fn shutdown(&self) {
        self.live.disconnect();
    }

    pub(crate) async fn handle_live_update(&self, update: LiveUpdate) {
        let Some(controller) = self.controller() else {
            // No active selection; nothing to refresh.
            return;
        };
        match update {
            LiveUpdate::RefreshAll(entries) => {
                controller.apply_refresh_all(entries);
            }
            LiveUpdate::Invalidated => {
                debug!("Change signal received, re-fetching active scope");
                controller
                    .fetch(FetchOptions {
                        use_cache: false,
                        show_loading: false,
                    })
                    .await;
            }
        }
    }

    /// Degraded-mode refresh: only while online, visible, and the
    /// live channel is down. Shares the controller's in-flight guard,
    /// so a poll never stacks onto an active fetch.
    async fn poll_fallback(&self) {
        let state = self.connectivity.state();
        if !state.online || !state.visible || self.live.is_connected() {
            return;
        }
        let Some(controller) = self.controller() else {
            return;
        };
        debug!("Polling fallback (live channel not connected)");
        controller
            .fetch(FetchOptions {
                use_cache: false,
                show_loading: false,
            })
            .await;
    }

    fn controller_slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<FetchController>>> {
        self.controller.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::cache::store::tests::{cache, entry, scope};
    use crate::models::{AssessmentEntry, ScheduleEntry};

    use super::*;

    #[derive(Default)]
    struct CountingSource {
        schedules: Vec<ScheduleEntry>,
        schedule_calls: AtomicUsize,
    }

    #[async_trait]
    impl ScheduleSource for CountingSource {
        async fn fetch_schedules(&self, _scope: &ScheduleScope) -> Result<Vec<ScheduleEntry>> {
            self.schedule_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.schedules.clone())
        }

        async fn fetch_assessments(&self, _scope: &ScheduleScope) -> Result<Vec<AssessmentEntry>> {
            Ok(Vec::new())
        }
    }

    fn engine(source: Arc<CountingSource>, cache: &ScheduleCache) -> SyncEngine {
        let (live, rx) = LiveChannel::new("ws://127.0.0.1:1/ws/schedule".to_string());
        SyncEngine::new(
            source,
            cache.clone(),
            Connectivity::new(),
            live,
            rx,
            None,
        )
    }

    #[tokio::test]
    async fn test_update_scope_replaces_controller() {
        let cache = cache();
        let engine = engine(Arc::new(CountingSource::default()), &cache);
        assert!(engine.controller().is_none());

        let first = engine.update_scope(scope());
        let second = engine.update_scope(ScheduleScope::new(
            2,
            crate::models::Semester::Semester2,
            None,
        ));

        assert_eq!(first.scope(), scope());
        assert_ne!(first.scope(), second.scope());
        assert_eq!(engine.controller().unwrap().scope(), second.scope());
    }

    #[tokio::test]
    async fn test_refresh_all_update_writes_view_and_cache() {
        let cache = cache();
        let engine = engine(Arc::new(CountingSource::default()), &cache);
        let controller = engine.update_scope(scope());

        engine
            .handle_live_update(LiveUpdate::RefreshAll(vec![entry(1, "TI-221")]))
            .await;

        assert_eq!(controller.view().schedules.len(), 1);
        assert_eq!(cache.load_schedules(&scope()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalidation_update_refetches_from_network() {
        let cache = cache();
        let source = Arc::new(CountingSource {
            schedules: vec![entry(1, "TI-221")],
            ..Default::default()
        });
        let engine = engine(source.clone(), &cache);
        let controller = engine.update_scope(scope());

        engine.handle_live_update(LiveUpdate::Invalidated).await;

        assert_eq!(source.schedule_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.view().schedules.len(), 1);
    }

    #[tokio::test]
    async fn test_updates_without_active_scope_are_dropped() {
        let cache = cache();
        let source = Arc::new(CountingSource::default());
        let engine = engine(source.clone(), &cache);

        engine.handle_live_update(LiveUpdate::Invalidated).await;
        engine
            .handle_live_update(LiveUpdate::RefreshAll(vec![entry(1, "TI-221")]))
            .await;

        assert_eq!(source.schedule_calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.load_schedules(&scope()), None);
    }

    #[tokio::test]
    async fn test_poll_fallback_respects_connectivity_gates() {
        let cache = cache();
        let source = Arc::new(CountingSource::default());
        let engine = engine(source.clone(), &cache);
        engine.update_scope(scope());

        engine.connectivity.set_online(false);
        engine.poll_fallback().await;
        assert_eq!(source.schedule_calls.load(Ordering::SeqCst), 0);

        engine.connectivity.set_online(true);
        engine.connectivity.set_visible(false);
        engine.poll_fallback().await;
        assert_eq!(source.schedule_calls.load(Ordering::SeqCst), 0);

        engine.connectivity.set_visible(true);
        engine.poll_fallback().await;
        assert_eq!(source.schedule_calls.load(Ordering::SeqCst), 1);
    }
}
