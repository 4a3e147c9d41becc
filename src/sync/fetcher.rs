//! Per-scope fetch orchestration.
//!
//! A `FetchController` produces a consistent view of one
//! (academic year, semester, cycle type) selection: cache first for
//! instant paint, then a network refresh, falling back to cache when
//! the network fails and to plain notices when there is nothing else
//! to show. An atomic in-flight flag drops overlapping invocations so
//! mount, reconnect, polling, and push triggers never stack requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::api::ScheduleSource;
use crate::cache::ScheduleCache;
use crate::models::{slot_conflicts, AssessmentEntry, ScheduleEntry, ScheduleScope};

use super::Connectivity;

/// User-facing state of a degraded fetch. Rendered as an inline
/// banner; never a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No connectivity; cached data is shown.
    Offline,
    /// No connectivity and nothing cached for this selection.
    OfflineNoCache,
    /// The server could not be reached; cached data is shown and may
    /// be out of date.
    StaleCache,
    /// The fetch failed and no cache exists; carries the error detail.
    FetchFailed(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Offline => write!(f, "Offline mode."),
            Notice::OfflineNoCache => {
                write!(f, "No internet connection and no cached data.")
            }
            Notice::StaleCache => write!(
                f,
                "Could not reach the server. Showing cached data (possibly outdated)."
            ),
            Notice::FetchFailed(detail) => {
                write!(f, "Failed to load the schedule: {}", detail)
            }
        }
    }
}

/// What a view renders: the entries for the active selection plus
/// loading/notice state.
#[derive(Debug, Clone, Default)]
pub struct ScheduleView {
    pub schedules: Vec<ScheduleEntry>,
    pub assessments: Vec<AssessmentEntry>,
    pub loading: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Render cached data immediately before hitting the network.
    pub use_cache: bool,
    /// Toggle the loading indicator around the fetch.
    pub show_loading: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            show_loading: true,
        }
    }
}

/// Releases the in-flight flag when dropped, whatever path the fetch
/// took to get out.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Fetch state for one (year, semester, cycle) subscription.
///
/// The scope is fixed at construction; switching selections means a
/// new controller. A fetch that outlives its controller's selection
/// can therefore only write the old selection's cache key, never
/// corrupt the new one.
pub struct FetchController {
    source: Arc<dyn ScheduleSource>,
    cache: ScheduleCache,
    scope: ScheduleScope,
    /// Set for students; every rendered or cached record is reduced
    /// to this group first.
    user_group: Option<String>,
    connectivity: Connectivity,
    in_flight: AtomicBool,
    view: Mutex<ScheduleView>,
}

impl FetchController {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        cache: ScheduleCache,
        scope: ScheduleScope,
        user_group: Option<String>,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            source,
            cache,
            scope,
            user_group,
            connectivity,
            in_flight: AtomicBool::new(false),
            view: Mutex::new(ScheduleView::default()),
        }
    }

    pub fn scope(&self) -> ScheduleScope {
        self.scope
    }

    /// Snapshot of the current view state.
    pub fn view(&self) -> ScheduleView {
        self.view_mut().clone()
    }

    /// Run one fetch cycle for this controller's scope.
    ///
    /// Assessment-period semesters load the assessment calendar;
    /// teaching semesters load the weekly grid. If a fetch is already
    /// in flight the call returns immediately without touching the
    /// network or the view.
    pub async fn fetch(&self, options: FetchOptions) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!(scope = %self.scope, "Fetch already in flight, skipping");
            return;
        }
        let _guard = InFlightGuard(&self.in_flight);

        if self.scope.semester.is_assessment_period() {
            self.fetch_assessments(options).await;
        } else {
            self.fetch_schedules(options).await;
        }
    }

    /// Replace the rendered schedule set from a refresh-all push.
    ///
    /// The payload is the complete schedule set; it is trimmed to
    /// this controller's scope and the user's group before replacing
    /// state and writing through to the cache.
    pub fn apply_refresh_all(&self, entries: Vec<ScheduleEntry>) {
        let scoped: Vec<ScheduleEntry> = entries
            .into_iter()
            .filter(|e| e.matches_scope(&self.scope))
            .collect();
        let filtered = self.filter_schedules(scoped);

        {
            let mut view = self.view_mut();
            view.schedules = filtered.clone();
            view.notice = None;
        }
        self.cache.save_schedules(&filtered, &self.scope);
        debug!(scope = %self.scope, count = filtered.len(), "Applied refresh-all push");
    }

    // ===== Weekly grid =====

    async fn fetch_schedules(&self, options: FetchOptions) {
        let mut rendered_from_cache = false;

        if options.use_cache {
            if let Some(cached) = self.non_empty_cached_schedules() {
                let filtered = self.filter_schedules(cached);
                let mut view = self.view_mut();
                view.schedules = filtered;
                view.notice = None;
                if options.show_loading {
                    view.loading = false;
                }
                rendered_from_cache = true;
            }
        }

        if !self.connectivity.is_online() {
            self.render_offline_schedules(rendered_from_cache, options.show_loading);
            return;
        }

        if options.show_loading {
            self.view_mut().loading = true;
        }

        match self.source.fetch_schedules(&self.scope).await {
            Ok(data) => {
                for (a, b) in slot_conflicts(&data) {
                    warn!(first = a, second = b, "Server data has two sessions in one slot");
                }
                let filtered = self.filter_schedules(data);
                {
                    let mut view = self.view_mut();
                    view.schedules = filtered.clone();
                    view.notice = None;
                }
                self.cache.save_schedules(&filtered, &self.scope);
            }
            Err(e) => {
                debug!(scope = %self.scope, error = %e, "Schedule fetch failed, trying cache");
                match self.non_empty_cached_schedules() {
                    Some(cached) => {
                        let filtered = self.filter_schedules(cached);
                        let mut view = self.view_mut();
                        if !rendered_from_cache {
                            view.schedules = filtered;
                        }
                        view.notice = Some(Notice::StaleCache);
                    }
                    None => {
                        self.view_mut().notice = Some(Notice::FetchFailed(e.to_string()));
                    }
                }
            }
        }

        if options.show_loading {
            self.view_mut().loading = false;
        }
    }

    fn render_offline_schedules(&self, rendered_from_cache: bool, show_loading: bool) {
        match self.non_empty_cached_schedules() {
            Some(cached) => {
                let filtered = self.filter_schedules(cached);
                let mut view = self.view_mut();
                if !rendered_from_cache {
                    view.schedules = filtered;
                }
                view.notice = Some(Notice::Offline);
                if show_loading {
                    view.loading = false;
                }
            }
            None => {
                let mut view = self.view_mut();
                view.notice = Some(Notice::OfflineNoCache);
                if show_loading {
                    view.loading = false;
                }
            }
        }
    }

    // ===== Assessment calendar =====

    async fn fetch_assessments(&self, options: FetchOptions) {
        let mut rendered_from_cache = false;

        if options.use_cache {
            if let Some(cached) = self.non_empty_cached_assessments() {
                let filtered = self.filter_assessments(cached);
                let mut view = self.view_mut();
                view.assessments = filtered;
                view.notice = None;
                if options.show_loading {
                    view.loading = false;
                }
                rendered_from_cache = true;
            }
        }

        if !self.connectivity.is_online() {
            self.render_offline_assessments(rendered_from_cache, options.show_loading);
            return;
        }

        if options.show_loading {
            self.view_mut().loading = true;
        }

        match self.source.fetch_assessments(&self.scope).await {
            Ok(data) => {
                let filtered = self.filter_assessments(data);
                {
                    let mut view = self.view_mut();
                    view.assessments = filtered.clone();
                    view.notice = None;
                }
                self.cache.save_assessments(&filtered, &self.scope);
            }
            Err(e) => {
                debug!(scope = %self.scope, error = %e, "Assessment fetch failed, trying cache");
                match self.non_empty_cached_assessments() {
                    Some(cached) => {
                        let filtered = self.filter_assessments(cached);
                        let mut view = self.view_mut();
                        if !rendered_from_cache {
                            view.assessments = filtered;
                        }
                        view.notice = Some(Notice::StaleCache);
                    }
                    None => {
                        self.view_mut().notice = Some(Notice::FetchFailed(e.to_string()));
                    }
                }
            }
        }

        if options.show_loading {
            self.view_mut().loading = false;
        }
    }

    fn render_offline_assessments(&self, rendered_from_cache: bool, show_loading: bool) {
        match self.non_empty_cached_assessments() {
            Some(cached) => {
                let filtered = self.filter_assessments(cached);
                let mut view = self.view_mut();
                if !rendered_from_cache {
                    view.assessments = filtered;
                }
                view.notice = Some(Notice::Offline);
                if show_loading {
                    view.loading = false;
                }
            }
            None => {
                let mut view = self.view_mut();
                view.notice = Some(Notice::OfflineNoCache);
                if show_loading {
                    view.loading = false;
                }
            }
        }
    }

    // ===== Helpers =====

    fn non_empty_cached_schedules(&self) -> Option<Vec<ScheduleEntry>> {
        self.cache
            .load_schedules(&self.scope)
            .filter(|entries| !entries.is_empty())
    }

    fn non_empty_cached_assessments(&self) -> Option<Vec<AssessmentEntry>> {
        self.cache
            .load_assessments(&self.scope)
            .filter(|entries| !entries.is_empty())
    }

    fn filter_schedules(&self, entries: Vec<ScheduleEntry>) -> Vec<ScheduleEntry> {
        match self.user_group {
            Some(ref group) => entries
                .into_iter()
                .filter(|e| e.group.code == *group)
                .collect(),
            None => entries,
        }
    }

    /// Keep only the user's assessments, and collapse each record's
    /// composition to the user's own group for display.
    fn filter_assessments(&self, entries: Vec<AssessmentEntry>) -> Vec<AssessmentEntry> {
        match self.user_group {
            Some(ref group) => entries
                .into_iter()
                .filter(|e| e.includes_group(group))
                .map(|mut e| {
                    e.groups_composition = group.clone();
                    e
                })
                .collect(),
            None => entries,
        }
    }

    fn view_mut(&self) -> MutexGuard<'_, ScheduleView> {
        self.view.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use crate::cache::store::tests::{assessment, cache, entry, scope};
    use crate::models::{CycleType, Semester};

    use super::*;

    /// Scripted source: fixed payloads, optional failure, optional
    /// delay, and call counters for the in-flight assertions.
    #[derive(Default)]
    struct StubSource {
        schedules: Vec<ScheduleEntry>,
        assessments: Vec<AssessmentEntry>,
        fail: bool,
        delay: Option<Duration>,
        schedule_calls: AtomicUsize,
        assessment_calls: AtomicUsize,
    }

    #[async_trait]
    impl ScheduleSource for StubSource {
        async fn fetch_schedules(&self, _scope: &ScheduleScope) -> Result<Vec<ScheduleEntry>> {
            self.schedule_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.schedules.clone())
        }

        async fn fetch_assessments(&self, _scope: &ScheduleScope) -> Result<Vec<AssessmentEntry>> {
            self.assessment_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.assessments.clone())
        }
    }

    fn controller(
        source: Arc<StubSource>,
        cache: &ScheduleCache,
        user_group: Option<&str>,
        connectivity: &Connectivity,
    ) -> FetchController {
        FetchController::new(
            source,
            cache.clone(),
            scope(),
            user_group.map(str::to_string),
            connectivity.clone(),
        )
    }

    #[tokio::test]
    async fn test_offline_renders_cache_without_network_call() {
        let cache = cache();
        cache.save_schedules(&[entry(1, "TI-221")], &scope());

        let connectivity = Connectivity::new();
        connectivity.set_online(false);

        let source = Arc::new(StubSource {
            schedules: vec![entry(2, "TI-221")],
            ..Default::default()
        });
        let ctl = controller(source.clone(), &cache, None, &connectivity);
        ctl.fetch(FetchOptions::default()).await;

        let view = ctl.view();
        assert_eq!(view.schedules.len(), 1);
        assert_eq!(view.schedules[0].id, 1);
        assert_eq!(view.notice, Some(Notice::Offline));
        assert!(!view.loading);
        assert_eq!(source.schedule_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_offline_without_cache_reports_no_data() {
        let cache = cache();
        let connectivity = Connectivity::new();
        connectivity.set_online(false);

        let ctl = controller(Arc::new(StubSource::default()), &cache, None, &connectivity);
        ctl.fetch(FetchOptions::default()).await;

        let view = ctl.view();
        assert!(view.schedules.is_empty());
        assert_eq!(view.notice, Some(Notice::OfflineNoCache));
    }

    #[tokio::test]
    async fn test_network_result_overwrites_stale_cache() {
        let cache = cache();
        cache.save_schedules(&[entry(1, "TI-221")], &scope());

        let fresh = vec![entry(2, "TI-221"), entry(3, "TI-221")];
        let source = Arc::new(StubSource {
            schedules: fresh.clone(),
            ..Default::default()
        });
        let ctl = controller(source, &cache, None, &Connectivity::new());
        ctl.fetch(FetchOptions::default()).await;

        let view = ctl.view();
        assert_eq!(view.schedules, fresh);
        assert_eq!(view.notice, None);
        assert_eq!(cache.load_schedules(&scope()), Some(fresh));
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_to_cache_with_notice() {
        let cache = cache();
        let cached = vec![entry(1, "TI-221")];
        cache.save_schedules(&cached, &scope());

        let source = Arc::new(StubSource {
            fail: true,
            ..Default::default()
        });
        let ctl = controller(source, &cache, None, &Connectivity::new());
        ctl.fetch(FetchOptions {
            use_cache: false,
            show_loading: false,
        })
        .await;

        let view = ctl.view();
        assert_eq!(view.schedules, cached);
        assert_eq!(view.notice, Some(Notice::StaleCache));
        // The cache itself is untouched by a failed fetch.
        assert_eq!(cache.load_schedules(&scope()), Some(view.schedules));
    }

    #[tokio::test]
    async fn test_failed_fetch_without_cache_surfaces_detail() {
        let cache = cache();
        let source = Arc::new(StubSource {
            fail: true,
            ..Default::default()
        });
        let ctl = controller(source, &cache, None, &Connectivity::new());
        ctl.fetch(FetchOptions::default()).await;

        match ctl.view().notice {
            Some(Notice::FetchFailed(detail)) => assert!(detail.contains("connection refused")),
            other => panic!("expected FetchFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overlapping_fetches_make_one_network_call() {
        let cache = cache();
        let source = Arc::new(StubSource {
            schedules: vec![entry(1, "TI-221")],
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let ctl = Arc::new(controller(source.clone(), &cache, None, &Connectivity::new()));

        let a = ctl.clone();
        let b = ctl.clone();
        tokio::join!(
            a.fetch(FetchOptions::default()),
            b.fetch(FetchOptions::default())
        );

        assert_eq!(source.schedule_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_results_are_reduced_to_user_group() {
        let cache = cache();
        let source = Arc::new(StubSource {
            schedules: vec![entry(1, "TI-221"), entry(2, "TI-222")],
            ..Default::default()
        });
        let ctl = controller(source, &cache, Some("TI-221"), &Connectivity::new());
        ctl.fetch(FetchOptions::default()).await;

        let view = ctl.view();
        assert_eq!(view.schedules.len(), 1);
        assert_eq!(view.schedules[0].group.code, "TI-221");
        assert_eq!(cache.load_schedules(&scope()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_assessment_scope_routes_to_assessment_endpoint() {
        let cache = cache();
        let source = Arc::new(StubSource {
            assessments: vec![assessment(1, "TI-221, TI-222")],
            ..Default::default()
        });
        let ctl = FetchController::new(
            source.clone(),
            cache.clone(),
            ScheduleScope::new(1, Semester::Assessments1, Some(CycleType::FullTime)),
            Some("TI-221".to_string()),
            Connectivity::new(),
        );
        ctl.fetch(FetchOptions::default()).await;

        let view = ctl.view();
        assert!(view.schedules.is_empty());
        assert_eq!(view.assessments.len(), 1);
        // Composition collapses to the user's own group for display.
        assert_eq!(view.assessments[0].groups_composition, "TI-221");
        assert_eq!(source.assessment_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.schedule_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_fetch_populates_cache_for_triple() {
        let cache = cache();
        let fetched = vec![entry(1, "TI-221")];
        let source = Arc::new(StubSource {
            schedules: fetched.clone(),
            ..Default::default()
        });
        let ctl = controller(source, &cache, None, &Connectivity::new());

        assert_eq!(cache.load_schedules(&scope()), None);
        ctl.fetch(FetchOptions::default()).await;
        assert_eq!(cache.load_schedules(&scope()), Some(fetched));
    }

    #[tokio::test]
    async fn test_apply_refresh_all_trims_to_scope_and_group() {
        let cache = cache();
        let ctl = controller(
            Arc::new(StubSource::default()),
            &cache,
            Some("TI-221"),
            &Connectivity::new(),
        );

        let mut other_scope = entry(3, "TI-221");
        other_scope.academic_year = Some(2);

        ctl.apply_refresh_all(vec![entry(1, "TI-221"), entry(2, "TI-222"), other_scope]);

        let view = ctl.view();
        assert_eq!(view.schedules.len(), 1);
        assert_eq!(view.schedules[0].id, 1);
        assert_eq!(cache.load_schedules(&scope()).unwrap().len(), 1);
    }
}
