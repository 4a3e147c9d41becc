use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{AssessmentEntry, ScheduleEntry, ScheduleScope};
use crate::storage::KeyValueStore;

/// Key prefixes. Schedule and assessment entries get distinct
/// prefixes so the two kinds can never collide, and each data key has
/// a parallel timestamp key recording the write time in epoch millis.
pub(crate) const SCHEDULE_PREFIX: &str = "scheduleCache_";
pub(crate) const SCHEDULE_TS_PREFIX: &str = "scheduleCacheTimestamp_";
pub(crate) const ASSESSMENT_PREFIX: &str = "assessmentCache_";
pub(crate) const ASSESSMENT_TS_PREFIX: &str = "assessmentCacheTimestamp_";

/// Unprefixed keys written by old client versions. Removed by
/// `clear_all` only; nothing reads them anymore.
const LEGACY_KEY: &str = "scheduleCache";
const LEGACY_TS_KEY: &str = "scheduleCacheTimestamp";

/// Display order of group columns, shared between the admin save flow
/// and the schedule views.
const GROUP_ORDER_KEY: &str = "scheduleGroupsOrder";

/// Keyed persistent cache over the key-value port.
///
/// Cheap to clone; all clones share the same backing store.
#[derive(Clone)]
pub struct ScheduleCache {
    store: Arc<dyn KeyValueStore>,
}

impl ScheduleCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    // ===== Schedules =====

    pub fn save_schedules(&self, entries: &[ScheduleEntry], scope: &ScheduleScope) {
        self.save_list(SCHEDULE_PREFIX, SCHEDULE_TS_PREFIX, scope, entries);
    }

    pub fn load_schedules(&self, scope: &ScheduleScope) -> Option<Vec<ScheduleEntry>> {
        self.load_list(SCHEDULE_PREFIX, scope)
    }

    pub fn clear_schedules(&self, scope: &ScheduleScope) {
        self.clear_key(SCHEDULE_PREFIX, SCHEDULE_TS_PREFIX, scope);
    }

    pub fn schedules_saved_at(&self, scope: &ScheduleScope) -> Option<DateTime<Utc>> {
        self.saved_at(SCHEDULE_TS_PREFIX, scope)
    }

    // ===== Assessments =====

    pub fn save_assessments(&self, entries: &[AssessmentEntry], scope: &ScheduleScope) {
        self.save_list(ASSESSMENT_PREFIX, ASSESSMENT_TS_PREFIX, scope, entries);
    }

    pub fn load_assessments(&self, scope: &ScheduleScope) -> Option<Vec<AssessmentEntry>> {
        self.load_list(ASSESSMENT_PREFIX, scope)
    }

    pub fn clear_assessments(&self, scope: &ScheduleScope) {
        self.clear_key(ASSESSMENT_PREFIX, ASSESSMENT_TS_PREFIX, scope);
    }

    pub fn assessments_saved_at(&self, scope: &ScheduleScope) -> Option<DateTime<Utc>> {
        self.saved_at(ASSESSMENT_TS_PREFIX, scope)
    }

    // ===== Group display order =====

    pub fn save_group_order(&self, group_ids: &[i64]) {
        let json = match serde_json::to_string(group_ids) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize group order");
                return;
            }
        };
        if let Err(e) = self.store.set(GROUP_ORDER_KEY, &json) {
            warn!(error = %e, "Failed to save group order");
        }
    }

    pub fn load_group_order(&self) -> Option<Vec<i64>> {
        let raw = match self.store.get(GROUP_ORDER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read group order");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(ids) => Some(ids),
            Err(e) => {
                warn!(error = %e, "Malformed group order, ignoring");
                None
            }
        }
    }

    // ===== Maintenance =====

    /// Remove every cached entry: all four prefixes plus the legacy
    /// unprefixed keys.
    pub fn clear_all(&self) {
        for prefix in [
            SCHEDULE_PREFIX,
            SCHEDULE_TS_PREFIX,
            ASSESSMENT_PREFIX,
            ASSESSMENT_TS_PREFIX,
        ] {
            let keys = match self.store.keys_with_prefix(prefix) {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(prefix, error = %e, "Failed to list cache keys");
                    continue;
                }
            };
            for key in keys {
                if let Err(e) = self.store.remove(&key) {
                    warn!(key, error = %e, "Failed to remove cache key");
                }
            }
        }
        for key in [LEGACY_KEY, LEGACY_TS_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove legacy cache key");
            }
        }
    }

    // ===== Internals =====

    fn data_key(prefix: &str, scope: &ScheduleScope) -> String {
        format!("{}{}", prefix, scope.key_fragment())
    }

    fn save_list<T: Serialize>(
        &self,
        prefix: &str,
        ts_prefix: &str,
        scope: &ScheduleScope,
        entries: &[T],
    ) {
        let key = Self::data_key(prefix, scope);
        let json = match serde_json::to_string(entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entries");
                return;
            }
        };
        if let Err(e) = self.store.set(&key, &json) {
            warn!(key, error = %e, "Failed to write cache");
            return;
        }
        let ts = Utc::now().timestamp_millis().to_string();
        if let Err(e) = self.store.set(&Self::data_key(ts_prefix, scope), &ts) {
            warn!(key, error = %e, "Failed to write cache timestamp");
        }
        debug!(key, count = entries.len(), "Cache updated");
    }

    fn load_list<T: DeserializeOwned>(
        &self,
        prefix: &str,
        scope: &ScheduleScope,
    ) -> Option<Vec<T>> {
        let key = Self::data_key(prefix, scope);
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Some(entries),
            Err(e) => {
                // Malformed data counts as no cache; it will be
                // overwritten by the next successful fetch.
                warn!(key, error = %e, "Malformed cached data, ignoring");
                None
            }
        }
    }

    fn clear_key(&self, prefix: &str, ts_prefix: &str, scope: &ScheduleScope) {
        for key in [Self::data_key(prefix, scope), Self::data_key(ts_prefix, scope)] {
            if let Err(e) = self.store.remove(&key) {
                warn!(key, error = %e, "Failed to clear cache key");
            }
        }
    }

    fn saved_at(&self, ts_prefix: &str, scope: &ScheduleScope) -> Option<DateTime<Utc>> {
        let key = Self::data_key(ts_prefix, scope);
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache timestamp");
                return None;
            }
        };
        let millis: i64 = raw.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}
