use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{AssessmentEntry, ScheduleEntry};

use super::store::{
    ScheduleCache, ASSESSMENT_PREFIX, ASSESSMENT_TS_PREFIX, SCHEDULE_PREFIX, SCHEDULE_TS_PREFIX,
};

impl ScheduleCache {
    /// Prune every cached key down to one group's records.
    ///
    /// Called once per session, as soon as the authenticated user's
    /// group is known; on a shared device this keeps another
    /// student's schedule from lingering in the cache. Must not run
    /// before the group is known: filtering against the wrong group
    /// would destroy valid cache.
    ///
    /// A key whose filtered result is empty is deleted along with its
    /// timestamp key instead of storing an empty placeholder.
    pub fn filter_by_group(&self, group_code: &str) {
        self.filter_kind::<ScheduleEntry, _>(SCHEDULE_PREFIX, SCHEDULE_TS_PREFIX, |entry| {
            entry.group.code == group_code
        });
        self.filter_kind::<AssessmentEntry, _>(ASSESSMENT_PREFIX, ASSESSMENT_TS_PREFIX, |entry| {
            entry.includes_group(group_code)
        });
        debug!(group = group_code, "Cache filtered to user group");
    }

    fn filter_kind<T, F>(&self, prefix: &str, ts_prefix: &str, keep: F)
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let keys = match self.store().keys_with_prefix(prefix) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(prefix, error = %e, "Failed to list cache keys for filtering");
                return;
            }
        };

        for key in keys {
            let raw = match self.store().get(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key, error = %e, "Failed to read cache key for filtering");
                    continue;
                }
            };

            let entries: Vec<T> = match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(key, error = %e, "Malformed cached data, skipping filter");
                    continue;
                }
            };

            let total = entries.len();
            let kept: Vec<T> = entries.into_iter().filter(|e| keep(e)).collect();

            if kept.is_empty() {
                let ts_key = key.replacen(prefix, ts_prefix, 1);
                for k in [key.as_str(), ts_key.as_str()] {
                    if let Err(e) = self.store().remove(k) {
                        warn!(key = k, error = %e, "Failed to remove emptied cache key");
                    }
                }
                continue;
            }

            if kept.len() == total {
                continue;
            }

            match serde_json::to_string(&kept) {
                Ok(json) => {
                    if let Err(e) = self.store().set(&key, &json) {
                        warn!(key, error = %e, "Failed to write filtered cache");
                    }
                }
                Err(e) => warn!(key, error = %e, "Failed to serialize filtered cache"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::store::tests::{assessment, cache, entry, scope};
    use crate::models::{CycleType, ScheduleScope, Semester};

    #[test]
    fn test_filter_keeps_only_matching_schedules() {
        let cache = cache();
        cache.save_schedules(&[entry(1, "TI-221"), entry(2, "TI-222")], &scope());

        cache.filter_by_group("TI-221");

        let remaining = cache.load_schedules(&scope()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].group.code, "TI-221");
    }

    #[test]
    fn test_filter_spans_all_scopes() {
        let cache = cache();
        let other = ScheduleScope::new(2, Semester::Semester2, Some(CycleType::ReducedAttendance));
        cache.save_schedules(&[entry(1, "TI-221"), entry(2, "TI-222")], &scope());
        cache.save_schedules(&[entry(3, "TI-222")], &other);

        cache.filter_by_group("TI-221");

        assert_eq!(cache.load_schedules(&scope()).unwrap().len(), 1);
        // The other scope had no TI-221 rows; its key must be gone.
        assert_eq!(cache.load_schedules(&other), None);
    }

    #[test]
    fn test_emptied_key_loses_its_timestamp_too() {
        let cache = cache();
        cache.save_schedules(&[entry(1, "TI-222")], &scope());

        cache.filter_by_group("TI-221");

        assert_eq!(
            cache.store().get("scheduleCache_1_semester1_F").unwrap(),
            None
        );
        assert_eq!(
            cache
                .store()
                .get("scheduleCacheTimestamp_1_semester1_F")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_filter_matches_assessment_composition_membership() {
        let cache = cache();
        cache.save_assessments(
            &[
                assessment(1, "TI-221, TI-222"),
                assessment(2, "TI-223"),
                assessment(3, "TI-2211"),
            ],
            &scope(),
        );

        cache.filter_by_group("TI-221");

        let remaining = cache.load_assessments(&scope()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 1);
    }

    #[test]
    fn test_filter_leaves_full_matches_untouched() {
        let cache = cache();
        let entries = vec![entry(1, "TI-221"), entry(2, "TI-221")];
        cache.save_schedules(&entries, &scope());

        cache.filter_by_group("TI-221");

        assert_eq!(cache.load_schedules(&scope()), Some(entries));
    }

    #[test]
    fn test_end_to_end_two_groups_one_survivor() {
        let cache = cache();
        cache.save_schedules(&[entry(1, "TI-221"), entry(2, "TI-222")], &scope());

        cache.filter_by_group("TI-221");

        let loaded = cache.load_schedules(&scope()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 1);
    }
}
