use serde::{Deserialize, Serialize};

use super::scope::{CycleType, Semester};

/// A periodic-evaluation record. Unlike `ScheduleEntry` these are not
/// slotted into the weekly grid: subject, professor, date, time, and
/// room are free text entered by the admin, and one record can cover
/// several groups at once via `groups_composition`
/// (comma-joined group codes, e.g. "TI-221, TI-222").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentEntry {
    pub id: i64,
    pub subject: String,
    pub groups_composition: String,
    pub professor_name: String,
    pub assessment_date: String,
    pub assessment_time: String,
    pub room_code: String,
    pub academic_year: i32,
    pub semester: Semester,
    #[serde(default)]
    pub cycle_type: Option<CycleType>,
}

impl AssessmentEntry {
    /// Group codes from `groups_composition`, split on commas and
    /// trimmed. Empty segments are dropped.
    pub fn groups(&self) -> Vec<&str> {
        self.groups_composition
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .collect()
    }

    pub fn includes_group(&self, group_code: &str) -> bool {
        self.groups().iter().any(|g| *g == group_code)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentDraft {
    pub subject: String,
    pub groups_composition: String,
    pub professor_name: String,
    pub assessment_date: String,
    pub assessment_time: String,
    pub room_code: String,
    pub academic_year: i32,
    pub semester: Semester,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_type: Option<CycleType>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssessmentChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups_composition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<Semester>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_type: Option<CycleType>,
}
