use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::reference::{Group, Professor, Room, Subject};
use super::scope::{CycleType, ScheduleScope, Semester};

/// Teaching day. The grid runs Monday through Saturday; Sunday is
/// never scheduled. Wire values are the Romanian day names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Day {
    #[serde(rename = "Luni")]
    Monday,
    #[serde(rename = "Marți")]
    Tuesday,
    #[serde(rename = "Miercuri")]
    Wednesday,
    #[serde(rename = "Joi")]
    Thursday,
    #[serde(rename = "Vineri")]
    Friday,
    #[serde(rename = "Sâmbătă")]
    Saturday,
}

impl Day {
    pub const ALL: [Day; 6] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "Luni",
            Day::Tuesday => "Marți",
            Day::Wednesday => "Miercuri",
            Day::Thursday => "Joi",
            Day::Friday => "Vineri",
            Day::Saturday => "Sâmbătă",
        }
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven fixed 90-minute slots of the daily grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HourSlot {
    #[serde(rename = "8.00-9.30")]
    S1,
    #[serde(rename = "9.45-11.15")]
    S2,
    #[serde(rename = "11.30-13.00")]
    S3,
    #[serde(rename = "13.30-15.00")]
    S4,
    #[serde(rename = "15.15-16.45")]
    S5,
    #[serde(rename = "17.00-18.30")]
    S6,
    #[serde(rename = "18.45-20.15")]
    S7,
}

impl HourSlot {
    pub const ALL: [HourSlot; 7] = [
        HourSlot::S1,
        HourSlot::S2,
        HourSlot::S3,
        HourSlot::S4,
        HourSlot::S5,
        HourSlot::S6,
        HourSlot::S7,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HourSlot::S1 => "8.00-9.30",
            HourSlot::S2 => "9.45-11.15",
            HourSlot::S3 => "11.30-13.00",
            HourSlot::S4 => "13.30-15.00",
            HourSlot::S5 => "15.15-16.45",
            HourSlot::S6 => "17.00-18.30",
            HourSlot::S7 => "18.45-20.15",
        }
    }
}

impl std::fmt::Display for HourSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Course,
    Seminar,
    Lab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Normal,
    Moved,
    Canceled,
}

/// A single timetabled session as returned by the backend.
///
/// The odd-week fields carry the alternate subject/professor/room for
/// biweekly-alternating sessions; all three are independent and any
/// may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub day: Day,
    pub hour: HourSlot,
    pub session_type: SessionType,
    pub status: SessionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub version: i64,
    pub group: Group,
    pub subject: Subject,
    pub professor: Professor,
    pub room: Room,
    #[serde(default)]
    pub odd_week_subject: Option<Subject>,
    #[serde(default)]
    pub odd_week_professor: Option<Professor>,
    #[serde(default)]
    pub odd_week_room: Option<Room>,
    #[serde(default)]
    pub academic_year: Option<i32>,
    #[serde(default)]
    pub semester: Option<Semester>,
    #[serde(default)]
    pub cycle_type: Option<CycleType>,
}

impl ScheduleEntry {
    /// True when the entry belongs to the given scope. Used to trim
    /// refresh-all payloads, which always carry the complete set.
    pub fn matches_scope(&self, scope: &ScheduleScope) -> bool {
        self.academic_year == Some(scope.academic_year)
            && self.semester == Some(scope.semester)
            && self.cycle_type == scope.cycle_type
    }
}

/// Payload for creating a schedule entry. References are by id; the
/// caller resolves typed-in names to entities first (`ensure_*` on
/// the API client).
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleDraft {
    pub group_id: i64,
    pub subject_id: i64,
    pub professor_id: i64,
    pub room_id: i64,
    pub day: Day,
    pub hour: HourSlot,
    pub session_type: SessionType,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_week_subject_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_week_professor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_week_room_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<Semester>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_type: Option<CycleType>,
}

/// Partial update; only the set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<Day>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<HourSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_type: Option<SessionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_week_subject_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_week_professor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_week_room_id: Option<i64>,
}

/// Find entries that share a grid slot within the same scheduling
/// context. The backend enforces
/// (group, day, hour, academic_year, semester, cycle_type) uniqueness;
/// the client only observes and reports violations.
pub fn slot_conflicts(entries: &[ScheduleEntry]) -> Vec<(i64, i64)> {
    type SlotKey = (
        i64,
        Day,
        HourSlot,
        Option<i32>,
        Option<Semester>,
        Option<CycleType>,
    );

    let mut seen: HashMap<SlotKey, i64> = HashMap::new();
    let mut conflicts = Vec::new();

    for entry in entries {
        let key = (
            entry.group.id,
            entry.day,
            entry.hour,
            entry.academic_year,
            entry.semester,
            entry.cycle_type,
        );
        match seen.get(&key) {
            Some(&first_id) => conflicts.push((first_id, entry.id)),
            None => {
                seen.insert(key, entry.id);
            }
        }
    }

    conflicts
}
