use serde::{Deserialize, Serialize};

/// Semester / scheduling-period tag.
///
/// The two teaching semesters carry the weekly grid; the assessment
/// and exam periods carry periodic-evaluation records instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    #[serde(rename = "semester1")]
    Semester1,
    #[serde(rename = "semester2")]
    Semester2,
    #[serde(rename = "assessments1")]
    Assessments1,
    #[serde(rename = "assessments2")]
    Assessments2,
    #[serde(rename = "exams")]
    Exams,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Semester1 => "semester1",
            Semester::Semester2 => "semester2",
            Semester::Assessments1 => "assessments1",
            Semester::Assessments2 => "assessments2",
            Semester::Exams => "exams",
        }
    }

    /// True for the periods whose records live on the assessment
    /// calendar rather than the weekly grid.
    pub fn is_assessment_period(&self) -> bool {
        matches!(
            self,
            Semester::Assessments1 | Semester::Assessments2 | Semester::Exams
        )
    }
}

impl std::fmt::Display for Semester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrollment track: full-time ("F") or reduced-attendance ("FR").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleType {
    #[serde(rename = "F")]
    FullTime,
    #[serde(rename = "FR")]
    ReducedAttendance,
}

impl CycleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleType::FullTime => "F",
            CycleType::ReducedAttendance => "FR",
        }
    }
}

impl std::fmt::Display for CycleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (academic year, semester, cycle type) triple every fetch,
/// cache key, and live-update filter is scoped by.
///
/// Constructing a scope requires the year and semester; `cycle_type`
/// stays optional because the wire format allows it to be null and
/// the cache key encodes the absence explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleScope {
    pub academic_year: i32,
    pub semester: Semester,
    pub cycle_type: Option<CycleType>,
}

impl ScheduleScope {
    pub fn new(academic_year: i32, semester: Semester, cycle_type: Option<CycleType>) -> Self {
        Self {
            academic_year,
            semester,
            cycle_type,
        }
    }

    /// Key fragment shared by the data and timestamp cache keys:
    /// `{year}_{semester}_{cycle|null}`.
    pub fn key_fragment(&self) -> String {
        let cycle = self
            .cycle_type
            .map(|c| c.as_str())
            .unwrap_or("null");
        format!("{}_{}_{}", self.academic_year, self.semester.as_str(), cycle)
    }
}

impl std::fmt::Display for ScheduleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key_fragment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semester_wire_names() {
        let json = serde_json::to_string(&Semester::Assessments1).unwrap();
        assert_eq!(json, "\"assessments1\"");
        let parsed: Semester = serde_json::from_str("\"exams\"").unwrap();
        assert_eq!(parsed, Semester::Exams);
    }

    #[test]
    fn test_assessment_periods() {
        assert!(!Semester::Semester1.is_assessment_period());
        assert!(!Semester::Semester2.is_assessment_period());
        assert!(Semester::Assessments1.is_assessment_period());
        assert!(Semester::Assessments2.is_assessment_period());
        assert!(Semester::Exams.is_assessment_period());
    }

    #[test]
    fn test_key_fragment_encodes_missing_cycle() {
        let scope = ScheduleScope::new(1, Semester::Semester1, Some(CycleType::FullTime));
        assert_eq!(scope.key_fragment(), "1_semester1_F");

        let scope = ScheduleScope::new(3, Semester::Exams, None);
        assert_eq!(scope.key_fragment(), "3_exams_null");
    }
}
