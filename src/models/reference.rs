use serde::{Deserialize, Serialize};

/// A student group. `code` is the display identifier (e.g. "TI-221");
/// the numeric id is assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDraft {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl GroupDraft {
    pub fn from_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            year: None,
            faculty: None,
            specialization: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub semester: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectDraft {
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
}

impl SubjectDraft {
    /// Subjects typed into a schedule cell arrive as a bare name;
    /// the code defaults to the name until an admin edits it.
    pub fn from_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            code: name.to_string(),
            semester: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professor {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfessorDraft {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfessorDraft {
    pub fn from_name(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            department: None,
            email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomDraft {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
}

impl RoomDraft {
    pub fn from_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            building: None,
            capacity: None,
        }
    }
}
