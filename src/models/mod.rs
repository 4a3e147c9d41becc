//! Data models for the scheduling service.
//!
//! This module contains the data structures exchanged with the
//! backend and stored in the local cache:
//!
//! - `ScheduleEntry`: a weekly timetabled session with its group,
//!   subject, professor, room, and optional odd-week alternates
//! - `AssessmentEntry`: a periodic-evaluation record outside the
//!   weekly grid
//! - `Group`, `Subject`, `Professor`, `Room`: reference entities
//! - `User`: an account with a role and optional group binding
//! - Scope types: `Semester`, `CycleType`, `ScheduleScope`

pub mod assessment;
pub mod reference;
pub mod schedule;
pub mod scope;
pub mod user;

pub use assessment::{AssessmentChange, AssessmentDraft, AssessmentEntry};
pub use reference::{
    Group, GroupDraft, Professor, ProfessorDraft, Room, RoomDraft, Subject, SubjectDraft,
};
pub use schedule::{
    slot_conflicts, Day, HourSlot, ScheduleChange, ScheduleDraft, ScheduleEntry, SessionStatus,
    SessionType,
};
pub use scope::{CycleType, ScheduleScope, Semester};
pub use user::{User, UserChange, UserDraft, UserRole};
