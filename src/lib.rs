//! orarcache - offline-first client core for a university
//! course-scheduling service.
//!
//! This crate contains everything a schedule-viewer frontend needs
//! short of the actual rendering:
//!
//! - `api`: REST client for the scheduling backend (auth, schedules,
//!   periodic assessments, reference data)
//! - `models`: wire/domain types shared by the client, cache, and
//!   live-update channel
//! - `storage`: key-value port with in-memory and on-disk backends
//! - `cache`: keyed persistent schedule cache and the per-group
//!   privacy filter for shared devices
//! - `auth`: session persistence, credential storage, and startup
//!   identity resolution
//! - `sync`: cache-first fetch orchestration, the WebSocket
//!   live-update channel, and the engine that ties them together

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod storage;
pub mod sync;

pub use api::{ApiClient, ApiError, ScheduleSource};
pub use cache::ScheduleCache;
pub use config::Config;
pub use models::{
    AssessmentEntry, CycleType, Day, Group, HourSlot, Professor, Room, ScheduleEntry,
    ScheduleScope, Semester, SessionStatus, SessionType, Subject, User,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use sync::{Connectivity, FetchController, LiveChannel, LiveUpdate, Notice, SyncEngine};
