//! REST client module for the scheduling backend.
//!
//! `ApiClient` talks to the course-scheduling API: bearer-token auth,
//! schedule and assessment queries scoped by
//! (academic year, semester, cycle type), and CRUD for the reference
//! entities (groups, subjects, professors, rooms) and users.
//!
//! `ScheduleSource` is the narrow read seam the fetch orchestrator
//! depends on, so it can be exercised without a live backend.

pub mod client;
pub mod error;
pub mod source;

pub use client::{ApiClient, AuthGrant, BroadcastReport, NotificationReport};
pub use error::ApiError;
pub use source::ScheduleSource;
