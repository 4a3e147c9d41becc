//! Local caching module for offline schedule access.
//!
//! `ScheduleCache` stores schedule and assessment arrays keyed by
//! (academic year, semester, cycle type), with a write timestamp per
//! key. Entries never expire by time; they are only overwritten by a
//! newer fetch, cleared explicitly, or pruned by the group filter.
//!
//! Every operation swallows storage errors after logging them: a
//! broken cache must degrade to "no cache", never break the caller.

pub mod filter;
pub mod store;

pub use store::ScheduleCache;
