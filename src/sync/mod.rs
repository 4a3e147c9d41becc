//! Cache-first fetch orchestration and live updates.
//!
//! - `Connectivity`: the online/visible signal the host app drives
//!   (the native stand-in for the browser's `online` and
//!   `visibilitychange` events)
//! - `FetchController`: per-scope orchestration of cache-first
//!   rendering, network refresh, and offline fallback, with an
//!   in-flight guard against duplicate requests
//! - `LiveChannel`: WebSocket client delivering refresh-all payloads
//!   and coarse invalidation signals, with automatic reconnection
//! - `SyncEngine`: ties the three together and arms the 60-second
//!   polling fallback while the live channel is down

pub mod connectivity;
pub mod engine;
pub mod fetcher;
pub mod live;

pub use connectivity::{ConnState, Connectivity};
pub use engine::SyncEngine;
pub use fetcher::{FetchController, FetchOptions, Notice, ScheduleView};
pub use live::{LiveChannel, LiveUpdate};
