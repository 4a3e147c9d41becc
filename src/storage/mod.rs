//! Key-value port backing the schedule cache.
//!
//! The cache layer only needs string keys and string values plus a
//! prefix scan, so the port mirrors web-storage semantics without
//! binding to any particular medium. `MemoryStore` serves tests and
//! ephemeral contexts; `FileStore` is the native-app backend.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// Minimal persistent string store. Implementations must be safe to
/// share across tasks; callers treat every operation as fallible and
/// decide themselves whether a failure is fatal.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// All stored keys starting with `prefix`, in no particular order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
