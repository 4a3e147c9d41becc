//! Authentication module for sessions, credentials, and startup
//! identity resolution.
//!
//! - `Session`: bearer-token session with local expiry, persisted to
//!   disk so a restart (or an offline launch) keeps the identity
//! - `CredentialStore`: OS-keychain storage for the last password
//! - `resolve_identity`: the startup triage deciding between
//!   authenticated, offline, and logged-out

pub mod credentials;
pub mod identity;
pub mod session;

pub use credentials::CredentialStore;
pub use identity::{login, logout, resolve_identity, Identity};
pub use session::{Session, SessionData};
