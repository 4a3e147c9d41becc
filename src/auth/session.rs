use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserRole;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Token lifetime in minutes; the backend issues 24-hour tokens.
/// Checked locally so an expired session logs out without a server
/// round-trip.
const TOKEN_EXPIRY_MINUTES: i64 = 1440;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub role: UserRole,
    pub email: String,
    /// Known once the current-user call succeeds; kept here so the
    /// group filter and the group-scoped views work offline too.
    pub group_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(token: String, role: UserRole, email: String) -> Self {
        Self {
            token,
            role,
            email,
            group_code: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        Utc::now() > expiry
    }

    pub fn minutes_until_expiry(&self) -> i64 {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        (expiry - Utc::now()).num_minutes().max(0)
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Returns true when a non-expired
    /// session was restored.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data, both in memory and on disk
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Record the group code learned from the current-user call.
    pub fn set_group_code(&mut self, group_code: Option<String>) {
        if let Some(ref mut data) = self.data {
            data.group_code = group_code;
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    pub fn group_code(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.group_code.as_deref())
    }

    pub fn is_valid(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> SessionData {
        SessionData::new(
            "tok".to_string(),
            UserRole::Student,
            "student@uni.md".to_string(),
        )
    }

    #[test]
    fn test_fresh_session_is_valid() {
        let fresh = data();
        assert!(!fresh.is_expired());
        assert!(fresh.minutes_until_expiry() > 0);
    }

    #[test]
    fn test_expired_session_is_detected() {
        let mut old = data();
        old.created_at = Utc::now() - Duration::minutes(TOKEN_EXPIRY_MINUTES + 1);
        assert!(old.is_expired());
        assert_eq!(old.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(data());
        session.set_group_code(Some("TI-221".to_string()));
        session.save().unwrap();

        let mut restored = Session::new(dir.path().to_path_buf());
        assert!(restored.load().unwrap());
        assert_eq!(restored.token(), Some("tok"));
        assert_eq!(restored.group_code(), Some("TI-221"));
    }

    #[test]
    fn test_expired_session_is_not_restored() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        let mut stale = data();
        stale.created_at = Utc::now() - Duration::minutes(TOKEN_EXPIRY_MINUTES + 1);
        session.update(stale);
        session.save().unwrap();

        let mut restored = Session::new(dir.path().to_path_buf());
        assert!(!restored.load().unwrap());
        assert!(restored.data.is_none());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(data());
        session.save().unwrap();
        session.clear().unwrap();

        let mut restored = Session::new(dir.path().to_path_buf());
        assert!(!restored.load().unwrap());
    }
}
