use anyhow::{Error, Result};
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::cache::ScheduleCache;
use crate::config::Config;
use crate::models::{User, UserRole};

use super::{CredentialStore, Session, SessionData};

/// Startup identity outcome.
#[derive(Debug)]
pub enum Identity {
    /// Current-user check succeeded; the session is live.
    Authenticated(User),
    /// The server is unreachable but a locally stored session exists;
    /// the app keeps running against the cache.
    Offline { group_code: Option<String> },
    /// No usable session: never logged in, token rejected, or an
    /// unclassifiable failure. The caller must route to login.
    LoggedOut { reason: String },
}

#[derive(Debug, PartialEq, Eq)]
enum FailureKind {
    Unauthorized,
    Network,
    Other,
}

/// Decide who the user is at startup and prepare the cache for them.
///
/// On success the group code is recorded in the session (for later
/// offline launches) and the cache is pruned to that group. A 401 is
/// fatal to the session, while a connectivity failure degrades to
/// offline mode with the previously saved group - the distinction the
/// whole error-handling design hangs on.
pub async fn resolve_identity(
    api: &ApiClient,
    session: &mut Session,
    cache: &ScheduleCache,
) -> Identity {
    if !session.is_valid() {
        return Identity::LoggedOut {
            reason: "Not logged in".to_string(),
        };
    }

    match api.current_user().await {
        Ok(user) => {
            session.set_group_code(user.group_code.clone());
            if let Err(e) = session.save() {
                warn!(error = %e, "Failed to persist session");
            }
            if let Some(ref code) = user.group_code {
                cache.filter_by_group(code);
            }
            info!(role = user.role.as_str(), "Identity confirmed");
            Identity::Authenticated(user)
        }
        Err(e) => match classify(&e) {
            FailureKind::Unauthorized => {
                if let Err(e) = session.clear() {
                    warn!(error = %e, "Failed to clear session");
                }
                Identity::LoggedOut {
                    reason: "Session expired. Please log in again.".to_string(),
                }
            }
            FailureKind::Network => {
                // Server down or no connectivity: keep the stored
                // identity and let the cache carry the session.
                let group_code = session.group_code().map(str::to_string);
                if let Some(ref code) = group_code {
                    cache.filter_by_group(code);
                }
                info!("Server unreachable, continuing offline");
                Identity::Offline { group_code }
            }
            FailureKind::Other => {
                warn!(error = %e, "Unclassified identity failure, treating as logged out");
                if let Err(e) = session.clear() {
                    warn!(error = %e, "Failed to clear session");
                }
                Identity::LoggedOut {
                    reason: format!("Could not verify the session: {}", e),
                }
            }
        },
    }
}

/// Authenticate and establish a session.
///
/// On success the token is set on the client, the password is stored
/// in the keychain, and the email is remembered in the config for the
/// next login form. Failures of the ancillary steps are logged and do
/// not fail the login itself.
pub async fn login(
    api: &mut ApiClient,
    session: &mut Session,
    config: &mut Config,
    email: &str,
    password: &str,
) -> Result<UserRole> {
    let grant = api.login(email, password).await?;
    api.set_token(grant.access_token.clone());

    if let Err(e) = CredentialStore::store(email, password) {
        warn!(error = %e, "Failed to store credentials");
    }

    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    session.update(SessionData::new(
        grant.access_token,
        grant.role,
        email.to_string(),
    ));
    if let Err(e) = session.save() {
        warn!(error = %e, "Failed to save session");
    }

    info!("Login successful");
    Ok(grant.role)
}

/// End the session: forget the token locally. Cached schedule data is
/// left alone (it has already been reduced to the user's own group).
pub fn logout(session: &mut Session) {
    if let Err(e) = session.clear() {
        warn!(error = %e, "Failed to clear session");
    }
    info!("Logged out");
}

fn classify(err: &Error) -> FailureKind {
    if let Some(api_err) = err.downcast_ref::<ApiError>() {
        return match api_err {
            ApiError::Unauthorized => FailureKind::Unauthorized,
            e if e.is_network() => FailureKind::Network,
            _ => FailureKind::Other,
        };
    }
    if let Some(req_err) = err.downcast_ref::<reqwest::Error>() {
        if req_err.is_connect() || req_err.is_timeout() {
            return FailureKind::Network;
        }
    }
    FailureKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_fatal() {
        let err = Error::from(ApiError::Unauthorized);
        assert_eq!(classify(&err), FailureKind::Unauthorized);
    }

    #[test]
    fn test_unauthorized_survives_added_context() {
        let err = Error::from(ApiError::Unauthorized).context("Failed to fetch current user");
        assert_eq!(classify(&err), FailureKind::Unauthorized);
    }

    #[test]
    fn test_server_rejection_is_not_network() {
        let err = Error::from(ApiError::ServerError("boom".to_string()));
        assert_eq!(classify(&err), FailureKind::Other);
    }

    #[test]
    fn test_unrelated_error_is_other() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(classify(&err), FailureKind::Other);
    }
}
