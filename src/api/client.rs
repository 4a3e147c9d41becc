//! API client for the course-scheduling backend.
//!
//! All endpoints speak JSON; authenticated requests carry a bearer
//! token obtained from `POST /auth/login`. Read endpoints are open to
//! students; mutations require an admin token (enforced server-side).

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    AssessmentChange, AssessmentDraft, AssessmentEntry, Group, GroupDraft, Professor,
    ProfessorDraft, Room, RoomDraft, ScheduleChange, ScheduleDraft, ScheduleEntry, ScheduleScope,
    Subject, SubjectDraft, User, UserChange, UserDraft, UserRole,
};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
pub struct AuthGrant {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub role: UserRole,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Outcome of a batch change-notification request.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationReport {
    pub message: String,
    pub groups_notified: i64,
    pub total_students: i64,
    pub emails_sent: i64,
    pub emails_failed: i64,
}

/// Outcome of asking the server to push a refresh-all to every
/// connected live-update client.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastReport {
    pub message: String,
    pub schedules_count: i64,
}

#[derive(Debug, Deserialize)]
struct DeleteAck {
    #[allow(dead_code)]
    #[serde(default)]
    message: Option<String>,
}

/// API client for the scheduling backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL
    /// (e.g. `http://127.0.0.1:8000`). A trailing slash is tolerated.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ===== Authentication =====

    /// Authenticate and return the granted token plus role.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthGrant> {
        let grant: AuthGrant = self
            .request(Method::POST, "/auth/login", Some(&LoginBody { email, password }))
            .await?;
        debug!(role = grant.role.as_str(), "Login succeeded");
        Ok(grant)
    }

    /// Fetch the account behind the current token. A 401 here means
    /// the session is dead, not that the network is down; callers
    /// must treat the two differently.
    pub async fn current_user(&self) -> Result<User> {
        self.request::<User, ()>(Method::GET, "/auth/me", None).await
    }

    // ===== Schedules =====

    /// Fetch schedules, optionally filtered server-side by scope.
    pub async fn schedules(&self, scope: Option<&ScheduleScope>) -> Result<Vec<ScheduleEntry>> {
        let url = match scope {
            Some(scope) => {
                let query = Self::scope_query(scope);
                self.url_with_query("/schedule/", &query)?
            }
            None => self.url("/schedule/"),
        };
        self.request_url(Method::GET, url, None::<&()>).await
    }

    pub async fn schedules_for_group(&self, group_code: &str) -> Result<Vec<ScheduleEntry>> {
        self.request::<_, ()>(Method::GET, &format!("/schedule/{}", group_code), None)
            .await
    }

    pub async fn schedule_by_id(&self, id: i64) -> Result<ScheduleEntry> {
        self.request::<_, ()>(Method::GET, &format!("/schedule/id/{}", id), None)
            .await
    }

    pub async fn create_schedule(&self, draft: &ScheduleDraft) -> Result<ScheduleEntry> {
        self.request(Method::POST, "/schedule/", Some(draft)).await
    }

    pub async fn update_schedule(&self, id: i64, change: &ScheduleChange) -> Result<ScheduleEntry> {
        self.request(Method::PUT, &format!("/schedule/{}", id), Some(change))
            .await
    }

    pub async fn delete_schedule(&self, id: i64) -> Result<()> {
        self.request::<DeleteAck, ()>(Method::DELETE, &format!("/schedule/{}", id), None)
            .await?;
        Ok(())
    }

    /// Ask the server to email students of the given groups about
    /// schedule changes.
    pub async fn notify_schedule_changes(&self, group_ids: &[i64]) -> Result<NotificationReport> {
        #[derive(Serialize)]
        struct Body<'a> {
            modified_group_ids: &'a [i64],
        }
        self.request(
            Method::POST,
            "/schedule/notifications/batch",
            Some(&Body {
                modified_group_ids: group_ids,
            }),
        )
        .await
    }

    /// Ask the server to broadcast a refresh-all over the live
    /// channel (used by the admin save flow after a batch of edits).
    pub async fn broadcast_refresh_all(&self) -> Result<BroadcastReport> {
        self.request::<_, ()>(Method::POST, "/schedule/refresh-all", None)
            .await
    }

    // ===== Assessments =====

    pub async fn assessments(&self, scope: Option<&ScheduleScope>) -> Result<Vec<AssessmentEntry>> {
        let url = match scope {
            Some(scope) => {
                let query = Self::scope_query(scope);
                self.url_with_query("/assessment-schedules/", &query)?
            }
            None => self.url("/assessment-schedules/"),
        };
        self.request_url(Method::GET, url, None::<&()>).await
    }

    pub async fn create_assessment(&self, draft: &AssessmentDraft) -> Result<AssessmentEntry> {
        self.request(Method::POST, "/assessment-schedules/", Some(draft))
            .await
    }

    pub async fn update_assessment(
        &self,
        id: i64,
        change: &AssessmentChange,
    ) -> Result<AssessmentEntry> {
        self.request(
            Method::PUT,
            &format!("/assessment-schedules/{}", id),
            Some(change),
        )
        .await
    }

    pub async fn delete_assessment(&self, id: i64) -> Result<()> {
        self.request::<DeleteAck, ()>(
            Method::DELETE,
            &format!("/assessment-schedules/{}", id),
            None,
        )
        .await?;
        Ok(())
    }

    // ===== Reference entities =====

    pub async fn groups(&self) -> Result<Vec<Group>> {
        self.request::<_, ()>(Method::GET, "/groups/", None).await
    }

    pub async fn create_group(&self, draft: &GroupDraft) -> Result<Group> {
        self.request(Method::POST, "/groups/", Some(draft)).await
    }

    pub async fn update_group(&self, id: i64, draft: &GroupDraft) -> Result<Group> {
        self.request(Method::PUT, &format!("/groups/{}", id), Some(draft))
            .await
    }

    pub async fn delete_group(&self, id: i64) -> Result<()> {
        self.request::<DeleteAck, ()>(Method::DELETE, &format!("/groups/{}", id), None)
            .await?;
        Ok(())
    }

    pub async fn subjects(&self) -> Result<Vec<Subject>> {
        self.request::<_, ()>(Method::GET, "/subjects/", None).await
    }

    pub async fn create_subject(&self, draft: &SubjectDraft) -> Result<Subject> {
        self.request(Method::POST, "/subjects/", Some(draft)).await
    }

    pub async fn update_subject(&self, id: i64, draft: &SubjectDraft) -> Result<Subject> {
        self.request(Method::PUT, &format!("/subjects/{}", id), Some(draft))
            .await
    }

    pub async fn delete_subject(&self, id: i64) -> Result<()> {
        self.request::<DeleteAck, ()>(Method::DELETE, &format!("/subjects/{}", id), None)
            .await?;
        Ok(())
    }

    pub async fn professors(&self) -> Result<Vec<Professor>> {
        self.request::<_, ()>(Method::GET, "/professors/", None).await
    }

    pub async fn create_professor(&self, draft: &ProfessorDraft) -> Result<Professor> {
        self.request(Method::POST, "/professors/", Some(draft)).await
    }

    pub async fn update_professor(&self, id: i64, draft: &ProfessorDraft) -> Result<Professor> {
        self.request(Method::PUT, &format!("/professors/{}", id), Some(draft))
            .await
    }

    pub async fn delete_professor(&self, id: i64) -> Result<()> {
        self.request::<DeleteAck, ()>(Method::DELETE, &format!("/professors/{}", id), None)
            .await?;
        Ok(())
    }

    pub async fn rooms(&self) -> Result<Vec<Room>> {
        self.request::<_, ()>(Method::GET, "/rooms/", None).await
    }

    pub async fn create_room(&self, draft: &RoomDraft) -> Result<Room> {
        self.request(Method::POST, "/rooms/", Some(draft)).await
    }

    pub async fn update_room(&self, id: i64, draft: &RoomDraft) -> Result<Room> {
        self.request(Method::PUT, &format!("/rooms/{}", id), Some(draft))
            .await
    }

    pub async fn delete_room(&self, id: i64) -> Result<()> {
        self.request::<DeleteAck, ()>(Method::DELETE, &format!("/rooms/{}", id), None)
            .await?;
        Ok(())
    }

    // ===== Lazy reference creation =====
    //
    // The admin grid accepts free-typed names; a name with no
    // matching entity creates one on save.

    pub async fn ensure_group(&self, code: &str) -> Result<Group> {
        let existing = self.groups().await?;
        if let Some(group) = existing.into_iter().find(|g| g.code == code) {
            return Ok(group);
        }
        debug!(code, "Group not found, creating");
        self.create_group(&GroupDraft::from_code(code)).await
    }

    pub async fn ensure_subject(&self, name: &str) -> Result<Subject> {
        let existing = self.subjects().await?;
        if let Some(subject) = existing.into_iter().find(|s| s.name == name) {
            return Ok(subject);
        }
        debug!(name, "Subject not found, creating");
        self.create_subject(&SubjectDraft::from_name(name)).await
    }

    pub async fn ensure_professor(&self, full_name: &str) -> Result<Professor> {
        let existing = self.professors().await?;
        if let Some(professor) = existing.into_iter().find(|p| p.full_name == full_name) {
            return Ok(professor);
        }
        debug!(full_name, "Professor not found, creating");
        self.create_professor(&ProfessorDraft::from_name(full_name))
            .await
    }

    pub async fn ensure_room(&self, code: &str) -> Result<Room> {
        let existing = self.rooms().await?;
        if let Some(room) = existing.into_iter().find(|r| r.code == code) {
            return Ok(room);
        }
        debug!(code, "Room not found, creating");
        self.create_room(&RoomDraft::from_code(code)).await
    }

    // ===== Users =====

    pub async fn users(&self) -> Result<Vec<User>> {
        self.request::<_, ()>(Method::GET, "/users/", None).await
    }

    pub async fn create_user(&self, draft: &UserDraft) -> Result<User> {
        self.request(Method::POST, "/users/", Some(draft)).await
    }

    pub async fn update_user(&self, id: i64, change: &UserChange) -> Result<User> {
        self.request(Method::PUT, &format!("/users/{}", id), Some(change))
            .await
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.request::<DeleteAck, ()>(Method::DELETE, &format!("/users/{}", id), None)
            .await?;
        Ok(())
    }

    // ===== Internals =====

    /// Query parameters for a scoped schedule/assessment listing.
    /// An absent cycle type is simply omitted.
    fn scope_query(scope: &ScheduleScope) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("academic_year", scope.academic_year.to_string()),
            ("semester", scope.semester.as_str().to_string()),
        ];
        if let Some(cycle) = scope.cycle_type {
            query.push(("cycle_type", cycle.as_str().to_string()));
        }
        query
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn url_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let mut url = url::Url::parse(&self.url(path))
            .with_context(|| format!("Invalid API URL for {}", path))?;
        for (name, value) in query {
            url.query_pairs_mut().append_pair(name, value);
        }
        Ok(url.into())
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning a typed error with
    /// the body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        self.request_url(method, self.url(path), body).await
    }

    async fn request_url<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: String,
        body: Option<&B>,
    ) -> Result<T> {
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(self.auth_headers()?);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(ApiError::NetworkError)
            .with_context(|| format!("Failed to send {} request to {}", method, url))?;

        // 204 has no body to parse; map it through an empty object so
        // DELETE acks deserialize uniformly.
        if response.status() == StatusCode::NO_CONTENT {
            return serde_json::from_str("{}")
                .map_err(|e| ApiError::InvalidResponse(e.to_string()).into());
        }

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CycleType, Semester};

    #[test]
    fn test_scope_query_includes_cycle_when_set() {
        let scope = ScheduleScope::new(1, Semester::Semester1, Some(CycleType::FullTime));
        assert_eq!(
            ApiClient::scope_query(&scope),
            vec![
                ("academic_year", "1".to_string()),
                ("semester", "semester1".to_string()),
                ("cycle_type", "F".to_string()),
            ]
        );
    }

    #[test]
    fn test_scope_query_omits_missing_cycle() {
        let scope = ScheduleScope::new(2, Semester::Exams, None);
        let query = ApiClient::scope_query(&scope);
        assert_eq!(query.len(), 2);
        assert!(query.iter().all(|(name, _)| *name != "cycle_type"));
    }

    #[test]
    fn test_url_building() {
        let api = ApiClient::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(api.url("/schedule/"), "http://127.0.0.1:8000/schedule/");

        let scope = ScheduleScope::new(1, Semester::Semester1, Some(CycleType::FullTime));
        let url = api
            .url_with_query("/schedule/", &ApiClient::scope_query(&scope))
            .unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:8000/schedule/?academic_year=1&semester=semester1&cycle_type=F"
        );
    }

    #[test]
    fn test_auth_header_set_with_token() {
        let mut api = ApiClient::new("http://127.0.0.1:8000").unwrap();
        assert!(api.auth_headers().unwrap().is_empty());

        api.set_token("tok123".to_string());
        let headers = api.auth_headers().unwrap();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer tok123"
        );
    }

    #[test]
    fn test_auth_grant_defaults_token_type() {
        let grant: AuthGrant =
            serde_json::from_str(r#"{"access_token": "t", "role": "student"}"#).unwrap();
        assert_eq!(grant.token_type, "bearer");
        assert_eq!(grant.role, UserRole::Student);
    }
}
