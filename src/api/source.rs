use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AssessmentEntry, ScheduleEntry, ScheduleScope};

use super::ApiClient;

/// Read-side seam between the fetch orchestrator and the backend.
///
/// The orchestrator only ever needs scoped listings, so this trait
/// stays deliberately narrow; tests substitute a counting stub.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedules(&self, scope: &ScheduleScope) -> Result<Vec<ScheduleEntry>>;

    async fn fetch_assessments(&self, scope: &ScheduleScope) -> Result<Vec<AssessmentEntry>>;
}

#[async_trait]
impl ScheduleSource for ApiClient {
    async fn fetch_schedules(&self, scope: &ScheduleScope) -> Result<Vec<ScheduleEntry>> {
        self.schedules(Some(scope)).await
    }

    async fn fetch_assessments(&self, scope: &ScheduleScope) -> Result<Vec<AssessmentEntry>> {
        self.assessments(Some(scope)).await
    }
}
