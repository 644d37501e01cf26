//! The collaborator seam: question-pair generation plus persistence of
//! selections and feedback.

use async_trait::async_trait;

use crate::bank::{FeedbackRecord, PreferenceRecord};
use crate::domain::{FeedbackSubmission, FetchedPair, SelectionCommit};
use crate::error::ServiceError;

#[async_trait]
pub trait EvaluationBackend: Send + Sync {
    /// Short label for logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Fresh pair for `subject`, or `ServiceError::Exhausted` once the pool is depleted.
    async fn fetch_pair(&self, subject: &str) -> Result<FetchedPair, ServiceError>;

    async fn commit_selection(&self, commit: &SelectionCommit) -> Result<(), ServiceError>;

    async fn submit_feedback(&self, feedback: &FeedbackSubmission) -> Result<(), ServiceError>;

    /// Recorded preference dataset, when this backend keeps one locally.
    async fn export(&self) -> (Vec<PreferenceRecord>, Vec<FeedbackRecord>) {
        (Vec::new(), Vec::new())
    }
}
