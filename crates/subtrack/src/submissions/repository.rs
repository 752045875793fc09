use serde::{Deserialize, Serialize};

use super::domain::{
    Plan, PlanId, Reseller, ResellerId, Submission, SubmissionId, SubmissionStatus,
};

/// Selection criteria for [`SubmissionRepository::find`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub reseller_id: Option<ResellerId>,
}

impl SubmissionFilter {
    pub fn with_status(status: SubmissionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn for_reseller(reseller_id: ResellerId) -> Self {
        Self {
            reseller_id: Some(reseller_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        self.status.map_or(true, |status| submission.status == status)
            && self
                .reseller_id
                .as_ref()
                .map_or(true, |reseller| &submission.reseller_id == reseller)
    }
}

/// Storage abstraction over the submission collection.
///
/// `update_by_id` must apply `apply` atomically with respect to other writers of the same id
/// and return the post-update record, or `None` when the id is unknown.
pub trait SubmissionRepository: Send + Sync {
    fn insert(&self, submission: Submission) -> Result<Submission, RepositoryError>;
    fn find_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError>;
    fn find(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>, RepositoryError>;
    fn update_by_id(
        &self,
        id: &SubmissionId,
        apply: &mut dyn FnMut(&mut Submission),
    ) -> Result<Option<Submission>, RepositoryError>;
    /// Removes every submission filed by `reseller_id`, returning how many were removed.
    fn delete_for_reseller(&self, reseller_id: &ResellerId) -> Result<usize, RepositoryError>;
}

/// Plan catalog lookups.
pub trait PlanRepository: Send + Sync {
    fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, RepositoryError>;
    fn list(&self) -> Result<Vec<Plan>, RepositoryError>;
    fn insert(&self, plan: Plan) -> Result<Plan, RepositoryError>;
}

/// Reseller directory storage.
pub trait ResellerRepository: Send + Sync {
    fn list(&self) -> Result<Vec<Reseller>, RepositoryError>;
    fn find_by_id(&self, id: &ResellerId) -> Result<Option<Reseller>, RepositoryError>;
    fn insert(&self, reseller: Reseller) -> Result<Reseller, RepositoryError>;
    /// Same contract as [`SubmissionRepository::update_by_id`].
    fn update_by_id(
        &self,
        id: &ResellerId,
        apply: &mut dyn FnMut(&mut Reseller),
    ) -> Result<Option<Reseller>, RepositoryError>;
    fn delete(&self, id: &ResellerId) -> Result<bool, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
