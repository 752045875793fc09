//! Customer submission lifecycle and the reseller directory behind it: intake, status
//! transitions, renewals, expiry dashboards, and reseller administration.

pub mod catalog;
pub mod dates;
pub mod domain;
pub mod expiry;
pub mod prediction;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{default_plans, default_resellers, seed_default_plans, seed_default_resellers};
pub use domain::{
    CustomerEmail, NewSubmission, Plan, PlanId, RenewalPrediction, Reseller, ResellerId,
    ResellerUpdate, Submission, SubmissionId, SubmissionStatus,
};
pub use expiry::{
    classify, ExpiringSubmission, ExpiryConfig, ExpiryOverview, ExpiryScanner, ExpiryStatus,
    MAX_EXPIRY_WINDOW_DAYS,
};
pub use prediction::{PredictionError, RenewalPredictor};
pub use repository::{
    PlanRepository, RepositoryError, ResellerRepository, SubmissionFilter, SubmissionRepository,
};
pub use router::submission_router;
pub use service::{FieldErrors, SubmissionError, SubmissionService};
