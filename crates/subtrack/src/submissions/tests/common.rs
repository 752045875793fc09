use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::submissions::domain::{
    NewSubmission, Plan, PlanId, RenewalPrediction, Reseller, ResellerId, Submission,
    SubmissionId,
};
use crate::submissions::prediction::{PredictionError, RenewalPredictor};
use crate::submissions::repository::{
    PlanRepository, RepositoryError, ResellerRepository, SubmissionFilter, SubmissionRepository,
};
use crate::submissions::{
    default_plans, seed_default_plans, seed_default_resellers, ExpiryConfig, SubmissionService,
};

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn reseller_id() -> ResellerId {
    ResellerId("reseller-001".to_string())
}

pub(super) fn new_submission() -> NewSubmission {
    NewSubmission {
        customer_email: "customer@example.com".to_string(),
        requested_plan_id: "plan-basic".to_string(),
        duration_months: 12,
        notes: None,
        reseller_id: reseller_id(),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SubmissionId, Submission>>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, id: &SubmissionId) -> Submission {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
            .expect("record present")
    }
}

impl SubmissionRepository for MemoryRepository {
    fn insert(&self, submission: Submission) -> Result<Submission, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&submission.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    fn find_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|submission| filter.matches(submission))
            .cloned()
            .collect())
    }

    fn update_by_id(
        &self,
        id: &SubmissionId,
        apply: &mut dyn FnMut(&mut Submission),
    ) -> Result<Option<Submission>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get_mut(id).map(|submission| {
            apply(submission);
            submission.clone()
        }))
    }

    fn delete_for_reseller(&self, reseller_id: &ResellerId) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|_, submission| &submission.reseller_id != reseller_id);
        Ok(before - guard.len())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryPlans {
    plans: Arc<Mutex<Vec<Plan>>>,
}

impl MemoryPlans {
    pub(super) fn seeded() -> Self {
        let plans = Self::default();
        seed_default_plans(&plans).expect("seed plans");
        plans
    }
}

impl PlanRepository for MemoryPlans {
    fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, RepositoryError> {
        let guard = self.plans.lock().expect("plan mutex poisoned");
        Ok(guard.iter().find(|plan| &plan.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Plan>, RepositoryError> {
        Ok(self.plans.lock().expect("plan mutex poisoned").clone())
    }

    fn insert(&self, plan: Plan) -> Result<Plan, RepositoryError> {
        let mut guard = self.plans.lock().expect("plan mutex poisoned");
        if guard.iter().any(|existing| existing.id == plan.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(plan.clone());
        Ok(plan)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryResellers {
    resellers: Arc<Mutex<HashMap<ResellerId, Reseller>>>,
}

impl MemoryResellers {
    pub(super) fn seeded(now: DateTime<Utc>) -> Self {
        let resellers = Self::default();
        seed_default_resellers(&resellers, now).expect("seed resellers");
        resellers
    }

    pub(super) fn stored(&self, id: &ResellerId) -> Option<Reseller> {
        self.resellers
            .lock()
            .expect("reseller mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl ResellerRepository for MemoryResellers {
    fn list(&self) -> Result<Vec<Reseller>, RepositoryError> {
        let guard = self.resellers.lock().expect("reseller mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn find_by_id(&self, id: &ResellerId) -> Result<Option<Reseller>, RepositoryError> {
        let guard = self.resellers.lock().expect("reseller mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert(&self, reseller: Reseller) -> Result<Reseller, RepositoryError> {
        let mut guard = self.resellers.lock().expect("reseller mutex poisoned");
        if guard.contains_key(&reseller.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(reseller.id.clone(), reseller.clone());
        Ok(reseller)
    }

    fn update_by_id(
        &self,
        id: &ResellerId,
        apply: &mut dyn FnMut(&mut Reseller),
    ) -> Result<Option<Reseller>, RepositoryError> {
        let mut guard = self.resellers.lock().expect("reseller mutex poisoned");
        Ok(guard.get_mut(id).map(|reseller| {
            apply(reseller);
            reseller.clone()
        }))
    }

    fn delete(&self, id: &ResellerId) -> Result<bool, RepositoryError> {
        let mut guard = self.resellers.lock().expect("reseller mutex poisoned");
        Ok(guard.remove(id).is_some())
    }
}

pub(super) struct UnavailableRepository;

impl SubmissionRepository for UnavailableRepository {
    fn insert(&self, _submission: Submission) -> Result<Submission, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_id(&self, _id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find(&self, _filter: &SubmissionFilter) -> Result<Vec<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_by_id(
        &self,
        _id: &SubmissionId,
        _apply: &mut dyn FnMut(&mut Submission),
    ) -> Result<Option<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_for_reseller(&self, _reseller_id: &ResellerId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct StaticPredictor(pub(super) f32);

impl RenewalPredictor for StaticPredictor {
    fn predict(&self, notes: &str) -> Result<RenewalPrediction, PredictionError> {
        Ok(RenewalPrediction {
            likelihood: self.0,
            reason: format!("based on: {notes}"),
        })
    }
}

pub(super) struct FailingPredictor;

impl RenewalPredictor for FailingPredictor {
    fn predict(&self, _notes: &str) -> Result<RenewalPrediction, PredictionError> {
        Err(PredictionError::Unavailable("model timeout".to_string()))
    }
}

pub(super) type TestService = SubmissionService<MemoryRepository, MemoryPlans, MemoryResellers>;

pub(super) fn build_service(now: DateTime<Utc>) -> (TestService, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = service_over(repository.clone(), now);
    (service, repository)
}

/// A second service over the same store, observing a different instant.
pub(super) fn service_over(repository: Arc<MemoryRepository>, now: DateTime<Utc>) -> TestService {
    service_with(repository, Arc::new(MemoryResellers::seeded(now)), now)
}

/// Service sharing both the submission store and the reseller directory with the caller.
pub(super) fn service_with(
    repository: Arc<MemoryRepository>,
    resellers: Arc<MemoryResellers>,
    now: DateTime<Utc>,
) -> TestService {
    SubmissionService::new(
        repository,
        Arc::new(MemoryPlans::seeded()),
        resellers,
        ExpiryConfig::default(),
    )
    .with_clock(Arc::new(FixedClock(now)))
}

/// Insert an already-activated submission ending at `end_date`.
pub(super) fn insert_active(
    repository: &MemoryRepository,
    email: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Submission {
    let submission = Submission {
        id: SubmissionId::generate(),
        customer_email: crate::submissions::CustomerEmail::parse(email).expect("valid email"),
        requested_plan_id: default_plans()[0].id.clone(),
        duration_months: 1,
        notes: None,
        reseller_id: reseller_id(),
        reseller_name: "Reseller One".to_string(),
        status: crate::submissions::SubmissionStatus::Successful,
        request_date: start_date,
        start_date: Some(start_date),
        end_date: Some(end_date),
        profile_name: None,
        renewal_likelihood: None,
        renewal_reason: None,
        notification_read: false,
        created_at: start_date,
        updated_at: start_date,
    };
    repository.insert(submission).expect("insert succeeds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
