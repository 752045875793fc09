use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use subtrack::submissions::{
    Plan, PlanId, PlanRepository, RepositoryError, Reseller, ResellerId, ResellerRepository,
    Submission, SubmissionFilter, SubmissionId, SubmissionRepository,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store mutex poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionRepository {
    records: Arc<Mutex<HashMap<SubmissionId, Submission>>>,
}

impl SubmissionRepository for InMemorySubmissionRepository {
    fn insert(&self, submission: Submission) -> Result<Submission, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&submission.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    fn find_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn find(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>, RepositoryError> {
        Ok(lock(&self.records)?
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
        let mut guard = lock(&self.records)?;
        Ok(guard.get_mut(id).map(|submission| {
            apply(submission);
            submission.clone()
        }))
    }

    fn delete_for_reseller(&self, reseller_id: &ResellerId) -> Result<usize, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let before = guard.len();
        guard.retain(|_, submission| &submission.reseller_id != reseller_id);
        Ok(before - guard.len())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPlanRepository {
    plans: Arc<Mutex<Vec<Plan>>>,
}

impl PlanRepository for InMemoryPlanRepository {
    fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, RepositoryError> {
        Ok(lock(&self.plans)?.iter().find(|plan| &plan.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Plan>, RepositoryError> {
        Ok(lock(&self.plans)?.clone())
    }

    fn insert(&self, plan: Plan) -> Result<Plan, RepositoryError> {
        let mut guard = lock(&self.plans)?;
        if guard.iter().any(|existing| existing.id == plan.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(plan.clone());
        Ok(plan)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryResellerRepository {
    resellers: Arc<Mutex<HashMap<ResellerId, Reseller>>>,
}

impl ResellerRepository for InMemoryResellerRepository {
    fn list(&self) -> Result<Vec<Reseller>, RepositoryError> {
        Ok(lock(&self.resellers)?.values().cloned().collect())
    }

    fn find_by_id(&self, id: &ResellerId) -> Result<Option<Reseller>, RepositoryError> {
        Ok(lock(&self.resellers)?.get(id).cloned())
    }

    fn insert(&self, reseller: Reseller) -> Result<Reseller, RepositoryError> {
        let mut guard = lock(&self.resellers)?;
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
        let mut guard = lock(&self.resellers)?;
        Ok(guard.get_mut(id).map(|reseller| {
            apply(reseller);
            reseller.clone()
        }))
    }

    fn delete(&self, id: &ResellerId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.resellers)?.remove(id).is_some())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Noon UTC on `date`, so demo timelines never straddle a day boundary.
pub(crate) fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc()
}
