use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use validator::ValidateEmail;

use super::dates::add_months;
use super::domain::{
    CustomerEmail, NewSubmission, Plan, PlanId, RenewalPrediction, Reseller, ResellerId,
    ResellerUpdate, Submission, SubmissionId, SubmissionStatus,
};
use super::expiry::{ExpiryConfig, ExpiryScanner};
use super::prediction::{self, RenewalPredictor};
use super::repository::{
    PlanRepository, RepositoryError, ResellerRepository, SubmissionFilter, SubmissionRepository,
};
use crate::clock::{Clock, SystemClock};

pub const MAX_PROFILE_NAME_CHARS: usize = 100;

/// Lifecycle manager for customer submissions and the resellers who file them.
///
/// Owns status transitions and start/end date derivation. Every mutation goes through the
/// stores' `update_by_id`, so concurrent writers resolve last-write-wins at the store.
pub struct SubmissionService<S, P, R> {
    submissions: Arc<S>,
    plans: Arc<P>,
    resellers: Arc<R>,
    predictor: Option<Arc<dyn RenewalPredictor>>,
    clock: Arc<dyn Clock>,
    scanner: ExpiryScanner<S>,
}

impl<S, P, R> SubmissionService<S, P, R>
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    pub fn new(
        submissions: Arc<S>,
        plans: Arc<P>,
        resellers: Arc<R>,
        expiry: ExpiryConfig,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let scanner = ExpiryScanner::new(submissions.clone(), clock.clone(), expiry);
        Self {
            submissions,
            plans,
            resellers,
            predictor: None,
            clock,
            scanner,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.scanner = self.scanner.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn RenewalPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn scanner(&self) -> &ExpiryScanner<S> {
        &self.scanner
    }

    /// Record a new `Pending` submission.
    pub fn create(&self, request: NewSubmission) -> Result<Submission, SubmissionError> {
        let (customer_email, plan, reseller) = self.validate_intake(&request)?;
        let prediction = self.predict(request.notes.as_deref());
        let now = self.clock.now();

        let submission = Submission {
            id: SubmissionId::generate(),
            customer_email,
            requested_plan_id: plan.id,
            duration_months: request.duration_months,
            notes: normalized_text(request.notes),
            reseller_id: reseller.id.clone(),
            reseller_name: reseller.name.clone(),
            status: SubmissionStatus::Pending,
            request_date: now,
            start_date: None,
            end_date: None,
            profile_name: None,
            renewal_likelihood: prediction.as_ref().map(|p| p.likelihood),
            renewal_reason: prediction.map(|p| p.reason),
            notification_read: false,
            created_at: now,
            updated_at: now,
        };

        let stored = self.submissions.insert(submission)?;
        info!(
            submission_id = %stored.id,
            plan_id = %stored.requested_plan_id,
            "submission created"
        );
        Ok(stored)
    }

    /// Record a submission that is active immediately, as admins do when adding a customer
    /// on a reseller's behalf. Skips the renewal prediction.
    pub fn create_active(&self, request: NewSubmission) -> Result<Submission, SubmissionError> {
        let (customer_email, plan, reseller) = self.validate_intake(&request)?;
        let now = self.clock.now();
        let end_date = add_months(now, request.duration_months)
            .ok_or_else(|| FieldErrors::single("duration_months", "end date out of range"))?;

        let submission = Submission {
            id: SubmissionId::generate(),
            customer_email,
            requested_plan_id: plan.id,
            duration_months: request.duration_months,
            notes: normalized_text(request.notes),
            reseller_id: reseller.id.clone(),
            reseller_name: reseller.name.clone(),
            status: SubmissionStatus::Successful,
            request_date: now,
            start_date: Some(now),
            end_date: Some(end_date),
            profile_name: None,
            renewal_likelihood: None,
            renewal_reason: None,
            notification_read: false,
            created_at: now,
            updated_at: now,
        };

        let stored = self.submissions.insert(submission)?;
        info!(submission_id = %stored.id, %end_date, "active submission created");
        Ok(stored)
    }

    /// Move a submission to `status`.
    ///
    /// Activating sets `start_date` (kept if already present) and derives `end_date` from the
    /// override or the stored duration. Moving to `Pending` or `Canceled` leaves dates intact.
    pub fn transition(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        override_duration_months: Option<u32>,
    ) -> Result<Submission, SubmissionError> {
        if override_duration_months == Some(0) {
            return Err(
                FieldErrors::single("duration_months", "Duration must be at least 1 month.").into(),
            );
        }

        let now = self.clock.now();
        let mut out_of_range = false;
        let updated = self.submissions.update_by_id(id, &mut |submission: &mut Submission| {
            if status == SubmissionStatus::Successful {
                let start = submission.start_date.unwrap_or(now);
                let months = override_duration_months.unwrap_or(submission.duration_months);
                if !activate(submission, start, months, now) {
                    out_of_range = true;
                }
            } else {
                submission.status = status;
                submission.updated_at = now;
            }
        })?;

        let updated = updated.ok_or_else(|| SubmissionError::not_found(id))?;
        if out_of_range {
            return Err(FieldErrors::single("duration_months", "end date out of range").into());
        }

        info!(submission_id = %id, status = status.label(), "submission status updated");
        Ok(updated)
    }

    /// Extend a submission by `extra_months`.
    ///
    /// A subscription that is still running (or was never activated) keeps its start date and
    /// grows its duration. One whose end date already passed restarts from now for
    /// `extra_months`.
    pub fn renew(
        &self,
        id: &SubmissionId,
        extra_months: u32,
    ) -> Result<Submission, SubmissionError> {
        if extra_months == 0 {
            return Err(
                FieldErrors::single("extra_months", "Renewal must be at least 1 month.").into(),
            );
        }

        let now = self.clock.now();
        let mut out_of_range = false;
        let mut restarted = false;
        let updated = self.submissions.update_by_id(id, &mut |submission: &mut Submission| {
            let (start, months) = match submission.end_date {
                Some(end) if end < now => {
                    restarted = true;
                    (now, extra_months)
                }
                _ => (
                    submission.start_date.unwrap_or(now),
                    submission.duration_months.saturating_add(extra_months),
                ),
            };
            if !activate(submission, start, months, now) {
                out_of_range = true;
            }
        })?;

        let updated = updated.ok_or_else(|| SubmissionError::not_found(id))?;
        if out_of_range {
            return Err(FieldErrors::single("extra_months", "end date out of range").into());
        }

        info!(
            submission_id = %id,
            extra_months,
            restarted,
            end_date = ?updated.end_date,
            "submission renewed"
        );
        Ok(updated)
    }

    /// Set or clear the profile label. Blank names are stored as unset.
    pub fn set_profile_name(
        &self,
        id: &SubmissionId,
        name: Option<String>,
    ) -> Result<Submission, SubmissionError> {
        let name = normalized_text(name);
        if let Some(value) = &name {
            if value.chars().count() > MAX_PROFILE_NAME_CHARS {
                return Err(FieldErrors::single(
                    "profile_name",
                    format!("Profile name cannot exceed {MAX_PROFILE_NAME_CHARS} characters."),
                )
                .into());
            }
        }

        let now = self.clock.now();
        let updated = self.submissions.update_by_id(id, &mut |submission: &mut Submission| {
            submission.profile_name = name.clone();
            submission.updated_at = now;
        })?;

        updated.ok_or_else(|| SubmissionError::not_found(id))
    }

    /// Dismiss the dashboard notification for a submission.
    ///
    /// Returns `true` only when the flag actually changed; unknown ids and already-dismissed
    /// notifications both report `false`.
    pub fn mark_notification_read(&self, id: &SubmissionId) -> Result<bool, SubmissionError> {
        let now = self.clock.now();
        let mut changed = false;
        let updated = self.submissions.update_by_id(id, &mut |submission: &mut Submission| {
            if !submission.notification_read {
                submission.notification_read = true;
                submission.updated_at = now;
                changed = true;
            }
        })?;

        debug!(
            submission_id = %id,
            found = updated.is_some(),
            changed,
            "notification marked read"
        );
        Ok(changed)
    }

    pub fn get(&self, id: &SubmissionId) -> Result<Submission, SubmissionError> {
        self.submissions
            .find_by_id(id)?
            .ok_or_else(|| SubmissionError::not_found(id))
    }

    /// All submissions, newest first.
    pub fn list_all(&self) -> Result<Vec<Submission>, SubmissionError> {
        self.list(&SubmissionFilter::default())
    }

    /// Submissions filed by one reseller, newest first.
    pub fn list_for_reseller(
        &self,
        reseller_id: &ResellerId,
    ) -> Result<Vec<Submission>, SubmissionError> {
        self.list(&SubmissionFilter::for_reseller(reseller_id.clone()))
    }

    pub fn list_plans(&self) -> Result<Vec<Plan>, SubmissionError> {
        Ok(self.plans.list()?)
    }

    /// Reseller directory, ordered by id.
    pub fn list_resellers(&self) -> Result<Vec<Reseller>, SubmissionError> {
        let mut resellers = self.resellers.list()?;
        resellers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(resellers)
    }

    pub fn get_reseller(&self, id: &ResellerId) -> Result<Reseller, SubmissionError> {
        self.reseller(id)
    }

    /// Ban or reinstate a reseller. Their existing submissions are untouched.
    pub fn set_reseller_banned(
        &self,
        id: &ResellerId,
        banned: bool,
    ) -> Result<Reseller, SubmissionError> {
        let now = self.clock.now();
        let updated = self.resellers.update_by_id(id, &mut |reseller: &mut Reseller| {
            reseller.banned = banned;
            reseller.updated_at = now;
        })?;

        let updated = updated.ok_or_else(|| SubmissionError::reseller_not_found(id))?;
        info!(reseller_id = %id, banned, "reseller ban flag updated");
        Ok(updated)
    }

    /// Update a reseller's contact details.
    ///
    /// Submissions keep the reseller name captured when they were filed.
    pub fn update_reseller_info(
        &self,
        id: &ResellerId,
        update: ResellerUpdate,
    ) -> Result<Reseller, SubmissionError> {
        let mut errors = FieldErrors::default();
        let name = update.name.map(|name| name.trim().to_string());
        if name.as_deref().is_some_and(str::is_empty) {
            errors.push("name", "Name cannot be blank.");
        }
        let email = update.email.map(|email| email.trim().to_string());
        if email.as_ref().is_some_and(|email| !email.validate_email()) {
            errors.push("email", "Invalid email address.");
        }
        let phone = update.phone.map(|phone| phone.trim().to_string());
        if phone.as_deref().is_some_and(str::is_empty) {
            errors.push("phone", "Phone cannot be blank.");
        }
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let now = self.clock.now();
        let updated = self.resellers.update_by_id(id, &mut |reseller: &mut Reseller| {
            if let Some(name) = &name {
                reseller.name = name.clone();
            }
            if let Some(email) = &email {
                reseller.email = email.clone();
            }
            if let Some(phone) = &phone {
                reseller.phone = phone.clone();
            }
            reseller.updated_at = now;
        })?;

        updated.ok_or_else(|| SubmissionError::reseller_not_found(id))
    }

    /// Remove a reseller together with every submission they filed. Returns the number of
    /// submissions removed.
    pub fn delete_reseller(&self, id: &ResellerId) -> Result<usize, SubmissionError> {
        self.reseller(id)?;

        let removed = self.submissions.delete_for_reseller(id)?;
        if !self.resellers.delete(id)? {
            return Err(SubmissionError::reseller_not_found(id));
        }

        info!(reseller_id = %id, submissions_removed = removed, "reseller deleted");
        Ok(removed)
    }

    fn list(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>, SubmissionError> {
        let mut submissions = self.submissions.find(filter)?;
        submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(submissions)
    }

    fn validate_intake(
        &self,
        request: &NewSubmission,
    ) -> Result<(CustomerEmail, Plan, Reseller), SubmissionError> {
        let mut errors = FieldErrors::default();

        let email = match CustomerEmail::parse(&request.customer_email) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.push("customer_email", "Invalid customer email.");
                None
            }
        };

        let plan_id = request.requested_plan_id.trim();
        if plan_id.is_empty() {
            errors.push("requested_plan_id", "Plan is required.");
        }

        if request.duration_months < 1 {
            errors.push("duration_months", "Duration must be at least 1 month.");
        }

        let email = match email {
            Some(email) if errors.is_empty() => email,
            _ => return Err(SubmissionError::Validation(errors)),
        };

        let plan_id = PlanId(plan_id.to_string());
        let plan = self
            .plans
            .find_by_id(&plan_id)?
            .ok_or_else(|| SubmissionError::NotFound {
                entity: "plan",
                id: plan_id.0.clone(),
            })?;

        let reseller = self.reseller(&request.reseller_id)?;

        Ok((email, plan, reseller))
    }

    fn reseller(&self, id: &ResellerId) -> Result<Reseller, SubmissionError> {
        self.resellers
            .find_by_id(id)?
            .ok_or_else(|| SubmissionError::reseller_not_found(id))
    }

    fn predict(&self, notes: Option<&str>) -> Option<RenewalPrediction> {
        let predictor = self.predictor.as_ref()?;
        let notes = notes.map(str::trim).filter(|notes| !notes.is_empty())?;

        match predictor.predict(notes).and_then(prediction::checked) {
            Ok(prediction) => Some(prediction),
            Err(err) => {
                warn!(error = %err, "renewal prediction failed; continuing without it");
                None
            }
        }
    }
}

/// Marks `submission` successful over `[start, start + months)`. Leaves the record untouched
/// and returns `false` when the end date cannot be represented.
fn activate(
    submission: &mut Submission,
    start: DateTime<Utc>,
    months: u32,
    now: DateTime<Utc>,
) -> bool {
    let Some(end) = add_months(start, months) else {
        return false;
    };

    submission.status = SubmissionStatus::Successful;
    submission.start_date = Some(start);
    submission.end_date = Some(end);
    submission.duration_months = months;
    submission.updated_at = now;
    true
}

fn normalized_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Field-level validation messages, keyed by input field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Error raised by the submission service.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl SubmissionError {
    fn not_found(id: &SubmissionId) -> Self {
        Self::NotFound {
            entity: "submission",
            id: id.0.clone(),
        }
    }

    fn reseller_not_found(id: &ResellerId) -> Self {
        Self::NotFound {
            entity: "reseller",
            id: id.0.clone(),
        }
    }
}

impl From<FieldErrors> for SubmissionError {
    fn from(value: FieldErrors) -> Self {
        Self::Validation(value)
    }
}
