use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateEmail;

/// Identifier wrapper for customer submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn generate() -> Self {
        Self(format!("sub-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResellerId(pub String);

impl fmt::Display for ResellerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer address accepted only after syntactic validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerEmail(String);

impl CustomerEmail {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let candidate = raw.trim().to_string();
        if candidate.validate_email() {
            Ok(Self(candidate))
        } else {
            Err(format!("'{raw}' is not a valid customer email"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CustomerEmail {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CustomerEmail> for String {
    fn from(value: CustomerEmail) -> Self {
        value.0
    }
}

impl AsRef<str> for CustomerEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a submission. Any status may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Pending,
    Successful,
    Canceled,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "Pending",
            SubmissionStatus::Successful => "Successful",
            SubmissionStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Subscription offering a submission refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub duration_months: u32,
}

/// Reseller account as kept in the admin directory. Credentials belong to the auth layer and
/// never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reseller {
    pub id: ResellerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial contact-detail update; unset fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResellerUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Unvalidated intake payload, as posted by a reseller form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub customer_email: String,
    pub requested_plan_id: String,
    pub duration_months: u32,
    #[serde(default)]
    pub notes: Option<String>,
    /// Filing reseller; the display name is resolved from the directory.
    pub reseller_id: ResellerId,
}

/// Output of the renewal-likelihood collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalPrediction {
    pub likelihood: f32,
    pub reason: String,
}

/// Persisted submission record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub customer_email: CustomerEmail,
    pub requested_plan_id: PlanId,
    pub duration_months: u32,
    pub notes: Option<String>,
    pub reseller_id: ResellerId,
    pub reseller_name: String,
    pub status: SubmissionStatus,
    pub request_date: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub profile_name: Option<String>,
    pub renewal_likelihood: Option<f32>,
    pub renewal_reason: Option<String>,
    pub notification_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// True once the submission has been activated at least once.
    pub fn has_been_activated(&self) -> bool {
        self.end_date.is_some()
    }
}
