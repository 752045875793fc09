//! On-demand expiry classification for activated submissions.
//!
//! Nothing here runs in the background: every answer is computed by comparing the stored end
//! date against the clock at query time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Submission, SubmissionStatus};
use super::repository::{RepositoryError, SubmissionFilter, SubmissionRepository};
use crate::clock::Clock;

pub const DEFAULT_EXPIRING_SOON_DAYS: u32 = 7;
/// Longest lookahead accepted from configuration or a dashboard query.
pub const MAX_EXPIRY_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryConfig {
    /// Lookahead used to flag a subscription as expiring soon.
    pub expiring_soon_days: u32,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            expiring_soon_days: DEFAULT_EXPIRING_SOON_DAYS,
        }
    }
}

impl ExpiryConfig {
    pub fn window(&self) -> Duration {
        Duration::days(i64::from(self.expiring_soon_days))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Active,
    ExpiringSoon,
    Expired,
}

impl ExpiryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ExpiryStatus::Active => "active",
            ExpiryStatus::ExpiringSoon => "expiring_soon",
            ExpiryStatus::Expired => "expired",
        }
    }
}

/// Classify `submission` relative to `now`.
///
/// `Expired` when the end date is before `now`, `ExpiringSoon` when it falls within
/// `[now, now + window]`, `Active` otherwise. A submission without an end date is `Active`.
pub fn classify(submission: &Submission, now: DateTime<Utc>, window: Duration) -> ExpiryStatus {
    match submission.end_date {
        Some(end) if end < now => ExpiryStatus::Expired,
        Some(end) if end - now <= window => ExpiryStatus::ExpiringSoon,
        _ => ExpiryStatus::Active,
    }
}

/// Dashboard row pairing a submission with its expiry classification.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiringSubmission {
    pub submission: Submission,
    pub expiry: ExpiryStatus,
    /// Whole days until the end date; negative once expired.
    pub days_remaining: i64,
}

/// Counts shown on the expired-accounts dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpiryOverview {
    pub window_days: u32,
    pub active: usize,
    pub expiring_soon: usize,
    pub expired: usize,
}

pub struct ExpiryScanner<S> {
    submissions: Arc<S>,
    clock: Arc<dyn Clock>,
    config: ExpiryConfig,
}

impl<S> ExpiryScanner<S>
where
    S: SubmissionRepository + 'static,
{
    pub fn new(submissions: Arc<S>, clock: Arc<dyn Clock>, config: ExpiryConfig) -> Self {
        Self {
            submissions,
            clock,
            config,
        }
    }

    pub(crate) fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> ExpiryConfig {
        self.config
    }

    pub fn classify(&self, submission: &Submission, now: DateTime<Utc>) -> ExpiryStatus {
        classify(submission, now, self.config.window())
    }

    /// `Successful` submissions whose end date lies in `[now, now + window_days]`, soonest
    /// first.
    pub fn list_expiring_within(
        &self,
        window_days: u32,
    ) -> Result<Vec<ExpiringSubmission>, RepositoryError> {
        let now = self.clock.now();
        let horizon = now
            .checked_add_signed(Duration::days(i64::from(window_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut rows: Vec<_> = self
            .activated()?
            .into_iter()
            .filter(|submission| {
                submission
                    .end_date
                    .is_some_and(|end| end >= now && end <= horizon)
            })
            .map(|submission| self.row(submission, now))
            .collect();
        rows.sort_by_key(|row| row.submission.end_date);
        Ok(rows)
    }

    /// `Successful` submissions whose end date has passed, most recently expired first.
    pub fn list_expired(&self) -> Result<Vec<ExpiringSubmission>, RepositoryError> {
        let now = self.clock.now();

        let mut rows: Vec<_> = self
            .activated()?
            .into_iter()
            .filter(|submission| submission.end_date.is_some_and(|end| end < now))
            .map(|submission| self.row(submission, now))
            .collect();
        rows.sort_by_key(|row| std::cmp::Reverse(row.submission.end_date));
        Ok(rows)
    }

    pub fn overview(&self) -> Result<ExpiryOverview, RepositoryError> {
        let now = self.clock.now();
        let mut overview = ExpiryOverview {
            window_days: self.config.expiring_soon_days,
            ..ExpiryOverview::default()
        };

        for submission in self.activated()? {
            match self.classify(&submission, now) {
                ExpiryStatus::Active => overview.active += 1,
                ExpiryStatus::ExpiringSoon => overview.expiring_soon += 1,
                ExpiryStatus::Expired => overview.expired += 1,
            }
        }
        Ok(overview)
    }

    fn activated(&self) -> Result<Vec<Submission>, RepositoryError> {
        self.submissions
            .find(&SubmissionFilter::with_status(SubmissionStatus::Successful))
    }

    fn row(&self, submission: Submission, now: DateTime<Utc>) -> ExpiringSubmission {
        let expiry = self.classify(&submission, now);
        let days_remaining = submission
            .end_date
            .map(|end| (end - now).num_days())
            .unwrap_or_default();
        ExpiringSubmission {
            submission,
            expiry,
            days_remaining,
        }
    }
}
