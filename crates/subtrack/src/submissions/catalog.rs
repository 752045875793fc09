//! Default plan catalog, starter reseller directory, and the one-time startup seeding step.

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{Plan, PlanId, Reseller, ResellerId};
use super::repository::{PlanRepository, RepositoryError, ResellerRepository};

pub fn default_plans() -> Vec<Plan> {
    [
        ("plan-basic", "Adobe Basic Cloud", 12),
        ("plan-standard", "Adobe Standard Suite", 12),
        ("plan-premium", "Adobe Premium All Apps", 24),
        ("plan-enterprise", "Adobe Enterprise Pack", 36),
    ]
    .into_iter()
    .map(|(id, name, duration_months)| Plan {
        id: PlanId(id.to_string()),
        name: name.to_string(),
        duration_months,
    })
    .collect()
}

/// Inserts the default catalog when the plan store is empty.
///
/// Run once during startup, before any request is served. Returns the number of plans inserted.
pub fn seed_default_plans<P>(plans: &P) -> Result<usize, RepositoryError>
where
    P: PlanRepository + ?Sized,
{
    if !plans.list()?.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0;
    for plan in default_plans() {
        plans.insert(plan)?;
        inserted += 1;
    }
    info!(inserted, "seeded default plan catalog");
    Ok(inserted)
}

pub fn default_resellers(now: DateTime<Utc>) -> Vec<Reseller> {
    [
        ("reseller-001", "Reseller One", "reseller@example.com", "01700000001"),
        ("reseller-002", "Reseller Two", "reseller2@example.com", "01700000002"),
    ]
    .into_iter()
    .map(|(id, name, email, phone)| Reseller {
        id: ResellerId(id.to_string()),
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        banned: false,
        created_at: now,
        updated_at: now,
    })
    .collect()
}

/// Inserts the starter reseller accounts when the directory is empty.
pub fn seed_default_resellers<R>(
    resellers: &R,
    now: DateTime<Utc>,
) -> Result<usize, RepositoryError>
where
    R: ResellerRepository + ?Sized,
{
    if !resellers.list()?.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0;
    for reseller in default_resellers(now) {
        resellers.insert(reseller)?;
        inserted += 1;
    }
    info!(inserted, "seeded default reseller directory");
    Ok(inserted)
}
