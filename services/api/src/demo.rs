use crate::infra::{
    noon_utc, InMemoryPlanRepository, InMemoryResellerRepository, InMemorySubmissionRepository,
};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use clap::Args;
use std::sync::Arc;
use subtrack::clock::FixedClock;
use subtrack::error::AppError;
use subtrack::submissions::{
    seed_default_plans, seed_default_resellers, ExpiringSubmission, ExpiryConfig, NewSubmission,
    PlanRepository, ResellerId, SubmissionService, SubmissionStatus, MAX_EXPIRY_WINDOW_DAYS,
};

type DemoService = SubmissionService<
    InMemorySubmissionRepository,
    InMemoryPlanRepository,
    InMemoryResellerRepository,
>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reporting date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Lookahead in days for the expiring-soon listing.
    #[arg(long)]
    pub(crate) window_days: Option<u32>,
}

struct DemoStore {
    submissions: Arc<InMemorySubmissionRepository>,
    plans: Arc<InMemoryPlanRepository>,
    resellers: Arc<InMemoryResellerRepository>,
    expiry: ExpiryConfig,
}

impl DemoStore {
    fn service_at(&self, now: DateTime<Utc>) -> DemoService {
        SubmissionService::new(
            self.submissions.clone(),
            self.plans.clone(),
            self.resellers.clone(),
            self.expiry,
        )
        .with_clock(Arc::new(FixedClock(now)))
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, window_days } = args;

    let today = noon_utc(today.unwrap_or_else(|| Local::now().date_naive()));
    let expiry = window_days
        .map(|days| ExpiryConfig {
            expiring_soon_days: days.clamp(1, MAX_EXPIRY_WINDOW_DAYS),
        })
        .unwrap_or_default();

    let store = DemoStore {
        submissions: Arc::new(InMemorySubmissionRepository::default()),
        plans: Arc::new(InMemoryPlanRepository::default()),
        resellers: Arc::new(InMemoryResellerRepository::default()),
        expiry,
    };
    seed_default_plans(store.plans.as_ref())?;
    seed_default_resellers(store.resellers.as_ref(), today - Duration::days(400))?;

    println!("Subscription tracker demo ({})", today.date_naive());
    println!("Plan catalog:");
    for plan in store.plans.list()? {
        println!(
            "  - {} ({}) | {} months",
            plan.name, plan.id, plan.duration_months
        );
    }

    let service = store.service_at(today);
    println!("Resellers:");
    for reseller in service.list_resellers()? {
        println!("  - {} ({}) | {}", reseller.name, reseller.id, reseller.email);
    }
    let reseller = ResellerId("reseller-001".to_string());

    println!("\nIntake and approvals");
    let lapsed_start = today - Duration::days(370);
    let earlier = store.service_at(lapsed_start);
    let lapsed = earlier.create(intake("studio@example.com", "plan-basic", 12, &reseller))?;
    let lapsed = earlier.transition(&lapsed.id, SubmissionStatus::Successful, None)?;
    print_submission(
        "approved a year ago",
        &lapsed.customer_email,
        lapsed.end_date,
    );

    let monthly_start = today - Duration::days(28);
    let monthly = store
        .service_at(monthly_start)
        .create_active(intake("freelancer@example.com", "plan-standard", 1, &reseller))?;
    print_submission(
        "added directly by admin",
        &monthly.customer_email,
        monthly.end_date,
    );

    let fresh = service.create(intake("agency@example.com", "plan-premium", 24, &reseller))?;
    let fresh = service.transition(&fresh.id, SubmissionStatus::Successful, None)?;
    service.set_profile_name(&fresh.id, Some("Agency Seat 1".to_string()))?;
    print_submission("approved today", &fresh.customer_email, fresh.end_date);

    let pending = service.create(intake("trial@example.com", "plan-enterprise", 36, &reseller))?;
    println!(
        "- {} awaiting review (status {})",
        pending.customer_email.as_str(),
        pending.status
    );

    let scanner = service.scanner();
    let overview = scanner.overview()?;
    println!(
        "\nExpiry overview: {} active | {} expiring within {} days | {} expired",
        overview.active, overview.expiring_soon, overview.window_days, overview.expired
    );

    let window = scanner.config().expiring_soon_days;
    print_rows(
        &format!("Expiring within {window} days"),
        &scanner.list_expiring_within(window)?,
    );
    print_rows("Expired", &scanner.list_expired()?);

    println!("\nRenewing {} for 12 months", lapsed.customer_email.as_str());
    let renewed = service.renew(&lapsed.id, 12)?;
    print_submission("renewed", &renewed.customer_email, renewed.end_date);

    let overview = scanner.overview()?;
    println!(
        "Expiry overview after renewal: {} active | {} expiring soon | {} expired",
        overview.active, overview.expiring_soon, overview.expired
    );

    let departing = ResellerId("reseller-002".to_string());
    service.create(intake("walkin@example.com", "plan-basic", 12, &departing))?;
    service.set_reseller_banned(&departing, true)?;
    let removed = service.delete_reseller(&departing)?;
    println!("\nBanned and removed {departing} along with {removed} submission(s)");

    Ok(())
}

fn intake(email: &str, plan: &str, months: u32, reseller: &ResellerId) -> NewSubmission {
    NewSubmission {
        customer_email: email.to_string(),
        requested_plan_id: plan.to_string(),
        duration_months: months,
        notes: None,
        reseller_id: reseller.clone(),
    }
}

fn print_submission(
    label: &str,
    email: &subtrack::submissions::CustomerEmail,
    end_date: Option<DateTime<Utc>>,
) {
    match end_date {
        Some(end) => println!("- {} {} -> ends {}", email.as_str(), label, end.date_naive()),
        None => println!("- {} {}", email.as_str(), label),
    }
}

fn print_rows(title: &str, rows: &[ExpiringSubmission]) {
    if rows.is_empty() {
        println!("{title}: none");
        return;
    }
    println!("{title}:");
    for row in rows {
        println!(
            "  - {} | {} | {} days remaining",
            row.submission.customer_email.as_str(),
            row.expiry.label(),
            row.days_remaining
        );
    }
}
