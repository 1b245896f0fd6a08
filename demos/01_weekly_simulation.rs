/// weekly simulation - drive the billing passes day by day with controlled time
///
/// Run with `RUST_LOG=debug` to see every ledger decision.
use chrono::{Duration, TimeZone, Utc};
use fleet_financing_rs::{
    BillingConfig, BillingCycle, Financing, FinancingTerms, InMemoryLedgerStore,
    LedgerRepository, Money, PaymentFrequency, QuotaStatus, Rate, SafeTimeProvider, TimeSource,
};
use tracing_subscriber::EnvFilter;

fn terms(vehicle: &str, client: &str, amount: i64, months: u32) -> FinancingTerms {
    FinancingTerms {
        vehicle_id: vehicle.to_string(),
        client_id: client.to_string(),
        total_amount: Money::from_major(amount),
        term_months: months,
        frequency: PaymentFrequency::Weekly,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== weekly billing simulation ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();
    let start = time.now().date_naive();

    let store = InMemoryLedgerStore::new();
    let punctual = store.insert_financing(Financing::originate(
        terms("VIN-PUNCTUAL", "driver-1", 49_500, 54),
        start,
    )?)?;
    let late = store.insert_financing(Financing::originate(terms("VIN-LATE", "driver-2", 20_000, 24), start)?)?;
    let ahead = store.insert_financing(Financing::originate(terms("VIN-AHEAD", "driver-3", 12_000, 12), start)?)?;

    // a gentler penalty than the default 10% per day
    let config = BillingConfig {
        late_fee_rate: Rate::from_percentage(1),
        minimum_overdue_days: 1,
    };
    let cycle = BillingCycle::with_settings(store, config);

    let mut week = 0;
    for day in 0..=56 {
        let today = time.now().date_naive();

        // weekly generation pass
        if day % 7 == 0 && week < 8 {
            week += 1;
            let report = cycle.run_generation_pass_at(week, &time)?;
            println!(
                "{today}: week {week} generated {}, covered by advance {}",
                report.generated, report.covered_by_advance
            );
        }

        // the punctual driver pays each quota on its due date
        for quota in cycle.repository().list_quotas(punctual.id, Some(QuotaStatus::Pending))? {
            if quota.due_date == today {
                let reference = format!("p-{}", quota.quota_number);
                cycle.apply_payment_at(punctual.id, quota.quota_number, quota.amount, &reference, &time)?;
            }
        }

        // the third driver prepays four weeks the day after signing
        if day == 1 {
            let quota = cycle
                .repository()
                .find_quota(ahead.id, 1)?
                .ok_or("first quota missing")?;
            let outcome =
                cycle.apply_payment_at(ahead.id, 1, quota.amount.times(4), "a-1", &time)?;
            println!("{today}: advance covers {:?}", outcome.advance);
        }

        let overdue = cycle.run_overdue_pass_at(&time)?;
        if overdue.newly_overdue > 0 {
            println!(
                "{today}: {} quota(s) newly overdue, ${} in fees outstanding",
                overdue.newly_overdue, overdue.total_fees
            );
        }

        // the late driver clears everything overdue every other week
        if day >= 16 && day % 14 == 2 {
            for quota in cycle.repository().list_quotas(late.id, Some(QuotaStatus::Overdue))? {
                let due = cycle.amount_due(late.id, quota.quota_number, today)?;
                let reference = format!("l-{}", quota.quota_number);
                let outcome = cycle.apply_payment_at(late.id, quota.quota_number, due.required, &reference, &time)?;
                println!(
                    "{today}: quota {} paid {} days late, fee ${}",
                    quota.quota_number, due.days_late, outcome.fee_collected
                );
            }
        }

        controller.advance(Duration::days(1));
    }

    println!();
    for id in [punctual.id, late.id, ahead.id] {
        let summary = cycle.summarize(id)?;
        println!(
            "{}: paid {}/{} quotas, balance ${}, late fees ${}, open {}",
            summary.vehicle_id,
            summary.schedule.paid_quotas,
            summary.schedule.total_quotas,
            summary.balances.current_balance,
            summary.balances.total_late_fees,
            summary.quotas.pending + summary.quotas.overdue
        );
    }

    Ok(())
}
