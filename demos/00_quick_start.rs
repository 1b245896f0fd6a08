/// quick start - originate a financing, bill the first quota and pay it
use chrono::NaiveDate;
use fleet_financing_rs::{
    BillingCycle, Financing, FinancingTerms, InMemoryLedgerStore, LedgerRepository, Money,
    PaymentFrequency, PaymentRequest,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;

    // a $49,500 vehicle paid weekly over 54 months
    let financing = Financing::originate(
        FinancingTerms {
            vehicle_id: "VIN-1HGCM82633A004352".to_string(),
            client_id: "driver-0042".to_string(),
            total_amount: Money::from_major(49_500),
            term_months: 54,
            frequency: PaymentFrequency::Weekly,
        },
        start,
    )?;
    println!(
        "{} quotas of ${}",
        financing.total_quotas,
        financing.regular_quota_amount()
    );

    let store = InMemoryLedgerStore::new();
    let financing = store.insert_financing(financing)?;
    let cycle = BillingCycle::new(store);

    // bill the first week
    cycle.run_generation_pass(1, start)?;
    let quota = cycle
        .repository()
        .find_quota(financing.id, 1)?
        .ok_or("quota 1 missing")?;

    // pay it on the due date
    cycle.apply_payment(PaymentRequest {
        financing_id: financing.id,
        quota_number: 1,
        amount: quota.amount,
        payment_date: quota.due_date,
        reference: "deposit-0001".to_string(),
    })?;

    println!("{}", cycle.summarize(financing.id)?.to_json_pretty()?);

    Ok(())
}
