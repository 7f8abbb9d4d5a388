//! Billing summary arithmetic. All money is integer cents.

use serde::Serialize;
use std::collections::BTreeMap;

use super::timesheet_calculator::labour_cents;
use crate::domain::entities::{ExpenseEntry, TimesheetEntry};
use crate::domain::value_objects::{Province, WorkflowStatus};

/// Labour billed to one client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientLine {
    pub client_name: String,
    pub hours: f64,
    pub labour_cents: i64,
    pub expense_cents: i64,
}

/// One tax line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxLine {
    pub name: &'static str,
    /// Rate in thousandths of a percent (9975 = 9.975%)
    pub rate_milli_percent: i64,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingSummary {
    pub province: Province,
    pub clients: Vec<ClientLine>,
    pub labour_cents: i64,
    pub expense_cents: i64,
    pub subtotal_cents: i64,
    pub taxes: Vec<TaxLine>,
    pub tax_cents: i64,
    pub total_cents: i64,
}

/// `amount × rate / 100_000`, rounded half-up.
pub fn tax_amount(amount_cents: i64, rate_milli_percent: i64) -> i64 {
    (amount_cents * rate_milli_percent + 50_000) / 100_000
}

/// Build a summary from approved billable time and expenses.
///
/// Entries that are not approved or not billable are ignored. Expenses with
/// no client are reported under an empty client name.
pub fn summarize(
    province: Province,
    timesheets: &[TimesheetEntry],
    expenses: &[ExpenseEntry],
) -> BillingSummary {
    let mut lines: BTreeMap<String, ClientLine> = BTreeMap::new();

    for entry in timesheets.iter().filter(|e| is_billed(e.status, e.billable)) {
        let Ok(hours) = entry.hours() else {
            continue;
        };
        let line = line_for(&mut lines, &entry.client_name);
        line.hours += hours;
        line.labour_cents += labour_cents(hours, entry.hourly_rate_cents);
    }

    for expense in expenses.iter().filter(|e| is_billed(e.status, e.billable)) {
        let client = expense.client_name.as_deref().unwrap_or_default();
        line_for(&mut lines, client).expense_cents += expense.amount_cents;
    }

    let clients: Vec<ClientLine> = lines
        .into_values()
        .map(|mut line| {
            line.hours = (line.hours * 100.0).round() / 100.0;
            line
        })
        .collect();

    let labour: i64 = clients.iter().map(|c| c.labour_cents).sum();
    let expense: i64 = clients.iter().map(|c| c.expense_cents).sum();
    let subtotal = labour + expense;

    let taxes: Vec<TaxLine> = province
        .sales_taxes()
        .into_iter()
        .map(|tax| TaxLine {
            name: tax.name,
            rate_milli_percent: tax.rate_milli_percent,
            amount_cents: tax_amount(subtotal, tax.rate_milli_percent),
        })
        .collect();
    let tax_cents: i64 = taxes.iter().map(|t| t.amount_cents).sum();

    BillingSummary {
        province,
        clients,
        labour_cents: labour,
        expense_cents: expense,
        subtotal_cents: subtotal,
        taxes,
        tax_cents,
        total_cents: subtotal + tax_cents,
    }
}

fn is_billed(status: WorkflowStatus, billable: bool) -> bool {
    billable && matches!(status, WorkflowStatus::Approved | WorkflowStatus::Locked)
}

fn line_for<'a>(lines: &'a mut BTreeMap<String, ClientLine>, client: &str) -> &'a mut ClientLine {
    lines
        .entry(client.to_string())
        .or_insert_with(|| ClientLine {
            client_name: client.to_string(),
            hours: 0.0,
            labour_cents: 0,
            expense_cents: 0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::timesheet::entry;
    use crate::domain::entities::ExpenseCategory;
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;

    fn expense(amount_cents: i64, client: Option<&str>) -> ExpenseEntry {
        let now = Utc::now();
        ExpenseEntry {
            id: 1,
            tenant_id: 1,
            user_id: 7,
            expense_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            category: ExpenseCategory::Materials,
            description: "Gaines".into(),
            amount_cents,
            distance_km: None,
            receipt_url: None,
            billable: true,
            client_name: client.map(str::to_string),
            status: WorkflowStatus::Approved,
            approved_by: Some(2),
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tax_amount_rounds_half_up() {
        assert_eq!(tax_amount(10_000, 5_000), 500);
        assert_eq!(tax_amount(10_000, 9_975), 998);
        assert_eq!(tax_amount(1, 5_000), 0);
    }

    #[test]
    fn test_quebec_summary() {
        let mut approved = entry(1, 7, (8, 0), (12, 0));
        approved.status = WorkflowStatus::Approved;
        let mut draft = entry(2, 7, (13, 0), (17, 0));
        draft.status = WorkflowStatus::Draft;

        let summary = summarize(
            Province::QC,
            &[approved, draft],
            &[expense(5_000, Some("Client A"))],
        );

        assert_eq!(summary.clients.len(), 1);
        assert_eq!(summary.clients[0].hours, 4.0);
        assert_eq!(summary.labour_cents, 20_000);
        assert_eq!(summary.expense_cents, 5_000);
        assert_eq!(summary.subtotal_cents, 25_000);
        // GST 5% + QST 9.975%
        assert_eq!(summary.taxes[0].amount_cents, 1_250);
        assert_eq!(summary.taxes[1].amount_cents, 2_494);
        assert_eq!(summary.total_cents, 28_744);
    }

    #[test]
    fn test_clients_are_grouped_and_sorted() {
        let mut a = entry(1, 7, (8, 0), (10, 0));
        a.status = WorkflowStatus::Approved;
        a.client_name = "Zinc Inc".into();
        let mut b = entry(2, 8, (8, 0), (9, 0));
        b.status = WorkflowStatus::Locked;

        let summary = summarize(Province::ON, &[a, b], &[expense(100, None)]);
        let names: Vec<_> = summary.clients.iter().map(|c| c.client_name.as_str()).collect();
        assert_eq!(names, vec!["", "Client A", "Zinc Inc"]);
        assert_eq!(summary.taxes.len(), 1);
        assert_eq!(summary.taxes[0].name, "HST");
    }

    #[test]
    fn test_non_billable_is_excluded() {
        let mut e = entry(1, 7, (8, 0), (10, 0));
        e.status = WorkflowStatus::Approved;
        e.billable = false;
        let summary = summarize(Province::AB, &[e], &[]);
        assert_eq!(summary.total_cents, 0);
        assert!(summary.clients.is_empty());
    }
}
