//! Dashboard figures and period reports computed from stored records

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::records::Expense;
use crate::revenue::{RevenueEntry, RevenueStatus, VendorCategory};
use crate::types::*;

/// `YYYY-MM` key used to bucket records by month
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Headline numbers for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Everything collected so far
    pub total_revenue: BigDecimal,
    pub total_expenses: BigDecimal,
    /// Still owed on sales that are not yet received
    pub pending_payments: BigDecimal,
    pub net_profit: BigDecimal,
}

impl DashboardSummary {
    pub fn compute(revenues: &[RevenueEntry], expenses: &[Expense]) -> Self {
        let total_revenue: BigDecimal = revenues.iter().map(|r| &r.received_amount).sum();
        let total_expenses: BigDecimal = expenses.iter().map(|e| &e.amount).sum();
        let pending_payments: BigDecimal = revenues
            .iter()
            .filter(|r| r.status == RevenueStatus::Pending)
            .map(|r| &r.pending_amount)
            .sum();
        let net_profit = &total_revenue - &total_expenses;

        Self {
            total_revenue,
            total_expenses,
            pending_payments,
            net_profit,
        }
    }
}

/// Revenue and expenses of one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyData {
    pub month: String,
    /// Received sales only
    pub revenue: BigDecimal,
    pub expenses: BigDecimal,
}

/// The last `months` months that have any activity, oldest first
pub fn monthly_overview(
    revenues: &[RevenueEntry],
    expenses: &[Expense],
    months: usize,
) -> Vec<MonthlyData> {
    let mut revenue_by_month: BTreeMap<String, BigDecimal> = BTreeMap::new();
    let mut expenses_by_month: BTreeMap<String, BigDecimal> = BTreeMap::new();

    for revenue in revenues.iter().filter(|r| r.status == RevenueStatus::Completed) {
        *revenue_by_month
            .entry(month_key(revenue.date))
            .or_insert_with(|| BigDecimal::from(0)) += &revenue.received_amount;
    }
    for expense in expenses {
        *expenses_by_month
            .entry(month_key(expense.date))
            .or_insert_with(|| BigDecimal::from(0)) += &expense.amount;
    }

    let all_months: BTreeSet<&String> = revenue_by_month
        .keys()
        .chain(expenses_by_month.keys())
        .collect();
    let skip = all_months.len().saturating_sub(months);

    all_months
        .into_iter()
        .skip(skip)
        .map(|month| MonthlyData {
            month: month.clone(),
            revenue: revenue_by_month
                .get(month)
                .cloned()
                .unwrap_or_else(|| BigDecimal::from(0)),
            expenses: expenses_by_month
                .get(month)
                .cloned()
                .unwrap_or_else(|| BigDecimal::from(0)),
        })
        .collect()
}

/// Period a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    All,
    Year(i32),
    Month(i32, u32),
}

impl ReportPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            ReportPeriod::All => true,
            ReportPeriod::Year(year) => date.year() == year,
            ReportPeriod::Month(year, month) => date.year() == year && date.month() == month,
        }
    }

    /// `all`, `2025` or `2025-03`
    pub fn label(&self) -> String {
        match *self {
            ReportPeriod::All => "all".to_string(),
            ReportPeriod::Year(year) => year.to_string(),
            ReportPeriod::Month(year, month) => format!("{year}-{month:02}"),
        }
    }
}

/// Profit and loss for a period, broken down by source and category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub period: String,
    pub total_revenue: BigDecimal,
    pub total_expenses: BigDecimal,
    pub net_profit: BigDecimal,
    pub revenue_by_source: BTreeMap<String, BigDecimal>,
    pub expense_by_category: BTreeMap<String, BigDecimal>,
}

impl PeriodReport {
    /// Revenue counts received sales only; expenses count in full
    pub fn compute(period: ReportPeriod, revenues: &[RevenueEntry], expenses: &[Expense]) -> Self {
        let mut revenue_by_source: BTreeMap<String, BigDecimal> = BTreeMap::new();
        for revenue in revenues
            .iter()
            .filter(|r| period.contains(r.date) && r.status == RevenueStatus::Completed)
        {
            *revenue_by_source
                .entry(revenue.source.as_str().to_string())
                .or_insert_with(|| BigDecimal::from(0)) += &revenue.received_amount;
        }

        let mut expense_by_category: BTreeMap<String, BigDecimal> = BTreeMap::new();
        for expense in expenses.iter().filter(|e| period.contains(e.date)) {
            *expense_by_category
                .entry(expense.category.clone())
                .or_insert_with(|| BigDecimal::from(0)) += &expense.amount;
        }

        let total_revenue: BigDecimal = revenue_by_source.values().sum();
        let total_expenses: BigDecimal = expense_by_category.values().sum();
        let net_profit = &total_revenue - &total_expenses;

        Self {
            period: period.label(),
            total_revenue,
            total_expenses,
            net_profit,
            revenue_by_source,
            expense_by_category,
        }
    }
}

/// Sales of one month with their totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthGroup {
    pub month: String,
    pub entries: Vec<RevenueEntry>,
    pub total_sale: BigDecimal,
    pub total_received: BigDecimal,
    pub total_pending: BigDecimal,
}

/// Revenue grouped by month, newest month first and newest entry first
pub fn group_by_month(revenues: &[RevenueEntry]) -> Vec<MonthGroup> {
    let mut months: BTreeMap<String, Vec<RevenueEntry>> = BTreeMap::new();
    for revenue in revenues {
        months
            .entry(month_key(revenue.date))
            .or_default()
            .push(revenue.clone());
    }

    months
        .into_iter()
        .rev()
        .map(|(month, mut entries)| {
            entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
            MonthGroup {
                total_sale: entries.iter().map(|e| &e.sale_price).sum(),
                total_received: entries.iter().map(|e| &e.received_amount).sum(),
                total_pending: entries.iter().map(|e| &e.pending_amount).sum(),
                month,
                entries,
            }
        })
        .collect()
}

/// Months that have revenue, newest first
pub fn available_months(revenues: &[RevenueEntry]) -> Vec<String> {
    let months: BTreeSet<String> = revenues.iter().map(|r| month_key(r.date)).collect();
    months.into_iter().rev().collect()
}

/// Sales with money still to collect, oldest first
pub fn pending_payments(revenues: &[RevenueEntry]) -> Vec<RevenueEntry> {
    let mut pending: Vec<RevenueEntry> = revenues
        .iter()
        .filter(|r| r.pending_amount > tolerance())
        .cloned()
        .collect();
    pending.sort_by(|a, b| a.date.cmp(&b.date));
    pending
}

/// An unpaid vendor cost row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPayable {
    pub revenue_id: String,
    pub client_name: String,
    pub date: NaiveDate,
    pub cost_id: String,
    pub vendor_name: String,
    pub category: VendorCategory,
    pub amount: BigDecimal,
    pub paid: BigDecimal,
    pub pending: BigDecimal,
}

/// Every vendor cost row with money outstanding
pub fn vendor_payables(revenues: &[RevenueEntry]) -> Vec<VendorPayable> {
    let mut payables: Vec<VendorPayable> = revenues
        .iter()
        .flat_map(|revenue| {
            revenue.outstanding_costs().map(move |cost| VendorPayable {
                revenue_id: revenue.id.clone(),
                client_name: revenue.client_name.clone(),
                date: revenue.date,
                cost_id: cost.id.clone(),
                vendor_name: cost.vendor_name.clone(),
                category: cost.category,
                amount: cost.amount.clone(),
                paid: cost.paid(),
                pending: cost.pending(),
            })
        })
        .collect();
    payables.sort_by(|a, b| a.date.cmp(&b.date));
    payables
}

/// Business placed with one vendor across all sales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorBusiness {
    pub vendor_name: String,
    /// Σ cost amounts booked with the vendor
    pub total_business: BigDecimal,
    /// Number of cost rows
    pub transaction_count: usize,
    pub total_paid: BigDecimal,
    pub total_pending: BigDecimal,
}

impl VendorBusiness {
    /// Average cost row, zero when there are none
    pub fn average_transaction(&self) -> BigDecimal {
        if self.transaction_count == 0 {
            return BigDecimal::from(0);
        }
        round_money(&(&self.total_business / BigDecimal::from(self.transaction_count as u64)))
    }
}

/// Cost rows grouped by vendor name, biggest business first
///
/// Names are matched after trimming; rows without a vendor name are skipped.
pub fn vendor_business(revenues: &[RevenueEntry]) -> Vec<VendorBusiness> {
    let mut by_vendor: BTreeMap<&str, VendorBusiness> = BTreeMap::new();
    for cost in revenues.iter().flat_map(|r| &r.cost_price_details) {
        let name = cost.vendor_name.trim();
        if name.is_empty() {
            continue;
        }
        let row = by_vendor.entry(name).or_insert_with(|| VendorBusiness {
            vendor_name: name.to_string(),
            total_business: BigDecimal::from(0),
            transaction_count: 0,
            total_paid: BigDecimal::from(0),
            total_pending: BigDecimal::from(0),
        });
        row.total_business += &cost.amount;
        row.transaction_count += 1;
        row.total_paid += cost.paid();
        row.total_pending += cost.pending();
    }

    let mut report: Vec<VendorBusiness> = by_vendor.into_values().collect();
    report.sort_by(|a, b| {
        b.total_business
            .cmp(&a.total_business)
            .then_with(|| a.vendor_name.cmp(&b.vendor_name))
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::ReconciliationEngine;
    use crate::records::ExpenseDraft;
    use crate::revenue::{RevenueDraft, RevenueSource, VendorCost};

    fn revenue(y: i32, m: u32, source: RevenueSource, sale: i64, received: i64) -> RevenueEntry {
        let draft = RevenueDraft::new(
            NaiveDate::from_ymd_opt(y, m, 5).unwrap(),
            "Client",
            source,
            BigDecimal::from(sale),
        )
        .received(BigDecimal::from(received));
        RevenueEntry::from_draft(draft, &ReconciliationEngine::new()).unwrap()
    }

    fn expense(y: i32, m: u32, category: &str, amount: i64) -> Expense {
        Expense::from_draft(ExpenseDraft::new(
            NaiveDate::from_ymd_opt(y, m, 8).unwrap(),
            category,
            BigDecimal::from(amount),
        ))
    }

    #[test]
    fn test_dashboard_summary() {
        let revenues = vec![
            revenue(2025, 1, RevenueSource::Visa, 1000, 1000),
            revenue(2025, 1, RevenueSource::Package, 5000, 2000),
        ];
        let expenses = vec![expense(2025, 1, "Office Rent", 1500)];

        let summary = DashboardSummary::compute(&revenues, &expenses);
        assert_eq!(summary.total_revenue, BigDecimal::from(3000));
        assert_eq!(summary.pending_payments, BigDecimal::from(3000));
        assert_eq!(summary.net_profit, BigDecimal::from(1500));
    }

    #[test]
    fn test_monthly_overview_keeps_last_months() {
        let revenues: Vec<RevenueEntry> = (1..=8)
            .map(|m| revenue(2025, m, RevenueSource::Ticket, 100, 100))
            .chain(std::iter::once(revenue(2025, 8, RevenueSource::Visa, 500, 200)))
            .collect();
        let expenses = vec![expense(2025, 9, "Marketing", 300)];

        let overview = monthly_overview(&revenues, &expenses, 6);
        let months: Vec<&str> = overview.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(
            months,
            vec!["2025-04", "2025-05", "2025-06", "2025-07", "2025-08", "2025-09"]
        );
        // the partly paid visa sale is not counted
        assert_eq!(overview[4].revenue, BigDecimal::from(100));
        assert_eq!(overview[5].revenue, BigDecimal::from(0));
        assert_eq!(overview[5].expenses, BigDecimal::from(300));
    }

    #[test]
    fn test_period_report() {
        let revenues = vec![
            revenue(2025, 3, RevenueSource::Visa, 1000, 1000),
            revenue(2025, 3, RevenueSource::Visa, 800, 800),
            revenue(2025, 3, RevenueSource::Ticket, 400, 100),
            revenue(2025, 4, RevenueSource::Package, 9000, 9000),
        ];
        let expenses = vec![
            expense(2025, 3, "Utilities", 200),
            expense(2025, 4, "Utilities", 250),
        ];

        let march = PeriodReport::compute(ReportPeriod::Month(2025, 3), &revenues, &expenses);
        assert_eq!(march.period, "2025-03");
        assert_eq!(march.total_revenue, BigDecimal::from(1800));
        assert_eq!(march.revenue_by_source.get("Visa"), Some(&BigDecimal::from(1800)));
        assert!(!march.revenue_by_source.contains_key("Ticket"));
        assert_eq!(march.net_profit, BigDecimal::from(1600));

        let year = PeriodReport::compute(ReportPeriod::Year(2025), &revenues, &expenses);
        assert_eq!(year.total_revenue, BigDecimal::from(10800));
        assert_eq!(year.expense_by_category.get("Utilities"), Some(&BigDecimal::from(450)));

        assert_eq!(ReportPeriod::All.label(), "all");
    }

    #[test]
    fn test_grouping_and_outstanding() {
        let mut sale = revenue(2025, 2, RevenueSource::Package, 1000, 1000);
        sale.cost_price_details
            .push(VendorCost::new("Hotel ABC", VendorCategory::Hotel, BigDecimal::from(600)));
        let revenues = vec![
            revenue(2025, 1, RevenueSource::Visa, 500, 200),
            sale,
        ];

        let groups = group_by_month(&revenues);
        assert_eq!(groups[0].month, "2025-02");
        assert_eq!(groups[1].total_pending, BigDecimal::from(300));
        assert_eq!(available_months(&revenues), vec!["2025-02", "2025-01"]);

        assert_eq!(pending_payments(&revenues).len(), 1);
        let payables = vendor_payables(&revenues);
        assert_eq!(payables.len(), 1);
        assert_eq!(payables[0].pending, BigDecimal::from(600));
    }

    #[test]
    fn test_vendor_business_totals() {
        let mut goa = revenue(2025, 2, RevenueSource::Package, 50000, 50000);
        let mut hotel = VendorCost::new("Hotel ABC", VendorCategory::Hotel, BigDecimal::from(30000));
        hotel
            .record_payment(crate::revenue::VendorPayment::new(
                NaiveDate::from_ymd_opt(2025, 2, 6).unwrap(),
                BigDecimal::from(10000),
                crate::revenue::PaymentMode::Cash,
            ))
            .unwrap();
        goa.cost_price_details.push(hotel);
        goa.cost_price_details
            .push(VendorCost::new("IndiGo", VendorCategory::Flight, BigDecimal::from(12000)));

        let mut kerala = revenue(2025, 3, RevenueSource::Package, 20000, 20000);
        kerala.cost_price_details.push(VendorCost::new(
            " Hotel ABC ",
            VendorCategory::Hotel,
            BigDecimal::from(9000),
        ));
        kerala
            .cost_price_details
            .push(VendorCost::new("", VendorCategory::Other, BigDecimal::from(50)));

        let report = vendor_business(&[goa, kerala]);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].vendor_name, "Hotel ABC");
        assert_eq!(report[0].total_business, BigDecimal::from(39000));
        assert_eq!(report[0].transaction_count, 2);
        assert_eq!(report[0].total_paid, BigDecimal::from(10000));
        assert_eq!(report[0].total_pending, BigDecimal::from(29000));
        assert_eq!(report[0].average_transaction(), BigDecimal::from(19500));
        assert_eq!(report[1].vendor_name, "IndiGo");
        assert_eq!(report[1].transaction_count, 1);
    }
}
