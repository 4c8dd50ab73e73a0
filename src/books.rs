//! The back office as one service: every record operation keeps the
//! ledger and GST records in step with the stored data

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::activity::{ActivityAction, ActivityEntry, ActivityQuery};
use crate::config::BooksConfig;
use crate::ledger::{AccountBook, ChartGroup, Ledger};
use crate::reconciliation::{AmountField, Amounts, Reconciled, ReconciliationEngine};
use crate::records::{BankAccount, Expense, ExpenseDraft, ExpenseUpdate, Vendor};
use crate::reports::{
    self, DashboardSummary, MonthGroup, MonthlyData, PeriodReport, ReportPeriod, VendorBusiness,
    VendorPayable,
};
use crate::revenue::{Payment, RevenueDraft, RevenueEntry, RevenueUpdate, VendorPayment};
use crate::tax::{GstCalculator, GstError, GstSummary, TaxInvoice};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_non_negative_amounts;
use crate::utils::{MemoryStorage, StorageSnapshot};

/// User recorded on activity entries until [`Books::set_user`] is called
pub const SYSTEM_USER: &str = "system";

/// What [`Books::rebuild_accounting`] removed and reposted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    pub vouchers_removed: usize,
    pub gst_records_removed: usize,
    pub revenues_processed: usize,
    pub expenses_processed: usize,
    pub vendor_payments_processed: usize,
}

pub struct Books<S: LedgerStorage + RecordStorage + ActivityStorage> {
    ledger: Ledger<S>,
    storage: S,
    config: BooksConfig,
    engine: ReconciliationEngine,
    gst: GstCalculator,
    validator: Box<dyn RecordValidator>,
    user: String,
}

impl<S: LedgerStorage + RecordStorage + ActivityStorage + Clone> Books<S> {
    /// Books with the default record rules; call [`Books::init`] before posting
    pub fn new(storage: S, config: BooksConfig) -> Self {
        Self::with_validator(storage, config, Box::new(DefaultRecordValidator))
    }

    pub fn with_validator(
        storage: S,
        config: BooksConfig,
        validator: Box<dyn RecordValidator>,
    ) -> Self {
        Self {
            ledger: Ledger::new(storage.clone()),
            gst: config.gst_calculator(),
            storage,
            config,
            engine: ReconciliationEngine::new(),
            validator,
            user: SYSTEM_USER.to_string(),
        }
    }

    /// Validate the settings and seed the chart of accounts
    pub async fn open(storage: S, config: BooksConfig) -> BooksResult<Self> {
        config.validate()?;
        let mut books = Self::new(storage, config);
        books.init().await?;
        Ok(books)
    }

    pub async fn init(&mut self) -> BooksResult<()> {
        self.ledger.setup_chart_of_accounts().await?;
        Ok(())
    }

    /// Who later changes are logged against
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn config(&self) -> &BooksConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger<S> {
        &mut self.ledger
    }

    /// What the revenue form shows after one amount was edited
    pub fn preview_amounts(&self, amounts: &Amounts, edited: AmountField) -> Reconciled {
        self.engine.reconcile(amounts, edited)
    }

    // Revenue

    pub async fn list_revenues(&self) -> BooksResult<Vec<RevenueEntry>> {
        self.storage.list_revenues().await
    }

    pub async fn get_revenue(&self, revenue_id: &str) -> BooksResult<RevenueEntry> {
        self.storage
            .get_revenue(revenue_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Revenue, revenue_id))
    }

    pub async fn revenues_by_month(&self) -> BooksResult<Vec<MonthGroup>> {
        Ok(reports::group_by_month(&self.list_revenues().await?))
    }

    pub async fn available_months(&self) -> BooksResult<Vec<String>> {
        Ok(reports::available_months(&self.list_revenues().await?))
    }

    pub async fn create_revenue(&mut self, draft: RevenueDraft) -> BooksResult<RevenueEntry> {
        let amounts = Amounts::new(
            draft.sale_price.clone(),
            draft.received_amount.clone(),
            draft.pending_amount.clone(),
        );
        validate_non_negative_amounts(&amounts)
            .inspect_err(|e| warn!(error = %e, "rejected revenue"))?;

        let revenue = RevenueEntry::from_draft(draft, &self.engine)
            .inspect_err(|e| warn!(error = %e, "rejected revenue"))?;
        Self::validate_costs(&revenue)?;

        self.storage.save_revenue(&revenue).await?;
        info!(
            revenue_id = %revenue.id,
            amount = %revenue.sale_price,
            status = ?revenue.status,
            "created revenue"
        );

        self.post_revenue(&revenue).await?;
        self.sync_vendor_payments(&HashMap::new(), &revenue).await?;
        self.audit(
            "Revenue",
            ActivityAction::Create,
            format!("Added {} sale for {}", revenue.source.as_str(), revenue.client_name),
            json!({ "revenue_id": revenue.id, "sale_price": revenue.sale_price.to_string() }),
        )
        .await;
        Ok(revenue)
    }

    pub async fn update_revenue(
        &mut self,
        revenue_id: &str,
        update: RevenueUpdate,
    ) -> BooksResult<RevenueEntry> {
        let mut revenue = self.get_revenue(revenue_id).await?;
        let paid_before = vendor_payments(&revenue);

        revenue
            .apply_update(update, &self.engine)
            .inspect_err(|e| warn!(revenue_id, error = %e, "rejected revenue update"))?;
        validate_non_negative_amounts(&revenue.amounts())
            .inspect_err(|e| warn!(revenue_id, error = %e, "rejected revenue update"))?;
        Self::validate_costs(&revenue)?;

        self.storage.update_revenue(&revenue).await?;
        info!(revenue_id, amount = %revenue.sale_price, "updated revenue");

        self.repost_revenue(&revenue).await?;
        self.sync_vendor_payments(&paid_before, &revenue).await?;
        self.audit(
            "Revenue",
            ActivityAction::Update,
            format!("Updated sale for {}", revenue.client_name),
            json!({ "revenue_id": revenue_id }),
        )
        .await;
        Ok(revenue)
    }

    pub async fn delete_revenue(&mut self, revenue_id: &str) -> BooksResult<()> {
        let revenue = self.get_revenue(revenue_id).await?;

        self.ledger
            .remove_postings(&Reference::new(ReferenceKind::Revenue, revenue_id))
            .await?;
        for payment_id in vendor_payments(&revenue).keys() {
            self.remove_vendor_payment(payment_id).await?;
        }

        self.storage.delete_revenue(revenue_id).await?;
        info!(revenue_id, "deleted revenue");
        self.audit(
            "Revenue",
            ActivityAction::Delete,
            format!("Deleted sale for {}", revenue.client_name),
            json!({ "revenue_id": revenue_id }),
        )
        .await;
        Ok(())
    }

    /// Record money received from the client against a sale
    pub async fn record_revenue_payment(
        &mut self,
        revenue_id: &str,
        payment: Payment,
    ) -> BooksResult<RevenueEntry> {
        let mut revenue = self.get_revenue(revenue_id).await?;
        let amount = payment.amount.clone();
        revenue
            .record_payment(payment, &self.engine)
            .inspect_err(|e| warn!(revenue_id, error = %e, "rejected client payment"))?;

        self.storage.update_revenue(&revenue).await?;
        info!(
            revenue_id,
            amount = %amount,
            pending = %revenue.pending_amount,
            "recorded client payment"
        );

        self.repost_revenue(&revenue).await?;
        Ok(revenue)
    }

    /// Record a payment to the vendor of one cost row and post it
    pub async fn record_vendor_payment(
        &mut self,
        revenue_id: &str,
        cost_id: &str,
        payment: VendorPayment,
    ) -> BooksResult<RevenueEntry> {
        let mut revenue = self.get_revenue(revenue_id).await?;
        let paid_before = vendor_payments(&revenue);
        revenue
            .record_vendor_payment(cost_id, payment, &self.engine)
            .inspect_err(|e| warn!(revenue_id, cost_id, error = %e, "rejected vendor payment"))?;
        self.storage.update_revenue(&revenue).await?;

        self.sync_vendor_payments(&paid_before, &revenue).await?;
        Ok(revenue)
    }

    fn validate_costs(revenue: &RevenueEntry) -> BooksResult<()> {
        for row in &revenue.cost_price_details {
            row.validate()
                .inspect_err(|e| warn!(revenue_id = %revenue.id, error = %e, "rejected cost row"))?;
        }
        Ok(())
    }

    async fn post_revenue(&mut self, revenue: &RevenueEntry) -> BooksResult<()> {
        self.ledger
            .post_revenue(revenue, &self.gst, &self.config.company.invoice_prefix)
            .await?;
        Ok(())
    }

    async fn repost_revenue(&mut self, revenue: &RevenueEntry) -> BooksResult<()> {
        self.ledger
            .remove_postings(&Reference::new(ReferenceKind::Revenue, &revenue.id))
            .await?;
        self.post_revenue(revenue).await
    }

    /// Bring vendor payment vouchers in line with the sale's cost rows
    ///
    /// Payments missing from `before` are posted, payments whose amount,
    /// date or mode changed are reposted and payments that left the sale
    /// are removed.
    async fn sync_vendor_payments(
        &mut self,
        before: &HashMap<String, VendorPayment>,
        revenue: &RevenueEntry,
    ) -> BooksResult<()> {
        let after = vendor_payments(revenue);
        for payment_id in before.keys().filter(|id| !after.contains_key(*id)) {
            self.remove_vendor_payment(payment_id).await?;
        }

        for row in &revenue.cost_price_details {
            for payment in &row.vendor_payments {
                match before.get(&payment.id) {
                    Some(old) if old == payment => continue,
                    Some(_) => {
                        self.remove_vendor_payment(&payment.id).await?;
                    }
                    None => {}
                }
                self.ledger.post_vendor_payment(revenue, row, payment).await?;
            }
        }
        Ok(())
    }

    async fn remove_vendor_payment(&mut self, payment_id: &str) -> BooksResult<()> {
        self.ledger
            .remove_postings(&Reference::new(ReferenceKind::VendorPayment, payment_id))
            .await?;
        Ok(())
    }

    // Expenses

    pub async fn list_expenses(&self) -> BooksResult<Vec<Expense>> {
        self.storage.list_expenses().await
    }

    pub async fn get_expense(&self, expense_id: &str) -> BooksResult<Expense> {
        self.storage
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Expense, expense_id))
    }

    pub async fn create_expense(&mut self, draft: ExpenseDraft) -> BooksResult<Expense> {
        let expense = Expense::from_draft(draft);
        self.check_expense(&expense)
            .inspect_err(|e| warn!(error = %e, "rejected expense"))?;

        self.storage.save_expense(&expense).await?;
        info!(expense_id = %expense.id, amount = %expense.amount, "created expense");

        self.ledger.post_expense(&expense, &self.gst).await?;
        self.audit(
            "Expenses",
            ActivityAction::Create,
            format!("Added {} expense", expense.category),
            json!({ "expense_id": expense.id, "amount": expense.amount.to_string() }),
        )
        .await;
        Ok(expense)
    }

    pub async fn update_expense(
        &mut self,
        expense_id: &str,
        update: ExpenseUpdate,
    ) -> BooksResult<Expense> {
        let mut expense = self.get_expense(expense_id).await?;
        expense.apply_update(update);
        self.check_expense(&expense)
            .inspect_err(|e| warn!(expense_id, error = %e, "rejected expense update"))?;

        self.storage.update_expense(&expense).await?;
        info!(expense_id, amount = %expense.amount, "updated expense");

        self.ledger
            .remove_postings(&Reference::new(ReferenceKind::Expense, expense_id))
            .await?;
        self.ledger.post_expense(&expense, &self.gst).await?;
        self.audit(
            "Expenses",
            ActivityAction::Update,
            format!("Updated {} expense", expense.category),
            json!({ "expense_id": expense_id }),
        )
        .await;
        Ok(expense)
    }

    pub async fn delete_expense(&mut self, expense_id: &str) -> BooksResult<()> {
        let expense = self.get_expense(expense_id).await?;
        self.ledger
            .remove_postings(&Reference::new(ReferenceKind::Expense, expense_id))
            .await?;
        self.storage.delete_expense(expense_id).await?;
        info!(expense_id, "deleted expense");
        self.audit(
            "Expenses",
            ActivityAction::Delete,
            format!("Deleted {} expense", expense.category),
            json!({ "expense_id": expense_id }),
        )
        .await;
        Ok(())
    }

    /// Record rules, then the GST split, before anything is stored
    fn check_expense(&self, expense: &Expense) -> BooksResult<()> {
        self.validator.validate_expense(expense)?;
        if let Some(rate) = expense.input_gst_rate() {
            self.gst.split_purchase(expense.amount.clone(), rate.clone())?;
        }
        Ok(())
    }

    // Vendors

    pub async fn list_vendors(&self) -> BooksResult<Vec<Vendor>> {
        self.storage.list_vendors().await
    }

    pub async fn get_vendor(&self, vendor_id: &str) -> BooksResult<Vendor> {
        self.storage
            .get_vendor(vendor_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Vendor, vendor_id))
    }

    pub async fn create_vendor(&mut self, vendor: Vendor) -> BooksResult<Vendor> {
        self.validator.validate_vendor(&vendor)?;
        self.storage.save_vendor(&vendor).await?;
        info!(vendor_id = %vendor.id, name = %vendor.vendor_name, "created vendor");
        self.audit(
            "Vendors",
            ActivityAction::Create,
            format!("Added vendor {}", vendor.vendor_name),
            json!({ "vendor_id": vendor.id }),
        )
        .await;
        Ok(vendor)
    }

    pub async fn update_vendor(&mut self, vendor: Vendor) -> BooksResult<Vendor> {
        self.get_vendor(&vendor.id).await?;
        self.validator.validate_vendor(&vendor)?;
        self.storage.update_vendor(&vendor).await?;
        info!(vendor_id = %vendor.id, "updated vendor");
        self.audit(
            "Vendors",
            ActivityAction::Update,
            format!("Updated vendor {}", vendor.vendor_name),
            json!({ "vendor_id": vendor.id }),
        )
        .await;
        Ok(vendor)
    }

    pub async fn delete_vendor(&mut self, vendor_id: &str) -> BooksResult<()> {
        let vendor = self.get_vendor(vendor_id).await?;
        self.storage.delete_vendor(vendor_id).await?;
        info!(vendor_id, "deleted vendor");
        self.audit(
            "Vendors",
            ActivityAction::Delete,
            format!("Deleted vendor {}", vendor.vendor_name),
            json!({ "vendor_id": vendor_id }),
        )
        .await;
        Ok(())
    }

    // Bank accounts

    pub async fn list_bank_accounts(&self) -> BooksResult<Vec<BankAccount>> {
        self.storage.list_bank_accounts().await
    }

    pub async fn get_bank_account(&self, account_id: &str) -> BooksResult<BankAccount> {
        self.storage
            .get_bank_account(account_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::BankAccount, account_id))
    }

    pub async fn create_bank_account(&mut self, account: BankAccount) -> BooksResult<BankAccount> {
        self.validator.validate_bank_account(&account)?;
        self.storage.save_bank_account(&account).await?;
        info!(
            account_id = %account.id,
            bank = %account.bank_name,
            number = %account.masked_number(),
            "created bank account"
        );
        self.audit(
            "Bank Accounts",
            ActivityAction::Create,
            format!("Added {} account {}", account.bank_name, account.masked_number()),
            json!({ "account_id": account.id }),
        )
        .await;
        Ok(account)
    }

    pub async fn update_bank_account(&mut self, account: BankAccount) -> BooksResult<BankAccount> {
        self.get_bank_account(&account.id).await?;
        self.validator.validate_bank_account(&account)?;
        self.storage.update_bank_account(&account).await?;
        info!(account_id = %account.id, "updated bank account");
        self.audit(
            "Bank Accounts",
            ActivityAction::Update,
            format!("Updated {} account {}", account.bank_name, account.masked_number()),
            json!({ "account_id": account.id }),
        )
        .await;
        Ok(account)
    }

    pub async fn delete_bank_account(&mut self, account_id: &str) -> BooksResult<()> {
        let account = self.get_bank_account(account_id).await?;
        self.storage.delete_bank_account(account_id).await?;
        info!(account_id, "deleted bank account");
        self.audit(
            "Bank Accounts",
            ActivityAction::Delete,
            format!("Deleted {} account {}", account.bank_name, account.masked_number()),
            json!({ "account_id": account_id }),
        )
        .await;
        Ok(())
    }

    // Accounting

    pub async fn trial_balance(&self, as_of_date: Option<NaiveDate>) -> BooksResult<TrialBalance> {
        self.ledger.trial_balance(as_of_date).await
    }

    /// Output and input GST, restricted to `[start, end]` when both are given
    pub async fn gst_summary(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<GstSummary> {
        let records = self.ledger.gst_records(None, None).await?;
        Ok(GstSummary::from_records(records, start_date, end_date))
    }

    /// Tax invoice for a received sale
    pub async fn gst_invoice(&self, revenue_id: &str) -> BooksResult<TaxInvoice> {
        let revenue = self.get_revenue(revenue_id).await?;
        TaxInvoice::ensure_invoiceable(&revenue)?;

        let record = self
            .ledger
            .output_gst_record(revenue_id)
            .await?
            .ok_or_else(|| GstError::NotInvoiceable(revenue_id.to_string()))?;
        Ok(TaxInvoice::issue(
            &self.config.company.name,
            &revenue,
            &record,
        )?)
    }

    pub async fn cash_book(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<AccountBook> {
        self.ledger.cash_book(start_date, end_date).await
    }

    pub async fn bank_book(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<AccountBook> {
        self.ledger.bank_book(start_date, end_date).await
    }

    pub async fn chart_of_accounts(&self) -> BooksResult<Vec<ChartGroup>> {
        self.ledger.chart_of_accounts().await
    }

    /// Throw away every voucher and GST record and post them again from
    /// the stored revenues, vendor payments and expenses
    ///
    /// Vouchers entered by hand through the ledger are not tied to a record
    /// and do not come back.
    pub async fn rebuild_accounting(&mut self) -> BooksResult<RebuildSummary> {
        let cleared = self.ledger.clear_postings().await?;
        self.init().await?;

        let revenues = self.storage.list_revenues().await?;
        let mut vendor_payments_processed = 0;
        for revenue in revenues.iter().rev() {
            self.post_revenue(revenue).await?;
            for row in &revenue.cost_price_details {
                for payment in &row.vendor_payments {
                    self.ledger.post_vendor_payment(revenue, row, payment).await?;
                    vendor_payments_processed += 1;
                }
            }
        }

        let expenses = self.storage.list_expenses().await?;
        for expense in expenses.iter().rev() {
            self.ledger.post_expense(expense, &self.gst).await?;
        }

        let summary = RebuildSummary {
            vouchers_removed: cleared.vouchers,
            gst_records_removed: cleared.gst_records,
            revenues_processed: revenues.len(),
            expenses_processed: expenses.len(),
            vendor_payments_processed,
        };
        info!(
            revenues = summary.revenues_processed,
            expenses = summary.expenses_processed,
            vendor_payments = summary.vendor_payments_processed,
            "rebuilt accounting"
        );
        self.audit(
            "Accounting",
            ActivityAction::Rebuild,
            format!(
                "Rebuilt accounting from {} revenues and {} expenses",
                summary.revenues_processed, summary.expenses_processed
            ),
            json!(summary),
        )
        .await;
        Ok(summary)
    }

    // Activity log

    /// Append an entry for the current user
    pub async fn log_activity(
        &mut self,
        module: &str,
        action: ActivityAction,
        description: impl Into<String>,
        details: serde_json::Value,
    ) -> BooksResult<ActivityEntry> {
        let entry = ActivityEntry::new(module, action, self.user.clone(), description)
            .with_details(details);
        self.storage.save_activity(&entry).await?;
        Ok(entry)
    }

    /// Newest entries first
    pub async fn activity_logs(&self, query: &ActivityQuery) -> BooksResult<Vec<ActivityEntry>> {
        self.storage.list_activities(query).await
    }

    // a failed log write never undoes the change it describes
    async fn audit(
        &mut self,
        module: &str,
        action: ActivityAction,
        description: String,
        details: serde_json::Value,
    ) {
        if let Err(e) = self.log_activity(module, action, description, details).await {
            warn!(module, %action, error = %e, "could not write activity log");
        }
    }

    // Reports

    pub async fn dashboard_summary(&self) -> BooksResult<DashboardSummary> {
        let revenues = self.storage.list_revenues().await?;
        let expenses = self.storage.list_expenses().await?;
        Ok(DashboardSummary::compute(&revenues, &expenses))
    }

    pub async fn monthly_overview(&self) -> BooksResult<Vec<MonthlyData>> {
        let revenues = self.storage.list_revenues().await?;
        let expenses = self.storage.list_expenses().await?;
        Ok(reports::monthly_overview(
            &revenues,
            &expenses,
            self.config.monthly_overview_months,
        ))
    }

    pub async fn period_report(&self, period: ReportPeriod) -> BooksResult<PeriodReport> {
        let revenues = self.storage.list_revenues().await?;
        let expenses = self.storage.list_expenses().await?;
        Ok(PeriodReport::compute(period, &revenues, &expenses))
    }

    pub async fn pending_payments(&self) -> BooksResult<Vec<RevenueEntry>> {
        Ok(reports::pending_payments(
            &self.storage.list_revenues().await?,
        ))
    }

    pub async fn vendor_payables(&self) -> BooksResult<Vec<VendorPayable>> {
        Ok(reports::vendor_payables(
            &self.storage.list_revenues().await?,
        ))
    }

    /// Business placed with each vendor, biggest first
    pub async fn vendor_business(&self) -> BooksResult<Vec<VendorBusiness>> {
        Ok(reports::vendor_business(
            &self.storage.list_revenues().await?,
        ))
    }
}

impl Books<MemoryStorage> {
    /// JSON backup of every table
    pub async fn export_backup(&mut self) -> BooksResult<String> {
        let backup = self.storage.export_json()?;
        info!(bytes = backup.len(), "exported backup");
        self.audit(
            "Backup",
            ActivityAction::Backup,
            "Exported backup".to_string(),
            json!({ "bytes": backup.len() }),
        )
        .await;
        Ok(backup)
    }

    /// Replace every table with a JSON backup
    pub async fn restore_backup(&mut self, backup: &str) -> BooksResult<StorageSnapshot> {
        let snapshot = self
            .storage
            .import_json(backup)
            .inspect_err(|e| warn!(error = %e, "rejected backup"))?;
        info!(records = snapshot.record_count(), "restored backup");
        self.audit(
            "Backup",
            ActivityAction::Restore,
            "Restored backup".to_string(),
            json!({
                "records": snapshot.record_count(),
                "backup_timestamp": snapshot.timestamp.to_string(),
            }),
        )
        .await;
        Ok(snapshot)
    }
}

fn vendor_payments(revenue: &RevenueEntry) -> HashMap<String, VendorPayment> {
    revenue
        .cost_price_details
        .iter()
        .flat_map(|row| &row.vendor_payments)
        .map(|payment| (payment.id.clone(), payment.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BANK_ACCOUNT, CASH_ACCOUNT, CGST_PAYABLE, VENDOR_COSTS};
    use crate::reconciliation::ReconcileError;
    use crate::revenue::{
        PaymentMode, RevenueSource, RevenueStatus, VendorCategory, VendorCost, VendorPaymentStatus,
    };
    use crate::utils::MemoryStorage;
    use bigdecimal::BigDecimal;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    async fn books() -> Books<MemoryStorage> {
        Books::open(MemoryStorage::new(), BooksConfig::default())
            .await
            .unwrap()
    }

    async fn balance(books: &Books<MemoryStorage>, name: &str) -> BigDecimal {
        let account = books.ledger().find_account(name).await.unwrap().unwrap();
        account.balance
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected() {
        let mut books = books().await;
        let draft = RevenueDraft::new(date(1), "Asha", RevenueSource::Visa, BigDecimal::from(1000))
            .received(BigDecimal::from(-100));

        let err = books.create_revenue(draft).await.unwrap_err();
        assert!(matches!(
            err,
            BooksError::Reconciliation(ReconcileError::Negative { .. })
        ));
        assert!(books.list_revenues().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_amounts_rejected() {
        let mut books = books().await;
        let mut draft =
            RevenueDraft::new(date(1), "Asha", RevenueSource::Visa, BigDecimal::from(1000));
        draft.received_amount = BigDecimal::from(600);
        draft.pending_amount = BigDecimal::from(300);

        let err = books.create_revenue(draft).await.unwrap_err();
        assert!(matches!(err, BooksError::Reconciliation(_)));
    }

    #[tokio::test]
    async fn test_payment_reposts_revenue() {
        let mut books = books().await;
        let revenue = books
            .create_revenue(
                RevenueDraft::new(date(1), "Asha", RevenueSource::Visa, BigDecimal::from(1180))
                    .received(BigDecimal::from(590))
                    .payment_mode(PaymentMode::Upi),
            )
            .await
            .unwrap();
        assert_eq!(balance(&books, BANK_ACCOUNT).await, BigDecimal::from(590));

        let revenue = books
            .record_revenue_payment(
                &revenue.id,
                Payment::new(date(5), BigDecimal::from(590), PaymentMode::Upi),
            )
            .await
            .unwrap();
        assert_eq!(revenue.status, RevenueStatus::Completed);
        assert_eq!(balance(&books, BANK_ACCOUNT).await, BigDecimal::from(1180));
        assert_eq!(balance(&books, CGST_PAYABLE).await, BigDecimal::from(90));

        let overpaid = books
            .record_revenue_payment(
                &revenue.id,
                Payment::new(date(6), BigDecimal::from(10), PaymentMode::Cash),
            )
            .await;
        assert!(matches!(overpaid, Err(BooksError::Overpayment { .. })));

        assert!(books.trial_balance(None).await.unwrap().is_balanced);
    }

    #[tokio::test]
    async fn test_vendor_payment_posts_and_is_removed_with_revenue() {
        let mut books = books().await;
        let revenue = books
            .create_revenue(
                RevenueDraft::new(date(1), "Ravi", RevenueSource::Ticket, BigDecimal::from(5000))
                    .received(BigDecimal::from(5000))
                    .cost(VendorCost::new("IndiGo", VendorCategory::Flight, BigDecimal::from(4200))),
            )
            .await
            .unwrap();
        let cost_id = revenue.cost_price_details[0].id.clone();

        books
            .record_vendor_payment(
                &revenue.id,
                &cost_id,
                VendorPayment::new(date(2), BigDecimal::from(4200), PaymentMode::Cash),
            )
            .await
            .unwrap();
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(800));
        assert!(books.vendor_payables().await.unwrap().is_empty());

        books.delete_revenue(&revenue.id).await.unwrap();
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(0));
        assert!(books.ledger().get_vouchers(None, None).await.unwrap().is_empty());
        assert!(books.gst_summary(None, None).await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_vendor_payments_in_update_body_are_posted() {
        let mut books = books().await;
        let revenue = books
            .create_revenue(
                RevenueDraft::new(date(1), "Ravi", RevenueSource::Ticket, BigDecimal::from(5000))
                    .received(BigDecimal::from(5000))
                    .cost(VendorCost::new("IndiGo", VendorCategory::Flight, BigDecimal::from(4200))),
            )
            .await
            .unwrap();

        // the form sends the whole cost row back with the payment added
        let mut row = revenue.cost_price_details[0].clone();
        row.vendor_payments.push(VendorPayment::new(
            date(2),
            BigDecimal::from(4200),
            PaymentMode::Cash,
        ));
        let updated = books
            .update_revenue(
                &revenue.id,
                RevenueUpdate {
                    cost_price_details: Some(vec![row.clone()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            updated.cost_price_details[0].payment_status,
            VendorPaymentStatus::Done
        );
        assert!(books.vendor_payables().await.unwrap().is_empty());
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(800));
        assert_eq!(balance(&books, VENDOR_COSTS).await, BigDecimal::from(4200));

        // same payment id with a corrected amount replaces the voucher
        row.vendor_payments[0].amount = BigDecimal::from(4000);
        let payment_id = row.vendor_payments[0].id.clone();
        books
            .update_revenue(
                &revenue.id,
                RevenueUpdate {
                    cost_price_details: Some(vec![row.clone()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(1000));
        assert_eq!(balance(&books, VENDOR_COSTS).await, BigDecimal::from(4000));
        let vouchers = books
            .ledger()
            .get_vouchers(None, None)
            .await
            .unwrap()
            .into_iter()
            .filter(|v| v.reference.as_ref().is_some_and(|r| r.id == payment_id))
            .count();
        assert_eq!(vouchers, 1);

        // an unrelated edit leaves the payment voucher alone
        books
            .update_revenue(
                &revenue.id,
                RevenueUpdate {
                    notes: Some("window seat".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(1000));

        row.vendor_payments.clear();
        books
            .update_revenue(
                &revenue.id,
                RevenueUpdate {
                    cost_price_details: Some(vec![row]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(5000));
        assert_eq!(balance(&books, VENDOR_COSTS).await, BigDecimal::from(0));
        assert!(books.trial_balance(None).await.unwrap().is_balanced);
    }

    #[tokio::test]
    async fn test_vendor_payments_in_create_body_are_posted() {
        let mut books = books().await;
        let mut hotel = VendorCost::new("Hotel ABC", VendorCategory::Hotel, BigDecimal::from(3000));
        hotel.vendor_payments.push(VendorPayment::new(
            date(1),
            BigDecimal::from(3000),
            PaymentMode::Cash,
        ));

        let revenue = books
            .create_revenue(
                RevenueDraft::new(date(1), "Meera", RevenueSource::Package, BigDecimal::from(5000))
                    .received(BigDecimal::from(5000))
                    .cost(hotel),
            )
            .await
            .unwrap();
        assert_eq!(
            revenue.cost_price_details[0].payment_status,
            VendorPaymentStatus::Done
        );
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(2000));
        assert_eq!(balance(&books, VENDOR_COSTS).await, BigDecimal::from(3000));
    }

    #[tokio::test]
    async fn test_bad_expense_rate_leaves_nothing_behind() {
        let mut books = books().await;
        let mut draft = ExpenseDraft::new(date(3), "Office Supplies", BigDecimal::from(1000));
        draft.gst_rate = Some(BigDecimal::from(150));

        let err = books.create_expense(draft).await.unwrap_err();
        assert!(matches!(err, BooksError::Validation(_)));
        assert!(books.list_expenses().await.unwrap().is_empty());
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(0));
        assert!(books.ledger().get_vouchers(None, None).await.unwrap().is_empty());

        let expense = books
            .create_expense(ExpenseDraft::new(date(3), "Utilities", BigDecimal::from(1180)))
            .await
            .unwrap();
        let err = books
            .update_expense(
                &expense.id,
                ExpenseUpdate {
                    gst_rate: Some(BigDecimal::from(-5)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BooksError::Validation(_)));
        assert_eq!(books.get_expense(&expense.id).await.unwrap().gst_rate, None);
        assert_eq!(balance(&books, "Utilities").await, BigDecimal::from(1180));
    }

    #[tokio::test]
    async fn test_rebuild_reposts_from_records() {
        let mut books = books().await;
        let mut hotel = VendorCost::new("Hotel ABC", VendorCategory::Hotel, BigDecimal::from(3000));
        hotel.vendor_payments.push(VendorPayment::new(
            date(2),
            BigDecimal::from(1000),
            PaymentMode::Cash,
        ));
        books
            .create_revenue(
                RevenueDraft::new(date(1), "Asha", RevenueSource::Visa, BigDecimal::from(5900))
                    .received(BigDecimal::from(5900))
                    .cost(hotel),
            )
            .await
            .unwrap();
        let mut bill = ExpenseDraft::new(date(3), "Utilities", BigDecimal::from(1180));
        bill.gst_rate = Some(BigDecimal::from(18));
        books.create_expense(bill).await.unwrap();

        let cash_before = balance(&books, CASH_ACCOUNT).await;
        let gst_before = books.gst_summary(None, None).await.unwrap();

        // a stray voucher with no record behind it
        let cash = books.ledger().find_account(CASH_ACCOUNT).await.unwrap().unwrap();
        let misc = books.ledger().find_account("Miscellaneous").await.unwrap().unwrap();
        let stray = crate::ledger::VoucherBuilder::new(date(4), "Petty cash")
            .debit(misc.id, BigDecimal::from(50), None)
            .credit(cash.id, BigDecimal::from(50), None)
            .build()
            .unwrap();
        books.ledger_mut().record_voucher(stray).await.unwrap();

        let summary = books.rebuild_accounting().await.unwrap();
        assert_eq!(summary.vouchers_removed, 4);
        assert_eq!(summary.gst_records_removed, 2);
        assert_eq!(summary.revenues_processed, 1);
        assert_eq!(summary.expenses_processed, 1);
        assert_eq!(summary.vendor_payments_processed, 1);

        assert_eq!(balance(&books, CASH_ACCOUNT).await, cash_before);
        assert_eq!(balance(&books, "Miscellaneous").await, BigDecimal::from(0));
        let gst_after = books.gst_summary(None, None).await.unwrap();
        assert_eq!(gst_after.output_gst, gst_before.output_gst);
        assert_eq!(gst_after.input_gst, gst_before.input_gst);
        assert_eq!(gst_after.records.len(), 2);
        assert!(books.trial_balance(None).await.unwrap().is_balanced);
    }

    #[tokio::test]
    async fn test_changes_are_logged_for_the_user() {
        let mut books = books().await;
        books.set_user("priya");
        let expense = books
            .create_expense(ExpenseDraft::new(date(3), "Marketing", BigDecimal::from(900)))
            .await
            .unwrap();
        books.delete_expense(&expense.id).await.unwrap();
        books
            .create_revenue(RevenueDraft::new(
                date(4),
                "Asha",
                RevenueSource::Visa,
                BigDecimal::from(1180),
            ))
            .await
            .unwrap();

        let all = books.activity_logs(&ActivityQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|e| e.user == "priya"));

        let expenses = books
            .activity_logs(&ActivityQuery::default().module("Expenses"))
            .await
            .unwrap();
        let actions: Vec<ActivityAction> = expenses.iter().map(|e| e.action).collect();
        assert_eq!(expenses.len(), 2);
        assert!(actions.contains(&ActivityAction::Create));
        assert!(actions.contains(&ActivityAction::Delete));
        assert_eq!(expenses[0].details["expense_id"], expense.id.as_str());
    }

    #[tokio::test]
    async fn test_backup_restores_books() {
        let mut books = books().await;
        let revenue = books
            .create_revenue(
                RevenueDraft::new(date(1), "Asha", RevenueSource::Visa, BigDecimal::from(2360))
                    .received(BigDecimal::from(2360)),
            )
            .await
            .unwrap();
        let backup = books.export_backup().await.unwrap();

        books.delete_revenue(&revenue.id).await.unwrap();
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(0));

        let snapshot = books.restore_backup(&backup).await.unwrap();
        assert_eq!(snapshot.revenues.len(), 1);
        assert_eq!(books.get_revenue(&revenue.id).await.unwrap(), revenue);
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(2360));
        assert!(books.gst_invoice(&revenue.id).await.is_ok());

        let restores = books
            .activity_logs(&ActivityQuery::default().module("Backup"))
            .await
            .unwrap();
        assert_eq!(restores[0].action, ActivityAction::Restore);
    }

    #[tokio::test]
    async fn test_invoice_requires_received_sale() {
        let mut books = books().await;
        let pending = books
            .create_revenue(RevenueDraft::new(
                date(1),
                "Meera",
                RevenueSource::Visa,
                BigDecimal::from(2360),
            ))
            .await
            .unwrap();
        let err = books.gst_invoice(&pending.id).await.unwrap_err();
        assert!(matches!(err, BooksError::Gst(GstError::NotInvoiceable(_))));

        let paid = books
            .update_revenue(
                &pending.id,
                RevenueUpdate {
                    status: Some(RevenueStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let invoice = books.gst_invoice(&paid.id).await.unwrap();
        assert_eq!(invoice.taxable_amount, BigDecimal::from(2000));
        assert_eq!(invoice.total_amount, BigDecimal::from(2360));
        assert!(invoice.invoice_number.starts_with("INV-"));
    }

    #[tokio::test]
    async fn test_expense_update_reposts() {
        let mut books = books().await;
        let expense = books
            .create_expense(ExpenseDraft::new(date(3), "Office Rent", BigDecimal::from(20000)))
            .await
            .unwrap();

        books
            .update_expense(
                &expense.id,
                ExpenseUpdate {
                    amount: Some(BigDecimal::from(25000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(balance(&books, "Office Rent").await, BigDecimal::from(25000));
        assert_eq!(balance(&books, CASH_ACCOUNT).await, BigDecimal::from(-25000));

        let err = books
            .create_expense(ExpenseDraft::new(date(3), "", BigDecimal::from(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, BooksError::Validation(_)));
    }
}
