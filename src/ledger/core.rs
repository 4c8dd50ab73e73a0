//! Main ledger orchestrator that coordinates accounts, vouchers and GST records

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::ledger::account::*;
use crate::ledger::posting::*;
use crate::records::Expense;
use crate::revenue::{RevenueEntry, VendorCost, VendorPayment};
use crate::tax::{invoice_number, GstCalculator, GstRecord, GstRecordKind};
use crate::traits::*;
use crate::types::*;

/// One line of a cash or bank book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLine {
    pub date: NaiveDate,
    pub voucher_id: String,
    pub narration: String,
    pub reference: Option<Reference>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    /// Running balance after this line
    pub balance: BigDecimal,
}

/// Chronological movements on one account with a running balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBook {
    pub account_name: String,
    pub account_code: String,
    pub opening_balance: BigDecimal,
    pub lines: Vec<BookLine>,
    pub closing_balance: BigDecimal,
}

/// Accounts of one type, as shown on the chart of accounts page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartGroup {
    pub account_type: AccountType,
    pub accounts: Vec<Account>,
    pub total_balance: BigDecimal,
}

/// What [`Ledger::clear_postings`] removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedPostings {
    pub vouchers: usize,
    pub gst_records: usize,
    /// Accounts whose balance was not already zero
    pub accounts_reset: usize,
}

/// Main ledger system that orchestrates all accounting operations
pub struct Ledger<S: LedgerStorage> {
    account_manager: AccountManager<S>,
    voucher_manager: VoucherManager<S>,
    storage: S,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            account_manager: AccountManager::new(storage.clone()),
            voucher_manager: VoucherManager::new(storage.clone()),
            storage,
        }
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        account_validator: Box<dyn AccountValidator>,
        voucher_validator: Box<dyn VoucherValidator>,
    ) -> Self {
        Self {
            account_manager: AccountManager::with_validator(storage.clone(), account_validator),
            voucher_manager: VoucherManager::with_validator(storage.clone(), voucher_validator),
            storage,
        }
    }

    /// Seed the agency's chart of accounts
    pub async fn setup_chart_of_accounts(&mut self) -> BooksResult<Vec<Account>> {
        let accounts = self.account_manager.seed_standard_chart().await?;
        debug!(accounts = accounts.len(), "chart of accounts ready");
        Ok(accounts)
    }

    // Account operations
    pub async fn create_account(
        &mut self,
        name: &str,
        account_type: AccountType,
    ) -> BooksResult<Account> {
        self.account_manager.create_account(name, account_type).await
    }

    pub async fn get_account(&self, account_id: &str) -> BooksResult<Option<Account>> {
        self.account_manager.get_account(account_id).await
    }

    pub async fn find_account(&self, name: &str) -> BooksResult<Option<Account>> {
        self.account_manager.find_by_name(name).await
    }

    pub async fn list_accounts(&self) -> BooksResult<Vec<Account>> {
        self.account_manager.list_accounts().await
    }

    /// Get account balance as of a specific date
    pub async fn get_account_balance(
        &self,
        account_id: &str,
        as_of_date: Option<NaiveDate>,
    ) -> BooksResult<BigDecimal> {
        self.account_manager
            .get_balance(account_id, as_of_date)
            .await
    }

    // Voucher operations
    pub async fn record_voucher(&mut self, voucher: Voucher) -> BooksResult<Voucher> {
        self.voucher_manager.record_voucher(voucher).await
    }

    pub async fn get_vouchers(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>> {
        self.voucher_manager.get_vouchers(start_date, end_date).await
    }

    pub async fn delete_voucher(&mut self, voucher_id: &str) -> BooksResult<()> {
        self.voucher_manager.delete_voucher(voucher_id).await
    }

    /// Post the received part of a sale and book its output GST
    ///
    /// Nothing is posted while nothing has been received.
    pub async fn post_revenue(
        &mut self,
        revenue: &RevenueEntry,
        gst: &GstCalculator,
        invoice_prefix: &str,
    ) -> BooksResult<Option<GstRecord>> {
        if revenue.received_amount <= BigDecimal::from(0) {
            return Ok(None);
        }

        let split = gst.split_receipt(revenue.received_amount.clone(), revenue.source)?;

        let cash = self
            .account_manager
            .ensure_account(cash_or_bank(revenue.payment_mode.is_cash()), AccountType::Asset)
            .await?;
        let income = self
            .account_manager
            .ensure_account(&revenue.source.revenue_account(), AccountType::Income)
            .await?;
        let cgst = self
            .account_manager
            .ensure_account(CGST_PAYABLE, AccountType::Liability)
            .await?;
        let sgst = self
            .account_manager
            .ensure_account(SGST_PAYABLE, AccountType::Liability)
            .await?;
        let igst = self
            .account_manager
            .ensure_account(IGST_PAYABLE, AccountType::Liability)
            .await?;

        let voucher = patterns::client_receipt(ReceiptParams {
            date: revenue.date,
            narration: format!(
                "Revenue from {} - {}",
                revenue.source.as_str(),
                revenue.client_name
            ),
            reference: Reference::new(ReferenceKind::Revenue, &revenue.id),
            cash_or_bank_account_id: cash.id,
            revenue_account_id: income.id,
            cgst_account_id: cgst.id,
            sgst_account_id: sgst.id,
            igst_account_id: igst.id,
            split: split.clone(),
        })?;
        self.voucher_manager.record_voucher(voucher).await?;

        let record = GstRecord::from_calculation(
            GstRecordKind::Output,
            revenue.date,
            invoice_number(invoice_prefix, &revenue.id),
            revenue.client_name.clone(),
            revenue.source.as_str().to_string(),
            &split,
            revenue.id.clone(),
        );
        self.storage.save_gst_record(&record).await?;

        info!(
            revenue_id = %revenue.id,
            amount = %revenue.received_amount,
            gst = %record.total_gst,
            "posted revenue"
        );
        Ok(Some(record))
    }

    /// Post an expense and, when the bill carries GST, book the input credit
    pub async fn post_expense(
        &mut self,
        expense: &Expense,
        gst: &GstCalculator,
    ) -> BooksResult<Option<GstRecord>> {
        // an unusable rate must fail before anything is posted
        let split = expense
            .input_gst_rate()
            .map(|rate| gst.split_purchase(expense.amount.clone(), rate.clone()))
            .transpose()?;

        let category = self
            .account_manager
            .ensure_account(&expense.category, AccountType::Expense)
            .await?;
        let cash = self
            .account_manager
            .ensure_account(cash_or_bank(expense.payment_mode.is_cash()), AccountType::Asset)
            .await?;

        let narration = if expense.description.trim().is_empty() {
            format!("Expense for {}", expense.category)
        } else {
            expense.description.clone()
        };

        let voucher = patterns::payment(PaymentParams {
            date: expense.date,
            narration,
            reference: Reference::new(ReferenceKind::Expense, &expense.id),
            expense_account_id: category.id,
            cash_or_bank_account_id: cash.id,
            amount: expense.amount.clone(),
        })?;
        self.voucher_manager.record_voucher(voucher).await?;
        info!(expense_id = %expense.id, amount = %expense.amount, "posted expense");

        let Some(split) = split else {
            return Ok(None);
        };

        let mut record = GstRecord::from_calculation(
            GstRecordKind::Input,
            expense.date,
            expense.invoice_number.clone().unwrap_or_default(),
            expense.category.clone(),
            expense.category.clone(),
            &split,
            expense.id.clone(),
        );
        record.gstin = expense.supplier_gstin.clone().unwrap_or_default();
        self.storage.save_gst_record(&record).await?;

        Ok(Some(record))
    }

    /// Post a payment made to a vendor for one cost row of a sale
    pub async fn post_vendor_payment(
        &mut self,
        revenue: &RevenueEntry,
        cost: &VendorCost,
        payment: &VendorPayment,
    ) -> BooksResult<Voucher> {
        let vendor_costs = self
            .account_manager
            .ensure_account(VENDOR_COSTS, AccountType::Expense)
            .await?;
        let cash = self
            .account_manager
            .ensure_account(cash_or_bank(payment.payment_mode.is_cash()), AccountType::Asset)
            .await?;

        let voucher = patterns::payment(PaymentParams {
            date: payment.date,
            narration: format!(
                "Paid {} for {} ({})",
                cost.vendor_name, revenue.client_name, revenue.id
            ),
            reference: Reference::new(ReferenceKind::VendorPayment, &payment.id),
            expense_account_id: vendor_costs.id,
            cash_or_bank_account_id: cash.id,
            amount: payment.amount.clone(),
        })?;

        let voucher = self.voucher_manager.record_voucher(voucher).await?;
        info!(
            revenue_id = %revenue.id,
            vendor = %cost.vendor_name,
            amount = %payment.amount,
            "posted vendor payment"
        );
        Ok(voucher)
    }

    /// Undo everything posted for a record: vouchers and GST records
    pub async fn remove_postings(&mut self, reference: &Reference) -> BooksResult<usize> {
        let vouchers = self.voucher_manager.reverse_reference(reference).await?;
        let records = self
            .storage
            .delete_gst_records_for_reference(&reference.id)
            .await?;
        if vouchers + records > 0 {
            debug!(
                reference_id = %reference.id,
                vouchers,
                gst_records = records,
                "removed postings"
            );
        }
        Ok(vouchers)
    }

    /// Drop every voucher and GST record and zero all balances
    ///
    /// Accounts themselves stay, so codes do not change on a rebuild.
    pub async fn clear_postings(&mut self) -> BooksResult<ClearedPostings> {
        let vouchers = self.voucher_manager.get_vouchers(None, None).await?;
        for voucher in &vouchers {
            self.storage.delete_voucher(&voucher.id).await?;
        }

        let mut gst_records = 0;
        let references: HashSet<String> = self
            .storage
            .list_gst_records(None, None)
            .await?
            .into_iter()
            .map(|r| r.reference_id)
            .collect();
        for reference_id in references {
            gst_records += self
                .storage
                .delete_gst_records_for_reference(&reference_id)
                .await?;
        }

        let accounts_reset = self.account_manager.reset_balances().await?;
        let cleared = ClearedPostings {
            vouchers: vouchers.len(),
            gst_records,
            accounts_reset,
        };
        info!(
            vouchers = cleared.vouchers,
            gst_records = cleared.gst_records,
            accounts_reset = cleared.accounts_reset,
            "cleared postings"
        );
        Ok(cleared)
    }

    pub async fn gst_records(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<GstRecord>> {
        self.storage.list_gst_records(start_date, end_date).await
    }

    /// Output GST record booked for a revenue
    pub async fn output_gst_record(&self, revenue_id: &str) -> BooksResult<Option<GstRecord>> {
        Ok(self
            .storage
            .gst_records_for_reference(revenue_id)
            .await?
            .into_iter()
            .find(|r| r.kind == GstRecordKind::Output))
    }

    /// Trial balance from running balances, or as of a date
    ///
    /// Debit-normal accounts go in the debit column and credit-normal ones
    /// in the credit column; a balance that has gone negative moves to the
    /// other column.
    pub async fn trial_balance(&self, as_of_date: Option<NaiveDate>) -> BooksResult<TrialBalance> {
        let accounts = self.account_manager.list_accounts().await?;
        let mut rows = Vec::with_capacity(accounts.len());
        let mut total_debits = BigDecimal::from(0);
        let mut total_credits = BigDecimal::from(0);

        for account in accounts {
            let balance = match as_of_date {
                Some(_) => self.get_account_balance(&account.id, as_of_date).await?,
                None => account.balance.clone(),
            };

            let on_normal_side = balance >= BigDecimal::from(0);
            let side = if on_normal_side {
                account.account_type.normal_balance()
            } else {
                account.account_type.normal_balance().opposite()
            };
            let (debit, credit) = match side {
                EntryType::Debit => (balance.abs(), BigDecimal::from(0)),
                EntryType::Credit => (BigDecimal::from(0), balance.abs()),
            };
            total_debits += &debit;
            total_credits += &credit;

            rows.push(TrialBalanceRow {
                account_name: account.name,
                account_code: account.code,
                account_type: account.account_type,
                debit: round_money(&debit),
                credit: round_money(&credit),
                balance: round_money(&balance),
            });
        }

        let is_balanced = (&total_debits - &total_credits).abs() < tolerance();
        Ok(TrialBalance {
            as_of_date,
            rows,
            total_debits: round_money(&total_debits),
            total_credits: round_money(&total_credits),
            is_balanced,
        })
    }

    /// Movements on the cash account
    pub async fn cash_book(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<AccountBook> {
        self.account_book(CASH_ACCOUNT, start_date, end_date).await
    }

    /// Movements on the current account
    pub async fn bank_book(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<AccountBook> {
        self.account_book(BANK_ACCOUNT, start_date, end_date).await
    }

    /// Chronological movements on a named account with a running balance
    pub async fn account_book(
        &self,
        account_name: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<AccountBook> {
        let account = self
            .account_manager
            .find_by_name(account_name)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Account, account_name))?;

        let opening_balance = match start_date.and_then(|d| d.pred_opt()) {
            Some(day_before) => self.get_account_balance(&account.id, Some(day_before)).await?,
            None => BigDecimal::from(0),
        };

        let vouchers = self
            .voucher_manager
            .get_account_vouchers(&account.id, start_date, end_date)
            .await?;

        let mut balance = opening_balance.clone();
        let mut lines = Vec::new();
        for voucher in vouchers {
            for entry in voucher.entries.iter().filter(|e| e.account_id == account.id) {
                balance += signed_effect(account.account_type, entry.entry_type, &entry.amount);
                let (debit, credit) = match entry.entry_type {
                    EntryType::Debit => (entry.amount.clone(), BigDecimal::from(0)),
                    EntryType::Credit => (BigDecimal::from(0), entry.amount.clone()),
                };
                lines.push(BookLine {
                    date: voucher.date,
                    voucher_id: voucher.id.clone(),
                    narration: entry
                        .description
                        .clone()
                        .unwrap_or_else(|| voucher.narration.clone()),
                    reference: voucher.reference.clone(),
                    debit,
                    credit,
                    balance: balance.clone(),
                });
            }
        }

        Ok(AccountBook {
            account_name: account.name,
            account_code: account.code,
            opening_balance,
            lines,
            closing_balance: balance,
        })
    }

    /// Accounts grouped as Assets, Liabilities, Income, Expenses
    pub async fn chart_of_accounts(&self) -> BooksResult<Vec<ChartGroup>> {
        let accounts = self.account_manager.list_accounts().await?;
        let types = [
            AccountType::Asset,
            AccountType::Liability,
            AccountType::Income,
            AccountType::Expense,
        ];

        Ok(types
            .into_iter()
            .map(|account_type| {
                let accounts: Vec<Account> = accounts
                    .iter()
                    .filter(|a| a.account_type == account_type)
                    .cloned()
                    .collect();
                let total_balance = accounts.iter().map(|a| &a.balance).sum();
                ChartGroup {
                    account_type,
                    accounts,
                    total_balance,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revenue::{PaymentMode, RevenueDraft, RevenueSource};
    use crate::reconciliation::ReconciliationEngine;
    use crate::utils::memory_storage::MemoryStorage;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, day).unwrap()
    }

    async fn ledger() -> Ledger<MemoryStorage> {
        let mut ledger = Ledger::new(MemoryStorage::new());
        ledger.setup_chart_of_accounts().await.unwrap();
        ledger
    }

    fn visa_sale(received: i64, mode: PaymentMode) -> RevenueEntry {
        let draft = RevenueDraft::new(date(3), "Ravi Kumar", RevenueSource::Visa, BigDecimal::from(1180))
            .received(BigDecimal::from(received))
            .payment_mode(mode);
        RevenueEntry::from_draft(draft, &ReconciliationEngine::new()).unwrap()
    }

    #[tokio::test]
    async fn test_revenue_posting_splits_gst() {
        let mut ledger = ledger().await;
        let revenue = visa_sale(1180, PaymentMode::Upi);

        let record = ledger
            .post_revenue(&revenue, &GstCalculator::default(), "INV-")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.taxable_amount, BigDecimal::from(1000));
        assert_eq!(record.cgst, BigDecimal::from(90));
        assert_eq!(record.sgst, BigDecimal::from(90));

        let bank = ledger.find_account(BANK_ACCOUNT).await.unwrap().unwrap();
        assert_eq!(bank.balance, BigDecimal::from(1180));
        let visa = ledger.find_account("Visa Revenue").await.unwrap().unwrap();
        assert_eq!(visa.balance, BigDecimal::from(1000));

        let tb = ledger.trial_balance(None).await.unwrap();
        assert!(tb.is_balanced);
        assert_eq!(tb.total_debits, BigDecimal::from(1180));
    }

    #[tokio::test]
    async fn test_nothing_posted_before_payment() {
        let mut ledger = ledger().await;
        let revenue = visa_sale(0, PaymentMode::Cash);

        let record = ledger
            .post_revenue(&revenue, &GstCalculator::default(), "INV-")
            .await
            .unwrap();
        assert!(record.is_none());
        assert!(ledger.get_vouchers(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_postings_restores_balances() {
        let mut ledger = ledger().await;
        let revenue = visa_sale(590, PaymentMode::Cash);
        ledger
            .post_revenue(&revenue, &GstCalculator::default(), "INV-")
            .await
            .unwrap();

        let removed = ledger
            .remove_postings(&Reference::new(ReferenceKind::Revenue, &revenue.id))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let cash = ledger.find_account(CASH_ACCOUNT).await.unwrap().unwrap();
        assert_eq!(cash.balance, BigDecimal::from(0));
        assert!(ledger.gst_records(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cash_book_running_balance() {
        let mut ledger = ledger().await;
        let gst = GstCalculator::default();

        ledger
            .post_revenue(&visa_sale(1180, PaymentMode::Cash), &gst, "INV-")
            .await
            .unwrap();
        let mut rent = Expense::from_draft(crate::records::ExpenseDraft::new(
            date(10),
            "Office Rent",
            BigDecimal::from(500),
        ));
        rent.payment_mode = PaymentMode::Cash;
        ledger.post_expense(&rent, &gst).await.unwrap();

        let book = ledger.cash_book(None, None).await.unwrap();
        assert_eq!(book.lines.len(), 2);
        assert_eq!(book.lines[0].balance, BigDecimal::from(1180));
        assert_eq!(book.lines[1].credit, BigDecimal::from(500));
        assert_eq!(book.closing_balance, BigDecimal::from(680));

        let later = ledger.cash_book(Some(date(5)), None).await.unwrap();
        assert_eq!(later.opening_balance, BigDecimal::from(1180));
        assert_eq!(later.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_input_rate_posts_nothing() {
        let mut ledger = ledger().await;
        let mut bill = Expense::from_draft(crate::records::ExpenseDraft::new(
            date(4),
            "Office Supplies",
            BigDecimal::from(1000),
        ));
        bill.gst_rate = Some(BigDecimal::from(150));

        let err = ledger
            .post_expense(&bill, &GstCalculator::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BooksError::Gst(_)));
        assert!(ledger.get_vouchers(None, None).await.unwrap().is_empty());
        let cash = ledger.find_account(CASH_ACCOUNT).await.unwrap().unwrap();
        assert_eq!(cash.balance, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn test_clear_postings_empties_the_books() {
        let mut ledger = ledger().await;
        let gst = GstCalculator::default();
        ledger
            .post_revenue(&visa_sale(1180, PaymentMode::Cash), &gst, "INV-")
            .await
            .unwrap();
        let accounts_before = ledger.list_accounts().await.unwrap().len();

        let cleared = ledger.clear_postings().await.unwrap();
        assert_eq!(cleared.vouchers, 1);
        assert_eq!(cleared.gst_records, 1);
        // cash, visa revenue, cgst, sgst
        assert_eq!(cleared.accounts_reset, 4);

        assert!(ledger.get_vouchers(None, None).await.unwrap().is_empty());
        assert!(ledger.gst_records(None, None).await.unwrap().is_empty());
        assert_eq!(ledger.list_accounts().await.unwrap().len(), accounts_before);
        let tb = ledger.trial_balance(None).await.unwrap();
        assert!(tb.rows.iter().all(|r| r.balance == BigDecimal::from(0)));
    }

    #[tokio::test]
    async fn test_chart_groups_in_order() {
        let ledger = ledger().await;
        let chart = ledger.chart_of_accounts().await.unwrap();

        let types: Vec<AccountType> = chart.iter().map(|g| g.account_type).collect();
        assert_eq!(
            types,
            vec![
                AccountType::Asset,
                AccountType::Liability,
                AccountType::Income,
                AccountType::Expense
            ]
        );
        assert_eq!(chart[2].accounts.len(), 5);
    }
}
