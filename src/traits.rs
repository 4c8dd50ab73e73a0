//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::activity::{ActivityEntry, ActivityQuery};
use crate::crm::{Lead, Reminder};
use crate::records::{BankAccount, Expense, Vendor};
use crate::revenue::RevenueEntry;
use crate::tax::GstRecord;
use crate::types::*;

/// Storage for the chart of accounts, vouchers and GST records
///
/// Lets the books run on any backend (PostgreSQL, SQLite, a document
/// store, in-memory...) by implementing these methods.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Save a new account
    async fn save_account(&mut self, account: &Account) -> BooksResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> BooksResult<Option<Account>>;

    /// Get an account by its display name
    async fn find_account_by_name(&self, name: &str) -> BooksResult<Option<Account>>;

    /// List accounts ordered by code, optionally filtered by type
    async fn list_accounts(&self, account_type: Option<AccountType>) -> BooksResult<Vec<Account>>;

    /// Update an existing account
    async fn update_account(&mut self, account: &Account) -> BooksResult<()>;

    /// Save a voucher
    async fn save_voucher(&mut self, voucher: &Voucher) -> BooksResult<()>;

    /// Get a voucher by ID
    async fn get_voucher(&self, voucher_id: &str) -> BooksResult<Option<Voucher>>;

    /// Vouchers touching an account in a date range, oldest first
    async fn get_account_vouchers(
        &self,
        account_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>>;

    /// All vouchers in a date range, oldest first
    async fn get_vouchers(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>>;

    /// Vouchers posted for a business record
    async fn vouchers_for_reference(&self, reference: &Reference) -> BooksResult<Vec<Voucher>>;

    /// Delete a voucher; balances are the caller's concern
    async fn delete_voucher(&mut self, voucher_id: &str) -> BooksResult<()>;

    /// Get account balance as of a specific date, or the running balance
    async fn get_account_balance(
        &self,
        account_id: &str,
        as_of_date: Option<NaiveDate>,
    ) -> BooksResult<BigDecimal>;

    /// Save a GST record
    async fn save_gst_record(&mut self, record: &GstRecord) -> BooksResult<()>;

    /// GST records in a date range, oldest first
    async fn list_gst_records(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<GstRecord>>;

    /// GST records booked for a revenue or expense
    async fn gst_records_for_reference(&self, reference_id: &str) -> BooksResult<Vec<GstRecord>>;

    /// Remove the GST records of a revenue or expense, returning how many went
    async fn delete_gst_records_for_reference(&mut self, reference_id: &str) -> BooksResult<usize>;
}

/// Storage for revenue, expenses, vendors and bank accounts
#[async_trait]
pub trait RecordStorage: Send + Sync {
    async fn save_revenue(&mut self, revenue: &RevenueEntry) -> BooksResult<()>;
    async fn get_revenue(&self, revenue_id: &str) -> BooksResult<Option<RevenueEntry>>;
    /// Newest first
    async fn list_revenues(&self) -> BooksResult<Vec<RevenueEntry>>;
    async fn update_revenue(&mut self, revenue: &RevenueEntry) -> BooksResult<()>;
    async fn delete_revenue(&mut self, revenue_id: &str) -> BooksResult<()>;

    async fn save_expense(&mut self, expense: &Expense) -> BooksResult<()>;
    async fn get_expense(&self, expense_id: &str) -> BooksResult<Option<Expense>>;
    /// Newest first
    async fn list_expenses(&self) -> BooksResult<Vec<Expense>>;
    async fn update_expense(&mut self, expense: &Expense) -> BooksResult<()>;
    async fn delete_expense(&mut self, expense_id: &str) -> BooksResult<()>;

    async fn save_vendor(&mut self, vendor: &Vendor) -> BooksResult<()>;
    async fn get_vendor(&self, vendor_id: &str) -> BooksResult<Option<Vendor>>;
    async fn list_vendors(&self) -> BooksResult<Vec<Vendor>>;
    async fn update_vendor(&mut self, vendor: &Vendor) -> BooksResult<()>;
    async fn delete_vendor(&mut self, vendor_id: &str) -> BooksResult<()>;

    async fn save_bank_account(&mut self, account: &BankAccount) -> BooksResult<()>;
    async fn get_bank_account(&self, account_id: &str) -> BooksResult<Option<BankAccount>>;
    async fn list_bank_accounts(&self) -> BooksResult<Vec<BankAccount>>;
    async fn update_bank_account(&mut self, account: &BankAccount) -> BooksResult<()>;
    async fn delete_bank_account(&mut self, account_id: &str) -> BooksResult<()>;
}

/// Storage for CRM leads and reminders
#[async_trait]
pub trait CrmStorage: Send + Sync {
    async fn save_lead(&mut self, lead: &Lead) -> BooksResult<()>;

    /// Get a lead by its `LD-` id
    async fn get_lead(&self, lead_id: &str) -> BooksResult<Option<Lead>>;

    /// Find the lead a referral points at, by referral code or lead id
    async fn find_referrer(&self, reference: &str) -> BooksResult<Option<Lead>>;

    async fn list_leads(&self) -> BooksResult<Vec<Lead>>;
    async fn update_lead(&mut self, lead: &Lead) -> BooksResult<()>;
    async fn delete_lead(&mut self, lead_id: &str) -> BooksResult<()>;

    async fn save_reminder(&mut self, reminder: &Reminder) -> BooksResult<()>;
    async fn get_reminder(&self, reminder_id: &str) -> BooksResult<Option<Reminder>>;
    async fn list_reminders(&self) -> BooksResult<Vec<Reminder>>;
    async fn update_reminder(&mut self, reminder: &Reminder) -> BooksResult<()>;
    async fn delete_reminder(&mut self, reminder_id: &str) -> BooksResult<()>;
}

/// Storage for the activity log
#[async_trait]
pub trait ActivityStorage: Send + Sync {
    async fn save_activity(&mut self, entry: &ActivityEntry) -> BooksResult<()>;

    /// Entries matching the query, newest first
    async fn list_activities(&self, query: &ActivityQuery) -> BooksResult<Vec<ActivityEntry>>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &Account) -> BooksResult<()>;
}

/// Trait for implementing custom voucher validation rules
pub trait VoucherValidator: Send + Sync {
    /// Validate a voucher before posting
    fn validate_voucher(&self, voucher: &Voucher) -> BooksResult<()>;
}

/// Trait for validating master data before it is stored
pub trait RecordValidator: Send + Sync {
    fn validate_expense(&self, expense: &Expense) -> BooksResult<()>;
    fn validate_vendor(&self, vendor: &Vendor) -> BooksResult<()>;
    fn validate_bank_account(&self, account: &BankAccount) -> BooksResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &Account) -> BooksResult<()> {
        if account.code.trim().is_empty() {
            return Err(BooksError::Validation(
                "Account code cannot be empty".to_string(),
            ));
        }

        if account.name.trim().is_empty() {
            return Err(BooksError::Validation(
                "Account name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default voucher validator with the double-entry rules
pub struct DefaultVoucherValidator;

impl VoucherValidator for DefaultVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher) -> BooksResult<()> {
        voucher.validate()
    }
}

/// Default record validator: names present, amounts positive, GST rate in range
pub struct DefaultRecordValidator;

impl RecordValidator for DefaultRecordValidator {
    fn validate_expense(&self, expense: &Expense) -> BooksResult<()> {
        if expense.category.trim().is_empty() {
            return Err(BooksError::Validation(
                "Expense category cannot be empty".to_string(),
            ));
        }
        if expense.amount <= BigDecimal::from(0) {
            return Err(BooksError::Validation(
                "Expense amount must be positive".to_string(),
            ));
        }
        if let Some(rate) = &expense.gst_rate {
            if *rate < BigDecimal::from(0) || *rate > BigDecimal::from(100) {
                return Err(BooksError::Validation(format!(
                    "GST rate {rate} must be between 0 and 100"
                )));
            }
        }
        Ok(())
    }

    fn validate_vendor(&self, vendor: &Vendor) -> BooksResult<()> {
        if vendor.vendor_name.trim().is_empty() {
            return Err(BooksError::Validation(
                "Vendor name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_bank_account(&self, account: &BankAccount) -> BooksResult<()> {
        if account.bank_name.trim().is_empty() || account.account_number.trim().is_empty() {
            return Err(BooksError::Validation(
                "Bank name and account number are required".to_string(),
            ));
        }
        Ok(())
    }
}
