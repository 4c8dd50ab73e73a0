//! Core types shared across the back office: money helpers, chart-of-accounts
//! primitives, ledger vouchers and the crate-wide error type

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reconciliation::ReconcileError;
use crate::tax::gst::GstError;

/// Amounts that differ by no more than this are considered equal (0.01)
pub const AMOUNT_TOLERANCE_SCALE: i64 = 2;

/// The 0.01 tolerance used by every money comparison in the crate
pub fn tolerance() -> BigDecimal {
    BigDecimal::new(1.into(), AMOUNT_TOLERANCE_SCALE)
}

/// Round a money value to two decimal places
pub fn round_money(amount: &BigDecimal) -> BigDecimal {
    amount.round(AMOUNT_TOLERANCE_SCALE)
}

/// Whether two amounts agree within [`tolerance`]
pub fn within_tolerance(a: &BigDecimal, b: &BigDecimal) -> bool {
    (a - b).abs() <= tolerance()
}

/// Fresh identifier for stored records
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Account types used by the agency's chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountType {
    /// Cash, bank balances and receivables
    #[serde(rename = "Assets")]
    Asset,
    /// Vendor payables and GST collected on behalf of the government
    #[serde(rename = "Liabilities")]
    Liability,
    /// Service revenue (visa, ticketing, packages...)
    Income,
    /// Office and vendor costs
    #[serde(rename = "Expenses")]
    Expense,
}

impl AccountType {
    /// Returns the normal balance type for this account type
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Income => EntryType::Credit,
        }
    }

    /// Three letter prefix used for account codes (`AST-0001`)
    pub fn code_prefix(&self) -> &'static str {
        match self {
            AccountType::Asset => "AST",
            AccountType::Liability => "LIA",
            AccountType::Income => "INC",
            AccountType::Expense => "EXP",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Asset => "Assets",
            AccountType::Liability => "Liabilities",
            AccountType::Income => "Income",
            AccountType::Expense => "Expenses",
        }
    }
}

/// Types of entries in double-entry bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn opposite(&self) -> Self {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

/// A ledger account in the chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Display code, e.g. `INC-0009`
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Signed balance on the account's normal side
    pub balance: BigDecimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Account {
    pub fn new(code: String, name: String, account_type: AccountType) -> Self {
        let now = now();
        Self {
            id: new_id(),
            code,
            name,
            account_type,
            balance: BigDecimal::from(0),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the account balance based on an entry
    pub fn apply_entry(&mut self, entry_type: EntryType, amount: &BigDecimal) {
        self.balance = signed_effect(self.account_type, entry_type, amount) + &self.balance;
        self.updated_at = now();
    }
}

/// Effect of an entry on a balance kept on the account type's normal side
pub fn signed_effect(
    account_type: AccountType,
    entry_type: EntryType,
    amount: &BigDecimal,
) -> BigDecimal {
    if account_type.normal_balance() == entry_type {
        amount.clone()
    } else {
        -amount.clone()
    }
}

/// Individual debit or credit line of a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub account_id: String,
    pub entry_type: EntryType,
    pub amount: BigDecimal,
    pub description: Option<String>,
}

impl Entry {
    pub fn debit(account_id: String, amount: BigDecimal, description: Option<String>) -> Self {
        Self {
            account_id,
            entry_type: EntryType::Debit,
            amount,
            description,
        }
    }

    pub fn credit(account_id: String, amount: BigDecimal, description: Option<String>) -> Self {
        Self {
            account_id,
            entry_type: EntryType::Credit,
            amount,
            description,
        }
    }
}

/// Business document a voucher was posted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Revenue,
    Expense,
    VendorPayment,
}

/// Link from a voucher back to the record that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "reference_type")]
    pub kind: ReferenceKind,
    #[serde(rename = "reference_id")]
    pub id: String,
}

impl Reference {
    pub fn new(kind: ReferenceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// A balanced set of ledger entries posted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: String,
    pub date: NaiveDate,
    pub entries: Vec<Entry>,
    pub narration: String,
    pub reference: Option<Reference>,
    pub created_at: NaiveDateTime,
}

impl Voucher {
    pub fn new(date: NaiveDate, narration: String, reference: Option<Reference>) -> Self {
        Self {
            id: new_id(),
            date,
            entries: Vec::new(),
            narration,
            reference,
            created_at: now(),
        }
    }

    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn total_debits(&self) -> BigDecimal {
        self.entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Debit)
            .map(|e| &e.amount)
            .sum()
    }

    pub fn total_credits(&self) -> BigDecimal {
        self.entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Credit)
            .map(|e| &e.amount)
            .sum()
    }

    /// Debits equal credits exactly
    pub fn is_balanced(&self) -> bool {
        self.total_debits() == self.total_credits()
    }

    /// Double-entry checks: two or more lines, balanced, positive amounts
    pub fn validate(&self) -> BooksResult<()> {
        if self.entries.len() < 2 {
            return Err(BooksError::InvalidVoucher(
                "Voucher must have at least two entries for double-entry bookkeeping".to_string(),
            ));
        }

        if !self.is_balanced() {
            return Err(BooksError::InvalidVoucher(format!(
                "Voucher is not balanced: debits = {}, credits = {}",
                self.total_debits(),
                self.total_credits()
            )));
        }

        if self.entries.iter().any(|e| e.amount <= BigDecimal::from(0)) {
            return Err(BooksError::InvalidVoucher(
                "Entry amounts must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// One account's line in the trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_name: String,
    pub account_code: String,
    pub account_type: AccountType,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub balance: BigDecimal,
}

/// Snapshot of every account balance at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub as_of_date: Option<NaiveDate>,
    #[serde(rename = "accounts")]
    pub rows: Vec<TrialBalanceRow>,
    #[serde(rename = "total_debit")]
    pub total_debits: BigDecimal,
    #[serde(rename = "total_credit")]
    pub total_credits: BigDecimal,
    #[serde(rename = "balanced")]
    pub is_balanced: bool,
}

/// Kinds of stored records, used in not-found errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Account,
    Voucher,
    Revenue,
    Expense,
    Vendor,
    VendorCost,
    BankAccount,
    Lead,
    Reminder,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Account => "Account",
            RecordKind::Voucher => "Voucher",
            RecordKind::Revenue => "Revenue",
            RecordKind::Expense => "Expense",
            RecordKind::Vendor => "Vendor",
            RecordKind::VendorCost => "Vendor cost",
            RecordKind::BankAccount => "Bank account",
            RecordKind::Lead => "Lead",
            RecordKind::Reminder => "Reminder",
        };
        f.write_str(name)
    }
}

/// Errors that can occur anywhere in the back office
#[derive(Debug, thiserror::Error)]
pub enum BooksError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Reconciliation(#[from] ReconcileError),
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("Invalid voucher: {0}")]
    InvalidVoucher(String),
    #[error("Payment of {amount} exceeds the outstanding {outstanding}")]
    Overpayment {
        amount: BigDecimal,
        outstanding: BigDecimal,
    },
    #[error(transparent)]
    Gst(#[from] GstError),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BooksError {
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        BooksError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Message shown to the operator when a request fails
    pub fn user_message(&self) -> String {
        match self {
            BooksError::NotFound { kind, .. } => format!("{kind} not found"),
            BooksError::Storage(_) => "Something went wrong while saving, please retry".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for back office operations
pub type BooksResult<T> = Result<T, BooksError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_and_rounding() {
        assert_eq!(tolerance(), BigDecimal::from(1) / BigDecimal::from(100));
        assert!(within_tolerance(
            &BigDecimal::new(100_005.into(), 3),
            &BigDecimal::from(100)
        ));
        assert!(!within_tolerance(
            &BigDecimal::new(10_002.into(), 2),
            &BigDecimal::from(100)
        ));
        assert_eq!(
            round_money(&(BigDecimal::from(1000) / BigDecimal::from(3))),
            BigDecimal::new(33_333.into(), 2)
        );
    }

    #[test]
    fn test_apply_entry_respects_normal_side() {
        let mut cash = Account::new("AST-0001".into(), "Cash".into(), AccountType::Asset);
        cash.apply_entry(EntryType::Debit, &BigDecimal::from(500));
        cash.apply_entry(EntryType::Credit, &BigDecimal::from(200));
        assert_eq!(cash.balance, BigDecimal::from(300));

        let mut gst = Account::new(
            "LIA-0006".into(),
            "GST Payable - CGST".into(),
            AccountType::Liability,
        );
        gst.apply_entry(EntryType::Credit, &BigDecimal::from(90));
        assert_eq!(gst.balance, BigDecimal::from(90));
    }

    #[test]
    fn test_voucher_validation() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let mut voucher = Voucher::new(date, "Visa fee".into(), None);
        assert!(voucher.validate().is_err());

        voucher.add_entry(Entry::debit("cash".into(), BigDecimal::from(100), None));
        voucher.add_entry(Entry::credit("revenue".into(), BigDecimal::from(90), None));
        assert!(!voucher.is_balanced());
        assert!(voucher.validate().is_err());

        voucher.add_entry(Entry::credit("gst".into(), BigDecimal::from(10), None));
        assert!(voucher.validate().is_ok());
    }

    #[test]
    fn test_user_message_for_missing_record() {
        let err = BooksError::not_found(RecordKind::Revenue, "abc");
        assert_eq!(err.user_message(), "Revenue not found");
        assert_eq!(err.to_string(), "Revenue not found: abc");
    }
}
