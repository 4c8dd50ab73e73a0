//! Office expenses, the vendor directory and the agency's bank accounts

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::revenue::{PaymentMode, VendorCategory};
use crate::types::*;

/// Body of an expense create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub date: NaiveDate,
    /// Expense account name, e.g. "Office Rent"
    pub category: String,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    pub amount: BigDecimal,
    #[serde(default)]
    pub description: String,
    /// GST rate in percent when the bill carries input GST
    #[serde(default)]
    pub gst_rate: Option<BigDecimal>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub supplier_gstin: Option<String>,
}

impl ExpenseDraft {
    pub fn new(date: NaiveDate, category: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            date,
            category: category.into(),
            payment_mode: PaymentMode::Cash,
            amount,
            description: String::new(),
            gst_rate: None,
            invoice_number: None,
            supplier_gstin: None,
        }
    }

    pub fn payment_mode(mut self, mode: PaymentMode) -> Self {
        self.payment_mode = mode;
        self
    }

    pub fn with_gst(mut self, rate: BigDecimal, invoice_number: impl Into<String>) -> Self {
        self.gst_rate = Some(rate);
        self.invoice_number = Some(invoice_number.into());
        self
    }
}

/// Body of an expense update request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub payment_mode: Option<PaymentMode>,
    pub amount: Option<BigDecimal>,
    pub description: Option<String>,
    pub gst_rate: Option<BigDecimal>,
    pub invoice_number: Option<String>,
    pub supplier_gstin: Option<String>,
}

/// A stored expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub date: NaiveDate,
    pub category: String,
    pub payment_mode: PaymentMode,
    pub amount: BigDecimal,
    pub description: String,
    pub gst_rate: Option<BigDecimal>,
    pub invoice_number: Option<String>,
    pub supplier_gstin: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Expense {
    pub fn from_draft(draft: ExpenseDraft) -> Self {
        Self {
            id: new_id(),
            date: draft.date,
            category: draft.category,
            payment_mode: draft.payment_mode,
            amount: draft.amount,
            description: draft.description,
            gst_rate: draft.gst_rate,
            invoice_number: draft.invoice_number,
            supplier_gstin: draft.supplier_gstin,
            created_at: now(),
        }
    }

    pub fn apply_update(&mut self, update: ExpenseUpdate) {
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(payment_mode) = update.payment_mode {
            self.payment_mode = payment_mode;
        }
        if let Some(amount) = update.amount {
            self.amount = amount;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if update.gst_rate.is_some() {
            self.gst_rate = update.gst_rate;
        }
        if update.invoice_number.is_some() {
            self.invoice_number = update.invoice_number;
        }
        if update.supplier_gstin.is_some() {
            self.supplier_gstin = update.supplier_gstin;
        }
    }

    /// Rate to book input GST at, if the bill carries any
    pub fn input_gst_rate(&self) -> Option<&BigDecimal> {
        self.gst_rate
            .as_ref()
            .filter(|rate| **rate > BigDecimal::from(0))
    }
}

/// A supplier the agency books hotels, flights or visas with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    #[serde(default = "new_id")]
    pub id: String,
    pub vendor_name: String,
    #[serde(default)]
    pub contact: String,
    pub vendor_type: VendorCategory,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub bank_account_number: String,
    #[serde(default)]
    pub bank_ifsc: String,
}

impl Vendor {
    pub fn new(vendor_name: impl Into<String>, vendor_type: VendorCategory) -> Self {
        Self {
            id: new_id(),
            vendor_name: vendor_name.into(),
            contact: String::new(),
            vendor_type,
            bank_name: String::new(),
            bank_account_number: String::new(),
            bank_ifsc: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BankAccountType {
    Savings,
    #[default]
    Current,
}

/// One of the agency's own bank accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    #[serde(default = "new_id")]
    pub id: String,
    pub bank_name: String,
    pub holder_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    #[serde(default)]
    pub account_type: BankAccountType,
}

impl BankAccount {
    pub fn new(
        bank_name: impl Into<String>,
        holder_name: impl Into<String>,
        account_number: impl Into<String>,
        ifsc_code: impl Into<String>,
        account_type: BankAccountType,
    ) -> Self {
        Self {
            id: new_id(),
            bank_name: bank_name.into(),
            holder_name: holder_name.into(),
            account_number: account_number.into(),
            ifsc_code: ifsc_code.into(),
            account_type,
        }
    }

    /// Account number with all but the last four digits hidden
    pub fn masked_number(&self) -> String {
        let digits: Vec<char> = self.account_number.chars().collect();
        let visible = digits.len().saturating_sub(4);
        digits
            .iter()
            .enumerate()
            .map(|(i, c)| if i < visible { 'X' } else { *c })
            .collect()
    }
}
