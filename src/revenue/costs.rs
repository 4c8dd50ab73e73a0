//! Vendor costs booked against a sale and the profit they leave

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::revenue::PaymentMode;
use crate::types::*;

/// Supplier category for a cost row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VendorCategory {
    Hotel,
    Flight,
    Land,
    Visa,
    Insurance,
    Other,
}

/// Settlement state of a vendor cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VendorPaymentStatus {
    Done,
    #[default]
    Pending,
}

/// A payment made to a vendor towards one cost row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPayment {
    #[serde(default = "new_id")]
    pub id: String,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub payment_mode: PaymentMode,
}

impl VendorPayment {
    pub fn new(date: NaiveDate, amount: BigDecimal, payment_mode: PaymentMode) -> Self {
        Self {
            id: new_id(),
            date,
            amount,
            payment_mode,
        }
    }
}

/// What the agency owes a supplier for one booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorCost {
    #[serde(default = "new_id")]
    pub id: String,
    pub vendor_name: String,
    pub category: VendorCategory,
    pub amount: BigDecimal,
    #[serde(default)]
    pub payment_status: VendorPaymentStatus,
    #[serde(default)]
    pub vendor_payments: Vec<VendorPayment>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl VendorCost {
    pub fn new(vendor_name: impl Into<String>, category: VendorCategory, amount: BigDecimal) -> Self {
        Self {
            id: new_id(),
            vendor_name: vendor_name.into(),
            category,
            amount,
            payment_status: VendorPaymentStatus::Pending,
            vendor_payments: Vec::new(),
            payment_date: None,
            notes: None,
        }
    }

    /// Sum of payments made so far
    pub fn paid(&self) -> BigDecimal {
        self.vendor_payments.iter().map(|p| &p.amount).sum()
    }

    /// `amount - paid`
    pub fn pending(&self) -> BigDecimal {
        &self.amount - self.paid()
    }

    /// Fully paid: a positive cost with at most the tolerance outstanding
    pub fn is_settled(&self) -> bool {
        self.amount > BigDecimal::from(0) && self.pending() <= tolerance()
    }

    /// Re-derive `payment_status` from the payments
    pub fn refresh_status(&mut self) {
        self.payment_status = if self.is_settled() {
            VendorPaymentStatus::Done
        } else {
            VendorPaymentStatus::Pending
        };
    }

    /// Add a payment, refusing anything that would pay more than is owed
    pub fn record_payment(&mut self, payment: VendorPayment) -> BooksResult<()> {
        if payment.amount <= BigDecimal::from(0) {
            return Err(BooksError::Validation(
                "Vendor payment amount must be positive".to_string(),
            ));
        }

        let outstanding = self.pending();
        if payment.amount > &outstanding + tolerance() {
            return Err(BooksError::Overpayment {
                amount: payment.amount,
                outstanding,
            });
        }

        self.vendor_payments.push(payment);
        self.refresh_status();
        Ok(())
    }

    /// Payments must be positive and never exceed the cost
    pub fn validate(&self) -> BooksResult<()> {
        if self.vendor_name.trim().is_empty() {
            return Err(BooksError::Validation(
                "Vendor name cannot be empty".to_string(),
            ));
        }
        if self
            .vendor_payments
            .iter()
            .any(|p| p.amount <= BigDecimal::from(0))
        {
            return Err(BooksError::Validation(format!(
                "Payments to {} must be positive",
                self.vendor_name
            )));
        }
        if self.amount < BigDecimal::from(0) {
            return Err(BooksError::Validation(format!(
                "Cost for {} cannot be negative",
                self.vendor_name
            )));
        }
        if self.paid() > &self.amount + tolerance() {
            return Err(BooksError::Overpayment {
                amount: self.paid(),
                outstanding: self.amount.clone(),
            });
        }
        Ok(())
    }
}

/// Profit breakdown for a sale against its vendor costs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost_price: BigDecimal,
    pub profit: BigDecimal,
    /// Percentage of the sale price, two decimals
    pub profit_margin: BigDecimal,
}

impl CostSummary {
    pub fn aggregate(sale_price: &BigDecimal, rows: &[VendorCost]) -> Self {
        let total_cost_price: BigDecimal = rows.iter().map(|row| &row.amount).sum();
        let profit = sale_price - &total_cost_price;
        let profit_margin = profit_margin(sale_price, &total_cost_price);

        Self {
            total_cost_price,
            profit,
            profit_margin,
        }
    }
}

/// `(sale - cost) / sale * 100`, rounded to two decimals; zero without a sale price
pub fn profit_margin(sale_price: &BigDecimal, total_cost: &BigDecimal) -> BigDecimal {
    if *sale_price <= BigDecimal::from(0) {
        return BigDecimal::from(0);
    }

    let profit = sale_price - total_cost;
    round_money(&(profit * BigDecimal::from(100) / sale_price))
}
