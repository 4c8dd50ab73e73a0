//! Revenue entries: one sale to a client, what has been collected so far,
//! and what the agency owes its vendors for it

pub mod costs;

pub use costs::*;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::reconciliation::{AmountField, Amounts, ReconciliationEngine};
use crate::types::*;

/// Line of business a sale belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RevenueSource {
    Visa,
    Ticket,
    Package,
    Insurance,
    Other,
}

impl RevenueSource {
    pub const ALL: [RevenueSource; 5] = [
        RevenueSource::Visa,
        RevenueSource::Ticket,
        RevenueSource::Package,
        RevenueSource::Insurance,
        RevenueSource::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RevenueSource::Visa => "Visa",
            RevenueSource::Ticket => "Ticket",
            RevenueSource::Package => "Package",
            RevenueSource::Insurance => "Insurance",
            RevenueSource::Other => "Other",
        }
    }

    /// Income account credited for this source
    pub fn revenue_account(&self) -> String {
        format!("{} Revenue", self.as_str())
    }
}

/// Collection state of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RevenueStatus {
    #[default]
    Pending,
    /// Fully collected; stored as "Received"
    #[serde(rename = "Received", alias = "Completed")]
    Completed,
}

/// How money moved between client, agency and vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentMode {
    #[default]
    Cash,
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    Card,
    Cheque,
    /// Not paid yet; used for entries raised from CRM leads
    Pending,
}

impl PaymentMode {
    /// Cash goes through the cash book, everything else through the bank
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMode::Cash)
    }
}

/// A partial payment received from the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default = "new_id")]
    pub id: String,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Payment {
    pub fn new(date: NaiveDate, amount: BigDecimal, payment_mode: PaymentMode) -> Self {
        Self {
            id: new_id(),
            date,
            amount,
            payment_mode,
            notes: None,
        }
    }
}

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueDraft {
    pub date: NaiveDate,
    pub client_name: String,
    pub source: RevenueSource,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub sale_price: BigDecimal,
    #[serde(default)]
    pub received_amount: BigDecimal,
    #[serde(default)]
    pub pending_amount: BigDecimal,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub cost_price_details: Vec<VendorCost>,
    #[serde(default)]
    pub lead_id: Option<String>,
}

impl RevenueDraft {
    pub fn new(
        date: NaiveDate,
        client_name: impl Into<String>,
        source: RevenueSource,
        sale_price: BigDecimal,
    ) -> Self {
        Self {
            date,
            client_name: client_name.into(),
            source,
            payment_mode: PaymentMode::Cash,
            pending_amount: sale_price.clone(),
            sale_price,
            received_amount: BigDecimal::from(0),
            supplier: String::new(),
            notes: String::new(),
            cost_price_details: Vec::new(),
            lead_id: None,
        }
    }

    pub fn received(mut self, amount: BigDecimal) -> Self {
        self.pending_amount = &self.sale_price - &amount;
        self.received_amount = amount;
        self
    }

    pub fn payment_mode(mut self, mode: PaymentMode) -> Self {
        self.payment_mode = mode;
        self
    }

    pub fn cost(mut self, cost: VendorCost) -> Self {
        self.cost_price_details.push(cost);
        self
    }
}

/// Body of an update request; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueUpdate {
    pub date: Option<NaiveDate>,
    pub client_name: Option<String>,
    pub source: Option<RevenueSource>,
    pub payment_mode: Option<PaymentMode>,
    pub sale_price: Option<BigDecimal>,
    pub received_amount: Option<BigDecimal>,
    pub pending_amount: Option<BigDecimal>,
    pub status: Option<RevenueStatus>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub cost_price_details: Option<Vec<VendorCost>>,
}

/// A stored sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueEntry {
    pub id: String,
    pub date: NaiveDate,
    pub client_name: String,
    pub source: RevenueSource,
    pub payment_mode: PaymentMode,
    pub sale_price: BigDecimal,
    pub received_amount: BigDecimal,
    pub pending_amount: BigDecimal,
    pub status: RevenueStatus,
    pub supplier: String,
    pub notes: String,
    pub cost_price_details: Vec<VendorCost>,
    pub partial_payments: Vec<Payment>,
    pub total_cost_price: BigDecimal,
    pub profit: BigDecimal,
    pub profit_margin: BigDecimal,
    pub lead_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl RevenueEntry {
    /// Build an entry from a create body
    ///
    /// Bodies without a sale price (older clients) take it as
    /// `received + pending`. The amounts are checked, not rewritten, so an
    /// inconsistent body fails here.
    pub fn from_draft(draft: RevenueDraft, engine: &ReconciliationEngine) -> BooksResult<Self> {
        let mut sale_price = draft.sale_price;
        if sale_price == BigDecimal::from(0) {
            sale_price = &draft.received_amount + &draft.pending_amount;
        }
        let amounts = Amounts::new(sale_price, draft.received_amount, draft.pending_amount);
        engine.check(&amounts)?;

        let mut entry = Self {
            id: new_id(),
            date: draft.date,
            client_name: draft.client_name,
            source: draft.source,
            payment_mode: draft.payment_mode,
            sale_price: amounts.sale_price,
            received_amount: amounts.received_amount,
            pending_amount: amounts.pending_amount,
            status: RevenueStatus::Pending,
            supplier: draft.supplier,
            notes: draft.notes,
            cost_price_details: draft.cost_price_details,
            partial_payments: Vec::new(),
            total_cost_price: BigDecimal::from(0),
            profit: BigDecimal::from(0),
            profit_margin: BigDecimal::from(0),
            lead_id: draft.lead_id,
            created_at: now(),
        };
        entry.refresh_derived(engine);
        Ok(entry)
    }

    pub fn amounts(&self) -> Amounts {
        Amounts::new(
            self.sale_price.clone(),
            self.received_amount.clone(),
            self.pending_amount.clone(),
        )
    }

    fn set_amounts(&mut self, amounts: Amounts) {
        self.sale_price = amounts.sale_price;
        self.received_amount = amounts.received_amount;
        self.pending_amount = amounts.pending_amount;
    }

    /// Change one amount and re-derive the dependent one
    pub fn edit_amount(
        &mut self,
        field: AmountField,
        value: BigDecimal,
        engine: &ReconciliationEngine,
    ) -> BooksResult<()> {
        let mut amounts = self.amounts();
        match field {
            AmountField::SalePrice => amounts.sale_price = value,
            AmountField::ReceivedAmount => amounts.received_amount = value,
            AmountField::PendingAmount => amounts.pending_amount = value,
        }

        let (amounts, status) = engine.reconcile(&amounts, field).into_result()?;
        self.set_amounts(amounts);
        self.status = status;
        Ok(())
    }

    /// Pick the status directly, moving the sale price between received and pending
    pub fn set_status(&mut self, status: RevenueStatus, engine: &ReconciliationEngine) {
        let amounts = engine.apply_status(&self.sale_price, status);
        self.set_amounts(amounts);
        self.status = status;
    }

    /// Merge an update body
    ///
    /// When the body carries both received and pending they are taken as
    /// given and must add up; a single amount is reconciled against the
    /// sale price. A status without amounts behaves like picking it on the
    /// form.
    pub fn apply_update(
        &mut self,
        update: RevenueUpdate,
        engine: &ReconciliationEngine,
    ) -> BooksResult<()> {
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(client_name) = update.client_name {
            self.client_name = client_name;
        }
        if let Some(source) = update.source {
            self.source = source;
        }
        if let Some(payment_mode) = update.payment_mode {
            self.payment_mode = payment_mode;
        }
        if let Some(supplier) = update.supplier {
            self.supplier = supplier;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        if let Some(rows) = update.cost_price_details {
            self.cost_price_details = rows;
        }

        let mut amounts = self.amounts();
        if let Some(sale_price) = update.sale_price.clone() {
            amounts.sale_price = sale_price;
        }

        match (update.received_amount, update.pending_amount) {
            (Some(received), Some(pending)) => {
                amounts.received_amount = received;
                amounts.pending_amount = pending;
                engine.check(&amounts)?;
                self.set_amounts(amounts);
            }
            (Some(received), None) => {
                amounts.received_amount = received;
                let (amounts, _) = engine
                    .reconcile(&amounts, AmountField::ReceivedAmount)
                    .into_result()?;
                self.set_amounts(amounts);
            }
            (None, Some(pending)) => {
                amounts.pending_amount = pending;
                let (amounts, _) = engine
                    .reconcile(&amounts, AmountField::PendingAmount)
                    .into_result()?;
                self.set_amounts(amounts);
            }
            (None, None) => match update.status {
                Some(status) => {
                    self.sale_price = amounts.sale_price;
                    self.set_status(status, engine);
                }
                None if update.sale_price.is_some() => {
                    let (amounts, _) = engine
                        .reconcile(&amounts, AmountField::SalePrice)
                        .into_result()?;
                    self.set_amounts(amounts);
                }
                None => {}
            },
        }

        self.refresh_derived(engine);
        Ok(())
    }

    /// Record a partial payment from the client
    pub fn record_payment(
        &mut self,
        payment: Payment,
        engine: &ReconciliationEngine,
    ) -> BooksResult<()> {
        if payment.amount <= BigDecimal::from(0) {
            return Err(BooksError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }
        if payment.amount > &self.pending_amount + tolerance() {
            return Err(BooksError::Overpayment {
                amount: payment.amount,
                outstanding: self.pending_amount.clone(),
            });
        }

        let received = &self.received_amount + &payment.amount;
        self.payment_mode = payment.payment_mode;
        self.partial_payments.push(payment);
        self.edit_amount(AmountField::ReceivedAmount, received, engine)?;
        self.refresh_derived(engine);
        Ok(())
    }

    /// Record a payment to the vendor of one cost row
    pub fn record_vendor_payment(
        &mut self,
        cost_id: &str,
        payment: VendorPayment,
        engine: &ReconciliationEngine,
    ) -> BooksResult<()> {
        let row = self
            .cost_price_details
            .iter_mut()
            .find(|row| row.id == cost_id)
            .ok_or_else(|| BooksError::not_found(RecordKind::VendorCost, cost_id))?;
        row.record_payment(payment)?;
        self.refresh_derived(engine);
        Ok(())
    }

    /// Recompute status, vendor statuses and the profit figures
    pub fn refresh_derived(&mut self, engine: &ReconciliationEngine) {
        self.status = engine.status_for(&self.pending_amount);
        for row in &mut self.cost_price_details {
            row.refresh_status();
        }

        let summary = CostSummary::aggregate(&self.sale_price, &self.cost_price_details);
        self.total_cost_price = summary.total_cost_price;
        self.profit = summary.profit;
        self.profit_margin = summary.profit_margin;
    }

    /// Vendor cost rows that still have money outstanding
    pub fn outstanding_costs(&self) -> impl Iterator<Item = &VendorCost> {
        self.cost_price_details
            .iter()
            .filter(|row| row.pending() > tolerance())
    }
}
