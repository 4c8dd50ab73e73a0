//! Reconciliation of a revenue entry's sale price against the amounts
//! received and still pending
//!
//! Every edit of one of the three amounts re-derives the dependent one so
//! that `received + pending == sale_price` holds. A mismatch (possible when
//! all three arrive together, e.g. from an API body) never blocks editing,
//! but it blocks submission.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::revenue::RevenueStatus;
use crate::types::{tolerance, within_tolerance};

/// The amount field the operator just edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountField {
    SalePrice,
    ReceivedAmount,
    PendingAmount,
}

impl fmt::Display for AmountField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AmountField::SalePrice => "sale_price",
            AmountField::ReceivedAmount => "received_amount",
            AmountField::PendingAmount => "pending_amount",
        })
    }
}

/// The three amounts kept in balance on a revenue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amounts {
    pub sale_price: BigDecimal,
    pub received_amount: BigDecimal,
    pub pending_amount: BigDecimal,
}

impl Amounts {
    pub fn new(
        sale_price: BigDecimal,
        received_amount: BigDecimal,
        pending_amount: BigDecimal,
    ) -> Self {
        Self {
            sale_price,
            received_amount,
            pending_amount,
        }
    }

    /// `received + pending - sale_price`
    pub fn discrepancy(&self) -> BigDecimal {
        &self.received_amount + &self.pending_amount - &self.sale_price
    }
}

/// Reconciliation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    #[error(
        "Received ({received}) plus pending ({pending}) must equal the sale price ({sale_price})"
    )]
    Mismatch {
        sale_price: BigDecimal,
        received: BigDecimal,
        pending: BigDecimal,
    },
    #[error("{field} cannot be negative")]
    Negative { field: AmountField },
}

/// Outcome of a single reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub amounts: Amounts,
    pub status: RevenueStatus,
    /// Surfaced to the operator; only blocks submission
    pub issue: Option<ReconcileError>,
}

impl Reconciled {
    pub fn is_submittable(&self) -> bool {
        self.issue.is_none()
    }

    /// Converts into the amounts, failing if submission is blocked
    pub fn into_result(self) -> Result<(Amounts, RevenueStatus), ReconcileError> {
        match self.issue {
            Some(issue) => Err(issue),
            None => Ok((self.amounts, self.status)),
        }
    }
}

/// Keeps sale price, received and pending amounts consistent
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    tolerance: BigDecimal,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self {
            tolerance: tolerance(),
        }
    }

    /// Re-derive the dependent amount after `edited` changed
    ///
    /// Editing the sale price or the received amount recomputes pending;
    /// editing pending recomputes received. Negative values are carried
    /// through untouched.
    pub fn reconcile(&self, amounts: &Amounts, edited: AmountField) -> Reconciled {
        let mut next = amounts.clone();
        match edited {
            AmountField::SalePrice | AmountField::ReceivedAmount => {
                next.pending_amount = &next.sale_price - &next.received_amount;
            }
            AmountField::PendingAmount => {
                next.received_amount = &next.sale_price - &next.pending_amount;
            }
        }

        let issue = self.check(&next).err();
        let status = self.status_for(&next.pending_amount);
        Reconciled {
            amounts: next,
            status,
            issue,
        }
    }

    /// Submission check: amounts must add up unless the sale price is still zero
    pub fn check(&self, amounts: &Amounts) -> Result<(), ReconcileError> {
        if amounts.sale_price <= BigDecimal::from(0) {
            return Ok(());
        }

        if amounts.discrepancy().abs() > self.tolerance {
            return Err(ReconcileError::Mismatch {
                sale_price: amounts.sale_price.clone(),
                received: amounts.received_amount.clone(),
                pending: amounts.pending_amount.clone(),
            });
        }

        Ok(())
    }

    /// Pending while more than the tolerance is still owed
    pub fn status_for(&self, pending_amount: &BigDecimal) -> RevenueStatus {
        if pending_amount > &self.tolerance {
            RevenueStatus::Pending
        } else {
            RevenueStatus::Completed
        }
    }

    /// Amounts implied by picking a status directly
    ///
    /// Completed moves the full sale price to received; Pending moves it
    /// back to pending.
    pub fn apply_status(&self, sale_price: &BigDecimal, status: RevenueStatus) -> Amounts {
        match status {
            RevenueStatus::Completed => {
                Amounts::new(sale_price.clone(), sale_price.clone(), BigDecimal::from(0))
            }
            RevenueStatus::Pending => {
                Amounts::new(sale_price.clone(), BigDecimal::from(0), sale_price.clone())
            }
        }
    }

    /// Whether the amounts already satisfy the invariant
    pub fn is_consistent(&self, amounts: &Amounts) -> bool {
        within_tolerance(
            &(&amounts.received_amount + &amounts.pending_amount),
            &amounts.sale_price,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(sale: i64, received: i64, pending: i64) -> Amounts {
        Amounts::new(
            BigDecimal::from(sale),
            BigDecimal::from(received),
            BigDecimal::from(pending),
        )
    }

    #[test]
    fn test_pending_edit_recomputes_received() {
        let engine = ReconciliationEngine::new();
        let result = engine.reconcile(&amounts(500, 500, 200), AmountField::PendingAmount);

        assert_eq!(result.amounts.received_amount, BigDecimal::from(300));
        assert_eq!(result.amounts.pending_amount, BigDecimal::from(200));
        assert_eq!(result.status, RevenueStatus::Pending);
        assert!(result.is_submittable());
    }

    #[test]
    fn test_received_and_sale_edits_recompute_pending() {
        let engine = ReconciliationEngine::new();

        let result = engine.reconcile(&amounts(1000, 400, 0), AmountField::ReceivedAmount);
        assert_eq!(result.amounts.pending_amount, BigDecimal::from(600));

        let result = engine.reconcile(&amounts(1200, 400, 600), AmountField::SalePrice);
        assert_eq!(result.amounts.pending_amount, BigDecimal::from(800));
        assert_eq!(result.amounts.received_amount, BigDecimal::from(400));
    }

    #[test]
    fn test_fully_received_is_completed() {
        let engine = ReconciliationEngine::new();
        let result = engine.reconcile(&amounts(750, 750, 10), AmountField::ReceivedAmount);

        assert_eq!(result.amounts.pending_amount, BigDecimal::from(0));
        assert_eq!(result.status, RevenueStatus::Completed);
    }

    #[test]
    fn test_edit_sequences_keep_invariant() {
        let engine = ReconciliationEngine::new();
        let edits = [
            (AmountField::SalePrice, 0, 0, 0),
            (AmountField::SalePrice, 1500, 0, 0),
            (AmountField::ReceivedAmount, 1500, 200, 0),
            (AmountField::PendingAmount, 1500, 0, 1800),
            (AmountField::SalePrice, 900, 0, 0),
            (AmountField::PendingAmount, 900, 0, 0),
        ];

        let mut current = amounts(0, 0, 0);
        for (field, sale, received, pending) in edits {
            match field {
                AmountField::SalePrice => current.sale_price = BigDecimal::from(sale),
                AmountField::ReceivedAmount => current.received_amount = BigDecimal::from(received),
                AmountField::PendingAmount => current.pending_amount = BigDecimal::from(pending),
            }
            current = engine.reconcile(&current, field).amounts;
            assert!(engine.is_consistent(&current), "{current:?}");
        }

        assert_eq!(current.received_amount, BigDecimal::from(900));
        assert_eq!(current.pending_amount, BigDecimal::from(0));
    }

    #[test]
    fn test_mismatch_blocks_submission_only_with_sale_price() {
        let engine = ReconciliationEngine::new();

        let err = engine.check(&amounts(1000, 300, 300)).unwrap_err();
        assert!(matches!(err, ReconcileError::Mismatch { .. }));

        // empty form: nothing to validate yet
        assert!(engine.check(&amounts(0, 300, 0)).is_ok());

        let within = Amounts::new(
            BigDecimal::from(1000),
            BigDecimal::new(99_999.into(), 2),
            BigDecimal::from(0),
        );
        assert!(engine.check(&within).is_ok());
    }

    #[test]
    fn test_status_tolerance() {
        let engine = ReconciliationEngine::new();
        assert_eq!(
            engine.status_for(&BigDecimal::new(1.into(), 2)),
            RevenueStatus::Completed
        );
        assert_eq!(
            engine.status_for(&BigDecimal::new(2.into(), 2)),
            RevenueStatus::Pending
        );
        assert_eq!(
            engine.status_for(&BigDecimal::from(-5)),
            RevenueStatus::Completed
        );
    }

    #[test]
    fn test_apply_status() {
        let engine = ReconciliationEngine::new();
        let sale = BigDecimal::from(4200);

        let done = engine.apply_status(&sale, RevenueStatus::Completed);
        assert_eq!(done.received_amount, sale);
        assert_eq!(done.pending_amount, BigDecimal::from(0));

        let pending = engine.apply_status(&sale, RevenueStatus::Pending);
        assert_eq!(pending.received_amount, BigDecimal::from(0));
        assert_eq!(pending.pending_amount, sale);
    }
}
