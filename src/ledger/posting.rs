//! Voucher building, posting patterns and voucher bookkeeping

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::info;

use crate::tax::GstCalculation;
use crate::traits::*;
use crate::types::*;

/// Accounts and amounts for a client receipt that includes GST
pub struct ReceiptParams {
    pub date: NaiveDate,
    pub narration: String,
    pub reference: Reference,
    pub cash_or_bank_account_id: String,
    pub revenue_account_id: String,
    pub cgst_account_id: String,
    pub sgst_account_id: String,
    pub igst_account_id: String,
    /// Inclusive split of the received amount
    pub split: GstCalculation,
}

/// Accounts and amount for a payment out of cash or bank
pub struct PaymentParams {
    pub date: NaiveDate,
    pub narration: String,
    pub reference: Reference,
    pub expense_account_id: String,
    pub cash_or_bank_account_id: String,
    pub amount: BigDecimal,
}

/// Voucher manager: posts vouchers and keeps account balances in step
pub struct VoucherManager<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn VoucherValidator>,
}

impl<S: LedgerStorage> VoucherManager<S> {
    /// Create a new voucher manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultVoucherValidator),
        }
    }

    /// Create a new voucher manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn VoucherValidator>) -> Self {
        Self { storage, validator }
    }

    /// Validate, store and apply a voucher to its accounts
    pub async fn record_voucher(&mut self, voucher: Voucher) -> BooksResult<Voucher> {
        self.validator.validate_voucher(&voucher)?;

        // Verify all referenced accounts exist
        for entry in &voucher.entries {
            if self.storage.get_account(&entry.account_id).await?.is_none() {
                return Err(BooksError::not_found(RecordKind::Account, &entry.account_id));
            }
        }

        self.storage.save_voucher(&voucher).await?;

        for entry in &voucher.entries {
            if let Some(mut account) = self.storage.get_account(&entry.account_id).await? {
                account.apply_entry(entry.entry_type, &entry.amount);
                self.storage.update_account(&account).await?;
            }
        }

        info!(
            voucher_id = %voucher.id,
            amount = %voucher.total_debits(),
            narration = %voucher.narration,
            "posted voucher"
        );
        Ok(voucher)
    }

    /// Get a voucher by ID
    pub async fn get_voucher(&self, voucher_id: &str) -> BooksResult<Option<Voucher>> {
        self.storage.get_voucher(voucher_id).await
    }

    /// Get a voucher by ID, returning an error if not found
    pub async fn get_voucher_required(&self, voucher_id: &str) -> BooksResult<Voucher> {
        self.storage
            .get_voucher(voucher_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Voucher, voucher_id))
    }

    /// Vouchers touching an account, oldest first
    pub async fn get_account_vouchers(
        &self,
        account_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>> {
        self.storage
            .get_account_vouchers(account_id, start_date, end_date)
            .await
    }

    /// All vouchers within a date range
    pub async fn get_vouchers(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>> {
        self.storage.get_vouchers(start_date, end_date).await
    }

    /// Delete a voucher, reversing its effects on account balances
    pub async fn delete_voucher(&mut self, voucher_id: &str) -> BooksResult<()> {
        let voucher = self.get_voucher_required(voucher_id).await?;
        self.reverse_balances(&voucher).await?;
        self.storage.delete_voucher(voucher_id).await
    }

    /// Delete every voucher posted for a record; returns how many were removed
    pub async fn reverse_reference(&mut self, reference: &Reference) -> BooksResult<usize> {
        let vouchers = self.storage.vouchers_for_reference(reference).await?;
        for voucher in &vouchers {
            self.reverse_balances(voucher).await?;
            self.storage.delete_voucher(&voucher.id).await?;
        }
        Ok(vouchers.len())
    }

    async fn reverse_balances(&mut self, voucher: &Voucher) -> BooksResult<()> {
        for entry in &voucher.entries {
            if let Some(mut account) = self.storage.get_account(&entry.account_id).await? {
                account.apply_entry(entry.entry_type.opposite(), &entry.amount);
                self.storage.update_account(&account).await?;
            }
        }
        Ok(())
    }
}

/// Voucher builder for creating multi-line vouchers
#[derive(Debug)]
pub struct VoucherBuilder {
    voucher: Voucher,
}

impl VoucherBuilder {
    /// Create a new voucher builder
    pub fn new(date: NaiveDate, narration: impl Into<String>) -> Self {
        Self {
            voucher: Voucher::new(date, narration.into(), None),
        }
    }

    /// Link the voucher to the record it was posted for
    pub fn reference(mut self, reference: Reference) -> Self {
        self.voucher.reference = Some(reference);
        self
    }

    /// Add a debit entry
    pub fn debit(
        mut self,
        account_id: String,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        self.voucher
            .add_entry(Entry::debit(account_id, amount, description));
        self
    }

    /// Add a credit entry
    pub fn credit(
        mut self,
        account_id: String,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        self.voucher
            .add_entry(Entry::credit(account_id, amount, description));
        self
    }

    /// Add a credit entry unless the amount is zero
    pub fn credit_nonzero(
        self,
        account_id: String,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        if amount == BigDecimal::from(0) {
            self
        } else {
            self.credit(account_id, amount, description)
        }
    }

    /// Add a custom entry
    pub fn entry(mut self, entry: Entry) -> Self {
        self.voucher.add_entry(entry);
        self
    }

    /// Build the voucher
    pub fn build(self) -> BooksResult<Voucher> {
        self.voucher.validate()?;
        Ok(self.voucher)
    }
}

/// The agency's recurring postings
pub mod patterns {
    use super::*;

    /// Client receipt: Dr cash/bank; Cr revenue (taxable) and GST payable
    pub fn client_receipt(params: ReceiptParams) -> BooksResult<Voucher> {
        let split = params.split;
        let half_rate = &split.gst_rate.cgst_rate;

        VoucherBuilder::new(params.date, params.narration.clone())
            .reference(params.reference)
            .debit(
                params.cash_or_bank_account_id,
                split.total_amount.clone(),
                Some(params.narration.clone()),
            )
            .credit(
                params.revenue_account_id,
                split.taxable_amount.clone(),
                Some(params.narration),
            )
            .credit_nonzero(
                params.cgst_account_id,
                split.cgst.clone(),
                Some(format!("CGST @ {half_rate}%")),
            )
            .credit_nonzero(
                params.sgst_account_id,
                split.sgst.clone(),
                Some(format!("SGST @ {half_rate}%")),
            )
            .credit_nonzero(
                params.igst_account_id,
                split.igst.clone(),
                Some(format!("IGST @ {}%", split.gst_rate.igst_rate)),
            )
            .build()
    }

    /// Money going out: Dr expense (or vendor costs); Cr cash/bank
    pub fn payment(params: PaymentParams) -> BooksResult<Voucher> {
        VoucherBuilder::new(params.date, params.narration.clone())
            .reference(params.reference)
            .debit(
                params.expense_account_id,
                params.amount.clone(),
                Some(params.narration.clone()),
            )
            .credit(
                params.cash_or_bank_account_id,
                params.amount,
                Some(params.narration),
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::GstRate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
    }

    #[test]
    fn test_client_receipt_balances_after_rounding() {
        let split = GstCalculation::split_inclusive(
            BigDecimal::from(10000),
            GstRate::intra_state(BigDecimal::from(5)),
        )
        .unwrap();

        let voucher = patterns::client_receipt(ReceiptParams {
            date: date(),
            narration: "Revenue from Package - Asha".to_string(),
            reference: Reference::new(ReferenceKind::Revenue, "rev-1"),
            cash_or_bank_account_id: "bank".to_string(),
            revenue_account_id: "package".to_string(),
            cgst_account_id: "cgst".to_string(),
            sgst_account_id: "sgst".to_string(),
            igst_account_id: "igst".to_string(),
            split,
        })
        .unwrap();

        assert_eq!(voucher.entries.len(), 4);
        assert!(voucher.is_balanced());
        assert_eq!(voucher.total_debits(), BigDecimal::from(10000));
    }

    #[test]
    fn test_zero_rate_receipt_has_no_gst_lines() {
        let split = GstCalculation::split_inclusive(
            BigDecimal::from(800),
            GstRate::intra_state(BigDecimal::from(0)),
        )
        .unwrap();

        let voucher = patterns::client_receipt(ReceiptParams {
            date: date(),
            narration: "Revenue from Other - Dev".to_string(),
            reference: Reference::new(ReferenceKind::Revenue, "rev-2"),
            cash_or_bank_account_id: "cash".to_string(),
            revenue_account_id: "other".to_string(),
            cgst_account_id: "cgst".to_string(),
            sgst_account_id: "sgst".to_string(),
            igst_account_id: "igst".to_string(),
            split,
        })
        .unwrap();

        assert_eq!(voucher.entries.len(), 2);
    }

    #[test]
    fn test_payment_pattern() {
        let voucher = patterns::payment(PaymentParams {
            date: date(),
            narration: "Office Rent".to_string(),
            reference: Reference::new(ReferenceKind::Expense, "exp-1"),
            expense_account_id: "rent".to_string(),
            cash_or_bank_account_id: "bank".to_string(),
            amount: BigDecimal::from(25000),
        })
        .unwrap();

        assert_eq!(voucher.total_credits(), BigDecimal::from(25000));
        assert_eq!(
            voucher.reference.map(|r| r.kind),
            Some(ReferenceKind::Expense)
        );
    }
}
