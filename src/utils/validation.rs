//! Validation utilities

use bigdecimal::BigDecimal;

use crate::reconciliation::{AmountField, Amounts, ReconcileError};
use crate::records::{BankAccount, Expense, Vendor};
use crate::traits::*;
use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> BooksResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(BooksError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Reject negative amounts on a revenue form before it is submitted
pub fn validate_non_negative_amounts(amounts: &Amounts) -> Result<(), ReconcileError> {
    let fields = [
        (AmountField::SalePrice, &amounts.sale_price),
        (AmountField::ReceivedAmount, &amounts.received_amount),
        (AmountField::PendingAmount, &amounts.pending_amount),
    ];
    for (field, value) in fields {
        if *value < BigDecimal::from(0) {
            return Err(ReconcileError::Negative { field });
        }
    }
    Ok(())
}

/// Validate an account code such as `AST-0001`
pub fn validate_account_code(code: &str) -> BooksResult<()> {
    let Some((prefix, number)) = code.split_once('-') else {
        return Err(BooksError::Validation(format!(
            "Account code '{code}' must look like AST-0001"
        )));
    };

    if !matches!(prefix, "AST" | "LIA" | "INC" | "EXP") {
        return Err(BooksError::Validation(format!(
            "Unknown account code prefix '{prefix}'"
        )));
    }

    if number.len() != 4 || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(BooksError::Validation(format!(
            "Account code '{code}' must end in four digits"
        )));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> BooksResult<()> {
    if name.trim().is_empty() {
        return Err(BooksError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(BooksError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a voucher narration is valid
pub fn validate_narration(narration: &str) -> BooksResult<()> {
    if narration.trim().is_empty() {
        return Err(BooksError::Validation(
            "Voucher narration cannot be empty".to_string(),
        ));
    }

    if narration.len() > 500 {
        return Err(BooksError::Validation(
            "Voucher narration cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// IFSC: four letters, a zero, then six letters or digits
///
/// Letters are accepted in either case; banks print them upper-case but
/// forms often arrive lower-case.
pub fn validate_ifsc(ifsc: &str) -> BooksResult<()> {
    let chars: Vec<char> = ifsc.chars().collect();
    let valid = chars.len() == 11
        && chars[..4].iter().all(|c| c.is_ascii_alphabetic())
        && chars[4] == '0'
        && chars[5..].iter().all(|c| c.is_ascii_alphanumeric());

    if valid {
        Ok(())
    } else {
        Err(BooksError::Validation(format!("Invalid IFSC code '{ifsc}'")))
    }
}

/// GSTIN: fifteen upper-case letters or digits, starting with a state code
pub fn validate_gstin(gstin: &str) -> BooksResult<()> {
    let valid = gstin.len() == 15
        && gstin.chars().take(2).all(|c| c.is_ascii_digit())
        && gstin
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(BooksError::Validation(format!("Invalid GSTIN '{gstin}'")))
    }
}

/// Enhanced voucher validator with detailed checks
pub struct EnhancedVoucherValidator;

impl VoucherValidator for EnhancedVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher) -> BooksResult<()> {
        voucher.validate()?;
        validate_narration(&voucher.narration)?;

        for entry in &voucher.entries {
            validate_positive_amount(&entry.amount)?;
        }

        // same account cannot appear twice on the same side
        let mut seen = std::collections::HashSet::new();
        for entry in &voucher.entries {
            if !seen.insert((&entry.account_id, entry.entry_type)) {
                return Err(BooksError::Validation(format!(
                    "Account '{}' appears multiple times with the same entry type in voucher",
                    entry.account_id
                )));
            }
        }

        Ok(())
    }
}

/// Enhanced account validator with detailed checks
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &Account) -> BooksResult<()> {
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;

        if !account.code.starts_with(account.account_type.code_prefix()) {
            return Err(BooksError::Validation(format!(
                "Account code '{}' does not match type {}",
                account.code,
                account.account_type.label()
            )));
        }
        Ok(())
    }
}

/// Record validator that also checks bank and tax identifiers
pub struct StrictRecordValidator;

impl RecordValidator for StrictRecordValidator {
    fn validate_expense(&self, expense: &Expense) -> BooksResult<()> {
        DefaultRecordValidator.validate_expense(expense)?;
        if let Some(gstin) = expense.supplier_gstin.as_deref().filter(|g| !g.is_empty()) {
            validate_gstin(gstin)?;
        }
        Ok(())
    }

    fn validate_vendor(&self, vendor: &Vendor) -> BooksResult<()> {
        DefaultRecordValidator.validate_vendor(vendor)?;
        if !vendor.bank_ifsc.is_empty() {
            validate_ifsc(&vendor.bank_ifsc)?;
        }
        Ok(())
    }

    fn validate_bank_account(&self, account: &BankAccount) -> BooksResult<()> {
        DefaultRecordValidator.validate_bank_account(account)?;
        if account.holder_name.trim().is_empty() {
            return Err(BooksError::Validation(
                "Account holder name is required".to_string(),
            ));
        }
        if !account.account_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(BooksError::Validation(
                "Account number can only contain digits".to_string(),
            ));
        }
        validate_ifsc(&account.ifsc_code)
    }
}
