//! Chart of accounts management

use tracing::debug;

use crate::traits::*;
use crate::types::*;

pub const CASH_ACCOUNT: &str = "Cash";
pub const BANK_ACCOUNT: &str = "Bank - Current Account";
pub const SAVINGS_ACCOUNT: &str = "Bank - Savings Account";
pub const CGST_PAYABLE: &str = "GST Payable - CGST";
pub const SGST_PAYABLE: &str = "GST Payable - SGST";
pub const IGST_PAYABLE: &str = "GST Payable - IGST";
pub const VENDOR_COSTS: &str = "Vendor Costs";

/// Accounts every agency ledger starts with, in code order
pub const STANDARD_CHART: &[(&str, AccountType)] = &[
    (CASH_ACCOUNT, AccountType::Asset),
    (BANK_ACCOUNT, AccountType::Asset),
    (SAVINGS_ACCOUNT, AccountType::Asset),
    ("Accounts Receivable", AccountType::Asset),
    ("Accounts Payable", AccountType::Liability),
    (CGST_PAYABLE, AccountType::Liability),
    (SGST_PAYABLE, AccountType::Liability),
    (IGST_PAYABLE, AccountType::Liability),
    ("Visa Revenue", AccountType::Income),
    ("Ticket Revenue", AccountType::Income),
    ("Package Revenue", AccountType::Income),
    ("Insurance Revenue", AccountType::Income),
    ("Other Revenue", AccountType::Income),
    ("Office Rent", AccountType::Expense),
    ("Staff Salaries", AccountType::Expense),
    ("Marketing", AccountType::Expense),
    ("Utilities", AccountType::Expense),
    ("Travel Expenses", AccountType::Expense),
    ("Miscellaneous", AccountType::Expense),
    (VENDOR_COSTS, AccountType::Expense),
];

/// Cash book account for a payment mode
pub fn cash_or_bank(is_cash: bool) -> &'static str {
    if is_cash {
        CASH_ACCOUNT
    } else {
        BANK_ACCOUNT
    }
}

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn AccountValidator>,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultAccountValidator),
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a new account with the next free code
    pub async fn create_account(
        &mut self,
        name: &str,
        account_type: AccountType,
    ) -> BooksResult<Account> {
        if self.storage.find_account_by_name(name).await?.is_some() {
            return Err(BooksError::Validation(format!(
                "Account '{name}' already exists"
            )));
        }

        let code = self.next_code(account_type).await?;
        let account = Account::new(code, name.to_string(), account_type);
        self.validator.validate_account(&account)?;

        self.storage.save_account(&account).await?;
        debug!(code = %account.code, name = %account.name, "created ledger account");
        Ok(account)
    }

    /// The named account, created with `account_type` on first use
    pub async fn ensure_account(
        &mut self,
        name: &str,
        account_type: AccountType,
    ) -> BooksResult<Account> {
        match self.storage.find_account_by_name(name).await? {
            Some(account) => Ok(account),
            None => self.create_account(name, account_type).await,
        }
    }

    /// Seed the standard chart; accounts that already exist are left alone
    pub async fn seed_standard_chart(&mut self) -> BooksResult<Vec<Account>> {
        let mut accounts = Vec::with_capacity(STANDARD_CHART.len());
        for (name, account_type) in STANDARD_CHART {
            accounts.push(self.ensure_account(name, *account_type).await?);
        }
        Ok(accounts)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> BooksResult<Option<Account>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: &str) -> BooksResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Account, account_id))
    }

    pub async fn find_by_name(&self, name: &str) -> BooksResult<Option<Account>> {
        self.storage.find_account_by_name(name).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> BooksResult<Vec<Account>> {
        self.storage.list_accounts(None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> BooksResult<Vec<Account>> {
        self.storage.list_accounts(Some(account_type)).await
    }

    /// Get account balance
    pub async fn get_balance(
        &self,
        account_id: &str,
        as_of_date: Option<chrono::NaiveDate>,
    ) -> BooksResult<bigdecimal::BigDecimal> {
        self.storage
            .get_account_balance(account_id, as_of_date)
            .await
    }

    /// Zero every running balance, returning how many accounts changed
    pub async fn reset_balances(&mut self) -> BooksResult<usize> {
        let zero = bigdecimal::BigDecimal::from(0);
        let mut reset = 0;
        for mut account in self.storage.list_accounts(None).await? {
            if account.balance != zero {
                account.balance = zero.clone();
                self.storage.update_account(&account).await?;
                reset += 1;
            }
        }
        Ok(reset)
    }

    // codes run across the whole chart: AST-0001 .. LIA-0005 ..
    async fn next_code(&self, account_type: AccountType) -> BooksResult<String> {
        let count = self.storage.list_accounts(None).await?.len();
        Ok(format!("{}-{:04}", account_type.code_prefix(), count + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let mut manager = AccountManager::new(MemoryStorage::new());

        let first = manager.seed_standard_chart().await.unwrap();
        let second = manager.seed_standard_chart().await.unwrap();

        assert_eq!(first.len(), STANDARD_CHART.len());
        assert_eq!(first, second);
        assert_eq!(first[0].code, "AST-0001");
        assert_eq!(first[4].code, "LIA-0005");
        assert_eq!(
            manager.list_accounts().await.unwrap().len(),
            STANDARD_CHART.len()
        );
    }

    #[tokio::test]
    async fn test_ensure_account_creates_unknown_category() {
        let mut manager = AccountManager::new(MemoryStorage::new());
        manager.seed_standard_chart().await.unwrap();

        let printing = manager
            .ensure_account("Printing & Stationery", AccountType::Expense)
            .await
            .unwrap();
        assert_eq!(printing.code, format!("EXP-{:04}", STANDARD_CHART.len() + 1));

        let again = manager
            .ensure_account("Printing & Stationery", AccountType::Expense)
            .await
            .unwrap();
        assert_eq!(again.id, printing.id);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let mut manager = AccountManager::new(MemoryStorage::new());
        manager.create_account("Cash", AccountType::Asset).await.unwrap();
        assert!(manager
            .create_account("Cash", AccountType::Asset)
            .await
            .is_err());
    }
}
