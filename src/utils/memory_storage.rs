//! In-memory storage implementation for testing, with JSON backups

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::activity::{ActivityEntry, ActivityQuery};
use crate::crm::{Lead, Reminder};
use crate::records::{BankAccount, Expense, Vendor};
use crate::revenue::RevenueEntry;
use crate::tax::GstRecord;
use crate::traits::*;
use crate::types::*;

type Table<T> = Arc<RwLock<HashMap<String, T>>>;

fn read<T>(table: &Table<T>) -> BooksResult<RwLockReadGuard<'_, HashMap<String, T>>> {
    table
        .read()
        .map_err(|_| BooksError::Storage("storage lock poisoned".to_string()))
}

fn write<T>(table: &Table<T>) -> BooksResult<RwLockWriteGuard<'_, HashMap<String, T>>> {
    table
        .write()
        .map_err(|_| BooksError::Storage("storage lock poisoned".to_string()))
}

fn in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
}

fn insert<T: Clone>(table: &Table<T>, id: &str, value: &T) -> BooksResult<()> {
    write(table)?.insert(id.to_string(), value.clone());
    Ok(())
}

fn replace<T: Clone>(table: &Table<T>, kind: RecordKind, id: &str, value: &T) -> BooksResult<()> {
    let mut guard = write(table)?;
    match guard.get_mut(id) {
        Some(slot) => {
            *slot = value.clone();
            Ok(())
        }
        None => Err(BooksError::not_found(kind, id)),
    }
}

fn remove<T>(table: &Table<T>, kind: RecordKind, id: &str) -> BooksResult<()> {
    match write(table)?.remove(id) {
        Some(_) => Ok(()),
        None => Err(BooksError::not_found(kind, id)),
    }
}

fn fetch<T: Clone>(table: &Table<T>, id: &str) -> BooksResult<Option<T>> {
    Ok(read(table)?.get(id).cloned())
}

fn rows<T: Clone>(table: &Table<T>) -> BooksResult<Vec<T>> {
    Ok(read(table)?.values().cloned().collect())
}

fn fill<T>(table: &Table<T>, items: Vec<T>, id: impl Fn(&T) -> &str) -> BooksResult<()> {
    let mut guard = write(table)?;
    guard.clear();
    for item in items {
        guard.insert(id(&item).to_string(), item);
    }
    Ok(())
}

fn sorted_vouchers(mut vouchers: Vec<Voucher>) -> Vec<Voucher> {
    vouchers.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
    vouchers
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same tables, so the ledger, the books and the CRM desk
/// can each hold a handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    accounts: Table<Account>,
    vouchers: Table<Voucher>,
    gst_records: Table<GstRecord>,
    revenues: Table<RevenueEntry>,
    expenses: Table<Expense>,
    vendors: Table<Vendor>,
    bank_accounts: Table<BankAccount>,
    leads: Table<Lead>,
    reminders: Table<Reminder>,
    activities: Table<ActivityEntry>,
}

/// Format version written into every backup
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Every table of a [`MemoryStorage`], as written to a JSON backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub version: String,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub vouchers: Vec<Voucher>,
    #[serde(default)]
    pub gst_records: Vec<GstRecord>,
    #[serde(default)]
    pub revenues: Vec<RevenueEntry>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub bank_accounts: Vec<BankAccount>,
    #[serde(default)]
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub activities: Vec<ActivityEntry>,
}

impl StorageSnapshot {
    /// Records across all tables
    pub fn record_count(&self) -> usize {
        self.accounts.len()
            + self.vouchers.len()
            + self.gst_records.len()
            + self.revenues.len()
            + self.expenses.len()
            + self.vendors.len()
            + self.bank_accounts.len()
            + self.leads.len()
            + self.reminders.len()
            + self.activities.len()
    }
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> BooksResult<()> {
        write(&self.accounts)?.clear();
        write(&self.vouchers)?.clear();
        write(&self.gst_records)?.clear();
        write(&self.revenues)?.clear();
        write(&self.expenses)?.clear();
        write(&self.vendors)?.clear();
        write(&self.bank_accounts)?.clear();
        write(&self.leads)?.clear();
        write(&self.reminders)?.clear();
        write(&self.activities)?.clear();
        Ok(())
    }

    /// Copy of every table
    pub fn snapshot(&self) -> BooksResult<StorageSnapshot> {
        Ok(StorageSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            timestamp: now(),
            accounts: rows(&self.accounts)?,
            vouchers: sorted_vouchers(rows(&self.vouchers)?),
            gst_records: rows(&self.gst_records)?,
            revenues: rows(&self.revenues)?,
            expenses: rows(&self.expenses)?,
            vendors: rows(&self.vendors)?,
            bank_accounts: rows(&self.bank_accounts)?,
            leads: rows(&self.leads)?,
            reminders: rows(&self.reminders)?,
            activities: rows(&self.activities)?,
        })
    }

    /// Replace every table with the snapshot's contents
    pub fn restore(&self, snapshot: StorageSnapshot) -> BooksResult<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BooksError::Storage(format!(
                "unsupported backup version {}",
                snapshot.version
            )));
        }
        fill(&self.accounts, snapshot.accounts, |a| a.id.as_str())?;
        fill(&self.vouchers, snapshot.vouchers, |v| v.id.as_str())?;
        fill(&self.gst_records, snapshot.gst_records, |r| r.id.as_str())?;
        fill(&self.revenues, snapshot.revenues, |r| r.id.as_str())?;
        fill(&self.expenses, snapshot.expenses, |e| e.id.as_str())?;
        fill(&self.vendors, snapshot.vendors, |v| v.id.as_str())?;
        fill(&self.bank_accounts, snapshot.bank_accounts, |a| a.id.as_str())?;
        fill(&self.leads, snapshot.leads, |l| l.lead_id.as_str())?;
        fill(&self.reminders, snapshot.reminders, |r| r.id.as_str())?;
        fill(&self.activities, snapshot.activities, |a| a.id.as_str())?;
        Ok(())
    }

    /// Pretty-printed JSON backup of every table
    pub fn export_json(&self) -> BooksResult<String> {
        serde_json::to_string_pretty(&self.snapshot()?)
            .map_err(|e| BooksError::Storage(format!("cannot write backup: {e}")))
    }

    /// Restore from a JSON backup, returning what was loaded
    ///
    /// The backup is parsed in full before any table is touched.
    pub fn import_json(&self, json: &str) -> BooksResult<StorageSnapshot> {
        let snapshot: StorageSnapshot = serde_json::from_str(json)
            .map_err(|e| BooksError::Storage(format!("invalid backup: {e}")))?;
        self.restore(snapshot.clone())?;
        Ok(snapshot)
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn save_account(&mut self, account: &Account) -> BooksResult<()> {
        insert(&self.accounts, &account.id, account)
    }

    async fn get_account(&self, account_id: &str) -> BooksResult<Option<Account>> {
        fetch(&self.accounts, account_id)
    }

    async fn find_account_by_name(&self, name: &str) -> BooksResult<Option<Account>> {
        Ok(read(&self.accounts)?
            .values()
            .find(|account| account.name == name)
            .cloned())
    }

    async fn list_accounts(&self, account_type: Option<AccountType>) -> BooksResult<Vec<Account>> {
        let accounts = read(&self.accounts)?;
        let mut filtered: Vec<Account> = accounts
            .values()
            .filter(|account| account_type.is_none_or(|t| account.account_type == t))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(filtered)
    }

    async fn update_account(&mut self, account: &Account) -> BooksResult<()> {
        replace(&self.accounts, RecordKind::Account, &account.id, account)
    }

    async fn save_voucher(&mut self, voucher: &Voucher) -> BooksResult<()> {
        insert(&self.vouchers, &voucher.id, voucher)
    }

    async fn get_voucher(&self, voucher_id: &str) -> BooksResult<Option<Voucher>> {
        fetch(&self.vouchers, voucher_id)
    }

    async fn get_account_vouchers(
        &self,
        account_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>> {
        let vouchers = read(&self.vouchers)?;
        let filtered = vouchers
            .values()
            .filter(|v| v.entries.iter().any(|e| e.account_id == account_id))
            .filter(|v| in_range(v.date, start_date, end_date))
            .cloned()
            .collect();
        Ok(sorted_vouchers(filtered))
    }

    async fn get_vouchers(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>> {
        let vouchers = read(&self.vouchers)?;
        let filtered = vouchers
            .values()
            .filter(|v| in_range(v.date, start_date, end_date))
            .cloned()
            .collect();
        Ok(sorted_vouchers(filtered))
    }

    async fn vouchers_for_reference(&self, reference: &Reference) -> BooksResult<Vec<Voucher>> {
        let vouchers = read(&self.vouchers)?;
        let filtered = vouchers
            .values()
            .filter(|v| v.reference.as_ref() == Some(reference))
            .cloned()
            .collect();
        Ok(sorted_vouchers(filtered))
    }

    async fn delete_voucher(&mut self, voucher_id: &str) -> BooksResult<()> {
        remove(&self.vouchers, RecordKind::Voucher, voucher_id)
    }

    async fn get_account_balance(
        &self,
        account_id: &str,
        as_of_date: Option<NaiveDate>,
    ) -> BooksResult<BigDecimal> {
        let account = self
            .get_account(account_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Account, account_id))?;

        // If no date specified, return current balance
        if as_of_date.is_none() {
            return Ok(account.balance);
        }

        let mut balance = BigDecimal::from(0);
        let vouchers = self
            .get_account_vouchers(account_id, None, as_of_date)
            .await?;

        for voucher in vouchers {
            for entry in voucher.entries {
                if entry.account_id == account_id {
                    balance += signed_effect(account.account_type, entry.entry_type, &entry.amount);
                }
            }
        }

        Ok(balance)
    }

    async fn save_gst_record(&mut self, record: &GstRecord) -> BooksResult<()> {
        insert(&self.gst_records, &record.id, record)
    }

    async fn list_gst_records(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BooksResult<Vec<GstRecord>> {
        let records = read(&self.gst_records)?;
        let mut filtered: Vec<GstRecord> = records
            .values()
            .filter(|r| in_range(r.date, start_date, end_date))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.date.cmp(&b.date).then(a.invoice_number.cmp(&b.invoice_number)));
        Ok(filtered)
    }

    async fn gst_records_for_reference(&self, reference_id: &str) -> BooksResult<Vec<GstRecord>> {
        Ok(read(&self.gst_records)?
            .values()
            .filter(|r| r.reference_id == reference_id)
            .cloned()
            .collect())
    }

    async fn delete_gst_records_for_reference(&mut self, reference_id: &str) -> BooksResult<usize> {
        let mut records = write(&self.gst_records)?;
        let before = records.len();
        records.retain(|_, r| r.reference_id != reference_id);
        Ok(before - records.len())
    }
}

#[async_trait]
impl RecordStorage for MemoryStorage {
    async fn save_revenue(&mut self, revenue: &RevenueEntry) -> BooksResult<()> {
        insert(&self.revenues, &revenue.id, revenue)
    }

    async fn get_revenue(&self, revenue_id: &str) -> BooksResult<Option<RevenueEntry>> {
        fetch(&self.revenues, revenue_id)
    }

    async fn list_revenues(&self) -> BooksResult<Vec<RevenueEntry>> {
        let mut revenues: Vec<RevenueEntry> = read(&self.revenues)?.values().cloned().collect();
        revenues.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(revenues)
    }

    async fn update_revenue(&mut self, revenue: &RevenueEntry) -> BooksResult<()> {
        replace(&self.revenues, RecordKind::Revenue, &revenue.id, revenue)
    }

    async fn delete_revenue(&mut self, revenue_id: &str) -> BooksResult<()> {
        remove(&self.revenues, RecordKind::Revenue, revenue_id)
    }

    async fn save_expense(&mut self, expense: &Expense) -> BooksResult<()> {
        insert(&self.expenses, &expense.id, expense)
    }

    async fn get_expense(&self, expense_id: &str) -> BooksResult<Option<Expense>> {
        fetch(&self.expenses, expense_id)
    }

    async fn list_expenses(&self) -> BooksResult<Vec<Expense>> {
        let mut expenses: Vec<Expense> = read(&self.expenses)?.values().cloned().collect();
        expenses.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(expenses)
    }

    async fn update_expense(&mut self, expense: &Expense) -> BooksResult<()> {
        replace(&self.expenses, RecordKind::Expense, &expense.id, expense)
    }

    async fn delete_expense(&mut self, expense_id: &str) -> BooksResult<()> {
        remove(&self.expenses, RecordKind::Expense, expense_id)
    }

    async fn save_vendor(&mut self, vendor: &Vendor) -> BooksResult<()> {
        insert(&self.vendors, &vendor.id, vendor)
    }

    async fn get_vendor(&self, vendor_id: &str) -> BooksResult<Option<Vendor>> {
        fetch(&self.vendors, vendor_id)
    }

    async fn list_vendors(&self) -> BooksResult<Vec<Vendor>> {
        let mut vendors: Vec<Vendor> = read(&self.vendors)?.values().cloned().collect();
        vendors.sort_by(|a, b| a.vendor_name.cmp(&b.vendor_name));
        Ok(vendors)
    }

    async fn update_vendor(&mut self, vendor: &Vendor) -> BooksResult<()> {
        replace(&self.vendors, RecordKind::Vendor, &vendor.id, vendor)
    }

    async fn delete_vendor(&mut self, vendor_id: &str) -> BooksResult<()> {
        remove(&self.vendors, RecordKind::Vendor, vendor_id)
    }

    async fn save_bank_account(&mut self, account: &BankAccount) -> BooksResult<()> {
        insert(&self.bank_accounts, &account.id, account)
    }

    async fn get_bank_account(&self, account_id: &str) -> BooksResult<Option<BankAccount>> {
        fetch(&self.bank_accounts, account_id)
    }

    async fn list_bank_accounts(&self) -> BooksResult<Vec<BankAccount>> {
        let mut accounts: Vec<BankAccount> =
            read(&self.bank_accounts)?.values().cloned().collect();
        accounts.sort_by(|a, b| a.bank_name.cmp(&b.bank_name));
        Ok(accounts)
    }

    async fn update_bank_account(&mut self, account: &BankAccount) -> BooksResult<()> {
        replace(&self.bank_accounts, RecordKind::BankAccount, &account.id, account)
    }

    async fn delete_bank_account(&mut self, account_id: &str) -> BooksResult<()> {
        remove(&self.bank_accounts, RecordKind::BankAccount, account_id)
    }
}

#[async_trait]
impl CrmStorage for MemoryStorage {
    async fn save_lead(&mut self, lead: &Lead) -> BooksResult<()> {
        insert(&self.leads, &lead.lead_id, lead)
    }

    async fn get_lead(&self, lead_id: &str) -> BooksResult<Option<Lead>> {
        fetch(&self.leads, lead_id)
    }

    async fn find_referrer(&self, reference: &str) -> BooksResult<Option<Lead>> {
        Ok(read(&self.leads)?
            .values()
            .find(|lead| lead.answers_to(reference))
            .cloned())
    }

    async fn list_leads(&self) -> BooksResult<Vec<Lead>> {
        let mut leads: Vec<Lead> = read(&self.leads)?.values().cloned().collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn update_lead(&mut self, lead: &Lead) -> BooksResult<()> {
        replace(&self.leads, RecordKind::Lead, &lead.lead_id, lead)
    }

    async fn delete_lead(&mut self, lead_id: &str) -> BooksResult<()> {
        remove(&self.leads, RecordKind::Lead, lead_id)
    }

    async fn save_reminder(&mut self, reminder: &Reminder) -> BooksResult<()> {
        insert(&self.reminders, &reminder.id, reminder)
    }

    async fn get_reminder(&self, reminder_id: &str) -> BooksResult<Option<Reminder>> {
        fetch(&self.reminders, reminder_id)
    }

    async fn list_reminders(&self) -> BooksResult<Vec<Reminder>> {
        let mut reminders: Vec<Reminder> = read(&self.reminders)?.values().cloned().collect();
        reminders.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(reminders)
    }

    async fn update_reminder(&mut self, reminder: &Reminder) -> BooksResult<()> {
        replace(&self.reminders, RecordKind::Reminder, &reminder.id, reminder)
    }

    async fn delete_reminder(&mut self, reminder_id: &str) -> BooksResult<()> {
        remove(&self.reminders, RecordKind::Reminder, reminder_id)
    }
}

#[async_trait]
impl ActivityStorage for MemoryStorage {
    async fn save_activity(&mut self, entry: &ActivityEntry) -> BooksResult<()> {
        insert(&self.activities, &entry.id, entry)
    }

    async fn list_activities(&self, query: &ActivityQuery) -> BooksResult<Vec<ActivityEntry>> {
        Ok(query.select(rows(&self.activities)?))
    }
}
