//! # Agency Books
//!
//! Back office core for a travel agency: sales with their collections and
//! vendor costs, GST on services, a double-entry ledger kept in step with
//! every record, and a small CRM for leads and referrals.
//!
//! ## Features
//!
//! - **Revenue reconciliation**: sale price, received and pending amounts stay consistent
//! - **Vendor costs**: per-sale supplier costs, vendor payments and profit margin
//! - **GST**: inclusive splits into CGST/SGST or IGST, output and input records, tax invoices
//! - **Ledger**: chart of accounts, vouchers, trial balance, cash and bank books
//! - **Reports**: dashboard figures, monthly overview, period and vendor business reports
//! - **Activity log**: who changed what, plus JSON backup and restore
//! - **CRM**: leads, referral rewards, conversion to revenue and reminders
//! - **Storage abstraction**: async storage traits with an in-memory implementation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agency_books::{Books, BooksConfig, MemoryStorage, RevenueDraft, RevenueSource};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn run() -> agency_books::BooksResult<()> {
//! let mut books = Books::open(MemoryStorage::new(), BooksConfig::default()).await?;
//! let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
//! let sale = RevenueDraft::new(date, "Asha Menon", RevenueSource::Visa, BigDecimal::from(2360))
//!     .received(BigDecimal::from(2360));
//! let revenue = books.create_revenue(sale).await?;
//! let invoice = books.gst_invoice(&revenue.id).await?;
//! assert!(books.trial_balance(None).await?.is_balanced);
//! # let _ = invoice;
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod books;
pub mod config;
pub mod crm;
pub mod ledger;
pub mod reconciliation;
pub mod records;
pub mod reports;
pub mod revenue;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use activity::{ActivityAction, ActivityEntry, ActivityQuery};
pub use books::{Books, RebuildSummary};
pub use config::*;
pub use crm::{CrmDesk, Lead, LeadDraft, LeadFilter, LeadStatus, LeadUpdate, Reminder};
pub use ledger::*;
pub use reconciliation::*;
pub use records::*;
pub use reports::{DashboardSummary, MonthlyData, PeriodReport, ReportPeriod, VendorBusiness};
pub use revenue::*;
pub use tax::*;
pub use traits::*;
pub use types::*;
pub use utils::{MemoryStorage, StorageSnapshot};

// Re-export voucher patterns for convenience
pub use ledger::posting::patterns;
