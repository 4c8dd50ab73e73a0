//! Ledger module containing account management and voucher posting

pub mod account;
pub mod core;
pub mod posting;

pub use account::*;
pub use core::*;
pub use posting::*;
