//! GST calculation, stored GST records and tax invoices

pub mod gst;
pub mod summary;

pub use gst::*;
pub use summary::*;
