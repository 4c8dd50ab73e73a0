//! Back office settings

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::tax::{GstCalculator, ServiceRates};
use crate::types::*;

/// Company details printed on invoices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanySettings {
    pub name: String,
    pub gstin: String,
    /// Prefix of generated invoice numbers
    pub invoice_prefix: String,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            name: "Travel Agency".to_string(),
            gstin: String::new(),
            invoice_prefix: "INV-".to_string(),
        }
    }
}

/// GST rates per service and the default supply type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GstSettings {
    pub rates: ServiceRates,
    /// Charge IGST instead of CGST + SGST
    pub inter_state: bool,
}

/// Referral programme and follow-up windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmSettings {
    /// Loyalty points credited per referral
    pub referral_points: u32,
    /// Referrals needed for the royal client label
    pub royal_client_threshold: usize,
    /// How far ahead the upcoming travel list looks, in days
    pub upcoming_travel_days: i64,
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self {
            referral_points: 10,
            royal_client_threshold: 5,
            upcoming_travel_days: 10,
        }
    }
}

/// Everything configurable about the back office
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooksConfig {
    pub company: CompanySettings,
    pub gst: GstSettings,
    pub crm: CrmSettings,
    /// Months shown on the dashboard chart
    pub monthly_overview_months: usize,
}

impl Default for BooksConfig {
    fn default() -> Self {
        Self {
            company: CompanySettings::default(),
            gst: GstSettings::default(),
            crm: CrmSettings::default(),
            monthly_overview_months: 6,
        }
    }
}

impl BooksConfig {
    /// Parse and validate settings from JSON; missing keys take defaults
    pub fn from_json_str(json: &str) -> BooksResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BooksError::Config(format!("invalid settings: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> BooksResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| BooksError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> BooksResult<()> {
        if self.company.invoice_prefix.trim().is_empty() {
            return Err(BooksError::Config(
                "invoice prefix cannot be empty".to_string(),
            ));
        }
        self.gst
            .rates
            .validate()
            .map_err(|e| BooksError::Config(e.to_string()))?;
        if self.crm.royal_client_threshold == 0 {
            return Err(BooksError::Config(
                "royal client threshold must be at least one referral".to_string(),
            ));
        }
        if self.crm.upcoming_travel_days < 0 {
            return Err(BooksError::Config(
                "upcoming travel window cannot be negative".to_string(),
            ));
        }
        if self.monthly_overview_months == 0 {
            return Err(BooksError::Config(
                "monthly overview needs at least one month".to_string(),
            ));
        }
        Ok(())
    }

    /// GST calculator for these settings
    pub fn gst_calculator(&self) -> GstCalculator {
        GstCalculator::new(self.gst.rates.clone(), self.gst.inter_state)
    }

    pub fn rate_for(&self, source: crate::revenue::RevenueSource) -> BigDecimal {
        self.gst.rates.rate_for(source)
    }
}
