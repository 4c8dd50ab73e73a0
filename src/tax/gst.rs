//! GST (Goods and Services Tax) calculation for the agency's services

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::revenue::RevenueSource;
use crate::types::round_money;

/// GST rate split into its central, state and integrated parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstRate {
    /// Total GST rate percentage (e.g. 18 for 18%)
    pub total_rate: BigDecimal,
    pub cgst_rate: BigDecimal,
    pub sgst_rate: BigDecimal,
    pub igst_rate: BigDecimal,
}

impl GstRate {
    /// Intra-state supply: half CGST, half SGST
    pub fn intra_state(total_rate: BigDecimal) -> Self {
        let half_rate = &total_rate / BigDecimal::from(2);
        Self {
            total_rate,
            cgst_rate: half_rate.clone(),
            sgst_rate: half_rate,
            igst_rate: BigDecimal::from(0),
        }
    }

    /// Inter-state supply: all IGST
    pub fn inter_state(total_rate: BigDecimal) -> Self {
        Self {
            total_rate: total_rate.clone(),
            cgst_rate: BigDecimal::from(0),
            sgst_rate: BigDecimal::from(0),
            igst_rate: total_rate,
        }
    }

    pub fn is_inter_state(&self) -> bool {
        self.igst_rate > BigDecimal::from(0)
    }

    /// Validate that the GST rate structure is correct
    pub fn validate(&self) -> Result<(), GstError> {
        if self.total_rate < BigDecimal::from(0) || self.total_rate > BigDecimal::from(100) {
            return Err(GstError::InvalidRate(format!(
                "GST rate must be between 0 and 100, got {}",
                self.total_rate
            )));
        }

        let calculated_total = &self.cgst_rate + &self.sgst_rate + &self.igst_rate;
        if calculated_total != self.total_rate {
            return Err(GstError::InvalidRate(format!(
                "GST components don't add up to total rate: {} != {}",
                calculated_total, self.total_rate
            )));
        }

        if self.igst_rate == BigDecimal::from(0) && self.cgst_rate != self.sgst_rate {
            return Err(GstError::InvalidRate(
                "CGST and SGST rates must be equal for intra-state supplies".to_string(),
            ));
        }

        if self.igst_rate > BigDecimal::from(0)
            && (self.cgst_rate > BigDecimal::from(0) || self.sgst_rate > BigDecimal::from(0))
        {
            return Err(GstError::InvalidRate(
                "Only IGST applies to inter-state supplies".to_string(),
            ));
        }

        Ok(())
    }
}

/// GST breakdown of one taxable amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstCalculation {
    pub taxable_amount: BigDecimal,
    pub gst_rate: GstRate,
    pub cgst: BigDecimal,
    pub sgst: BigDecimal,
    pub igst: BigDecimal,
    /// CGST + SGST + IGST
    pub total_gst: BigDecimal,
    /// Taxable amount plus GST
    pub total_amount: BigDecimal,
}

impl GstCalculation {
    /// Tax on top of a taxable amount: `cgst = sgst = taxable * rate / 200`
    pub fn calculate(taxable_amount: BigDecimal, gst_rate: GstRate) -> Result<Self, GstError> {
        gst_rate.validate()?;

        let cgst = (&taxable_amount * &gst_rate.cgst_rate) / BigDecimal::from(100);
        let sgst = (&taxable_amount * &gst_rate.sgst_rate) / BigDecimal::from(100);
        let igst = (&taxable_amount * &gst_rate.igst_rate) / BigDecimal::from(100);

        let total_gst = &cgst + &sgst + &igst;
        let total_amount = &taxable_amount + &total_gst;

        Ok(Self {
            taxable_amount,
            gst_rate,
            cgst,
            sgst,
            igst,
            total_gst,
            total_amount,
        })
    }

    /// Taxable amount hidden inside a GST-inclusive total (unrounded)
    pub fn reverse_calculate(total_amount: BigDecimal, gst_rate: GstRate) -> Result<Self, GstError> {
        gst_rate.validate()?;

        let divisor = BigDecimal::from(100) + &gst_rate.total_rate;
        let taxable_amount = (&total_amount * BigDecimal::from(100)) / divisor;

        Self::calculate(taxable_amount, gst_rate)
    }

    /// Split a GST-inclusive amount into two-decimal parts that add back up
    /// to exactly `total_amount`
    ///
    /// Total GST is rounded first; the taxable amount takes the remainder,
    /// and on intra-state supplies SGST takes whatever CGST's rounding left.
    pub fn split_inclusive(total_amount: BigDecimal, gst_rate: GstRate) -> Result<Self, GstError> {
        let exact = Self::reverse_calculate(total_amount.clone(), gst_rate)?;

        let total_gst = round_money(&exact.total_gst);
        let taxable_amount = &total_amount - &total_gst;
        let (cgst, sgst, igst) = if exact.gst_rate.is_inter_state() {
            (BigDecimal::from(0), BigDecimal::from(0), total_gst.clone())
        } else {
            let cgst = round_money(&(&total_gst / BigDecimal::from(2)));
            let sgst = &total_gst - &cgst;
            (cgst, sgst, BigDecimal::from(0))
        };

        Ok(Self {
            taxable_amount,
            gst_rate: exact.gst_rate,
            cgst,
            sgst,
            igst,
            total_gst,
            total_amount,
        })
    }

    /// Round every figure to two decimals for display
    pub fn rounded(&self) -> Self {
        Self {
            taxable_amount: round_money(&self.taxable_amount),
            gst_rate: self.gst_rate.clone(),
            cgst: round_money(&self.cgst),
            sgst: round_money(&self.sgst),
            igst: round_money(&self.igst),
            total_gst: round_money(&self.total_gst),
            total_amount: round_money(&self.total_amount),
        }
    }
}

/// GST rate charged per line of business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRates {
    pub rates: BTreeMap<RevenueSource, BigDecimal>,
    /// Applied to sources missing from `rates`
    pub default_rate: BigDecimal,
}

impl Default for ServiceRates {
    fn default() -> Self {
        let rates = BTreeMap::from([
            (RevenueSource::Visa, BigDecimal::from(18)),
            (RevenueSource::Ticket, BigDecimal::from(5)),
            (RevenueSource::Package, BigDecimal::from(5)),
            (RevenueSource::Insurance, BigDecimal::from(18)),
            (RevenueSource::Other, BigDecimal::from(18)),
        ]);
        Self {
            rates,
            default_rate: BigDecimal::from(18),
        }
    }
}

impl ServiceRates {
    pub fn rate_for(&self, source: RevenueSource) -> BigDecimal {
        self.rates
            .get(&source)
            .cloned()
            .unwrap_or_else(|| self.default_rate.clone())
    }

    pub fn validate(&self) -> Result<(), GstError> {
        GstRate::intra_state(self.default_rate.clone()).validate()?;
        for rate in self.rates.values() {
            GstRate::intra_state(rate.clone()).validate()?;
        }
        Ok(())
    }
}

/// GST calculation engine keyed by line of business
#[derive(Debug, Clone)]
pub struct GstCalculator {
    rates: ServiceRates,
    /// Default supply type (intra-state or inter-state)
    default_is_inter_state: bool,
}

impl Default for GstCalculator {
    fn default() -> Self {
        Self::new(ServiceRates::default(), false)
    }
}

impl GstCalculator {
    pub fn new(rates: ServiceRates, default_is_inter_state: bool) -> Self {
        Self {
            rates,
            default_is_inter_state,
        }
    }

    pub fn rates(&self) -> &ServiceRates {
        &self.rates
    }

    /// Rate structure for a source, optionally overriding the supply type
    pub fn rate_for(&self, source: RevenueSource, is_inter_state: Option<bool>) -> GstRate {
        let total = self.rates.rate_for(source);
        match is_inter_state.unwrap_or(self.default_is_inter_state) {
            true => GstRate::inter_state(total),
            false => GstRate::intra_state(total),
        }
    }

    /// GST on top of a taxable amount
    pub fn calculate_for_source(
        &self,
        taxable_amount: BigDecimal,
        source: RevenueSource,
        is_inter_state: Option<bool>,
    ) -> Result<GstCalculation, GstError> {
        GstCalculation::calculate(taxable_amount, self.rate_for(source, is_inter_state))
    }

    /// Split an amount received from a client, which includes GST
    pub fn split_receipt(
        &self,
        amount: BigDecimal,
        source: RevenueSource,
    ) -> Result<GstCalculation, GstError> {
        GstCalculation::split_inclusive(amount, self.rate_for(source, None))
    }

    /// Split a GST-inclusive purchase at an explicit rate
    pub fn split_purchase(
        &self,
        amount: BigDecimal,
        total_rate: BigDecimal,
    ) -> Result<GstCalculation, GstError> {
        let rate = match self.default_is_inter_state {
            true => GstRate::inter_state(total_rate),
            false => GstRate::intra_state(total_rate),
        };
        GstCalculation::split_inclusive(amount, rate)
    }
}

/// GST-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GstError {
    #[error("Invalid GST rate: {0}")]
    InvalidRate(String),
    #[error("Revenue {0} is not invoiceable: it must be received with a positive amount")]
    NotInvoiceable(String),
    #[error("Calculation error: {0}")]
    Calculation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gst_rate_intra_state() {
        let rate = GstRate::intra_state(BigDecimal::from(18));
        assert_eq!(rate.cgst_rate, BigDecimal::from(9));
        assert_eq!(rate.sgst_rate, BigDecimal::from(9));
        assert_eq!(rate.igst_rate, BigDecimal::from(0));
        assert!(rate.validate().is_ok());
    }

    #[test]
    fn test_gst_rate_rejects_out_of_range() {
        assert!(GstRate::intra_state(BigDecimal::from(120)).validate().is_err());
        assert!(GstRate::intra_state(BigDecimal::from(-5)).validate().is_err());
    }

    #[test]
    fn test_gst_calculation() {
        let calculation =
            GstCalculation::calculate(BigDecimal::from(1000), GstRate::intra_state(BigDecimal::from(18)))
                .unwrap();

        assert_eq!(calculation.cgst, BigDecimal::from(90));
        assert_eq!(calculation.sgst, BigDecimal::from(90));
        assert_eq!(calculation.total_gst, BigDecimal::from(180));
        assert_eq!(calculation.total_amount, BigDecimal::from(1180));
    }

    #[test]
    fn test_gst_reverse_calculation() {
        let calculation = GstCalculation::reverse_calculate(
            BigDecimal::from(1180),
            GstRate::intra_state(BigDecimal::from(18)),
        )
        .unwrap();

        assert_eq!(calculation.taxable_amount, BigDecimal::from(1000));
        assert_eq!(calculation.total_gst, BigDecimal::from(180));
    }

    #[test]
    fn test_split_inclusive_adds_back_up() {
        // 10000 incl. 5%: taxable 9523.81, gst 476.19
        let split = GstCalculation::split_inclusive(
            BigDecimal::from(10000),
            GstRate::intra_state(BigDecimal::from(5)),
        )
        .unwrap();

        assert_eq!(split.total_gst, BigDecimal::new(47619.into(), 2));
        assert_eq!(split.taxable_amount, BigDecimal::new(952_381.into(), 2));
        assert_eq!(split.cgst, BigDecimal::new(23810.into(), 2));
        assert_eq!(split.sgst, BigDecimal::new(23809.into(), 2));
        assert_eq!(
            &split.taxable_amount + &split.cgst + &split.sgst,
            BigDecimal::from(10000)
        );
    }

    #[test]
    fn test_calculator_uses_service_rates() {
        let calculator = GstCalculator::default();

        let visa = calculator
            .calculate_for_source(BigDecimal::from(1000), RevenueSource::Visa, None)
            .unwrap();
        assert_eq!(visa.total_gst, BigDecimal::from(180));

        let ticket = calculator
            .calculate_for_source(BigDecimal::from(1000), RevenueSource::Ticket, None)
            .unwrap();
        assert_eq!(ticket.total_gst, BigDecimal::from(50));

        let insurance = calculator
            .calculate_for_source(BigDecimal::from(1000), RevenueSource::Insurance, Some(true))
            .unwrap();
        assert_eq!(insurance.igst, BigDecimal::from(180));
        assert_eq!(insurance.cgst, BigDecimal::from(0));
    }

    #[test]
    fn test_default_rates_list_every_source() {
        let rates = ServiceRates::default();
        for source in RevenueSource::ALL {
            assert!(rates.rates.contains_key(&source), "{source:?} missing");
        }
        assert_eq!(rates.rates[&RevenueSource::Insurance], BigDecimal::from(18));

        // a saved config shows the insurance rate instead of hiding it in the default
        let json = serde_json::to_value(&rates).unwrap();
        assert_eq!(json["rates"].as_object().unwrap().len(), 5);
    }
}
