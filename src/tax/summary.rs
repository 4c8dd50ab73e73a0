//! Stored GST records, the period summary built from them and the tax
//! invoice issued for a received sale

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::revenue::{RevenueEntry, RevenueStatus};
use crate::tax::gst::{GstCalculation, GstError};
use crate::types::*;

/// Output GST is collected on sales, input GST is paid on purchases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GstRecordKind {
    Output,
    Input,
}

/// GST booked for one revenue or expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstRecord {
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: GstRecordKind,
    pub invoice_number: String,
    /// Client for output records, supplier category for input records
    pub party_name: String,
    #[serde(default)]
    pub gstin: String,
    pub service_type: String,
    pub taxable_amount: BigDecimal,
    /// Total rate in percent
    pub gst_rate: BigDecimal,
    pub cgst: BigDecimal,
    pub sgst: BigDecimal,
    pub igst: BigDecimal,
    pub total_gst: BigDecimal,
    pub total_amount: BigDecimal,
    pub reference_id: String,
}

impl GstRecord {
    pub fn from_calculation(
        kind: GstRecordKind,
        date: NaiveDate,
        invoice_number: String,
        party_name: String,
        service_type: String,
        calculation: &GstCalculation,
        reference_id: String,
    ) -> Self {
        Self {
            id: new_id(),
            date,
            kind,
            invoice_number,
            party_name,
            gstin: String::new(),
            service_type,
            taxable_amount: calculation.taxable_amount.clone(),
            gst_rate: calculation.gst_rate.total_rate.clone(),
            cgst: calculation.cgst.clone(),
            sgst: calculation.sgst.clone(),
            igst: calculation.igst.clone(),
            total_gst: calculation.total_gst.clone(),
            total_amount: calculation.total_amount.clone(),
            reference_id,
        }
    }
}

/// Invoice number for a revenue: prefix plus the first 8 id characters
pub fn invoice_number(prefix: &str, revenue_id: &str) -> String {
    let short: String = revenue_id.chars().take(8).collect();
    format!("{prefix}{}", short.to_uppercase())
}

/// CGST/SGST/IGST totals on one side of the GST account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstTotals {
    pub cgst: BigDecimal,
    pub sgst: BigDecimal,
    pub igst: BigDecimal,
    pub total: BigDecimal,
}

impl Default for GstTotals {
    fn default() -> Self {
        Self {
            cgst: BigDecimal::from(0),
            sgst: BigDecimal::from(0),
            igst: BigDecimal::from(0),
            total: BigDecimal::from(0),
        }
    }
}

impl GstTotals {
    fn add(&mut self, record: &GstRecord) {
        self.cgst += &record.cgst;
        self.sgst += &record.sgst;
        self.igst += &record.igst;
        self.total += &record.total_gst;
    }

    fn rounded(self) -> Self {
        Self {
            cgst: round_money(&self.cgst),
            sgst: round_money(&self.sgst),
            igst: round_money(&self.igst),
            total: round_money(&self.total),
        }
    }
}

/// GST position for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstSummary {
    pub output_gst: GstTotals,
    pub input_gst: GstTotals,
    /// Output minus input
    pub net_gst_payable: BigDecimal,
    pub records: Vec<GstRecord>,
}

impl GstSummary {
    /// Summarise records, restricted to `[start, end]` when both bounds are given
    pub fn from_records(
        records: Vec<GstRecord>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Self {
        let records: Vec<GstRecord> = match (start, end) {
            (Some(start), Some(end)) => records
                .into_iter()
                .filter(|r| r.date >= start && r.date <= end)
                .collect(),
            _ => records,
        };

        let mut output_gst = GstTotals::default();
        let mut input_gst = GstTotals::default();
        for record in &records {
            match record.kind {
                GstRecordKind::Output => output_gst.add(record),
                GstRecordKind::Input => input_gst.add(record),
            }
        }

        let net_gst_payable = round_money(&(&output_gst.total - &input_gst.total));
        Self {
            output_gst: output_gst.rounded(),
            input_gst: input_gst.rounded(),
            net_gst_payable,
            records,
        }
    }
}

/// Tax invoice for a received sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxInvoice {
    pub invoice_number: String,
    pub company_name: String,
    pub date: NaiveDate,
    pub client_name: String,
    pub service_type: String,
    pub gst_rate: BigDecimal,
    pub taxable_amount: BigDecimal,
    pub cgst: BigDecimal,
    pub sgst: BigDecimal,
    pub igst: BigDecimal,
    pub total_gst: BigDecimal,
    pub total_amount: BigDecimal,
}

impl TaxInvoice {
    /// Only received sales with money collected can be invoiced
    pub fn ensure_invoiceable(revenue: &RevenueEntry) -> Result<(), GstError> {
        if revenue.status != RevenueStatus::Completed
            || revenue.received_amount <= BigDecimal::from(0)
        {
            return Err(GstError::NotInvoiceable(revenue.id.clone()));
        }
        Ok(())
    }

    /// Build the invoice from the revenue and its output GST record
    pub fn issue(
        company_name: &str,
        revenue: &RevenueEntry,
        record: &GstRecord,
    ) -> Result<Self, GstError> {
        Self::ensure_invoiceable(revenue)?;

        Ok(Self {
            invoice_number: record.invoice_number.clone(),
            company_name: company_name.to_string(),
            date: revenue.date,
            client_name: revenue.client_name.clone(),
            service_type: record.service_type.clone(),
            gst_rate: record.gst_rate.clone(),
            taxable_amount: record.taxable_amount.clone(),
            cgst: record.cgst.clone(),
            sgst: record.sgst.clone(),
            igst: record.igst.clone(),
            total_gst: record.total_gst.clone(),
            total_amount: record.total_amount.clone(),
        })
    }

    /// Half the total rate, as printed next to CGST and SGST
    pub fn split_rate(&self) -> BigDecimal {
        &self.gst_rate / BigDecimal::from(2)
    }
}
