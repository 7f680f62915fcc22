//! Yahoo Finance response models.
//!
//! Only the fields the valuation reads are modelled. Yahoo wraps numbers as
//! `{"raw": 123.45, "fmt": "123.45"}` and sends `{}` when a value is absent.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Number with raw and formatted representations
#[derive(Debug, Clone, Deserialize)]
pub struct RawNumber {
    pub raw: Option<f64>,
}

/// Wrapper of the fundamentals-timeseries endpoint
#[derive(Debug, Deserialize)]
pub struct TimeseriesResponse {
    pub timeseries: TimeseriesBody,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesBody {
    /// One object per requested type; the values sit under a key equal to
    /// the type name, so each result is kept as a raw map
    #[serde(default)]
    pub result: Option<Vec<Map<String, Value>>>,
    pub error: Option<Value>,
}

/// One reported period of a fundamentals series
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesEntry {
    pub as_of_date: String,
    pub reported_value: Option<RawNumber>,
}

/// Main response wrapper for the quoteSummary endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResponse {
    pub quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
pub struct QuoteSummary {
    pub result: Option<Vec<QuoteSummaryResult>>,
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResult {
    pub summary_detail: Option<SummaryDetail>,
    pub financial_data: Option<FinancialData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDetail {
    pub ask: Option<RawNumber>,
    pub market_cap: Option<RawNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialData {
    pub total_debt: Option<RawNumber>,
}
