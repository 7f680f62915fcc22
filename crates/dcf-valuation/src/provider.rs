//! Market data provider abstraction

use crate::error::Result;
use crate::series::PriceSeries;
use crate::statement::{FinancialStatement, StatementKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Live quote figures needed for weighting and comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Current ask price
    pub ask: Option<f64>,
    /// Market capitalisation
    pub market_cap: Option<f64>,
    /// Total debt as reported in the quote metadata
    pub total_debt: Option<f64>,
}

/// Source of prices, statements and quote metadata.
///
/// Implementations classify failures through [`crate::ErrorKind`] and never
/// retry on their own; retry policy belongs to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily closes for `symbol` between `start` and `end`
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries>;

    /// Annual values of the line items `kind` carries
    async fn statement(&self, symbol: &str, kind: StatementKind) -> Result<FinancialStatement>;

    /// Ask price, market cap and total debt
    async fn snapshot(&self, symbol: &str) -> Result<QuoteSnapshot>;
}
