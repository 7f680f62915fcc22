//! Discounted cash flow valuation of listed equities
//!
//! This crate estimates the intrinsic value per share of a ticker from its
//! public financial statements and price history. It includes:
//!
//! - Market data from Yahoo Finance (statements, quote metadata, daily closes)
//! - Revenue AAGR and a perpetuity growth rate from month-end returns
//! - CAPM cost of equity, cost of debt and WACC
//! - A four-year DCF with a Gordon growth terminal value
//! - An interactive query loop that retries rate-limited tickers
//!
//! # Architecture
//!
//! [`Valuator`] runs the pipeline against any [`MarketDataProvider`];
//! [`YahooFinanceClient`] is the live implementation. [`Driver`] wraps a
//! valuator with a [`RetryPolicy`] and the prompt loop.
//!
//! # Example
//!
//! ```rust,ignore
//! use dcf_utils::RunContext;
//! use dcf_valuation::{Driver, ValuationConfig, Valuator, YahooFinanceClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ValuationConfig::default().with_env()?;
//!     let client = YahooFinanceClient::new(&config)?;
//!     let ctx = RunContext::new("log");
//!
//!     let mut driver = Driver::new(Valuator::new(client, config, ctx));
//!     driver.process_ticker("AAPL", &mut std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod capital;
pub mod config;
pub mod dcf;
pub mod driver;
pub mod error;
pub mod growth;
pub mod provider;
pub mod ranking;
pub mod retry;
pub mod series;
pub mod statement;
pub mod valuation;

pub use api::YahooFinanceClient;
pub use capital::{CapitalStructure, CostOfEquity};
pub use config::{ValuationConfig, ValuationConfigBuilder};
pub use dcf::DcfValuation;
pub use driver::{Driver, DriverState, TickerOutcome};
pub use error::{ErrorKind, Result, ValuationError};
pub use provider::{MarketDataProvider, QuoteSnapshot};
pub use ranking::load_tickers;
pub use retry::RetryPolicy;
pub use series::PriceSeries;
pub use statement::{FinancialStatement, LineItem, StatementKind};
pub use valuation::{ValuationResult, Valuator};
