//! API clients for market data providers

pub mod models;
pub mod yahoo;

pub use yahoo::YahooFinanceClient;
