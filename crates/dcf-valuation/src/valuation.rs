//! End-to-end valuation of one ticker

use crate::capital::{self, CapitalStructure, CostOfEquity};
use crate::config::ValuationConfig;
use crate::dcf::DcfValuation;
use crate::error::{Result, ValuationError};
use crate::growth;
use crate::provider::MarketDataProvider;
use crate::statement::{LineItem, StatementKind};
use dcf_utils::RunContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::Instrument;

/// Everything computed for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub ticker: String,
    pub wacc: f64,
    pub total_present_value: f64,
    pub aagr: f64,
    pub perpetuity_growth: f64,
    pub market_cap: f64,
    pub total_debt: f64,
    pub tax_rate: f64,
    pub cost_of_equity: CostOfEquity,
    pub cost_of_debt: f64,
    pub shares_outstanding: f64,
    pub intrinsic_value_per_share: f64,
    /// Current ask; NaN when the quote carries none
    pub current_price: f64,
    /// Intrinsic value per share minus the current price
    pub undervalue_overvalue: f64,
    pub dcf: DcfValuation,
}

impl fmt::Display for ValuationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ticker: {}", self.ticker)?;
        writeln!(f, "WACC: {}", self.wacc)?;
        writeln!(f, "Total Present Value: {}", self.total_present_value)?;
        writeln!(f, "AAGR: {}", self.aagr)?;
        writeln!(f, "Intrinsic Value per Share: {}", self.intrinsic_value_per_share)?;
        writeln!(f, "Current Stock Price: {}", self.current_price)?;
        write!(f, "Undervalue/Overvalue: {}", self.undervalue_overvalue)
    }
}

/// Runs the valuation pipeline against a market data provider
pub struct Valuator<P> {
    provider: P,
    config: ValuationConfig,
    ctx: RunContext,
}

impl<P: MarketDataProvider> Valuator<P> {
    pub fn new(provider: P, config: ValuationConfig, ctx: RunContext) -> Self {
        Self {
            provider,
            config,
            ctx,
        }
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Value `ticker`, logging every intermediate into the session log
    pub async fn value(&self, ticker: &str) -> Result<ValuationResult> {
        let span = tracing::info_span!(
            "valuation",
            session_id = %self.ctx.session_id(),
            ticker = %ticker,
        );
        self.value_inner(ticker).instrument(span).await
    }

    async fn value_inner(&self, ticker: &str) -> Result<ValuationResult> {
        tracing::info!("Starting processing TICKER");
        let periods = self.config.statement_periods;

        let income = self.provider.statement(ticker, StatementKind::Income).await?;
        let cash_flow = self.provider.statement(ticker, StatementKind::CashFlow).await?;
        let balance_sheet = self
            .provider
            .statement(ticker, StatementKind::BalanceSheet)
            .await?;
        let snapshot = self.provider.snapshot(ticker).await?;

        let current_price = snapshot.ask.unwrap_or(f64::NAN);
        tracing::info!(current_price, "Current stock price");

        let free_cash_flows = cash_flow.recent(LineItem::FreeCashFlow, periods)?;
        tracing::info!(?free_cash_flows, "Free cash flow row");

        let market_cap = snapshot
            .market_cap
            .ok_or_else(|| ValuationError::unavailable(ticker, "market capitalisation missing"))?;
        let total_debt = match snapshot.total_debt {
            Some(debt) => debt,
            None => balance_sheet.latest(LineItem::TotalDebt)?,
        };
        tracing::info!(market_cap, total_debt, "Capital structure");

        let revenue: Vec<f64> = income
            .row(LineItem::TotalRevenue)?
            .iter()
            .map(|o| o.value)
            .collect();
        tracing::info!(?revenue, "Revenue row");
        let aagr = growth::average_annual_growth(&revenue).ok_or_else(|| {
            ValuationError::unavailable(ticker, "at least two revenue periods are needed for AAGR")
        })?;
        tracing::info!(aagr, "AAGR");

        let tax_rate =
            capital::effective_tax_rate(&income.recent(LineItem::TaxRateForCalcs, periods)?);
        tracing::info!(tax_rate, "Tax rate");

        let cost_of_equity = self.cost_of_equity(ticker).await?;
        tracing::info!(cost_of_equity = cost_of_equity.rate, "Cost of equity");

        let cost_of_debt = capital::cost_of_debt(
            &income.recent(LineItem::InterestExpense, periods)?,
            &balance_sheet.recent(LineItem::TotalDebt, periods)?,
        );
        tracing::info!(cost_of_debt, "Cost of debt");

        let wacc = CapitalStructure::new(market_cap, total_debt).wacc(
            cost_of_equity.rate,
            cost_of_debt,
            tax_rate,
        );
        tracing::info!(wacc, "WACC");

        let today = self.config.today();
        let closes = self
            .provider
            .price_history(ticker, self.config.history_start, today)
            .await?;
        let perpetuity_growth = growth::perpetuity_growth_rate(&closes).ok_or_else(|| {
            ValuationError::unavailable(ticker, "perpetuity growth rate could not be estimated")
        })?;
        tracing::info!(perpetuity_growth, "Perpetuity growth rate");

        let dcf = DcfValuation::compute(&free_cash_flows, aagr, wacc, perpetuity_growth, periods);
        tracing::info!(forecasted = ?dcf.forecasted_cash_flows, "Forecasted cash flows");
        tracing::info!(discounted = ?dcf.discounted_cash_flows, "Discounted cash flows");
        tracing::info!(
            terminal_value = dcf.terminal_value,
            discounted_terminal_value = dcf.discounted_terminal_value,
            "Terminal value"
        );
        tracing::info!(total_present_value = dcf.total_present_value, "Total present value");

        if !dcf.is_finite() {
            tracing::warn!(
                wacc,
                perpetuity_growth,
                "Present value is not finite; WACC does not exceed the perpetuity growth rate"
            );
        }

        let shares_outstanding = balance_sheet.latest(LineItem::OrdinarySharesNumber)?;
        let intrinsic_value_per_share = dcf.intrinsic_value_per_share(shares_outstanding);
        tracing::info!(intrinsic_value_per_share, "Intrinsic value per share");

        let undervalue_overvalue = intrinsic_value_per_share - current_price;
        tracing::info!(undervalue_overvalue, "Undervalue/Overvalue");

        Ok(ValuationResult {
            ticker: ticker.to_string(),
            wacc,
            total_present_value: dcf.total_present_value,
            aagr,
            perpetuity_growth,
            market_cap,
            total_debt,
            tax_rate,
            cost_of_equity,
            cost_of_debt,
            shares_outstanding,
            intrinsic_value_per_share,
            current_price,
            undervalue_overvalue,
            dcf,
        })
    }

    async fn cost_of_equity(&self, ticker: &str) -> Result<CostOfEquity> {
        let today = self.config.today();

        let stock = self
            .provider
            .price_history(ticker, self.config.capm_start, self.config.capm_end)
            .await?;
        let tbill = self
            .provider
            .price_history(&self.config.risk_free_symbol, self.config.risk_free_start, today)
            .await?;
        let market = self
            .provider
            .price_history(&self.config.market_index_symbol, self.config.market_start, today)
            .await?;

        capital::cost_of_equity(
            ticker,
            &stock,
            &tbill,
            &market,
            self.config.stack_risk_free_rate,
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Canned market data for pipeline and driver tests

    use super::*;
    use crate::provider::{MockMarketDataProvider, QuoteSnapshot};
    use crate::series::{Observation, PriceSeries};
    use crate::statement::FinancialStatement;
    use chrono::{Days, Months, NaiveDate};

    pub fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    pub fn config() -> ValuationConfig {
        ValuationConfig::builder()
            .as_of(d(2024, 12, 31))
            .build()
            .unwrap()
    }

    pub fn context() -> RunContext {
        RunContext::with_session_id("202412311200001234", "log")
    }

    fn annual(values: &[f64]) -> Vec<Observation> {
        // most recent first, fiscal years ending 2024, 2023, ...
        values
            .iter()
            .zip(0..)
            .map(|(&value, back)| Observation {
                date: d(2024 - back, 9, 30),
                value,
            })
            .collect()
    }

    pub fn statement(kind: StatementKind) -> FinancialStatement {
        let statement = FinancialStatement::new(kind);
        match kind {
            StatementKind::Income => statement
                .with_row(LineItem::TotalRevenue, annual(&[121.0, 110.0, 100.0]))
                .with_row(LineItem::TaxRateForCalcs, annual(&[0.2, 0.2, 0.2, 0.2]))
                .with_row(LineItem::InterestExpense, annual(&[10.0, 10.0, 10.0, 10.0])),
            StatementKind::CashFlow => statement
                .with_row(LineItem::FreeCashFlow, annual(&[100.0, 100.0, 100.0, 100.0])),
            StatementKind::BalanceSheet => statement
                .with_row(LineItem::TotalDebt, annual(&[200.0, 200.0, 200.0, 200.0]))
                .with_row(LineItem::OrdinarySharesNumber, annual(&[10.0])),
        }
    }

    pub fn snapshot() -> QuoteSnapshot {
        QuoteSnapshot {
            ask: Some(50.0),
            market_cap: Some(800.0),
            total_debt: Some(200.0),
        }
    }

    /// Weekly market closes on Fridays from 2022-01-07
    pub fn market_series() -> PriceSeries {
        let first = d(2022, 1, 7);
        PriceSeries::new((0..150u64).map(|week| {
            let wiggle = [0.0, 1.5, -0.5, 2.0, -1.0][(week % 5) as usize];
            (
                first.checked_add_days(Days::new(7 * week)).unwrap(),
                100.0 + week as f64 * 0.2 + wiggle,
            )
        }))
    }

    /// Monthly closes growing 1% a month for ten years
    pub fn long_history() -> PriceSeries {
        let first = d(2014, 1, 2);
        PriceSeries::new((0..120u32).map(|month| {
            (
                first.checked_add_months(Months::new(month)).unwrap(),
                20.0 * 1.01f64.powi(month as i32),
            )
        }))
    }

    /// Route a history request to the matching canned series
    pub fn history(config: &ValuationConfig, symbol: &str, start: NaiveDate) -> PriceSeries {
        if symbol == config.risk_free_symbol {
            PriceSeries::new(vec![(d(2024, 12, 30), 4.0)])
        } else if symbol == config.market_index_symbol || start == config.capm_start {
            market_series()
        } else {
            long_history()
        }
    }

    /// A provider mock answering every call with the canned data
    pub fn provider() -> MockMarketDataProvider {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_statement()
            .returning(|_, kind| Ok(statement(kind)));
        provider.expect_snapshot().returning(|_| Ok(snapshot()));
        let cfg = config();
        provider
            .expect_price_history()
            .returning(move |symbol, start, _| Ok(history(&cfg, symbol, start)));
        provider
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::provider::MockMarketDataProvider;

    #[tokio::test]
    async fn test_value_end_to_end() {
        let valuator = Valuator::new(provider(), config(), context());
        let result = valuator.value("TEST").await.unwrap();

        assert_eq!(result.ticker, "TEST");
        assert!((result.aagr - 0.10).abs() < 1e-12);
        assert!((result.tax_rate - 0.2).abs() < 1e-12);
        assert!((result.cost_of_debt - 0.05).abs() < 1e-12);
        assert!((result.cost_of_equity.risk_free_rate - 0.04).abs() < 1e-12);
        // stock and market are the same series
        assert!((result.cost_of_equity.beta - 1.0).abs() < 1e-9);
        assert_eq!(result.perpetuity_growth, 0.01);

        let expected_wacc = 0.8 * result.cost_of_equity.rate + 0.2 * 0.05 * 0.8;
        assert!((result.wacc - expected_wacc).abs() < 1e-12);

        let expected = DcfValuation::compute(&[100.0; 4], 0.10, result.wacc, 0.01, 4);
        assert_eq!(result.dcf, expected);
        assert_eq!(result.intrinsic_value_per_share, expected.total_present_value / 10.0);
        assert_eq!(result.undervalue_overvalue, result.intrinsic_value_per_share - 50.0);
    }

    #[tokio::test]
    async fn test_value_is_repeatable() {
        let valuator = Valuator::new(provider(), config(), context());
        let first = valuator.value("TEST").await.unwrap();
        let second = valuator.value("TEST").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_shares_row_aborts() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_statement().returning(|_, kind| {
            let mut statement = statement(kind);
            if kind == StatementKind::BalanceSheet {
                statement.insert(LineItem::OrdinarySharesNumber, vec![]);
            }
            Ok(statement)
        });
        provider.expect_snapshot().returning(|_| Ok(snapshot()));
        let cfg = config();
        provider
            .expect_price_history()
            .returning(move |symbol, start, _| Ok(history(&cfg, symbol, start)));

        let valuator = Valuator::new(provider, config(), context());
        let err = valuator.value("TEST").await.unwrap_err();
        assert!(matches!(
            err,
            ValuationError::LineItemNotFound {
                item: "Ordinary Shares Number",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_total_debt_falls_back_to_balance_sheet() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_statement()
            .returning(|_, kind| Ok(statement(kind)));
        provider.expect_snapshot().returning(|_| {
            Ok(crate::provider::QuoteSnapshot {
                total_debt: None,
                ..snapshot()
            })
        });
        let cfg = config();
        provider
            .expect_price_history()
            .returning(move |symbol, start, _| Ok(history(&cfg, symbol, start)));

        let valuator = Valuator::new(provider, config(), context());
        let result = valuator.value("TEST").await.unwrap();
        assert_eq!(result.total_debt, 200.0);
    }

    #[tokio::test]
    async fn test_flat_history_cannot_proceed() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_statement()
            .returning(|_, kind| Ok(statement(kind)));
        provider.expect_snapshot().returning(|_| Ok(snapshot()));
        let cfg = config();
        provider.expect_price_history().returning(move |symbol, start, _| {
            if start == cfg.history_start {
                Ok(crate::series::PriceSeries::new(
                    long_history().points().iter().map(|p| (p.date, 42.0)),
                ))
            } else {
                Ok(history(&cfg, symbol, start))
            }
        });

        let valuator = Valuator::new(provider, config(), context());
        let err = valuator.value("TEST").await.unwrap_err();
        assert!(matches!(err, ValuationError::DataUnavailable { .. }));
    }

    #[test]
    fn test_display_block() {
        let result = ValuationResult {
            ticker: "TEST".to_string(),
            wacc: 0.1,
            total_present_value: 1000.0,
            aagr: 0.05,
            perpetuity_growth: 0.01,
            market_cap: 800.0,
            total_debt: 200.0,
            tax_rate: 0.2,
            cost_of_equity: crate::capital::CostOfEquity {
                tbill_yield: 4.0,
                risk_free_rate: 0.04,
                beta: 1.0,
                market_return: 0.002,
                capm_rate: 0.002,
                rate: 0.042,
            },
            cost_of_debt: 0.05,
            shares_outstanding: 10.0,
            intrinsic_value_per_share: 100.0,
            current_price: 80.0,
            undervalue_overvalue: 20.0,
            dcf: DcfValuation::compute(&[100.0], 0.0, 0.1, 0.01, 4),
        };

        let text = result.to_string();
        assert!(text.starts_with("Ticker: TEST\nWACC: 0.1\n"));
        assert!(text.contains("Intrinsic Value per Share: 100\n"));
        assert!(text.ends_with("Undervalue/Overvalue: 20"));
    }
}
