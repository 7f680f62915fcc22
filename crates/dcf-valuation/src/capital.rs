//! Cost of capital: CAPM cost of equity, cost of debt, and WACC

use crate::error::{Result, ValuationError};
use crate::series::{PriceSeries, finite_mean, inner_join};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Fewest daily closes accepted for a weekly return series
pub const MIN_PRICE_POINTS: usize = 5;

/// Outcome of the CAPM estimate with its intermediates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostOfEquity {
    /// Last T-Bill close, in percent
    pub tbill_yield: f64,
    /// T-Bill yield as a fraction
    pub risk_free_rate: f64,
    /// Slope of the stock's weekly returns on the market's
    pub beta: f64,
    /// Mean weekly market return
    pub market_return: f64,
    /// rf + beta * (market - rf)
    pub capm_rate: f64,
    /// Rate used for discounting; `capm_rate` plus rf when stacking is on
    pub rate: f64,
}

/// Ordinary least squares slope of `y` on `x` with an intercept.
///
/// Returns `None` with fewer than two pairs or when `x` has no variance.
pub fn ols_beta(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }

    let y: Vec<f64> = pairs.iter().map(|(y, _)| *y).collect();
    let x: Vec<f64> = pairs.iter().map(|(_, x)| *x).collect();

    let var_x = x.iter().variance();
    if !var_x.is_finite() || var_x == 0.0 {
        return None;
    }

    let beta = y.iter().covariance(x.iter()) / var_x;
    beta.is_finite().then_some(beta)
}

/// CAPM cost of equity from daily closes of the stock, the T-Bill yield
/// (quoted in percent) and the market index.
///
/// Returns are weekly, on weeks ending Friday. The market return is the mean
/// of every weekly market return, while beta only uses the weeks both series
/// share.
pub fn cost_of_equity(
    symbol: &str,
    stock: &PriceSeries,
    tbill: &PriceSeries,
    market: &PriceSeries,
    stack_risk_free_rate: bool,
) -> Result<CostOfEquity> {
    if stock.len() < MIN_PRICE_POINTS {
        return Err(ValuationError::unavailable(
            symbol,
            "not enough valid data for weekly returns",
        ));
    }

    let tbill_yield = tbill
        .last_close()
        .ok_or_else(|| ValuationError::unavailable(symbol, "no T-Bill closes for the risk-free rate"))?;
    let risk_free_rate = tbill_yield / 100.0;
    tracing::info!(tbill_yield, risk_free_rate, "Risk-free rate");

    if market.len() < MIN_PRICE_POINTS {
        return Err(ValuationError::unavailable(
            symbol,
            "no market index data in the requested range",
        ));
    }

    let stock_returns = stock.weekly_friday().pct_change();
    let market_returns = market.weekly_friday().pct_change();

    let pairs = inner_join(&stock_returns, &market_returns);
    let beta = ols_beta(&pairs)
        .ok_or_else(|| ValuationError::unavailable(symbol, "beta could not be estimated"))?;

    let market_return = finite_mean(market_returns.iter().map(|o| &o.value));
    let capm_rate = risk_free_rate + beta * (market_return - risk_free_rate);
    let rate = if stack_risk_free_rate {
        capm_rate + risk_free_rate
    } else {
        capm_rate
    };

    tracing::info!(
        beta,
        market_return,
        "Cost of equity for {symbol}: {:.3}% ({:.3}% above the risk-free rate)",
        rate * 100.0,
        capm_rate * 100.0,
    );

    Ok(CostOfEquity {
        tbill_yield,
        risk_free_rate,
        beta,
        market_return,
        capm_rate,
        rate,
    })
}

/// Average interest expense over average total debt; missing values are skipped
pub fn cost_of_debt(interest_expense: &[f64], total_debt: &[f64]) -> f64 {
    finite_mean(interest_expense) / finite_mean(total_debt)
}

/// Average effective tax rate; missing values are skipped
pub fn effective_tax_rate(rates: &[f64]) -> f64 {
    finite_mean(rates)
}

/// Market value of equity and debt financing the firm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalStructure {
    pub equity: f64,
    pub debt: f64,
}

impl CapitalStructure {
    pub fn new(equity: f64, debt: f64) -> Self {
        Self { equity, debt }
    }

    pub fn total(&self) -> f64 {
        self.equity + self.debt
    }

    pub fn equity_weight(&self) -> f64 {
        self.equity / self.total()
    }

    pub fn debt_weight(&self) -> f64 {
        self.debt / self.total()
    }

    /// Weighted average cost of capital with after-tax cost of debt
    pub fn wacc(&self, cost_of_equity: f64, cost_of_debt: f64, tax_rate: f64) -> f64 {
        self.equity_weight() * cost_of_equity
            + self.debt_weight() * cost_of_debt * (1.0 - tax_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    /// Daily closes on consecutive Fridays starting 2024-01-05
    fn fridays(closes: &[f64]) -> PriceSeries {
        let first = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        PriceSeries::new(closes.iter().enumerate().map(|(i, &c)| {
            (first.checked_add_days(Days::new(7 * i as u64)).unwrap(), c)
        }))
    }

    fn market_closes() -> Vec<f64> {
        vec![100.0, 102.0, 101.0, 104.0, 103.0, 107.0, 106.0, 110.0]
    }

    #[test]
    fn test_ols_beta_exact_line() {
        let pairs: Vec<(f64, f64)> = [-0.02, 0.01, 0.03, -0.01, 0.02]
            .iter()
            .map(|&x| (0.001 + 1.5 * x, x))
            .collect();

        let beta = ols_beta(&pairs).unwrap();
        assert!((beta - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_ols_beta_degenerate() {
        assert_eq!(ols_beta(&[(0.1, 0.2)]), None);
        assert_eq!(ols_beta(&[(0.1, 0.2), (0.3, 0.2), (0.5, 0.2)]), None);
    }

    #[test]
    fn test_cost_of_equity_tracks_market() {
        let market = fridays(&market_closes());
        let stock = market.scaled(0.5);
        let tbill = fridays(&[4.0, 4.5, 5.0]);

        let coe = cost_of_equity("TEST", &stock, &tbill, &market, true).unwrap();

        assert_eq!(coe.tbill_yield, 5.0);
        assert!((coe.risk_free_rate - 0.05).abs() < 1e-12);
        assert!((coe.beta - 1.0).abs() < 1e-9);
        // beta of one leaves the market return
        assert!((coe.capm_rate - coe.market_return).abs() < 1e-9);
        assert!((coe.rate - (coe.capm_rate + 0.05)).abs() < 1e-12);
    }

    #[test]
    fn test_cost_of_equity_without_stacking() {
        let market = fridays(&market_closes());
        let tbill = fridays(&[5.0]);

        let coe = cost_of_equity("TEST", &market, &tbill, &market, false).unwrap();
        assert_eq!(coe.rate, coe.capm_rate);
    }

    #[test]
    fn test_cost_of_equity_short_stock_history() {
        let market = fridays(&market_closes());
        let stock = fridays(&[1.0, 2.0, 3.0, 4.0]);
        let tbill = fridays(&[5.0]);

        let err = cost_of_equity("TEST", &stock, &tbill, &market, true).unwrap_err();
        assert!(matches!(err, ValuationError::DataUnavailable { .. }));
    }

    #[test]
    fn test_cost_of_equity_missing_tbill() {
        let market = fridays(&market_closes());
        let err = cost_of_equity("TEST", &market, &PriceSeries::default(), &market, true)
            .unwrap_err();
        assert!(matches!(err, ValuationError::DataUnavailable { .. }));
    }

    #[test]
    fn test_cost_of_equity_short_market_history() {
        let stock = fridays(&market_closes());
        let market = fridays(&[100.0, 101.0]);
        let tbill = fridays(&[5.0]);

        assert!(cost_of_equity("TEST", &stock, &tbill, &market, true).is_err());
    }

    #[test]
    fn test_cost_of_debt_skips_missing() {
        let rd = cost_of_debt(&[10.0, f64::NAN, 14.0], &[200.0, 200.0, 200.0, 200.0]);
        assert!((rd - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_tax_rate_mean() {
        assert!((effective_tax_rate(&[0.21, 0.19, 0.2, 0.2]) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_weights_sum_to_one() {
        for (equity, debt) in [(2.9e12, 1.1e11), (1.0, 1.0), (5.0e9, 0.0), (1.0e6, 9.0e6)] {
            let structure = CapitalStructure::new(equity, debt);
            let sum = structure.equity_weight() + structure.debt_weight();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_wacc() {
        let structure = CapitalStructure::new(800.0, 200.0);
        let wacc = structure.wacc(0.10, 0.05, 0.25);
        // 0.8 * 0.10 + 0.2 * 0.05 * 0.75
        assert!((wacc - 0.0875).abs() < 1e-12);
    }
}
