//! Discounted cash flow engine.
//!
//! Pure arithmetic over plain numbers. Nothing here validates its inputs:
//! a WACC at or below the perpetuity growth rate yields an infinite or
//! negative terminal value, exactly as the formula does.

use serde::{Deserialize, Serialize};

/// Grow each cash flow by `aagr` compounded over its position (1-based)
pub fn forecast_cash_flows(free_cash_flows: &[f64], aagr: f64) -> Vec<f64> {
    free_cash_flows
        .iter()
        .zip(1..)
        .map(|(cf, year)| cf * (1.0 + aagr).powi(year))
        .collect()
}

/// Discount each flow by `wacc` over its position (1-based)
pub fn discount_cash_flows(cash_flows: &[f64], wacc: f64) -> Vec<f64> {
    cash_flows
        .iter()
        .zip(1..)
        .map(|(cf, year)| cf / (1.0 + wacc).powi(year))
        .collect()
}

/// Gordon growth terminal value of the flow following `last_cash_flow`
pub fn terminal_value(last_cash_flow: f64, wacc: f64, perpetuity_growth: f64) -> f64 {
    last_cash_flow * (1.0 + perpetuity_growth) / (wacc - perpetuity_growth)
}

/// Full DCF breakdown for one set of inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    pub forecasted_cash_flows: Vec<f64>,
    pub discounted_cash_flows: Vec<f64>,
    pub terminal_value: f64,
    pub discounted_terminal_value: f64,
    pub total_present_value: f64,
}

impl DcfValuation {
    /// Value the firm from its most recent free cash flows.
    ///
    /// The terminal value sits one year past the `horizon_years` forecast
    /// horizon, whatever number of flows the statement actually carried.
    pub fn compute(
        free_cash_flows: &[f64],
        aagr: f64,
        wacc: f64,
        perpetuity_growth: f64,
        horizon_years: usize,
    ) -> Self {
        let forecasted_cash_flows = forecast_cash_flows(free_cash_flows, aagr);
        let discounted_cash_flows = discount_cash_flows(&forecasted_cash_flows, wacc);

        let last = forecasted_cash_flows.last().copied().unwrap_or(f64::NAN);
        let terminal_value = terminal_value(last, wacc, perpetuity_growth);
        let terminal_year = horizon_years as i32 + 1;
        let discounted_terminal_value = terminal_value / (1.0 + wacc).powi(terminal_year);

        let total_present_value =
            discounted_cash_flows.iter().sum::<f64>() + discounted_terminal_value;

        Self {
            forecasted_cash_flows,
            discounted_cash_flows,
            terminal_value,
            discounted_terminal_value,
            total_present_value,
        }
    }

    pub fn intrinsic_value_per_share(&self, shares_outstanding: f64) -> f64 {
        self.total_present_value / shares_outstanding
    }

    pub fn is_finite(&self) -> bool {
        self.total_present_value.is_finite()
    }
}
