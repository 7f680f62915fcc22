//! Growth rate estimates: revenue AAGR and the perpetuity growth rate

use crate::series::PriceSeries;
use statrs::statistics::Statistics;

/// Fewest valid daily closes the perpetuity estimate accepts
pub const MIN_VALID_ROWS: usize = 25;

/// Trailing window of monthly returns averaged for the perpetuity rate
pub const TRAILING_MONTHS: usize = 120;

/// Year-over-year revenue growth in chronological order.
///
/// `revenue` is ordered most recent first, as statements are. Each rate is
/// measured against the absolute value of the earlier year so a negative base
/// does not flip the sign.
pub fn annual_growth_rates(revenue: &[f64]) -> Vec<f64> {
    let mut rates: Vec<f64> = revenue
        .windows(2)
        .map(|w| (w[0] - w[1]) / w[1].abs())
        .collect();
    rates.reverse();
    rates
}

/// Average annual growth rate of revenue; `None` with fewer than two periods
pub fn average_annual_growth(revenue: &[f64]) -> Option<f64> {
    let rates = annual_growth_rates(revenue);
    if rates.is_empty() {
        return None;
    }
    Some(rates.mean())
}

/// Long-run growth rate used in the terminal value.
///
/// Mean of the trailing [`TRAILING_MONTHS`] month-end returns, taken as an
/// absolute value and rounded to 5 decimals. Returns `None` when the series
/// cannot support an estimate: empty, fewer than [`MIN_VALID_ROWS`] closes,
/// no monthly returns, or a mean that is zero or NaN.
pub fn perpetuity_growth_rate(closes: &PriceSeries) -> Option<f64> {
    if closes.is_empty() {
        tracing::warn!("Skipping perpetuity growth: price data is empty");
        return None;
    }

    if closes.len() < MIN_VALID_ROWS {
        tracing::warn!(
            rows = closes.len(),
            "Skipping perpetuity growth: less than {MIN_VALID_ROWS} valid rows"
        );
        return None;
    }

    let returns: Vec<f64> = closes
        .month_end()
        .pct_change()
        .into_iter()
        .map(|o| o.value)
        .filter(|v| !v.is_nan())
        .collect();

    if returns.is_empty() {
        tracing::warn!("Skipping perpetuity growth: monthly returns are empty");
        return None;
    }

    let trailing = &returns[returns.len().saturating_sub(TRAILING_MONTHS)..];
    let average = trailing.mean();

    if average.is_nan() || average == 0.0 {
        tracing::warn!(average, "Skipping perpetuity growth: invalid growth rate");
        return None;
    }

    Some(round_to(average.abs(), 5))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
