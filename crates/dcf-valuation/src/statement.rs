//! Annual financial statements, addressed by line item identity

use crate::error::{Result, ValuationError};
use crate::series::Observation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three statements a valuation reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Income,
    CashFlow,
    BalanceSheet,
}

impl StatementKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::CashFlow => "cash flow",
            Self::BalanceSheet => "balance sheet",
        }
    }

    /// Line items the valuation needs from this statement
    pub fn line_items(self) -> &'static [LineItem] {
        match self {
            Self::Income => &[
                LineItem::TotalRevenue,
                LineItem::TaxRateForCalcs,
                LineItem::InterestExpense,
            ],
            Self::CashFlow => &[LineItem::FreeCashFlow],
            Self::BalanceSheet => &[LineItem::TotalDebt, LineItem::OrdinarySharesNumber],
        }
    }
}

/// Statement rows used by the valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LineItem {
    TotalRevenue,
    TaxRateForCalcs,
    InterestExpense,
    FreeCashFlow,
    TotalDebt,
    OrdinarySharesNumber,
}

impl LineItem {
    /// Row label as printed on the statement
    pub fn label(self) -> &'static str {
        match self {
            Self::TotalRevenue => "Total Revenue",
            Self::TaxRateForCalcs => "Tax Rate For Calcs",
            Self::InterestExpense => "Interest Expense",
            Self::FreeCashFlow => "Free Cash Flow",
            Self::TotalDebt => "Total Debt",
            Self::OrdinarySharesNumber => "Ordinary Shares Number",
        }
    }

    /// Field name in the provider's fundamentals feed
    pub fn provider_key(self) -> &'static str {
        match self {
            Self::TotalRevenue => "TotalRevenue",
            Self::TaxRateForCalcs => "TaxRateForCalcs",
            Self::InterestExpense => "InterestExpense",
            Self::FreeCashFlow => "FreeCashFlow",
            Self::TotalDebt => "TotalDebt",
            Self::OrdinarySharesNumber => "OrdinarySharesNumber",
        }
    }

    pub fn statement(self) -> StatementKind {
        match self {
            Self::TotalRevenue | Self::TaxRateForCalcs | Self::InterestExpense => {
                StatementKind::Income
            }
            Self::FreeCashFlow => StatementKind::CashFlow,
            Self::TotalDebt | Self::OrdinarySharesNumber => StatementKind::BalanceSheet,
        }
    }
}

/// One statement's annual values, most recent period first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub kind: StatementKind,
    rows: BTreeMap<LineItem, Vec<Observation>>,
}

impl FinancialStatement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            rows: BTreeMap::new(),
        }
    }

    /// Add a row; periods are reordered most recent first
    pub fn insert(&mut self, item: LineItem, mut periods: Vec<Observation>) {
        periods.sort_by(|a, b| b.date.cmp(&a.date));
        self.rows.insert(item, periods);
    }

    /// Builder-style [`FinancialStatement::insert`]
    pub fn with_row(mut self, item: LineItem, periods: Vec<Observation>) -> Self {
        self.insert(item, periods);
        self
    }

    pub fn contains(&self, item: LineItem) -> bool {
        self.rows.get(&item).is_some_and(|r| !r.is_empty())
    }

    /// Every period of a row, most recent first
    pub fn row(&self, item: LineItem) -> Result<&[Observation]> {
        self.rows
            .get(&item)
            .filter(|r| !r.is_empty())
            .map(Vec::as_slice)
            .ok_or(ValuationError::LineItemNotFound {
                statement: self.kind.name(),
                item: item.label(),
            })
    }

    /// Values of the `periods` most recent periods of a row
    pub fn recent(&self, item: LineItem, periods: usize) -> Result<Vec<f64>> {
        Ok(self
            .row(item)?
            .iter()
            .take(periods)
            .map(|o| o.value)
            .collect())
    }

    /// The most recent value of a row
    pub fn latest(&self, item: LineItem) -> Result<f64> {
        Ok(self.row(item)?[0].value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(year: i32, value: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
            value,
        }
    }

    #[test]
    fn test_rows_ordered_most_recent_first() {
        let statement = FinancialStatement::new(StatementKind::BalanceSheet).with_row(
            LineItem::TotalDebt,
            vec![obs(2021, 1.0), obs(2023, 3.0), obs(2022, 2.0)],
        );

        assert_eq!(statement.recent(LineItem::TotalDebt, 2).unwrap(), vec![3.0, 2.0]);
        assert_eq!(statement.latest(LineItem::TotalDebt).unwrap(), 3.0);
    }

    #[test]
    fn test_missing_item_is_an_error() {
        let statement = FinancialStatement::new(StatementKind::BalanceSheet);
        let err = statement.latest(LineItem::OrdinarySharesNumber).unwrap_err();

        assert!(matches!(
            err,
            ValuationError::LineItemNotFound {
                statement: "balance sheet",
                item: "Ordinary Shares Number",
            }
        ));
    }

    #[test]
    fn test_empty_row_counts_as_missing() {
        let statement = FinancialStatement::new(StatementKind::Income)
            .with_row(LineItem::TotalRevenue, vec![]);
        assert!(!statement.contains(LineItem::TotalRevenue));
        assert!(statement.row(LineItem::TotalRevenue).is_err());
    }

    #[test]
    fn test_line_items_belong_to_their_statement() {
        for kind in [
            StatementKind::Income,
            StatementKind::CashFlow,
            StatementKind::BalanceSheet,
        ] {
            for item in kind.line_items() {
                assert_eq!(item.statement(), kind);
            }
        }
    }
}
