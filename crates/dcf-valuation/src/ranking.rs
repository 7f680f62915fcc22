//! Ticker ranking file loader

use crate::error::{Result, ValuationError};
use std::fs::File;
use std::path::Path;

/// Column holding the ticker symbols
pub const SYMBOL_COLUMN: &str = "Symbol";

/// Read the `Symbol` column of a ranking CSV, in file order.
///
/// Blank symbols are skipped. A missing file surfaces as
/// [`ValuationError::Io`]; a file without the column as
/// [`ValuationError::DataUnavailable`].
pub fn load_tickers(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers()?.clone();
    let symbol_idx = headers
        .iter()
        .position(|h| h.trim() == SYMBOL_COLUMN)
        .ok_or_else(|| {
            ValuationError::unavailable(
                path.display().to_string(),
                format!("'{SYMBOL_COLUMN}' column not found in CSV file"),
            )
        })?;

    let mut tickers = Vec::new();
    for record in reader.records() {
        let record = record?;
        match record.get(symbol_idx).map(str::trim) {
            Some(symbol) if !symbol.is_empty() => tickers.push(symbol.to_string()),
            _ => {}
        }
    }

    tracing::debug!(count = tickers.len(), path = %path.display(), "Loaded ranking");
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "dcf-ranking-{}-{name}.csv",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_symbol_column() {
        let path = write_temp(
            "ok",
            "Rank,Symbol,Name\n1,AAPL,Apple\n2, MSFT ,Microsoft\n3,,Blank\n4,KO,Coca-Cola\n",
        );
        let tickers = load_tickers(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(tickers, vec!["AAPL", "MSFT", "KO"]);
    }

    #[test]
    fn test_missing_column() {
        let path = write_temp("nocol", "Rank,Ticker\n1,AAPL\n");
        let err = load_tickers(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, ValuationError::DataUnavailable { .. }));
        assert!(err.to_string().contains("'Symbol' column not found"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_tickers("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, ValuationError::Io(_)));
    }

    #[test]
    fn test_shipped_ranking() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../ranking/dow30_ranking.csv");
        let tickers = load_tickers(path).unwrap();
        assert_eq!(tickers.len(), 30);
        assert!(tickers.contains(&"AAPL".to_string()));
    }
}
