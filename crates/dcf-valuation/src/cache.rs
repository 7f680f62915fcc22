//! Session cache for daily price histories.
//!
//! The auxiliary series (T-Bill, market index) are identical for every ticker
//! valued in one session, so they are fetched once and reused until the TTL
//! expires. Nothing outlives the process.

use crate::series::PriceSeries;
use cached::{Cached, TimedCache};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for a daily history request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HistoryKey {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
        }
    }
}

/// Price histories already fetched this session, expiring after a TTL
#[derive(Clone)]
pub struct HistoryCache {
    entries: Arc<RwLock<TimedCache<HistoryKey, PriceSeries>>>,
}

impl HistoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Return the memoised history for `key`, running `fetcher` on a miss.
    ///
    /// Only successful fetches are stored, so a rate-limited request is tried
    /// again on the next call.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: HistoryKey, fetcher: F) -> Result<PriceSeries, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PriceSeries, E>>,
    {
        // TimedCache evicts on read, so lookups need the write lock
        if let Some(hit) = self.entries.write().await.cache_get(&key).cloned() {
            tracing::debug!(symbol = %key.symbol, start = %key.start, "History served from session cache");
            return Ok(hit);
        }

        let series = fetcher().await?;
        self.entries.write().await.cache_set(key, series.clone());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn series() -> PriceSeries {
        PriceSeries::new(vec![(d(2024, 1, 2), 4.5)])
    }

    #[tokio::test]
    async fn test_windows_are_cached_separately() {
        let cache = HistoryCache::new(Duration::from_secs(60));
        let capm = HistoryKey::new("AAPL", d(2022, 1, 1), d(2025, 1, 1));
        let long = HistoryKey::new("AAPL", d(2000, 1, 1), d(2025, 1, 1));

        cache
            .get_or_fetch(capm, || async { Ok::<_, String>(series()) })
            .await
            .unwrap();
        let other = cache
            .get_or_fetch(long, || async { Ok::<_, String>(PriceSeries::default()) })
            .await
            .unwrap();

        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_cache_get_or_fetch() {
        let cache = HistoryCache::new(Duration::from_secs(60));
        let key = HistoryKey::new("^IXIC", d(2022, 1, 1), d(2024, 6, 30));

        let mut call_count = 0;
        let result = cache
            .get_or_fetch(key.clone(), || {
                call_count += 1;
                async { Ok::<_, String>(series()) }
            })
            .await
            .unwrap();
        assert_eq!(result, series());
        assert_eq!(call_count, 1);

        // Second call should use cache
        let result = cache
            .get_or_fetch(key.clone(), || {
                call_count += 1;
                async { Ok::<_, String>(PriceSeries::default()) }
            })
            .await
            .unwrap();
        assert_eq!(result, series());
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_not_cached() {
        let cache = HistoryCache::new(Duration::from_secs(60));
        let key = HistoryKey::new("AAPL", d(2000, 1, 1), d(2024, 6, 30));

        let result = cache
            .get_or_fetch(key.clone(), || async { Err::<PriceSeries, _>("rate limited") })
            .await;
        assert!(result.is_err());

        let retried = cache
            .get_or_fetch(key, || async { Ok::<_, &str>(series()) })
            .await
            .unwrap();
        assert_eq!(retried, series());
    }
}
