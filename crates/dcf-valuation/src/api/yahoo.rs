//! Yahoo Finance API client

use super::models::{QuoteSummaryResponse, TimeseriesEntry, TimeseriesResponse};
use crate::cache::{HistoryCache, HistoryKey};
use crate::config::ValuationConfig;
use crate::error::{Result, ValuationError};
use crate::provider::{MarketDataProvider, QuoteSnapshot};
use crate::series::{Observation, PriceSeries};
use crate::statement::{FinancialStatement, StatementKind};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use std::num::NonZeroU32;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use yahoo_finance_api as yahoo;

const PROVIDER: &str = "Yahoo Finance";
const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Cookie and crumb pair Yahoo requires on quoteSummary requests
#[derive(Debug, Clone)]
struct Crumb {
    cookie: String,
    crumb: String,
}

/// Yahoo Finance API client
pub struct YahooFinanceClient {
    connector: yahoo::YahooConnector,
    http: Client,
    rate_limiter: SharedRateLimiter,
    crumb: RwLock<Option<Crumb>>,
    history_cache: HistoryCache,
    history_start: NaiveDate,
    today: NaiveDate,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new(config: &ValuationConfig) -> Result<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| ValuationError::Provider(format!("Failed to initialize Yahoo connector: {e}")))?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let quota = Quota::per_minute(
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            connector,
            http,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            crumb: RwLock::new(None),
            history_cache: HistoryCache::new(config.history_cache_ttl),
            history_start: config.history_start,
            today: config.today(),
        })
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries> {
        self.rate_limiter.until_ready().await;

        let response = self
            .connector
            .get_quote_history(symbol, to_offset(start)?, to_offset(end)?)
            .await
            .map_err(|e| classify_yahoo_error(symbol, &e))?;

        let quotes = response
            .quotes()
            .map_err(|e| classify_yahoo_error(symbol, &e))?;

        let series = PriceSeries::new(quotes.iter().filter_map(|q| {
            DateTime::from_timestamp(q.timestamp as i64, 0).map(|ts| (ts.date_naive(), q.adjclose))
        }));

        if series.is_empty() {
            return Err(ValuationError::unavailable(
                symbol,
                format!("no closing prices between {start} and {end}"),
            ));
        }

        tracing::debug!(symbol, points = series.len(), "Fetched daily closes");
        Ok(series)
    }

    /// Send a request through the rate limiter and map Yahoo's status codes
    async fn send(&self, symbol: &str, request: RequestBuilder) -> Result<Response> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await?;
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(ValuationError::RateLimited {
                provider: PROVIDER.to_string(),
            }),
            StatusCode::NOT_FOUND => Err(ValuationError::unavailable(symbol, "symbol not found")),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                self.clear_crumb().await;
                Err(ValuationError::Provider(format!(
                    "authentication rejected ({status})"
                )))
            }
            _ => Ok(response.error_for_status()?),
        }
    }

    /// Ensure we have a valid Yahoo authentication crumb
    async fn ensure_crumb(&self) -> Result<Crumb> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let crumb = self.fetch_crumb().await?;
        *self.crumb.write().await = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_crumb(&self) -> Result<Crumb> {
        self.rate_limiter.until_ready().await;

        // fc.yahoo.com answers 404 but still sets the session cookie
        let response = self.http.get(COOKIE_URL).send().await?;
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| ValuationError::Provider("Failed to parse Yahoo cookie".to_string()))?;

        let crumb = self
            .send("", self.http.get(CRUMB_URL).header(header::COOKIE, &cookie))
            .await?
            .text()
            .await?;

        if crumb.is_empty() || crumb.contains("Too Many Requests") {
            return Err(ValuationError::RateLimited {
                provider: PROVIDER.to_string(),
            });
        }

        tracing::debug!("Obtained Yahoo crumb");
        Ok(Crumb { cookie, crumb })
    }

    async fn clear_crumb(&self) {
        *self.crumb.write().await = None;
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries> {
        let key = HistoryKey::new(symbol, start, end);
        self.history_cache
            .get_or_fetch(key, || self.fetch_history(symbol, start, end))
            .await
    }

    async fn statement(&self, symbol: &str, kind: StatementKind) -> Result<FinancialStatement> {
        let types = kind
            .line_items()
            .iter()
            .map(|item| format!("annual{}", item.provider_key()))
            .collect::<Vec<_>>()
            .join(",");

        let period1 = to_unix(self.history_start).to_string();
        let period2 = to_unix(self.today.succ_opt().unwrap_or(self.today)).to_string();

        let request = self
            .http
            .get(format!("{TIMESERIES_URL}/{symbol}"))
            .query(&[
                ("symbol", symbol),
                ("type", types.as_str()),
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
            ]);

        let body: TimeseriesResponse = self.send(symbol, request).await?.json().await?;
        let statement = parse_timeseries(symbol, kind, body)?;

        tracing::debug!(symbol, statement = kind.name(), "Fetched financial statement");
        Ok(statement)
    }

    async fn snapshot(&self, symbol: &str) -> Result<QuoteSnapshot> {
        let crumb = self.ensure_crumb().await?;

        let request = self
            .http
            .get(format!("{QUOTE_SUMMARY_URL}/{symbol}"))
            .query(&[
                ("modules", "summaryDetail,financialData"),
                ("crumb", crumb.crumb.as_str()),
            ])
            .header(header::COOKIE, &crumb.cookie);

        let body: QuoteSummaryResponse = self.send(symbol, request).await?.json().await?;
        parse_quote_summary(symbol, body)
    }
}

/// Build a statement out of a fundamentals-timeseries response
fn parse_timeseries(
    symbol: &str,
    kind: StatementKind,
    body: TimeseriesResponse,
) -> Result<FinancialStatement> {
    if let Some(error) = body.timeseries.error.filter(|e| !e.is_null()) {
        return Err(ValuationError::Provider(format!(
            "timeseries error for {symbol}: {error}"
        )));
    }

    let mut statement = FinancialStatement::new(kind);
    let results = body.timeseries.result.unwrap_or_default();

    for item in kind.line_items() {
        let key = format!("annual{}", item.provider_key());
        let Some(entries) = results.iter().find_map(|r| r.get(&key)) else {
            continue;
        };

        let entries: Vec<Option<TimeseriesEntry>> = serde_json::from_value(entries.clone())?;
        let periods: Vec<Observation> = entries
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let date = NaiveDate::parse_from_str(&entry.as_of_date, "%Y-%m-%d").ok()?;
                let value = entry.reported_value?.raw?;
                Some(Observation { date, value })
            })
            .collect();

        if !periods.is_empty() {
            statement.insert(*item, periods);
        }
    }

    if kind.line_items().iter().all(|item| !statement.contains(*item)) {
        return Err(ValuationError::unavailable(
            symbol,
            format!("no {} statement data", kind.name()),
        ));
    }

    Ok(statement)
}

fn parse_quote_summary(symbol: &str, body: QuoteSummaryResponse) -> Result<QuoteSnapshot> {
    let result = body
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ValuationError::unavailable(symbol, "no quote summary"))?;

    let raw = |n: Option<super::models::RawNumber>| n.and_then(|n| n.raw);

    let (ask, market_cap) = result
        .summary_detail
        .map(|d| (raw(d.ask), raw(d.market_cap)))
        .unwrap_or_default();
    let total_debt = result.financial_data.and_then(|f| raw(f.total_debt));

    Ok(QuoteSnapshot {
        ask,
        market_cap,
        total_debt,
    })
}

/// Map a connector error onto our error kinds.
///
/// Rate limiting is recognised by variant; message text is only a fallback
/// for errors the connector wraps without a dedicated variant.
fn classify_yahoo_error(symbol: &str, error: &yahoo::YahooError) -> ValuationError {
    if matches!(error, yahoo::YahooError::TooManyRequests(_)) {
        return ValuationError::RateLimited {
            provider: PROVIDER.to_string(),
        };
    }

    let message = error.to_string();
    if is_rate_limit_message(&message) {
        return ValuationError::RateLimited {
            provider: PROVIDER.to_string(),
        };
    }

    let lowered = message.to_lowercase();
    if lowered.contains("no quotes") || lowered.contains("no result") || lowered.contains("empty") {
        return ValuationError::unavailable(symbol, message);
    }

    ValuationError::Provider(message)
}

fn is_rate_limit_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("too many requests") || lowered.contains("rate limited") || lowered.contains("429")
}

fn to_unix(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn to_offset(date: NaiveDate) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(to_unix(date))
        .map_err(|e| ValuationError::Provider(format!("Invalid timestamp for {date}: {e}")))
}
