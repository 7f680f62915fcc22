//! Interactive single-ticker query loop

use crate::error::ValuationError;
use crate::provider::MarketDataProvider;
use crate::retry::{RetryEvent, RetryPolicy};
use crate::valuation::{ValuationResult, Valuator};
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const PROMPT: &str = "Enter a ticker symbol to query a single asset (or 'q' to quit): ";

/// Where the query loop currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    AwaitingInput,
    Processing { ticker: String, attempt: u32 },
    Exit,
}

/// How processing one ticker ended
#[derive(Debug)]
pub enum TickerOutcome {
    Valued(Box<ValuationResult>),
    /// Failed with an error that is not worth retrying
    Failed(ValuationError),
    /// Still rate limited after the last attempt
    Exhausted,
}

/// Prompts for tickers and values each one with retries
pub struct Driver<P> {
    valuator: Valuator<P>,
    policy: RetryPolicy,
    state: DriverState,
}

impl<P: MarketDataProvider> Driver<P> {
    pub fn new(valuator: Valuator<P>) -> Self {
        let policy = RetryPolicy::from_config(valuator.config());
        Self::with_policy(valuator, policy)
    }

    pub fn with_policy(valuator: Valuator<P>, policy: RetryPolicy) -> Self {
        Self {
            valuator,
            policy,
            state: DriverState::AwaitingInput,
        }
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// Run the prompt loop until `q` or end of input
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        self.state = DriverState::AwaitingInput;

        loop {
            match &self.state {
                DriverState::AwaitingInput => {
                    write!(out, "{PROMPT}")?;
                    out.flush()?;

                    self.state = match lines.next_line().await? {
                        None => DriverState::Exit,
                        Some(line) => {
                            let ticker = line.trim().to_uppercase();
                            if ticker == "Q" {
                                DriverState::Exit
                            } else if ticker.is_empty() {
                                DriverState::AwaitingInput
                            } else {
                                DriverState::Processing { ticker, attempt: 1 }
                            }
                        }
                    };
                }
                DriverState::Processing { ticker, .. } => {
                    let ticker = ticker.clone();
                    self.process_ticker(&ticker, out).await?;
                }
                DriverState::Exit => {
                    writeln!(out, "Exiting single ticker queries.")?;
                    tracing::info!(
                        session_id = %self.valuator.context().session_id(),
                        "Exiting single ticker queries"
                    );
                    return Ok(());
                }
            }
        }
    }

    /// Value one ticker, printing progress and the result block to `out`
    pub async fn process_ticker<W: Write>(
        &mut self,
        ticker: &str,
        out: &mut W,
    ) -> io::Result<TickerOutcome> {
        let ticker = ticker.trim().to_uppercase();
        let valuator = &self.valuator;
        let state = &mut self.state;
        let mut write_result = Ok(());

        let result = self
            .policy
            .execute(
                &ticker,
                |event| {
                    let written = match event {
                        RetryEvent::Attempt { attempt, .. } => {
                            *state = DriverState::Processing {
                                ticker: ticker.clone(),
                                attempt: *attempt,
                            };
                            writeln!(out, "Processing TICKER: {ticker}")
                        }
                        RetryEvent::Waiting {
                            attempt,
                            max_attempts,
                            wait,
                            ..
                        } => writeln!(
                            out,
                            "Rate limit error for {ticker} (Attempt {attempt}/{max_attempts}). Waiting {} seconds...",
                            wait.as_secs()
                        ),
                    };
                    if write_result.is_ok() {
                        write_result = written;
                    }
                },
                || valuator.value(&ticker),
            )
            .await;
        write_result?;

        let outcome = match result {
            Ok(valuation) => {
                writeln!(out, "{valuation}")?;
                tracing::info!(ticker = %ticker, "Finished processing TICKER");
                TickerOutcome::Valued(Box::new(valuation))
            }
            Err(e) if e.is_rate_limited() => {
                writeln!(
                    out,
                    "Max attempts reached for {ticker}, skipping single asset analysis."
                )?;
                tracing::error!(ticker = %ticker, "Max attempts reached, skipping single asset analysis");
                TickerOutcome::Exhausted
            }
            Err(e) => {
                writeln!(out, "Error processing SINGLE TICKER: {ticker}, Error: {e}")?;
                tracing::error!(ticker = %ticker, error = %e, "Error processing SINGLE TICKER");
                TickerOutcome::Failed(e)
            }
        };
        self.state = DriverState::AwaitingInput;
        Ok(outcome)
    }
}
