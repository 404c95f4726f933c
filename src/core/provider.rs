//! Rate source abstractions

use crate::core::rates::RateSeries;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches the daily mid rates of `code` against PLN for `start..=end`.
    async fn fetch_series(&self, code: &str, start: NaiveDate, end: NaiveDate)
    -> Result<RateSeries>;
}
