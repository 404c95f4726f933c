//! Rate table and the records it is built from

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Currency all NBP table quotes are expressed in.
pub const BASE_CURRENCY: &str = "PLN";

/// Builds a pair label such as `EUR/PLN`.
pub fn pair_name(from: &str, to: &str) -> String {
    format!("{}/{}", from.to_uppercase(), to.to_uppercase())
}

/// A single daily mid rate, tagged with the pair it belongs to.
///
/// Field names follow the persisted CSV header (`currency,effectiveDate,mid`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub currency: String,
    #[serde(rename = "effectiveDate")]
    pub effective_date: NaiveDate,
    pub mid: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateSeries {
    pub pair: String,
    pub points: Vec<RatePoint>,
}

impl RateSeries {
    pub fn new(pair: impl Into<String>) -> Self {
        Self {
            pair: pair.into(),
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, effective_date: NaiveDate, mid: f64) {
        self.points.push(RatePoint {
            currency: self.pair.clone(),
            effective_date,
            mid,
        });
    }

    pub fn mids(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.mid)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// All known pairs, in the order they were fetched or derived.
///
/// The table is rebuilt on every refresh and never updated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    series: Vec<RateSeries>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a series, replacing any existing one with the same pair.
    pub fn insert(&mut self, series: RateSeries) {
        match self.series.iter_mut().find(|s| s.pair == series.pair) {
            Some(existing) => *existing = series,
            None => self.series.push(series),
        }
    }

    pub fn get(&self, pair: &str) -> Option<&RateSeries> {
        self.series.iter().find(|s| s.pair == pair)
    }

    pub fn contains(&self, pair: &str) -> bool {
        self.get(pair).is_some()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.pair.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RateSeries> {
        self.series.iter()
    }

    /// Every record of every pair, in table order.
    pub fn points(&self) -> impl Iterator<Item = &RatePoint> {
        self.series.iter().flat_map(|s| s.points.iter())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
