//! Summary statistics over a pair's mid rates.
use crate::core::rates::RateTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub average: f64,
    pub median: f64,
    pub minimum: f64,
    pub maximum: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatOutcome {
    Found { pair: String, stats: Statistics },
    /// The pair exists but has no records.
    Empty(String),
    NoSuchPair(String),
}

impl Statistics {
    /// Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        Some(Self {
            average: sorted.iter().sum::<f64>() / n as f64,
            median,
            minimum: sorted[0],
            maximum: sorted[n - 1],
        })
    }
}

/// Looks up `pair` (case-insensitive) and summarises its mid column.
pub fn calculate_statistics(table: &RateTable, pair: &str) -> StatOutcome {
    let pair = pair.trim().to_uppercase();
    let Some(series) = table.get(&pair) else {
        return StatOutcome::NoSuchPair(pair);
    };

    let values: Vec<f64> = series.mids().collect();
    match Statistics::from_values(&values) {
        Some(stats) => StatOutcome::Found { pair, stats },
        None => StatOutcome::Empty(pair),
    }
}
