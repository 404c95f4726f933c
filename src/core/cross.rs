//! Derives cross-rates between two currencies quoted against the same base.
use crate::core::rates::{BASE_CURRENCY, RateSeries, RateTable, pair_name};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Rounds to `precision` decimal places, half away from zero.
///
/// A precision too fine for `f64` leaves the value unchanged.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let Some(factor) = i32::try_from(precision)
        .ok()
        .map(|p| 10f64.powi(p))
        .filter(|f| f.is_finite())
    else {
        return value;
    };
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Computes `source / target` for every date both series share.
///
/// The result carries the source's date order. Dates missing on either side
/// are dropped, never filled.
pub fn cross_series(
    source: &RateSeries,
    target: &RateSeries,
    pair: &str,
    precision: u32,
) -> RateSeries {
    let target_by_date: HashMap<_, _> = target
        .points
        .iter()
        .map(|p| (p.effective_date, p.mid))
        .collect();

    let mut derived = RateSeries::new(pair);
    for point in &source.points {
        match target_by_date.get(&point.effective_date) {
            Some(&divisor) if divisor > 0.0 => {
                derived.push(point.effective_date, round_to(point.mid / divisor, precision));
            }
            Some(divisor) => {
                warn!(pair, date = %point.effective_date, divisor, "Skipping non-positive rate");
            }
            None => {
                warn!(pair, date = %point.effective_date, "No matching date in {}", target.pair);
            }
        }
    }

    if derived.len() != target.len() {
        warn!(
            pair,
            source_len = source.len(),
            target_len = target.len(),
            derived_len = derived.len(),
            "Cross-rate series are not aligned"
        );
    }
    derived
}

/// Adds a `{CODE}/{target}` series to the table for each code in `convert`.
pub fn calculate_other_rates(
    table: &mut RateTable,
    convert: &[String],
    target: &str,
    precision: u32,
) -> Result<()> {
    let target_pair = pair_name(target, BASE_CURRENCY);
    let target_series = table
        .get(&target_pair)
        .cloned()
        .ok_or_else(|| anyhow!("Missing target series {target_pair} for cross-rates"))?;

    for code in convert {
        let source_pair = pair_name(code, BASE_CURRENCY);
        let source_series = table
            .get(&source_pair)
            .ok_or_else(|| anyhow!("Missing source series {source_pair} for cross-rates"))?;

        let name = pair_name(code, target);
        let derived = cross_series(source_series, &target_series, &name, precision);
        debug!(pair = %name, points = derived.len(), "Derived cross-rate");
        table.insert(derived);
    }

    Ok(())
}
