//! Core rate types and calculations

pub mod config;
pub mod cross;
pub mod log;
pub mod provider;
pub mod rates;
pub mod stats;

// Re-export main types for cleaner imports
pub use provider::RateProvider;
pub use rates::{RatePoint, RateSeries, RateTable};
pub use stats::{StatOutcome, Statistics};
