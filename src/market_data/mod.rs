pub mod price_series;

// Re-export for `use crate::market_data::PriceSeries`.
pub use price_series::{Interval, PricePoint, PriceSeries};
