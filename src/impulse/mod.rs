// =============================================================================
// Impulse Module
// =============================================================================
//
// Descriptive statistics of candle direction for a single ticker: how often
// price moves up, down or sideways, how hard it moves, and how long
// same-direction runs last.

pub mod analyzer;
pub mod report;

pub use analyzer::analyze;
pub use report::ImpulseReport;
