// =============================================================================
// Macro Checklist Module
// =============================================================================
//
// Pre-session macro read:
// - ES / VIX / DXY day-over-day arrows, each with fallback tickers
// - ForexFactory high-impact USD events in the lookahead window
// - Risk-On / Neutral / Risk-Off mode with a discipline rule

pub mod calendar;
pub mod checklist;
pub mod mode;
pub mod signal;

pub use calendar::{high_impact_events, lookahead_from_hours, CalendarClient, CalendarFilter};
pub use checklist::MacroInstruments;
pub(crate) use checklist::run_checklist;
