// =============================================================================
// Macro Signals — day-over-day arrows with source fallback
// =============================================================================
//
// Each instrument's daily change is labelled with an arrow:
//
//   change >  deadband  =>  ⬆️
//   change < -deadband  =>  ⬇️
//   otherwise           =>  ⏸️
//
// Instruments are configured as an ordered list of tickers. The first ticker
// that yields data wins; when every source fails the instrument reports a
// neutral ⏸️ with source "N/A" so the checklist still completes.

use anyhow::Result;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Source label reported when every ticker failed.
pub const NO_SOURCE: &str = "N/A";

/// Direction of a daily change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arrow {
    Up,
    Down,
    Flat,
}

impl std::fmt::Display for Arrow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "⬆️"),
            Self::Down => write!(f, "⬇️"),
            Self::Flat => write!(f, "⏸️"),
        }
    }
}

/// Classify a percentage change; both deadband edges are Flat.
pub fn arrow_from_change(change_pct: f64, deadband_pct: f64) -> Arrow {
    if change_pct > deadband_pct {
        Arrow::Up
    } else if change_pct < -deadband_pct {
        Arrow::Down
    } else {
        Arrow::Flat
    }
}

/// Daily change of one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub arrow: Arrow,
    /// Change in percent (1.0 == 1 %).
    pub change_pct: f64,
    pub last: f64,
    pub prev: f64,
}

impl Signal {
    /// Build a signal from two closes. `None` when `prev` is zero.
    pub fn from_closes(prev: f64, last: f64, deadband_pct: f64) -> Option<Self> {
        if prev == 0.0 || !prev.is_finite() || !last.is_finite() {
            return None;
        }
        let change_pct = (last - prev) / prev * 100.0;
        Some(Self {
            arrow: arrow_from_change(change_pct, deadband_pct),
            change_pct,
            last,
            prev,
        })
    }

    pub fn neutral() -> Self {
        Self {
            arrow: Arrow::Flat,
            change_pct: 0.0,
            last: 0.0,
            prev: 0.0,
        }
    }
}

/// A signal together with the ticker that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSignal {
    pub signal: Signal,
    pub source: String,
}

/// Named instrument with its tickers in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub sources: Vec<String>,
}

impl Instrument {
    #[cfg(test)]
    pub fn new(name: &str, sources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Anything that can produce a daily signal for a ticker.
pub(crate) trait SignalProvider {
    async fn daily_signal(&self, ticker: &str, deadband_pct: f64) -> Result<Signal>;
}

/// Try `sources` in order; neutral signal with [`NO_SOURCE`] on exhaustion.
pub(crate) async fn resolve_signal<P: SignalProvider>(
    provider: &P,
    sources: &[String],
    deadband_pct: f64,
) -> ResolvedSignal {
    for ticker in sources {
        match provider.daily_signal(ticker, deadband_pct).await {
            Ok(signal) => {
                debug!(ticker = %ticker, change_pct = format!("{:.2}", signal.change_pct), "signal resolved");
                return ResolvedSignal {
                    signal,
                    source: ticker.clone(),
                };
            }
            Err(e) => warn!(ticker = %ticker, error = %e, "signal source failed"),
        }
    }

    warn!(sources = ?sources, "all signal sources failed, reporting neutral");
    ResolvedSignal {
        signal: Signal::neutral(),
        source: NO_SOURCE.to_string(),
    }
}

/// Resolve every instrument concurrently, preserving input order.
pub(crate) async fn resolve_all<P: SignalProvider>(
    provider: &P,
    instruments: &[Instrument],
    deadband_pct: f64,
) -> Vec<ResolvedSignal> {
    join_all(instruments.iter().map(|inst| async move {
        let resolved = resolve_signal(provider, &inst.sources, deadband_pct).await;
        debug!(instrument = %inst.name, source = %resolved.source, "instrument resolved");
        resolved
    }))
    .await
}
