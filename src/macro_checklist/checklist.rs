// Assembles the daily macro checklist: three instrument signals, the
// upcoming high-impact events and the resulting macro mode.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::macro_checklist::calendar::UpcomingEvent;
use crate::macro_checklist::mode::{determine_macro_mode, MacroVerdict};
use crate::macro_checklist::signal::{
    resolve_all, Instrument, ResolvedSignal, Signal, SignalProvider, NO_SOURCE,
};

fn default_es() -> Vec<String> {
    vec!["ES=F".to_string(), "SPY".to_string()]
}

fn default_vix() -> Vec<String> {
    vec!["^VIX".to_string(), "VIXY".to_string()]
}

fn default_dxy() -> Vec<String> {
    vec!["DX-Y.NYB".to_string(), "UUP".to_string()]
}

/// Ticker priority lists for the three checklist instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroInstruments {
    #[serde(default = "default_es")]
    pub es: Vec<String>,
    #[serde(default = "default_vix")]
    pub vix: Vec<String>,
    #[serde(default = "default_dxy")]
    pub dxy: Vec<String>,
}

impl Default for MacroInstruments {
    fn default() -> Self {
        Self {
            es: default_es(),
            vix: default_vix(),
            dxy: default_dxy(),
        }
    }
}

impl MacroInstruments {
    fn as_list(&self) -> [Instrument; 3] {
        [
            Instrument {
                name: "ES futures".to_string(),
                sources: self.es.clone(),
            },
            Instrument {
                name: "VIX".to_string(),
                sources: self.vix.clone(),
            },
            Instrument {
                name: "DXY".to_string(),
                sources: self.dxy.clone(),
            },
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroReport {
    pub es: ResolvedSignal,
    pub vix: ResolvedSignal,
    pub dxy: ResolvedSignal,
    pub lookahead_hours: i64,
    pub upcoming: Vec<UpcomingEvent>,
    pub verdict: MacroVerdict,
}

/// Resolve the three instruments and derive the session's macro mode.
pub(crate) async fn run_checklist<P: SignalProvider>(
    provider: &P,
    instruments: &MacroInstruments,
    deadband_pct: f64,
    upcoming: Vec<UpcomingEvent>,
    lookahead_hours: i64,
) -> MacroReport {
    let mut resolved = resolve_all(provider, &instruments.as_list(), deadband_pct)
        .await
        .into_iter();

    // resolve_all yields exactly one entry per instrument.
    let mut next = || resolved.next().unwrap_or_else(neutral_entry);
    let (es, vix, dxy) = (next(), next(), next());

    let verdict = determine_macro_mode(&es.signal, &vix.signal, &dxy.signal, !upcoming.is_empty());

    MacroReport {
        es,
        vix,
        dxy,
        lookahead_hours,
        upcoming,
        verdict,
    }
}

fn neutral_entry() -> ResolvedSignal {
    ResolvedSignal {
        signal: Signal::neutral(),
        source: NO_SOURCE.to_string(),
    }
}

fn signal_line(f: &mut fmt::Formatter<'_>, label: &str, r: &ResolvedSignal) -> fmt::Result {
    writeln!(
        f,
        "{label:<11} {} ({:+.2}%)  src={}",
        r.signal.arrow, r.signal.change_pct, r.source
    )
}

impl fmt::Display for MacroReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Macro checklist:")?;
        signal_line(f, "ES futures:", &self.es)?;
        signal_line(f, "VIX:", &self.vix)?;
        signal_line(f, "DXY:", &self.dxy)?;
        let has_high = !self.upcoming.is_empty();
        writeln!(
            f,
            "High-impact news confirmed (yes/no): {}",
            if has_high { "yes" } else { "no" }
        )?;

        writeln!(f)?;
        writeln!(f, "Macro conclusion:")?;
        writeln!(f, "{}", self.verdict.mode)?;
        write!(f, "Discipline rule: {}", self.verdict.rule)?;

        if has_high {
            writeln!(f)?;
            writeln!(f)?;
            write!(
                f,
                "Relevant events in the next {}h:",
                self.lookahead_hours
            )?;
            for u in &self.upcoming {
                write!(
                    f,
                    "\n - {} {} | {} ({} / {})",
                    u.event.date, u.event.time, u.event.title, u.event.country, u.event.impact
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macro_checklist::calendar::CalendarEvent;
    use crate::macro_checklist::mode::MacroMode;
    use anyhow::Result;
    use chrono::{FixedOffset, TimeZone};

    struct Quotes(Vec<(&'static str, f64, f64)>);

    impl SignalProvider for Quotes {
        async fn daily_signal(&self, ticker: &str, deadband_pct: f64) -> Result<Signal> {
            self.0
                .iter()
                .find(|(t, _, _)| *t == ticker)
                .and_then(|&(_, prev, last)| Signal::from_closes(prev, last, deadband_pct))
                .ok_or_else(|| anyhow::anyhow!("no quote for {ticker}"))
        }
    }

    #[tokio::test]
    async fn risk_on_with_fallbacks() {
        let quotes = Quotes(vec![
            ("SPY", 500.0, 503.0),
            ("^VIX", 15.0, 14.0),
            ("UUP", 28.0, 27.9),
        ]);
        let report = run_checklist(&quotes, &MacroInstruments::default(), 0.10, Vec::new(), 24).await;

        assert_eq!(report.es.source, "SPY");
        assert_eq!(report.vix.source, "^VIX");
        assert_eq!(report.dxy.source, "UUP");
        assert_eq!(report.verdict.mode, MacroMode::RiskOn);

        let text = report.to_string();
        assert!(text.contains("High-impact news confirmed (yes/no): no"));
        assert!(text.contains("src=SPY"));
        assert!(!text.contains("Relevant events"));
    }

    #[tokio::test]
    async fn upcoming_event_forces_neutral_and_is_listed() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let upcoming = vec![UpcomingEvent {
            event: CalendarEvent {
                title: "CPI m/m".to_string(),
                country: "USD".to_string(),
                impact: "High".to_string(),
                date: "01-08-2025".to_string(),
                time: "8:30am".to_string(),
            },
            local_time: tz.with_ymd_and_hms(2025, 1, 8, 8, 30, 0).unwrap(),
        }];
        let report = run_checklist(&Quotes(Vec::new()), &MacroInstruments::default(), 0.10, upcoming, 24).await;

        assert_eq!(report.es.source, "N/A");
        assert_eq!(report.verdict.mode, MacroMode::Neutral);
        let text = report.to_string();
        assert!(text.contains("Relevant events in the next 24h:"));
        assert!(text.contains(" - 01-08-2025 8:30am | CPI m/m (USD / High)"));
    }

    #[test]
    fn instruments_partial_json_fills_defaults() {
        let inst: MacroInstruments = serde_json::from_str(r#"{ "es": ["MES=F"] }"#).unwrap();
        assert_eq!(inst.es, vec!["MES=F"]);
        assert_eq!(inst.vix, vec!["^VIX", "VIXY"]);
        assert_eq!(inst.dxy, vec!["DX-Y.NYB", "UUP"]);
    }
}
