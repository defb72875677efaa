// =============================================================================
// Runtime Configuration — journal toolkit settings with atomic save
// =============================================================================
//
// Every tunable lives here: data-source URLs, default analysis request, macro
// deadband and calendar window, instrument fallbacks, risk gate limits and
// the goals board path. CLI flags override individual values for one run.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::macro_checklist::MacroInstruments;
use crate::market_data::Interval;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_ticker() -> String {
    "SPY".to_string()
}

fn default_period() -> String {
    "30d".to_string()
}

fn default_yahoo_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_macro_deadband_pct() -> f64 {
    0.10
}

fn default_lookahead_hours() -> i64 {
    24
}

fn default_calendar_url() -> String {
    "https://nfs.faireconomy.media/ff_calendar_thisweek.json".to_string()
}

fn default_calendar_cache_path() -> String {
    "ff_calendar_cache.json".to_string()
}

fn default_calendar_cache_ttl_min() -> u64 {
    15
}

fn default_countries() -> Vec<String> {
    vec!["USD".to_string()]
}

fn default_impact_levels() -> Vec<String> {
    vec!["High".to_string()]
}

fn default_utc_offset_hours() -> i32 {
    // America/Bogota, no DST.
    -5
}

fn default_risk_limit_usd() -> f64 {
    100.0
}

fn default_daily_risk_limit_usd() -> f64 {
    300.0
}

fn default_position_size() -> u32 {
    100
}

fn default_goals_path() -> String {
    "goals.json".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Impulse analysis ----------------------------------------------------

    /// Ticker analysed when none is given on the command line.
    #[serde(default = "default_ticker")]
    pub default_ticker: String,

    /// Look-back range passed to the chart endpoint (1d, 5d, 1mo, 30d, ...).
    #[serde(default = "default_period")]
    pub default_period: String,

    #[serde(default)]
    pub default_interval: Interval,

    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,

    // --- Macro checklist ----------------------------------------------------

    /// Half-width of the ⏸️ zone, in percent.
    #[serde(default = "default_macro_deadband_pct")]
    pub macro_deadband_pct: f64,

    #[serde(default)]
    pub instruments: MacroInstruments,

    /// Window after "now" in which a high-impact event turns the day Neutral.
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: i64,

    #[serde(default = "default_calendar_url")]
    pub calendar_url: String,

    #[serde(default = "default_calendar_cache_path")]
    pub calendar_cache_path: String,

    #[serde(default = "default_calendar_cache_ttl_min")]
    pub calendar_cache_ttl_min: u64,

    #[serde(default = "default_countries")]
    pub countries: Vec<String>,

    #[serde(default = "default_impact_levels")]
    pub impact_levels: Vec<String>,

    /// Offset of the trader's local clock from UTC.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    // --- Trade risk ---------------------------------------------------------

    /// Maximum dollar risk per trade.
    #[serde(default = "default_risk_limit_usd")]
    pub risk_limit_usd: f64,

    /// Maximum dollar risk across the trading day.
    #[serde(default = "default_daily_risk_limit_usd")]
    pub daily_risk_limit_usd: f64,

    /// Capital available for trading. Zero until the trader sets it, which
    /// keeps the gate closed.
    #[serde(default)]
    pub fund_usd: f64,

    /// Position size (shares / contracts) when none is given.
    #[serde(default = "default_position_size")]
    pub default_position_size: u32,

    // --- Goals --------------------------------------------------------------

    /// KPI and checklist board read by the `goals` command.
    #[serde(default = "default_goals_path")]
    pub goals_path: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_ticker: default_ticker(),
            default_period: default_period(),
            default_interval: Interval::default(),
            yahoo_base_url: default_yahoo_base_url(),
            macro_deadband_pct: default_macro_deadband_pct(),
            instruments: MacroInstruments::default(),
            lookahead_hours: default_lookahead_hours(),
            calendar_url: default_calendar_url(),
            calendar_cache_path: default_calendar_cache_path(),
            calendar_cache_ttl_min: default_calendar_cache_ttl_min(),
            countries: default_countries(),
            impact_levels: default_impact_levels(),
            utc_offset_hours: default_utc_offset_hours(),
            risk_limit_usd: default_risk_limit_usd(),
            daily_risk_limit_usd: default_daily_risk_limit_usd(),
            fund_usd: 0.0,
            default_position_size: default_position_size(),
            goals_path: default_goals_path(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            ticker = %config.default_ticker,
            interval = %config.default_interval,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Local timezone as a fixed offset. Out-of-range offsets fall back to UTC.
    pub fn local_offset(&self) -> FixedOffset {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}
