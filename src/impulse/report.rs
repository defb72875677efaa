// Plain-text rendering of an impulse summary for the terminal.

use std::fmt;

use crate::impulse::analyzer::Summary;
use crate::market_data::Interval;

/// Summary plus the request it answers, ready for `println!`.
pub struct ImpulseReport<'a> {
    pub ticker: &'a str,
    pub period: &'a str,
    pub interval: Interval,
    pub summary: &'a Summary,
}

fn opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}%"),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for ImpulseReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "=== RESULTS FOR {} ===", self.ticker)?;
        writeln!(f, "Period: {} | Interval: {}", self.period, self.interval)?;
        writeln!(f, "Candles analysed: {}", s.samples)?;
        writeln!(f)?;
        writeln!(f, "Bullish: {:.2}%", s.pct_up)?;
        writeln!(f, "Bearish: {:.2}%", s.pct_down)?;
        writeln!(f, "Flat:    {:.2}%", s.pct_flat)?;
        writeln!(f)?;
        writeln!(f, "Average intensity per candle:")?;
        writeln!(f, "  UP:         {}", opt(s.mean_up_return_pct))?;
        writeln!(f, "  DOWN:       {}", opt(s.mean_down_return_pct))?;
        writeln!(f, "  DOWN (abs): {}", opt(s.mean_down_abs_return_pct))?;
        writeln!(f)?;
        writeln!(f, "Streaks:")?;
        writeln!(f, "  UP mean:    {:.2} candles", s.up_streaks.mean_length)?;
        writeln!(f, "  UP max:     {}", s.up_streaks.max_length)?;
        writeln!(f, "  DOWN mean:  {:.2} candles", s.down_streaks.mean_length)?;
        writeln!(f, "  DOWN max:   {}", s.down_streaks.max_length)?;
        writeln!(f)?;
        writeln!(f, "% time in bullish impulses: {:.2}%", s.up_streaks.time_share_pct)?;
        write!(f, "% time in bearish impulses: {:.2}%", s.down_streaks.time_share_pct)
    }
}
