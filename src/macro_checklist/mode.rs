// =============================================================================
// Macro Mode — session stance from ES, VIX, DXY and the calendar
// =============================================================================
//
// Decision hierarchy (evaluated top-to-bottom; first match wins):
//
//   1. NEUTRAL  : high-impact event inside the lookahead window
//   2. NEUTRAL  : VIX change >= +1.5 %
//   3. NEUTRAL  : ES change <= -1.8 % (recent sell-off)
//   4. NEUTRAL  : ES < 0 AND DXY <= 0 (mixed signals)
//   5. RISK-ON  : ES > 0 AND VIX <= 0 AND DXY <= 0
//   6. RISK-OFF : ES < 0 AND VIX > 0 AND DXY > 0
//
// If no rule fires, the mode defaults to NEUTRAL.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::macro_checklist::signal::Signal;

const VIX_EXPANSION_PCT: f64 = 1.5;
const ES_SELL_OFF_PCT: f64 = -1.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacroMode {
    RiskOn,
    Neutral,
    RiskOff,
}

impl std::fmt::Display for MacroMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RiskOn => write!(f, "🟢 Risk-On"),
            Self::Neutral => write!(f, "🟡 Neutral"),
            Self::RiskOff => write!(f, "🔴 Risk-Off"),
        }
    }
}

/// Mode plus the discipline rule to follow for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroVerdict {
    pub mode: MacroMode,
    pub rule: String,
}

fn verdict(mode: MacroMode, rule: &str) -> MacroVerdict {
    MacroVerdict {
        mode,
        rule: rule.to_string(),
    }
}

pub fn determine_macro_mode(
    es: &Signal,
    vix: &Signal,
    dxy: &Signal,
    has_high_impact: bool,
) -> MacroVerdict {
    let (es, vix, dxy) = (es.change_pct, vix.change_pct, dxy.change_pct);

    let v = if has_high_impact {
        verdict(MacroMode::Neutral, "Macro event ahead → A+ setups only.")
    } else if vix >= VIX_EXPANSION_PCT {
        verdict(MacroMode::Neutral, "VIX expanding → unstable market → A+ only.")
    } else if es <= ES_SELL_OFF_PCT {
        verdict(MacroMode::Neutral, "Recent sell-off → transition day → A+ only.")
    } else if es < 0.0 && dxy <= 0.0 {
        verdict(MacroMode::Neutral, "Weak indices + soft dollar → Neutral.")
    } else if es > 0.0 && vix <= 0.0 && dxy <= 0.0 {
        verdict(MacroMode::RiskOn, "Risk-on flows aligned.")
    } else if es < 0.0 && vix > 0.0 && dxy > 0.0 {
        verdict(
            MacroMode::RiskOff,
            "Risk-off flows aligned → stand aside or A+ only.",
        )
    } else {
        verdict(MacroMode::Neutral, "Unclear conditions → protect capital.")
    };

    debug!(
        es = format!("{:.2}", es),
        vix = format!("{:.2}", vix),
        dxy = format!("{:.2}", dxy),
        has_high_impact,
        mode = %v.mode,
        "macro mode determined"
    );
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macro_checklist::signal::arrow_from_change;

    fn sig(change_pct: f64) -> Signal {
        Signal {
            arrow: arrow_from_change(change_pct, 0.10),
            change_pct,
            last: 0.0,
            prev: 0.0,
        }
    }

    #[test]
    fn high_impact_news_dominates() {
        let v = determine_macro_mode(&sig(0.8), &sig(-2.0), &sig(-0.3), true);
        assert_eq!(v.mode, MacroMode::Neutral);
        assert!(v.rule.contains("Macro event"));
    }

    #[test]
    fn vix_expansion_is_neutral() {
        let v = determine_macro_mode(&sig(0.5), &sig(1.5), &sig(-0.1), false);
        assert_eq!(v.mode, MacroMode::Neutral);
        assert!(v.rule.contains("VIX"));
    }

    #[test]
    fn sell_off_is_neutral_before_risk_off() {
        let v = determine_macro_mode(&sig(-1.8), &sig(0.5), &sig(0.4), false);
        assert_eq!(v.mode, MacroMode::Neutral);
        assert!(v.rule.contains("sell-off"));
    }

    #[test]
    fn weak_indices_soft_dollar() {
        let v = determine_macro_mode(&sig(-0.4), &sig(0.5), &sig(0.0), false);
        assert_eq!(v.mode, MacroMode::Neutral);
        assert!(v.rule.contains("soft dollar"));
    }

    #[test]
    fn clean_risk_on() {
        let v = determine_macro_mode(&sig(0.6), &sig(-3.0), &sig(-0.2), false);
        assert_eq!(v.mode, MacroMode::RiskOn);
    }

    #[test]
    fn aligned_risk_off() {
        let v = determine_macro_mode(&sig(-0.7), &sig(1.0), &sig(0.3), false);
        assert_eq!(v.mode, MacroMode::RiskOff);
    }

    #[test]
    fn neutral_signals_default_to_neutral() {
        let n = Signal::neutral();
        let v = determine_macro_mode(&n, &n, &n, false);
        assert_eq!(v.mode, MacroMode::Neutral);
        assert!(v.rule.contains("Unclear"));
    }

    #[test]
    fn mode_display() {
        assert_eq!(MacroMode::RiskOn.to_string(), "🟢 Risk-On");
        assert_eq!(MacroMode::RiskOff.to_string(), "🔴 Risk-Off");
    }
}
