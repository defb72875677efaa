// =============================================================================
// Trade Risk Gate — dollar risk per trade and the journal entry gate
// =============================================================================
//
//   risk_usd       = |entry - stop| * size
//   entry_cost_usd = entry * size
//
// A trade may be written to the journal only when every condition holds:
//   1. Daily checklist fully ticked.
//   2. Emotional state is Calm.
//   3. Fund, daily limit and per-trade limit are all positive.
//   4. Entry, stop and target are all positive.
//   5. Stop sits on the losing side of entry (below for Long, above for Short).
//   6. entry_cost_usd <= fund.
//   7. risk_usd <= per-trade limit and risk_usd <= daily limit.
//   8. The loss was accepted up front.
//
// Every failing condition is reported so the trader sees the whole list at
// once rather than fixing one thing at a time.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "Long"),
            Self::Short => write!(f, "Short"),
        }
    }
}

/// Self-reported state right before the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmotionalState {
    /// Calm and focused.
    Calm,
    /// Tense or hesitant: A+ setups only.
    Tense,
    /// Upset or anxious: do not trade.
    Upset,
}

impl EmotionalState {
    /// Advice shown next to the state, if any.
    pub fn advice(self) -> Option<&'static str> {
        match self {
            Self::Calm => None,
            Self::Tense => Some("⚠️ A+ setups only"),
            Self::Upset => Some("🚫 DO NOT TRADE. Self-protection."),
        }
    }
}

impl std::fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calm => write!(f, "🟢 Calm and focused"),
            Self::Tense => write!(f, "🟡 Tense / hesitant"),
            Self::Upset => write!(f, "🔴 Upset / anxious"),
        }
    }
}

/// A planned trade as entered on the journal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTicket {
    pub symbol: String,
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub size: u32,
}

impl TradeTicket {
    /// Dollar amount lost if the stop is hit.
    pub fn risk_usd(&self) -> f64 {
        (self.entry - self.stop).abs() * f64::from(self.size)
    }

    /// Capital tied up when the position is opened.
    pub fn entry_cost_usd(&self) -> f64 {
        self.entry * f64::from(self.size)
    }

    /// True when hitting the stop is a loss for this direction.
    pub fn stop_on_loss_side(&self) -> bool {
        match self.direction {
            Direction::Long => self.stop < self.entry,
            Direction::Short => self.stop > self.entry,
        }
    }

    /// Reward-to-risk multiple. `None` when the stop sits on the entry.
    pub fn reward_risk(&self) -> Option<f64> {
        let risk = (self.entry - self.stop).abs();
        if risk < f64::EPSILON {
            return None;
        }
        Some((self.target - self.entry).abs() / risk)
    }
}

/// Money limits the trade is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub per_trade_usd: f64,
    pub daily_usd: f64,
    pub fund_usd: f64,
}

impl RiskLimits {
    fn all_positive(&self) -> bool {
        self.per_trade_usd > 0.0 && self.daily_usd > 0.0 && self.fund_usd > 0.0
    }
}

/// Answers the trader gives right before entering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreTradeChecks {
    pub checklist_complete: bool,
    pub accepts_loss: bool,
    pub emotion: EmotionalState,
}

/// Outcome of the journal gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_usd: f64,
    pub entry_cost_usd: f64,
    pub limits: RiskLimits,
    pub stop_ok: bool,
    pub fund_ok: bool,
    /// Risk within the per-trade limit.
    pub risk_ok: bool,
    pub daily_risk_ok: bool,
    pub reward_risk: Option<f64>,
    pub can_log: bool,
    /// One entry per failing condition, empty when `can_log`.
    pub blockers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Evaluate `ticket` against the money limits and the pre-trade answers.
pub fn assess(ticket: &TradeTicket, limits: &RiskLimits, checks: PreTradeChecks) -> RiskAssessment {
    let risk_usd = ticket.risk_usd();
    let entry_cost_usd = ticket.entry_cost_usd();
    let capital_ok = limits.all_positive();
    let entry_ok = ticket.entry > 0.0 && ticket.size > 0;

    let stop_ok = entry_ok && ticket.stop_on_loss_side();
    let fund_ok = capital_ok && entry_ok && entry_cost_usd <= limits.fund_usd;
    let risk_ok = capital_ok && stop_ok && risk_usd <= limits.per_trade_usd;
    let daily_risk_ok = capital_ok && stop_ok && risk_usd <= limits.daily_usd;

    let mut blockers = Vec::new();

    if !checks.checklist_complete {
        blockers.push("Daily checklist incomplete".to_string());
    }
    if checks.emotion != EmotionalState::Calm {
        blockers.push(format!("Emotional state is {}", checks.emotion));
    }
    if !capital_ok {
        blockers.push("Fund, daily limit and per-trade limit must all be positive".to_string());
    }
    for (name, value) in [
        ("Entry", ticket.entry),
        ("Stop", ticket.stop),
        ("Target", ticket.target),
    ] {
        if value <= 0.0 {
            blockers.push(format!("{name} must be positive"));
        }
    }
    if ticket.size == 0 {
        blockers.push("Size must be at least 1".to_string());
    }
    if entry_ok && !stop_ok {
        let side = match ticket.direction {
            Direction::Long => "below",
            Direction::Short => "above",
        };
        blockers.push(format!(
            "Stop {} is not {side} entry {} for a {} trade",
            ticket.stop, ticket.entry, ticket.direction
        ));
    }
    if capital_ok && entry_ok && !fund_ok {
        blockers.push(format!(
            "Entry cost ${entry_cost_usd:.2} exceeds fund ${:.2}",
            limits.fund_usd
        ));
    }
    if capital_ok && stop_ok && !risk_ok {
        blockers.push(format!(
            "Risk ${risk_usd:.2} exceeds per-trade limit ${:.2} → adjust STOP or SIZE",
            limits.per_trade_usd
        ));
    }
    if capital_ok && stop_ok && !daily_risk_ok {
        blockers.push(format!(
            "Risk ${risk_usd:.2} exceeds daily limit ${:.2}",
            limits.daily_usd
        ));
    }
    if !checks.accepts_loss {
        blockers.push("Loss not accepted before entry".to_string());
    }

    let can_log = blockers.is_empty();

    if can_log {
        debug!(symbol = %ticket.symbol, risk_usd, "trade passes risk gate");
    } else {
        warn!(symbol = %ticket.symbol, risk_usd, blockers = blockers.len(), "trade blocked by risk gate");
    }

    RiskAssessment {
        risk_usd,
        entry_cost_usd,
        limits: *limits,
        stop_ok,
        fund_ok,
        risk_ok,
        daily_risk_ok,
        reward_risk: ticket.reward_risk(),
        can_log,
        blockers,
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "🚫"
    }
}

impl std::fmt::Display for RiskAssessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Entry cost: ${:.2}", self.entry_cost_usd)?;
        writeln!(f, "Trade risk: ${:.2}", self.risk_usd)?;
        writeln!(f, "{} Stop on the losing side of entry", mark(self.stop_ok))?;
        writeln!(f, "{} Entry cost within fund (${:.2})", mark(self.fund_ok), self.limits.fund_usd)?;
        writeln!(
            f,
            "{} Risk within per-trade limit (${:.2})",
            mark(self.risk_ok),
            self.limits.per_trade_usd
        )?;
        writeln!(
            f,
            "{} Risk within daily limit (${:.2})",
            mark(self.daily_risk_ok),
            self.limits.daily_usd
        )?;
        match self.reward_risk {
            Some(rr) => writeln!(f, "Reward:risk = {rr:.2}R")?,
            None => writeln!(f, "Reward:risk = n/a (stop equals entry)")?,
        }
        if self.can_log {
            write!(f, "✅ Trade may be logged")
        } else {
            write!(f, "🚫 Logging blocked:")?;
            for b in &self.blockers {
                write!(f, "\n - {b}")?;
            }
            Ok(())
        }
    }
}
