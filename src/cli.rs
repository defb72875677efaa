use clap::{Parser, Subcommand, ValueEnum};

use crate::market_data::Interval;
use crate::risk::{Direction, EmotionalState};

#[derive(Debug, Parser)]
#[command(author, version, about = "Trading journal toolkit: impulse stats, macro checklist, risk gate, goals", long_about = None)]
pub struct Args {
    /// Path to the JSON config file (falls back to $JOURNAL_CONFIG, then journal_config.json).
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Up/down/flat distribution and streak statistics for a ticker.
    Impulse {
        /// Ticker (SPY, QQQ, NVDA, BTC-USD...).
        #[arg(short, long)]
        ticker: Option<String>,

        /// Look-back range (1d,5d,1mo,3mo,6mo,1y,2y,5y,10y,ytd,max or e.g. 30d).
        #[arg(short, long)]
        period: Option<String>,

        /// Bar size: 1m, 5m, 15m, 30m, 1h, 1d, or menu choice 1-6.
        #[arg(short, long, value_parser = parse_interval)]
        interval: Option<Interval>,

        /// Print the summary as JSON instead of the text report.
        #[arg(long)]
        json: bool,
    },

    /// ES / VIX / DXY arrows, high-impact news and the macro mode.
    Macro {
        /// Half-width of the flat zone, in percent.
        #[arg(long)]
        deadband: Option<f64>,

        /// Hours ahead to scan for high-impact events.
        #[arg(long)]
        lookahead_hours: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Dollar risk of a planned trade and whether it may be logged.
    Risk {
        #[arg(long, default_value = "SPY")]
        symbol: String,

        #[arg(long, value_enum, default_value_t = DirectionArg::Long)]
        direction: DirectionArg,

        #[arg(long)]
        entry: f64,

        #[arg(long)]
        stop: f64,

        #[arg(long)]
        target: f64,

        /// Shares / contracts.
        #[arg(long)]
        size: Option<u32>,

        /// Maximum dollar risk per trade.
        #[arg(long)]
        limit: Option<f64>,

        /// Maximum dollar risk for the day.
        #[arg(long)]
        daily_limit: Option<f64>,

        /// Capital available for the trade.
        #[arg(long)]
        fund: Option<f64>,

        #[arg(long, value_enum, default_value_t = EmotionArg::Calm)]
        emotion: EmotionArg,

        /// All items of the daily checklist are ticked.
        #[arg(long)]
        checklist_ok: bool,

        /// I accept this loss before entering; if the stop is hit I close.
        #[arg(long)]
        accept_loss: bool,
    },

    /// KPI progress and checklist completion from the goals board.
    Goals {
        /// Board file (defaults to `goals_path` from the config).
        #[arg(short, long)]
        file: Option<String>,

        /// Only count tasks whose section or title contains this text.
        #[arg(short, long, default_value = "")]
        search: String,

        /// Hide sections that are already complete.
        #[arg(long)]
        pending_only: bool,

        #[arg(long)]
        json: bool,
    },

    /// Write a config file with every default filled in.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Long,
    Short,
}

impl From<DirectionArg> for Direction {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::Long => Direction::Long,
            DirectionArg::Short => Direction::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EmotionArg {
    Calm,
    Tense,
    Upset,
}

impl From<EmotionArg> for EmotionalState {
    fn from(e: EmotionArg) -> Self {
        match e {
            EmotionArg::Calm => EmotionalState::Calm,
            EmotionArg::Tense => EmotionalState::Tense,
            EmotionArg::Upset => EmotionalState::Upset,
        }
    }
}

pub fn parse_interval(s: &str) -> Result<Interval, String> {
    Ok(Interval::from_choice(s))
}
