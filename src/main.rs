// =============================================================================
// Impulse Journal — Main Entry Point
// =============================================================================
//
// Command-line companion to the trading journal. Each subcommand is one
// pre-session check: candle impulse statistics, the macro checklist, the
// per-trade risk gate, or progress on the goals board.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod cli;
mod goals;
mod impulse;
mod macro_checklist;
mod market_data;
mod risk;
mod runtime_config;
mod yahoo;

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};
use crate::goals::GoalsBoard;
use crate::impulse::ImpulseReport;
use crate::macro_checklist::{
    high_impact_events, lookahead_from_hours, run_checklist, CalendarClient, CalendarFilter,
};
use crate::market_data::Interval;
use crate::risk::{PreTradeChecks, RiskLimits, TradeTicket};
use crate::runtime_config::RuntimeConfig;
use crate::yahoo::YahooClient;

const DEFAULT_CONFIG_PATH: &str = "journal_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("JOURNAL_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    if let Command::InitConfig { force } = args.command {
        return init_config(&config_path, force);
    }

    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Override the default ticker from env if available.
    if let Ok(ticker) = std::env::var("JOURNAL_DEFAULT_TICKER") {
        let ticker = ticker.trim().to_uppercase();
        if !ticker.is_empty() {
            config.default_ticker = ticker;
        }
    }

    // ── 2. Dispatch ──────────────────────────────────────────────────────
    match args.command {
        Command::Impulse {
            ticker,
            period,
            interval,
            json,
        } => {
            let ticker = ticker
                .map(|t| t.trim().to_uppercase())
                .unwrap_or_else(|| config.default_ticker.clone());
            let period = period.unwrap_or_else(|| config.default_period.clone());
            let interval = interval.unwrap_or(config.default_interval);
            run_impulse(&config, &ticker, &period, interval, json).await
        }
        Command::Macro {
            deadband,
            lookahead_hours,
            json,
        } => {
            if let Some(d) = deadband {
                config.macro_deadband_pct = d;
            }
            if let Some(h) = lookahead_hours {
                config.lookahead_hours = h;
            }
            run_macro(&config, json).await
        }
        Command::Risk {
            symbol,
            direction,
            entry,
            stop,
            target,
            size,
            limit,
            daily_limit,
            fund,
            emotion,
            checklist_ok,
            accept_loss,
        } => {
            let ticket = TradeTicket {
                symbol: symbol.trim().to_uppercase(),
                direction: direction.into(),
                entry,
                stop,
                target,
                size: size.unwrap_or(config.default_position_size),
            };
            let limits = RiskLimits {
                per_trade_usd: limit.unwrap_or(config.risk_limit_usd),
                daily_usd: daily_limit.unwrap_or(config.daily_risk_limit_usd),
                fund_usd: fund.unwrap_or(config.fund_usd),
            };
            let checks = PreTradeChecks {
                checklist_complete: checklist_ok,
                accepts_loss: accept_loss,
                emotion: emotion.into(),
            };

            let assessment = risk::assess(&ticket, &limits, checks);
            println!(
                "{} {} | entry={} stop={} target={} size={}",
                ticket.symbol, ticket.direction, ticket.entry, ticket.stop, ticket.target, ticket.size
            );
            if let Some(advice) = checks.emotion.advice() {
                println!("{advice}");
            }
            println!("{assessment}");

            if !assessment.can_log {
                anyhow::bail!("trade for {} blocked by risk gate", ticket.symbol);
            }
            Ok(())
        }
        Command::Goals {
            file,
            search,
            pending_only,
            json,
        } => {
            let path = file.unwrap_or_else(|| config.goals_path.clone());
            run_goals(&path, &search, pending_only, json)
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

fn init_config(path: &str, force: bool) -> anyhow::Result<()> {
    if Path::new(path).exists() && !force {
        anyhow::bail!("{path} already exists (use --force to overwrite)");
    }
    RuntimeConfig::default().save(path)?;
    println!("Wrote default config to {path}");
    Ok(())
}

fn run_goals(path: &str, search: &str, pending_only: bool, json: bool) -> anyhow::Result<()> {
    let board = GoalsBoard::load(path)?;
    let report = goals::build_report(&board, search, pending_only);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialise goals report")?
        );
    } else {
        println!("{report}");
    }
    Ok(())
}

async fn run_impulse(
    config: &RuntimeConfig,
    ticker: &str,
    period: &str,
    interval: Interval,
    json: bool,
) -> anyhow::Result<()> {
    info!(ticker, period, %interval, "running impulse analysis");

    let client = YahooClient::new(config.yahoo_base_url.clone())?;
    let series = client.get_price_series(ticker, period, interval).await?;
    let summary = impulse::analyze(&series)
        .with_context(|| format!("impulse analysis failed for {ticker}"))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to serialise summary")?
        );
    } else {
        println!(
            "{}",
            ImpulseReport {
                ticker,
                period,
                interval,
                summary: &summary,
            }
        );
    }
    Ok(())
}

async fn run_macro(config: &RuntimeConfig, json: bool) -> anyhow::Result<()> {
    let lookahead = lookahead_from_hours(config.lookahead_hours)?;

    let yahoo = YahooClient::new(config.yahoo_base_url.clone())?;
    let calendar = CalendarClient::new(
        config.calendar_url.clone(),
        config.calendar_cache_path.clone(),
        config.calendar_cache_ttl_min,
    )?;

    // A calendar outage must not block the checklist.
    let events = calendar.fetch_events().await.unwrap_or_else(|e| {
        warn!(error = %e, "calendar unavailable, assuming no high-impact events");
        Vec::new()
    });

    let filter = CalendarFilter {
        countries: config.countries.clone(),
        impact_levels: config.impact_levels.clone(),
        lookahead,
    };
    let now = Utc::now().with_timezone(&config.local_offset());
    let upcoming = high_impact_events(&events, now, &filter);

    let report = run_checklist(
        &yahoo,
        &config.instruments,
        config.macro_deadband_pct,
        upcoming,
        config.lookahead_hours,
    )
    .await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialise macro report")?
        );
    } else {
        println!("{report}");
    }
    Ok(())
}
