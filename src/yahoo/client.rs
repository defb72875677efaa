// =============================================================================
// Yahoo Finance Chart Client — historical bars and daily change
// =============================================================================
//
// Public, unauthenticated endpoint:
//
//   GET /v8/finance/chart/{ticker}?range={range}&interval={interval}
//
// Response shape (only the fields we read):
//
//   { "chart": { "result": [ {
//         "meta": { "regularMarketPrice": .., "chartPreviousClose": .. },
//         "timestamp": [ .. ],
//         "indicators": { "quote": [ { "close": [ .., null, .. ] } ] }
//     } ], "error": null } }
//
// Null closes are kept as gaps; the analyzer decides what to do with them.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::macro_checklist::signal::{Signal, SignalProvider};
use crate::market_data::{Interval, PricePoint, PriceSeries};

/// Daily ranges tried in order when looking for the last two closes.
const DAILY_RANGES: &[&str] = &["5d", "1mo", "3mo"];

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) impulse-journal/1.0";

/// Thin client over the Yahoo chart endpoint.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    /// Create a client against `base_url` (e.g. `https://query1.finance.yahoo.com`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    fn chart_url(&self, ticker: &str, range: &str, interval: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("invalid Yahoo base URL '{}'", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Yahoo base URL '{}' cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        url.query_pairs_mut()
            .append_pair("range", range)
            .append_pair("interval", interval);
        Ok(url)
    }

    /// GET the raw chart document.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    async fn get_chart(&self, ticker: &str, range: &str, interval: &str) -> Result<Value> {
        let url = self.chart_url(ticker, range, interval)?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .context("failed to parse chart response")?;

        if !status.is_success() {
            anyhow::bail!("Yahoo GET /v8/finance/chart/{} returned {}: {}", ticker, status, body);
        }

        Ok(body)
    }

    /// Historical closes for `ticker` over `period` at `interval`.
    ///
    /// Fails when the provider returns no bars at all.
    #[instrument(skip(self), name = "yahoo::get_price_series")]
    pub async fn get_price_series(
        &self,
        ticker: &str,
        period: &str,
        interval: Interval,
    ) -> Result<PriceSeries> {
        let body = self.get_chart(ticker, period, interval.as_str()).await?;
        let series = parse_chart(&body)?;

        if series.is_empty() {
            anyhow::bail!(
                "no data returned for {} with period={} and interval={}. \
                 Try a longer period or a different interval.",
                ticker,
                period,
                interval
            );
        }

        debug!(ticker, period, %interval, count = series.len(), "bars fetched");
        Ok(series)
    }

    /// Day-over-day change of the last two daily closes.
    ///
    /// Tries progressively longer daily ranges, then the quote metadata
    /// (last price vs previous close) before giving up.
    #[instrument(skip(self), name = "yahoo::get_daily_signal")]
    pub async fn get_daily_signal(&self, ticker: &str, deadband_pct: f64) -> Result<Signal> {
        let mut charts = Vec::with_capacity(DAILY_RANGES.len());

        for range in DAILY_RANGES {
            let chart = self.get_chart(ticker, range, "1d").await;
            let has_history = chart
                .as_ref()
                .is_ok_and(|body| history_signal(body, deadband_pct).is_some());
            charts.push(chart);
            if has_history {
                break;
            }
        }

        select_daily_signal(ticker, &charts, deadband_pct)
    }
}

impl SignalProvider for YahooClient {
    async fn daily_signal(&self, ticker: &str, deadband_pct: f64) -> Result<Signal> {
        self.get_daily_signal(ticker, deadband_pct).await
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -------------------------------------------------------------------------
// Response parsing
// -------------------------------------------------------------------------

fn first_result(body: &Value) -> Result<&Value> {
    let chart = body.get("chart").context("chart response missing 'chart'")?;

    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        let description = err["description"].as_str().unwrap_or("unknown error");
        anyhow::bail!("Yahoo chart error: {description}");
    }

    chart["result"]
        .as_array()
        .and_then(|arr| arr.first())
        .context("chart response has no result")
}

/// Parse a chart document into a price series. Null closes become gaps.
pub fn parse_chart(body: &Value) -> Result<PriceSeries> {
    let result = first_result(body)?;

    // A range with no trading yields no `timestamp` key at all.
    let Some(timestamps) = result["timestamp"].as_array() else {
        return Ok(PriceSeries::default());
    };

    let closes = result["indicators"]["quote"]
        .as_array()
        .and_then(|q| q.first())
        .and_then(|q| q["close"].as_array())
        .context("chart result missing indicators.quote[0].close")?;

    if closes.len() != timestamps.len() {
        warn!(
            timestamps = timestamps.len(),
            closes = closes.len(),
            "timestamp/close length mismatch, truncating"
        );
    }

    let mut points = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes) {
        let ts = ts.as_i64().context("non-integer timestamp in chart result")?;
        points.push(PricePoint {
            timestamp: ts,
            close: close.as_f64(),
        });
    }

    Ok(PriceSeries::new(points))
}

/// Signal from the last two valid daily closes of one chart.
fn history_signal(body: &Value, deadband_pct: f64) -> Option<Signal> {
    let (prev, last) = parse_chart(body).ok()?.last_two_closes()?;
    Signal::from_closes(prev, last, deadband_pct)
}

/// Pick the daily signal from charts fetched over [`DAILY_RANGES`], in order.
///
/// The first chart with two usable closes wins. Failing that, the first
/// chart whose metadata carries both last price and previous close is used.
pub fn select_daily_signal(
    ticker: &str,
    charts: &[Result<Value>],
    deadband_pct: f64,
) -> Result<Signal> {
    for (range, chart) in DAILY_RANGES.iter().zip(charts) {
        match chart {
            Ok(body) => {
                if let Some(signal) = history_signal(body, deadband_pct) {
                    return Ok(signal);
                }
            }
            Err(e) => debug!(ticker, range, error = %e, "daily history attempt failed"),
        }
    }

    let meta = charts
        .iter()
        .filter_map(|chart| chart.as_ref().ok())
        .filter_map(meta_closes)
        .find_map(|(prev, last)| Signal::from_closes(prev, last, deadband_pct));
    if let Some(signal) = meta {
        warn!(ticker, "daily history empty, using quote metadata");
        return Ok(signal);
    }

    anyhow::bail!(
        "not enough data for {}: empty history (possible rate limit, holiday or outage)",
        ticker
    )
}

/// `(previous_close, last_price)` from the chart metadata, if both exist.
fn meta_closes(body: &Value) -> Option<(f64, f64)> {
    let meta = first_result(body).ok()?.get("meta")?;
    let last = meta["regularMarketPrice"].as_f64()?;
    let prev = meta["chartPreviousClose"]
        .as_f64()
        .or_else(|| meta["previousClose"].as_f64())?;
    Some((prev, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macro_checklist::signal::Arrow;
    use serde_json::json;

    #[test]
    fn parse_chart_keeps_null_closes_as_gaps() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "regularMarketPrice": 12.0, "chartPreviousClose": 10.0 },
                    "timestamp": [1, 2, 3],
                    "indicators": { "quote": [{ "close": [10.0, null, 12.5] }] }
                }],
                "error": null
            }
        });
        let series = parse_chart(&body).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.points[1], PricePoint::missing(2));
        assert_eq!(series.points[2], PricePoint::new(3, 12.5));
        assert_eq!(meta_closes(&body), Some((10.0, 12.0)));
    }

    #[test]
    fn parse_chart_without_timestamps_is_empty() {
        let body = json!({
            "chart": { "result": [{ "meta": {}, "indicators": { "quote": [{}] } }], "error": null }
        });
        assert!(parse_chart(&body).unwrap().is_empty());
        assert!(meta_closes(&body).is_none());
    }

    #[test]
    fn parse_chart_surfaces_provider_error() {
        let body = json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found" } }
        });
        let err = parse_chart(&body).unwrap_err();
        assert!(err.to_string().contains("No data found"));
    }

    fn daily_chart(closes: Value, meta: Value) -> Value {
        json!({
            "chart": {
                "result": [{
                    "meta": meta,
                    "timestamp": [1, 2, 3],
                    "indicators": { "quote": [{ "close": closes }] }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn daily_signal_uses_first_range_with_history() {
        let charts = vec![
            Ok(daily_chart(json!([null, null, 100.0]), json!({}))),
            Ok(daily_chart(json!([100.0, 102.0, null]), json!({}))),
            Ok(daily_chart(json!([50.0, 40.0, 30.0]), json!({}))),
        ];
        let signal = select_daily_signal("SPY", &charts, 0.10).unwrap();
        assert_eq!((signal.prev, signal.last), (100.0, 102.0));
        assert_eq!(signal.arrow, Arrow::Up);
    }

    #[test]
    fn daily_signal_skips_failed_requests() {
        let charts = vec![
            Err(anyhow!("HTTP 429")),
            Ok(daily_chart(json!([20.0, 19.0, 18.0]), json!({}))),
        ];
        let signal = select_daily_signal("^VIX", &charts, 0.10).unwrap();
        assert_eq!((signal.prev, signal.last), (19.0, 18.0));
        assert_eq!(signal.arrow, Arrow::Down);
    }

    #[test]
    fn short_history_falls_back_to_metadata() {
        let meta = json!({ "regularMarketPrice": 104.0, "previousClose": 104.05 });
        let charts = vec![
            Ok(daily_chart(json!([null, null, 104.0]), json!({}))),
            Ok(daily_chart(json!([null, 104.0, null]), meta)),
            Err(anyhow!("timeout")),
        ];
        let signal = select_daily_signal("DX-Y.NYB", &charts, 0.10).unwrap();
        assert_eq!((signal.prev, signal.last), (104.05, 104.0));
        assert_eq!(signal.arrow, Arrow::Flat);
    }

    #[test]
    fn no_usable_chart_is_an_error() {
        let charts = vec![
            Ok(daily_chart(json!([null, null, null]), json!({}))),
            Err(anyhow!("HTTP 500")),
            Ok(daily_chart(json!([1.0]), json!({ "regularMarketPrice": 1.0 }))),
        ];
        let err = select_daily_signal("ES=F", &charts, 0.10).unwrap_err();
        assert!(err.to_string().contains("not enough data for ES=F"));
        assert!(select_daily_signal("ES=F", &[], 0.10).is_err());
    }

    #[test]
    fn chart_url_appends_ticker_segment() {
        let client = YahooClient::new("https://query1.finance.yahoo.com/").unwrap();
        let url = client.chart_url("ES=F", "5d", "1d").unwrap();
        assert_eq!(
            url.as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/ES=F?range=5d&interval=1d"
        );
    }
}
