// =============================================================================
// Impulse Analyzer — up/down/flat distribution and streak statistics
// =============================================================================
//
// Turns a close series into percentage returns, labels each return with a
// sign using a fixed deadband, and summarises:
//
//   - share of Up / Down / Flat samples
//   - mean return of Up samples, of Down samples, and |mean| of Down samples
//   - per-sign streak statistics (mean length, max length, time share)
//
// A streak is a maximal run of identical non-flat signs. Flat samples end any
// running streak and never form a streak themselves.
//
// The analyzer is pure: no I/O, the input is never mutated, and every call
// produces a fresh `Summary`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::market_data::{PricePoint, PriceSeries};

/// Returns inside `[-FLAT_DEADBAND, FLAT_DEADBAND]` are Flat (0.01 %).
pub const FLAT_DEADBAND: f64 = 0.0001;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// No adjacent pair of valid closes was left to form a return.
    #[error("insufficient data: no return could be formed from {valid_points} valid closes")]
    InsufficientData { valid_points: usize },
}

/// Direction of a single return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnSign {
    Up,
    Down,
    Flat,
}

impl std::fmt::Display for ReturnSign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Flat => write!(f, "FLAT"),
        }
    }
}

/// One return between two consecutive valid closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnSample {
    /// Timestamp of the later close.
    pub timestamp: i64,
    /// Fractional return, `(close_t - close_{t-1}) / close_{t-1}`.
    pub return_pct: f64,
    pub sign: ReturnSign,
}

/// A maximal run of same-signed, non-flat samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub sign: ReturnSign,
    pub length: usize,
}

/// Streak statistics for one sign. All zero when no streak exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakStats {
    pub count: usize,
    pub mean_length: f64,
    pub max_length: usize,
    /// Sum of streak lengths, i.e. samples spent inside a streak.
    pub total_samples: usize,
    /// `total_samples` as a percentage of all samples.
    pub time_share_pct: f64,
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub samples: usize,
    pub pct_up: f64,
    pub pct_down: f64,
    pub pct_flat: f64,
    /// Mean return of Up samples, in percent. `None` with no Up samples.
    pub mean_up_return_pct: Option<f64>,
    /// Mean return of Down samples, in percent (negative).
    pub mean_down_return_pct: Option<f64>,
    /// Mean absolute return of Down samples, in percent.
    pub mean_down_abs_return_pct: Option<f64>,
    pub up_streaks: StreakStats,
    pub down_streaks: StreakStats,
}

// =============================================================================
// Pipeline steps
// =============================================================================

/// Label a fractional return against [`FLAT_DEADBAND`]. Boundaries are Flat.
pub fn classify_return(return_pct: f64) -> ReturnSign {
    if return_pct > FLAT_DEADBAND {
        ReturnSign::Up
    } else if return_pct < -FLAT_DEADBAND {
        ReturnSign::Down
    } else {
        ReturnSign::Flat
    }
}

/// Sort by time and compute a return for every adjacent pair of points.
///
/// Pairs with a missing close on either side are dropped, as are pairs whose
/// previous close is not positive.
pub fn compute_returns(series: &PriceSeries) -> Vec<ReturnSample> {
    let points = series.sorted_points();

    let samples: Vec<ReturnSample> = points
        .windows(2)
        .filter_map(|w| sample_between(&w[0], &w[1]))
        .collect();

    trace!(
        points = points.len(),
        samples = samples.len(),
        "returns computed"
    );
    samples
}

fn sample_between(prev: &PricePoint, curr: &PricePoint) -> Option<ReturnSample> {
    let p = prev.valid_close()?;
    let c = curr.valid_close()?;
    if p <= 0.0 {
        return None;
    }
    let return_pct = (c - p) / p;
    if !return_pct.is_finite() {
        return None;
    }
    Some(ReturnSample {
        timestamp: curr.timestamp,
        return_pct,
        sign: classify_return(return_pct),
    })
}

/// Single left-to-right scan collecting every Up and Down streak in order.
///
/// Flat samples open a run like any other sign, but a Flat run is never
/// emitted and never extends.
pub fn detect_streaks(signs: &[ReturnSign]) -> Vec<Streak> {
    let mut streaks = Vec::new();
    let Some((&first, rest)) = signs.split_first() else {
        return streaks;
    };

    let mut run_sign = first;
    let mut run_len = 1usize;

    for &s in rest {
        if s == run_sign && s != ReturnSign::Flat {
            run_len += 1;
        } else {
            close_run(&mut streaks, run_sign, run_len);
            run_sign = s;
            run_len = 1;
        }
    }
    close_run(&mut streaks, run_sign, run_len);

    streaks
}

fn close_run(streaks: &mut Vec<Streak>, sign: ReturnSign, length: usize) {
    if sign != ReturnSign::Flat {
        streaks.push(Streak { sign, length });
    }
}

fn streak_stats(streaks: &[Streak], sign: ReturnSign, samples: usize) -> StreakStats {
    let lengths: Vec<usize> = streaks
        .iter()
        .filter(|s| s.sign == sign)
        .map(|s| s.length)
        .collect();

    if lengths.is_empty() {
        return StreakStats::default();
    }

    let total: usize = lengths.iter().sum();
    StreakStats {
        count: lengths.len(),
        mean_length: total as f64 / lengths.len() as f64,
        max_length: lengths.iter().copied().max().unwrap_or(0),
        total_samples: total,
        time_share_pct: percent(total, samples),
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Mean of `values` scaled to percent; `None` for an empty input.
fn mean_pct(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64 * 100.0)
}

// =============================================================================
// Entry point
// =============================================================================

/// Run the full analysis over `series`.
pub fn analyze(series: &PriceSeries) -> Result<Summary, AnalysisError> {
    let samples = compute_returns(series);

    if samples.is_empty() {
        let valid_points = series
            .points
            .iter()
            .filter(|p| p.valid_close().is_some())
            .count();
        return Err(AnalysisError::InsufficientData { valid_points });
    }

    let total = samples.len();
    let count = |sign: ReturnSign| samples.iter().filter(|s| s.sign == sign).count();
    let returns_of = |sign: ReturnSign| {
        samples
            .iter()
            .filter(move |s| s.sign == sign)
            .map(|s| s.return_pct)
    };

    let signs: Vec<ReturnSign> = samples.iter().map(|s| s.sign).collect();
    let streaks = detect_streaks(&signs);

    let summary = Summary {
        samples: total,
        pct_up: percent(count(ReturnSign::Up), total),
        pct_down: percent(count(ReturnSign::Down), total),
        pct_flat: percent(count(ReturnSign::Flat), total),
        mean_up_return_pct: mean_pct(returns_of(ReturnSign::Up)),
        mean_down_return_pct: mean_pct(returns_of(ReturnSign::Down)),
        mean_down_abs_return_pct: mean_pct(returns_of(ReturnSign::Down).map(f64::abs)),
        up_streaks: streak_stats(&streaks, ReturnSign::Up, total),
        down_streaks: streak_stats(&streaks, ReturnSign::Down, total),
    };

    debug!(
        samples = total,
        pct_up = format!("{:.2}", summary.pct_up),
        pct_down = format!("{:.2}", summary.pct_down),
        up_streaks = summary.up_streaks.count,
        down_streaks = summary.down_streaks.count,
        "impulse analysis complete"
    );

    Ok(summary)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use ReturnSign::{Down, Flat, Up};

    #[test]
    fn deadband_boundary_is_flat() {
        assert_eq!(classify_return(FLAT_DEADBAND), Flat);
        assert_eq!(classify_return(-FLAT_DEADBAND), Flat);
        assert_eq!(classify_return(0.0), Flat);
        assert_eq!(classify_return(0.00011), Up);
        assert_eq!(classify_return(-0.00011), Down);
    }

    #[test]
    fn steady_rise_is_one_up_streak() {
        let summary = analyze(&PriceSeries::from_closes(&[100.0, 101.0, 102.0, 103.0])).unwrap();
        assert_eq!(summary.samples, 3);
        assert_relative_eq!(summary.pct_up, 100.0);
        assert_relative_eq!(summary.pct_down, 0.0);
        assert_eq!(summary.up_streaks.count, 1);
        assert_eq!(summary.up_streaks.max_length, 3);
        assert_relative_eq!(summary.up_streaks.mean_length, 3.0);
        assert_relative_eq!(summary.up_streaks.time_share_pct, 100.0);
        assert_eq!(summary.down_streaks, StreakStats::default());
        assert!(summary.mean_down_return_pct.is_none());
        assert!(summary.mean_down_abs_return_pct.is_none());
    }

    #[test]
    fn alternating_closes_give_unit_streaks() {
        let summary = analyze(&PriceSeries::from_closes(&[100.0, 101.0, 100.0, 101.0])).unwrap();
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.up_streaks.count, 2);
        assert_relative_eq!(summary.up_streaks.mean_length, 1.0);
        assert_eq!(summary.up_streaks.max_length, 1);
        assert_eq!(summary.down_streaks.count, 1);
        assert_eq!(summary.down_streaks.max_length, 1);
        assert_eq!(summary.down_streaks.total_samples, 1);
    }

    #[test]
    fn flat_sample_splits_an_up_run() {
        // Up, Up, Flat, Up
        let closes = [100.0, 101.0, 102.0, 102.0, 103.0];
        let summary = analyze(&PriceSeries::from_closes(&closes)).unwrap();
        assert_eq!(summary.up_streaks.count, 2);
        assert_eq!(summary.up_streaks.max_length, 2);
        assert_eq!(summary.up_streaks.total_samples, 3);
        assert_relative_eq!(summary.pct_flat, 25.0);
        assert_relative_eq!(summary.up_streaks.time_share_pct, 75.0);
    }

    #[test]
    fn streak_scan_handles_leading_and_trailing_flats() {
        let streaks = detect_streaks(&[Flat, Flat, Up, Up, Down, Flat]);
        assert_eq!(
            streaks,
            vec![
                Streak { sign: Up, length: 2 },
                Streak { sign: Down, length: 1 },
            ]
        );
        assert!(detect_streaks(&[]).is_empty());
        assert!(detect_streaks(&[Flat, Flat, Flat]).is_empty());
    }

    #[test]
    fn percentages_sum_to_hundred() {
        let closes = [50.0, 51.0, 51.0, 49.5, 49.0, 49.6, 52.0, 52.001, 51.0];
        let summary = analyze(&PriceSeries::from_closes(&closes)).unwrap();
        assert_relative_eq!(
            summary.pct_up + summary.pct_down + summary.pct_flat,
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn intensities_are_in_percent() {
        // +1 %, -2 %, +3 %
        let closes = [100.0, 101.0, 98.98, 101.9494];
        let summary = analyze(&PriceSeries::from_closes(&closes)).unwrap();
        assert_relative_eq!(summary.mean_up_return_pct.unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(summary.mean_down_return_pct.unwrap(), -2.0, epsilon = 1e-9);
        assert_relative_eq!(summary.mean_down_abs_return_pct.unwrap(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn single_point_is_insufficient() {
        let err = analyze(&PriceSeries::from_closes(&[100.0])).unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientData { valid_points: 1 });
        assert!(analyze(&PriceSeries::default()).is_err());
    }

    #[test]
    fn missing_closes_drop_their_pairs() {
        let series = PriceSeries::new(vec![
            PricePoint::new(0, 100.0),
            PricePoint::missing(1),
            PricePoint::new(2, 101.0),
            PricePoint::new(3, 102.0),
        ]);
        let samples = compute_returns(&series);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp, 3);

        let all_gaps = PriceSeries::new(vec![
            PricePoint::new(0, 100.0),
            PricePoint::missing(1),
            PricePoint::new(2, 101.0),
        ]);
        assert_eq!(
            analyze(&all_gaps).unwrap_err(),
            AnalysisError::InsufficientData { valid_points: 2 }
        );
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let series = PriceSeries::new(vec![
            PricePoint::new(3, 103.0),
            PricePoint::new(1, 101.0),
            PricePoint::new(2, 102.0),
        ]);
        let summary = analyze(&series).unwrap();
        assert_relative_eq!(summary.pct_up, 100.0);
        assert_eq!(summary.up_streaks.max_length, 2);
        // Input order untouched.
        assert_eq!(series.points[0].timestamp, 3);
    }

    #[test]
    fn non_positive_previous_close_is_skipped() {
        let samples = compute_returns(&PriceSeries::from_closes(&[0.0, 1.0, 2.0]));
        assert_eq!(samples.len(), 1);
        assert_relative_eq!(samples[0].return_pct, 1.0);
    }

    #[test]
    fn analysis_is_idempotent() {
        let series = PriceSeries::from_closes(&[10.0, 10.5, 10.2, 10.2, 10.9, 11.3, 11.0]);
        let a = analyze(&series).unwrap();
        let b = analyze(&series).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.pct_up.to_bits(), b.pct_up.to_bits());
    }
}
