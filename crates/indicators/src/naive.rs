//! Per-index indicator computation, strictly from `closes[0..=index]`.
//!
//! The reference implementation the batch engine is checked against.

use crate::snapshot::IndicatorSnapshot;
use crate::{
    MA_LONG_PERIOD, MA_SHORT_PERIOD, MA_SLOPE_LOOKBACK, ROC_PERIOD, RSI_PERIOD, VOLATILITY_PERIOD,
};

pub fn snapshot_at(closes: &[f64], index: usize) -> IndicatorSnapshot {
    if index >= closes.len() {
        return IndicatorSnapshot::default();
    }

    let ma20 = sma_at(closes, index, MA_SHORT_PERIOD);
    let ma60 = sma_at(closes, index, MA_LONG_PERIOD);

    let golden_cross = match (ma20, ma60) {
        (Some(short), Some(long)) => Some((short - long) / long * 100.0),
        _ => None,
    };

    IndicatorSnapshot {
        ma20,
        ma60,
        ma_slope: ma_slope_at(closes, index),
        disparity: ma20.map(|ma| (closes[index] - ma) / ma * 100.0),
        rsi14: rsi_at(closes, index),
        roc12: roc_at(closes, index),
        volatility20: volatility_at(closes, index),
        golden_cross,
        is_golden_cross: match (ma20, ma60) {
            (Some(short), Some(long)) => Some(short > long),
            _ => None,
        },
    }
}

fn sma_at(closes: &[f64], index: usize, period: usize) -> Option<f64> {
    if index + 1 < period {
        return None;
    }

    let window = &closes[index + 1 - period..=index];

    Some(window.iter().sum::<f64>() / period as f64)
}

/// Percent change of ma20 against its value a fixed lookback earlier.
fn ma_slope_at(closes: &[f64], index: usize) -> Option<f64> {
    if index < MA_SLOPE_LOOKBACK {
        return None;
    }

    let current = sma_at(closes, index, MA_SHORT_PERIOD)?;
    let past = sma_at(closes, index - MA_SLOPE_LOOKBACK, MA_SHORT_PERIOD)?;

    Some((current - past) / past * 100.0)
}

/// Wilder RSI: initial averages over the first 14 deltas, then smoothed
/// continuously from the series start, never resetting.
fn rsi_at(closes: &[f64], index: usize) -> Option<f64> {
    if index < RSI_PERIOD {
        return None;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..=RSI_PERIOD {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss += -delta;
        }
    }

    avg_gain /= RSI_PERIOD as f64;
    avg_loss /= RSI_PERIOD as f64;

    for i in (RSI_PERIOD + 1)..=index {
        let delta = closes[i] - closes[i - 1];
        let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };

        avg_gain = (avg_gain * (RSI_PERIOD - 1) as f64 + gain) / RSI_PERIOD as f64;
        avg_loss = (avg_loss * (RSI_PERIOD - 1) as f64 + loss) / RSI_PERIOD as f64;
    }

    Some(rsi_from_averages(avg_gain, avg_loss))
}

pub(crate) fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }

    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

fn roc_at(closes: &[f64], index: usize) -> Option<f64> {
    if index < ROC_PERIOD {
        return None;
    }

    let past = closes[index - ROC_PERIOD];

    Some((closes[index] - past) / past * 100.0)
}

/// Sample standard deviation of the last 20 daily returns, annualized by the
/// period count.
fn volatility_at(closes: &[f64], index: usize) -> Option<f64> {
    if index < VOLATILITY_PERIOD {
        return None;
    }

    let returns: Vec<f64> = (index + 1 - VOLATILITY_PERIOD..=index)
        .map(|i| closes[i] / closes[i - 1] - 1.0)
        .collect();

    Some(sample_stdev(&returns) * (VOLATILITY_PERIOD as f64).sqrt())
}

fn sample_stdev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / (n - 1.0);

    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    #[allow(non_snake_case)]
    fn snapshot_at__index_below_every_window__should_mark_all_fields_unavailable() {
        let closes: Vec<f64> = (1..=100).map(|i| i as f64).collect();

        assert_eq!(snapshot_at(&closes, 5), IndicatorSnapshot::default());
    }

    #[test]
    #[allow(non_snake_case)]
    fn snapshot_at__index_between_windows__should_mark_only_long_fields_unavailable() {
        let closes: Vec<f64> = (1..=100).map(|i| i as f64).collect();

        let snapshot = snapshot_at(&closes, 30);

        assert!(snapshot.ma20.is_some());
        assert!(snapshot.ma_slope.is_some());
        assert!(snapshot.rsi14.is_some());
        assert!(snapshot.ma60.is_none());
        assert!(snapshot.golden_cross.is_none());
        assert!(snapshot.is_golden_cross.is_none());
    }

    #[test]
    #[allow(non_snake_case)]
    fn snapshot_at__constant_series__should_return_zero_slope_and_full_rsi() {
        let closes = vec![50.0; 80];

        let snapshot = snapshot_at(&closes, 79);

        assert!(approx_eq!(f64, snapshot.ma20.unwrap(), 50.0, ulps = 2));
        assert!(approx_eq!(f64, snapshot.ma60.unwrap(), 50.0, ulps = 2));
        assert!(approx_eq!(f64, snapshot.ma_slope.unwrap(), 0.0, ulps = 2));
        assert!(approx_eq!(f64, snapshot.disparity.unwrap(), 0.0, ulps = 2));
        // no losses at all: RSI saturates at 100
        assert!(approx_eq!(f64, snapshot.rsi14.unwrap(), 100.0, ulps = 2));
        assert!(approx_eq!(f64, snapshot.volatility20.unwrap(), 0.0, ulps = 2));
        assert_eq!(snapshot.is_golden_cross, Some(false));
    }

    #[test]
    #[allow(non_snake_case)]
    fn snapshot_at__rising_series__should_report_golden_cross() {
        let closes: Vec<f64> = (1..=100).map(|i| 100.0 + i as f64).collect();

        let snapshot = snapshot_at(&closes, 99);

        assert_eq!(snapshot.is_golden_cross, Some(true));
        assert!(snapshot.golden_cross.unwrap() > 0.0);
        assert!(snapshot.ma_slope.unwrap() > 0.0);
    }

    #[test]
    #[allow(non_snake_case)]
    fn snapshot_at__index_out_of_range__should_return_default() {
        let closes = vec![1.0, 2.0, 3.0];

        assert_eq!(snapshot_at(&closes, 10), IndicatorSnapshot::default());
    }

    #[test]
    #[allow(non_snake_case)]
    fn rsi_from_averages__zero_average_loss__should_saturate_at_100() {
        assert_eq!(rsi_from_averages(1.0, 0.0), 100.0);
    }
}
