//! Sliding-window batch engine: O(1) amortized work per index.
//!
//! Must agree with `naive::snapshot_at` within 1e-6 for every index where
//! both are defined.

use crate::naive::rsi_from_averages;
use crate::snapshot::IndicatorSnapshot;
use crate::{
    MA_LONG_PERIOD, MA_SHORT_PERIOD, MA_SLOPE_LOOKBACK, ROC_PERIOD, RSI_PERIOD, VOLATILITY_PERIOD,
};

/// Snapshots for every index of the series.
pub fn compute_series(closes: &[f64]) -> Vec<IndicatorSnapshot> {
    compute_range(closes, 0)
}

/// Snapshots for `from_index..closes.len()`.
///
/// The walk always starts at index 0: Wilder RSI state is smoothed
/// continuously from the first delta, so starting mid-series would diverge
/// from the per-index definition for every later index.
pub fn compute_range(closes: &[f64], from_index: usize) -> Vec<IndicatorSnapshot> {
    let mut state = SlidingState::with_capacity(closes.len());
    let mut snapshots = Vec::with_capacity(closes.len().saturating_sub(from_index));

    for index in 0..closes.len() {
        let snapshot = state.advance(closes, index);

        if index >= from_index {
            snapshots.push(snapshot);
        }
    }

    log::trace!(
        "computed {} indicator snapshots over a series of {} closes",
        snapshots.len(),
        closes.len()
    );

    snapshots
}

#[derive(Default)]
struct SlidingState {
    ma_short_sum: f64,
    ma_long_sum: f64,
    ma_short_history: Vec<Option<f64>>,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
    return_sum: f64,
    return_sq_sum: f64,
}

impl SlidingState {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ma_short_history: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    fn advance(&mut self, closes: &[f64], index: usize) -> IndicatorSnapshot {
        let close = closes[index];

        self.ma_short_sum += close;
        if index >= MA_SHORT_PERIOD {
            self.ma_short_sum -= closes[index - MA_SHORT_PERIOD];
        }

        self.ma_long_sum += close;
        if index >= MA_LONG_PERIOD {
            self.ma_long_sum -= closes[index - MA_LONG_PERIOD];
        }

        let ma20 = (index + 1 >= MA_SHORT_PERIOD)
            .then(|| self.ma_short_sum / MA_SHORT_PERIOD as f64);
        let ma60 =
            (index + 1 >= MA_LONG_PERIOD).then(|| self.ma_long_sum / MA_LONG_PERIOD as f64);

        self.ma_short_history.push(ma20);

        if index >= 1 {
            let delta = close - closes[index - 1];
            let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };

            if index <= RSI_PERIOD {
                self.gain_sum += gain;
                self.loss_sum += loss;

                if index == RSI_PERIOD {
                    self.avg_gain = self.gain_sum / RSI_PERIOD as f64;
                    self.avg_loss = self.loss_sum / RSI_PERIOD as f64;
                }
            } else {
                self.avg_gain =
                    (self.avg_gain * (RSI_PERIOD - 1) as f64 + gain) / RSI_PERIOD as f64;
                self.avg_loss =
                    (self.avg_loss * (RSI_PERIOD - 1) as f64 + loss) / RSI_PERIOD as f64;
            }

            let daily_return = close / closes[index - 1] - 1.0;
            self.return_sum += daily_return;
            self.return_sq_sum += daily_return * daily_return;

            if index > VOLATILITY_PERIOD {
                let dropped = closes[index - VOLATILITY_PERIOD]
                    / closes[index - VOLATILITY_PERIOD - 1]
                    - 1.0;
                self.return_sum -= dropped;
                self.return_sq_sum -= dropped * dropped;
            }
        }

        let rsi14 =
            (index >= RSI_PERIOD).then(|| rsi_from_averages(self.avg_gain, self.avg_loss));

        let volatility20 = (index >= VOLATILITY_PERIOD).then(|| {
            let n = VOLATILITY_PERIOD as f64;
            let variance = (self.return_sq_sum - self.return_sum * self.return_sum / n) / (n - 1.0);

            // rolling subtraction may leave a tiny negative residue
            variance.max(0.0).sqrt() * n.sqrt()
        });

        let ma_slope = if index >= MA_SLOPE_LOOKBACK {
            match (ma20, self.ma_short_history[index - MA_SLOPE_LOOKBACK]) {
                (Some(current), Some(past)) => Some((current - past) / past * 100.0),
                _ => None,
            }
        } else {
            None
        };

        let roc12 = (index >= ROC_PERIOD).then(|| {
            let past = closes[index - ROC_PERIOD];
            (close - past) / past * 100.0
        });

        let golden_cross = match (ma20, ma60) {
            (Some(short), Some(long)) => Some((short - long) / long * 100.0),
            _ => None,
        };

        IndicatorSnapshot {
            ma20,
            ma60,
            ma_slope,
            disparity: ma20.map(|ma| (close - ma) / ma * 100.0),
            rsi14,
            roc12,
            volatility20,
            golden_cross,
            is_golden_cross: match (ma20, ma60) {
                (Some(short), Some(long)) => Some(short > long),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naive;
    use float_cmp::approx_eq;

    const PARITY_EPSILON: f64 = 1e-6;

    fn assert_parity(batch: Option<f64>, reference: Option<f64>) {
        match (batch, reference) {
            (Some(batch), Some(reference)) => {
                assert!(
                    approx_eq!(f64, batch, reference, epsilon = PARITY_EPSILON),
                    "batch value {} diverged from naive value {}",
                    batch,
                    reference
                );
            }
            (batch, reference) => assert_eq!(batch, reference),
        }
    }

    #[test]
    #[allow(non_snake_case)]
    fn compute_series__oscillating_series__should_match_naive_within_epsilon() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0)
            .collect();

        let batch = compute_series(&closes);

        for (index, snapshot) in batch.iter().enumerate() {
            let reference = naive::snapshot_at(&closes, index);

            assert_parity(snapshot.ma20, reference.ma20);
            assert_parity(snapshot.ma60, reference.ma60);
            assert_parity(snapshot.ma_slope, reference.ma_slope);
            assert_parity(snapshot.disparity, reference.disparity);
            assert_parity(snapshot.rsi14, reference.rsi14);
            assert_parity(snapshot.roc12, reference.roc12);
            assert_parity(snapshot.volatility20, reference.volatility20);
            assert_parity(snapshot.golden_cross, reference.golden_cross);
            assert_eq!(snapshot.is_golden_cross, reference.is_golden_cross);
        }
    }

    #[test]
    #[allow(non_snake_case)]
    fn compute_range__mid_series_start__should_equal_suffix_of_full_series() {
        let closes: Vec<f64> = (0..90).map(|i| 200.0 + (i as f64 * 1.3).cos() * 8.0).collect();

        let full = compute_series(&closes);
        let range = compute_range(&closes, 70);

        assert_eq!(range.len(), 20);
        assert_eq!(&full[70..], range.as_slice());
    }
}
