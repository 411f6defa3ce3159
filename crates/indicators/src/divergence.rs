//! Bearish price/RSI divergence over a trailing window.

use crate::snapshot::IndicatorSnapshot;

pub type PeakIndex = usize;

#[derive(Debug, Clone)]
pub struct DivergenceParams {
    /// Trailing window of trading days ending at the reference index.
    pub window: usize,
    /// Two highs closer than this keep only the higher one.
    pub min_peak_distance: usize,
    /// Minimum RSI points the later high must sit below the earlier one.
    pub rsi_min_drop: f64,
    /// The later high must hold at least this fraction of the earlier price.
    pub price_ratio_floor: f64,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            window: 15,
            min_peak_distance: 3,
            rsi_min_drop: 5.0,
            price_ratio_floor: 0.99,
        }
    }
}

/// True when price holds while RSI falls between the two most recent local
/// highs. Never errors: insufficient data or an out-of-range index is `false`.
pub fn bearish_divergence(
    closes: &[f64],
    snapshots: &[IndicatorSnapshot],
    reference_index: usize,
    params: &DivergenceParams,
) -> bool {
    if reference_index >= closes.len() || reference_index >= snapshots.len() {
        return false;
    }

    let peaks = local_highs(closes, reference_index, params);

    if peaks.len() < 2 {
        return false;
    }

    let earlier = peaks[peaks.len() - 2];
    let later = peaks[peaks.len() - 1];

    let (earlier_rsi, later_rsi) = match (snapshots[earlier].rsi14, snapshots[later].rsi14) {
        (Some(earlier_rsi), Some(later_rsi)) => (earlier_rsi, later_rsi),
        _ => return false,
    };

    let price_holds = closes[later] >= closes[earlier] * params.price_ratio_floor;
    let momentum_falls = later_rsi <= earlier_rsi - params.rsi_min_drop;

    price_holds && momentum_falls
}

/// Local highs (strictly greater than both neighbors) inside the trailing
/// window, deduplicated by the minimum peak distance.
fn local_highs(closes: &[f64], reference_index: usize, params: &DivergenceParams) -> Vec<PeakIndex> {
    let start = reference_index.saturating_sub(params.window);
    let mut peaks: Vec<PeakIndex> = Vec::new();

    // the reference day itself has no right neighbor yet
    for index in start.max(1)..reference_index {
        if closes[index] <= closes[index - 1] || closes[index] <= closes[index + 1] {
            continue;
        }

        match peaks.last().copied() {
            Some(previous) if index - previous < params.min_peak_distance => {
                if closes[index] > closes[previous] {
                    *peaks.last_mut().unwrap() = index;
                }
            }
            _ => peaks.push(index),
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshots_with_rsi(rsi_values: &[f64]) -> Vec<IndicatorSnapshot> {
        rsi_values
            .iter()
            .map(|&rsi| IndicatorSnapshot {
                rsi14: Some(rsi),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    #[allow(non_snake_case)]
    fn bearish_divergence__flat_highs_with_falling_rsi__should_be_detected() {
        //                    peak                          peak
        let closes = vec![
            100.0, 103.0, 106.0, 104.0, 102.0, 101.0, 103.0, 105.9, 104.0, 102.0,
        ];
        let mut rsi = vec![50.0; closes.len()];
        rsi[2] = 70.0;
        rsi[7] = 62.0;

        assert!(bearish_divergence(
            &closes,
            &snapshots_with_rsi(&rsi),
            9,
            &DivergenceParams::default()
        ));
    }

    #[test]
    #[allow(non_snake_case)]
    fn bearish_divergence__later_high_much_lower__should_not_be_detected() {
        let closes = vec![
            100.0, 103.0, 106.0, 104.0, 102.0, 101.0, 102.0, 103.0, 101.0, 100.0,
        ];
        let mut rsi = vec![50.0; closes.len()];
        rsi[2] = 70.0;
        rsi[7] = 62.0;

        // 103 < 0.99 × 106: price did not hold
        assert!(!bearish_divergence(
            &closes,
            &snapshots_with_rsi(&rsi),
            9,
            &DivergenceParams::default()
        ));
    }

    #[test]
    #[allow(non_snake_case)]
    fn bearish_divergence__rsi_drop_below_threshold__should_not_be_detected() {
        let closes = vec![
            100.0, 103.0, 106.0, 104.0, 102.0, 101.0, 103.0, 105.9, 104.0, 102.0,
        ];
        let mut rsi = vec![50.0; closes.len()];
        rsi[2] = 70.0;
        rsi[7] = 68.0;

        assert!(!bearish_divergence(
            &closes,
            &snapshots_with_rsi(&rsi),
            9,
            &DivergenceParams::default()
        ));
    }

    #[test]
    #[allow(non_snake_case)]
    fn bearish_divergence__fewer_than_two_highs__should_return_false() {
        let closes = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        let rsi = vec![50.0; closes.len()];

        assert!(!bearish_divergence(
            &closes,
            &snapshots_with_rsi(&rsi),
            5,
            &DivergenceParams::default()
        ));
    }

    #[test]
    #[allow(non_snake_case)]
    fn bearish_divergence__out_of_range_index__should_return_false() {
        let closes = vec![100.0, 101.0, 100.0];
        let rsi = vec![50.0; closes.len()];

        assert!(!bearish_divergence(
            &closes,
            &snapshots_with_rsi(&rsi),
            10,
            &DivergenceParams::default()
        ));
    }

    #[test]
    #[allow(non_snake_case)]
    fn local_highs__two_highs_within_min_distance__should_keep_the_higher_one() {
        //                          peak   dip    peak
        let closes = vec![100.0, 104.0, 103.0, 105.0, 101.0, 100.0, 100.5, 100.0];

        let peaks = local_highs(&closes, 7, &DivergenceParams::default());

        assert_eq!(peaks, vec![3, 6]);
    }
}
