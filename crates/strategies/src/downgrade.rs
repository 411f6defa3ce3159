//! Deterministic strategy-conservatism override.
//!
//! Computed from the *set* of fired triggers: at most one downgrade step is
//! applied regardless of how many fired, so the rule is idempotent and
//! order-independent.

use base::entities::StrategyKind;
use indicators::divergence::{bearish_divergence, DivergenceParams};
use indicators::snapshot::IndicatorSnapshot;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
pub struct DowngradeParams {
    pub rsi_threshold: f64,
    pub disparity_threshold: f64,
}

impl Default for DowngradeParams {
    fn default() -> Self {
        Self {
            rsi_threshold: 60.0,
            disparity_threshold: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum DowngradeTrigger {
    /// RSI overbought while the moving averages are inverted.
    OverboughtInvertedAlignment,
    /// RSI overbought with a bearish price/RSI divergence.
    BearishRsiDivergence,
}

impl Display for DowngradeTrigger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            DowngradeTrigger::OverboughtInvertedAlignment => {
                write!(f, "overbought with inverted moving-average alignment")
            }
            DowngradeTrigger::BearishRsiDivergence => {
                write!(f, "overbought with a bearish price/RSI divergence")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DowngradeOutcome {
    pub strategy: StrategyKind,
    /// True iff the resulting strategy differs from the input.
    pub applied: bool,
    /// Every firing trigger is reported even though only one step applies.
    pub reasons: Vec<String>,
}

pub fn fired_triggers(
    snapshot: &IndicatorSnapshot,
    closes: &[f64],
    series: &[IndicatorSnapshot],
    reference_index: usize,
    divergence_params: &DivergenceParams,
    params: &DowngradeParams,
) -> BTreeSet<DowngradeTrigger> {
    let mut triggers = BTreeSet::new();

    let rsi = match snapshot.rsi14 {
        Some(rsi) if rsi >= params.rsi_threshold => rsi,
        _ => return triggers,
    };

    if snapshot.is_inverted_alignment() {
        triggers.insert(DowngradeTrigger::OverboughtInvertedAlignment);
    }

    if let Some(disparity) = snapshot.disparity {
        if disparity < params.disparity_threshold
            && bearish_divergence(closes, series, reference_index, divergence_params)
        {
            triggers.insert(DowngradeTrigger::BearishRsiDivergence);
        }
    }

    log::debug!(
        "downgrade triggers at index {} (rsi {}): {:?}",
        reference_index,
        rsi,
        triggers
    );

    triggers
}

/// One downgrade step when any trigger fired; the most conservative strategy
/// is a fixed point.
pub fn apply_downgrade(
    strategy: StrategyKind,
    triggers: &BTreeSet<DowngradeTrigger>,
) -> DowngradeOutcome {
    if triggers.is_empty() {
        return DowngradeOutcome {
            strategy,
            applied: false,
            reasons: Vec::new(),
        };
    }

    let downgraded = strategy.more_conservative();

    DowngradeOutcome {
        strategy: downgraded,
        applied: downgraded != strategy,
        reasons: triggers.iter().map(ToString::to_string).collect(),
    }
}

pub fn evaluate_downgrade(
    strategy: StrategyKind,
    snapshot: &IndicatorSnapshot,
    closes: &[f64],
    series: &[IndicatorSnapshot],
    reference_index: usize,
    divergence_params: &DivergenceParams,
    params: &DowngradeParams,
) -> DowngradeOutcome {
    let triggers = fired_triggers(
        snapshot,
        closes,
        series,
        reference_index,
        divergence_params,
        params,
    );

    apply_downgrade(strategy, &triggers)
}
