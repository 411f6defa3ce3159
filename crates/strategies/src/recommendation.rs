//! The recommendation pipeline: analogue search, scoring, downgrade.

use anyhow::{bail, Result};
use base::entities::{PricePoint, StrategyKind};
use chrono::NaiveDate;
use indicators::adjusted_closes;
use indicators::divergence::{bearish_divergence, DivergenceParams};
use indicators::snapshot::IndicatorSnapshot;

use crate::cache::{catalogue_snapshots, IndicatorCache};
use crate::downgrade::{evaluate_downgrade, DowngradeOutcome, DowngradeParams};
use crate::scoring::{
    evaluate_candidates, recommended_strategy, score_strategies, CandidateEvaluation,
    ScoringParams, StrategyScore,
};
use crate::similarity::{find_similar, SimilarityParams};

#[derive(Debug, Clone, Default)]
pub struct RecommendationParams {
    pub similarity: SimilarityParams,
    pub scoring: ScoringParams,
    pub divergence: DivergenceParams,
    pub downgrade: DowngradeParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationReport {
    pub reference_date: NaiveDate,
    pub analysis_start_date: NaiveDate,
    pub reference_indicators: IndicatorSnapshot,
    pub top_candidates: Vec<CandidateEvaluation>,
    pub strategy_scores: Vec<StrategyScore>,
    pub recommended_strategy: StrategyKind,
    pub reason: String,
    pub downgrade_info: Option<DowngradeOutcome>,
}

/// Recommends the fixed strategy whose analogue backtests score highest as of
/// the reference date.
///
/// Only `prices[..=reference_index]` is ever read. A pipeline shortfall
/// (insufficient history, fewer analogous periods than requested, no valid
/// score) degrades to the default strategy with an explanatory reason;
/// only an out-of-range reference or invalid parameters are errors.
pub fn recommend(
    prices: &[PricePoint],
    ticker: &str,
    reference_index: usize,
    params: &RecommendationParams,
    cache: &mut impl IndicatorCache,
) -> Result<RecommendationReport> {
    if reference_index >= prices.len() {
        bail!(
            "reference index {} is out of range for {} price points",
            reference_index,
            prices.len()
        );
    }

    params.similarity.validate()?;

    let history = &prices[..=reference_index];
    let catalogue = catalogue_snapshots(prices, ticker, reference_index, cache);
    let reference_snapshot = catalogue[reference_index].clone();
    let reference_date = prices[reference_index].date;
    let analysis_start_date = prices[0].date;

    let fallback = |reason: String, reference_indicators: IndicatorSnapshot| RecommendationReport {
        reference_date,
        analysis_start_date,
        reference_indicators,
        top_candidates: Vec::new(),
        strategy_scores: Vec::new(),
        recommended_strategy: StrategyKind::default(),
        reason,
        downgrade_info: None,
    };

    if reference_snapshot.similarity_vector().is_none() {
        return Ok(fallback(
            format!(
                "fell back to {}: insufficient history for the reference indicators",
                StrategyKind::default()
            ),
            reference_snapshot,
        ));
    }

    // a candidate needs both the temporal gap and a full forward window
    // inside the as-of history
    let candidate_guard = params
        .scoring
        .performance_window_days
        .max(params.similarity.min_gap_days);

    let last_candidate_index = match reference_index.checked_sub(candidate_guard) {
        Some(index) => index,
        None => {
            return Ok(fallback(
                format!(
                    "fell back to {}: not enough history before the reference date",
                    StrategyKind::default()
                ),
                reference_snapshot,
            ))
        }
    };

    let candidates = find_similar(
        &catalogue,
        reference_index,
        last_candidate_index,
        &params.similarity,
    )?;

    if candidates.len() < params.similarity.top_k {
        return Ok(fallback(
            format!(
                "fell back to {}: only {} of {} analogous periods found",
                StrategyKind::default(),
                candidates.len(),
                params.similarity.top_k
            ),
            reference_snapshot,
        ));
    }

    let evaluations = evaluate_candidates(history, &candidates, &params.scoring);

    let closes = adjusted_closes(history);
    let divergence_override =
        bearish_divergence(&closes, &catalogue, reference_index, &params.divergence);
    let aggressive_excluded =
        reference_snapshot.is_golden_cross == Some(true) && !divergence_override;

    let strategy_scores = score_strategies(&evaluations, aggressive_excluded);

    match recommended_strategy(&strategy_scores) {
        Some(strategy) => {
            let outcome = evaluate_downgrade(
                strategy,
                &reference_snapshot,
                &closes,
                &catalogue,
                reference_index,
                &params.divergence,
                &params.downgrade,
            );

            let mut reason = format!(
                "{} scored highest across {} analogous periods",
                strategy,
                evaluations.len()
            );

            if outcome.applied {
                reason = format!(
                    "{}; downgraded to {} ({})",
                    reason,
                    outcome.strategy,
                    outcome.reasons.join("; ")
                );
            }

            let downgrade_info = if outcome.reasons.is_empty() {
                None
            } else {
                Some(outcome.clone())
            };

            Ok(RecommendationReport {
                reference_date,
                analysis_start_date,
                reference_indicators: reference_snapshot,
                top_candidates: evaluations,
                strategy_scores,
                recommended_strategy: outcome.strategy,
                reason,
                downgrade_info,
            })
        }
        None => Ok(RecommendationReport {
            reference_date,
            analysis_start_date,
            reference_indicators: reference_snapshot,
            top_candidates: evaluations,
            strategy_scores,
            recommended_strategy: StrategyKind::default(),
            reason: format!(
                "fell back to {}: no strategy produced a valid score",
                StrategyKind::default()
            ),
            downgrade_info: None,
        }),
    }
}
