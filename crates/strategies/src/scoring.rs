//! Strategy scoring over analogous historical periods.
//!
//! Every (candidate, strategy) pair is a pure nested backtest over read-only
//! inputs, so pairs are evaluated on scoped threads and merged back by index
//! — the ranking never depends on completion order.

use backtesting::engine::run_backtest;
use backtesting::{Capital, DEFAULT_INITIAL_CAPITAL};
use base::entities::{PricePoint, StrategyKind};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::similarity::SimilarPeriodCandidate;

pub type Score = f64;

#[derive(Debug, Clone)]
pub struct ScoringParams {
    /// Forward performance window immediately following a candidate date.
    pub performance_window_days: usize,
    pub initial_capital: Capital,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            performance_window_days: 60,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }
}

/// Forward performance of one strategy over one candidate's window.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyPerformance {
    pub strategy: StrategyKind,
    pub return_rate: Decimal,
    pub mdd: Decimal,
}

/// A candidate with its per-strategy forward performance; `None` marks a
/// nested backtest that failed and is excluded from scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvaluation {
    pub candidate: SimilarPeriodCandidate,
    pub performances: Vec<Option<StrategyPerformance>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyScore {
    pub strategy: StrategyKind,
    pub candidate_scores: Vec<Option<Score>>,
    /// Similarity-weighted average over the non-failed candidates.
    pub weighted_average: Option<Score>,
    pub excluded: bool,
}

fn evaluate_pair(
    prices: &[PricePoint],
    candidate_index: usize,
    strategy: StrategyKind,
    params: &ScoringParams,
) -> Option<StrategyPerformance> {
    let start = candidate_index + 1;
    let end = (start + params.performance_window_days).min(prices.len());

    if start >= end {
        log::warn!(
            "candidate index {} has no forward window inside the series",
            candidate_index
        );

        return None;
    }

    match run_backtest(&prices[start..end], strategy, params.initial_capital) {
        Ok(report) => Some(StrategyPerformance {
            strategy,
            return_rate: report.return_rate,
            mdd: report.mdd,
        }),
        Err(error) => {
            log::warn!(
                "nested backtest failed for candidate index {} under {}: {:#}",
                candidate_index,
                strategy,
                error
            );

            None
        }
    }
}

/// Evaluates every candidate × strategy pair concurrently.
pub fn evaluate_candidates(
    prices: &[PricePoint],
    candidates: &[SimilarPeriodCandidate],
    params: &ScoringParams,
) -> Vec<CandidateEvaluation> {
    crossbeam::thread::scope(|scope| {
        let handles: Vec<Vec<_>> = candidates
            .iter()
            .map(|candidate| {
                StrategyKind::ALL
                    .iter()
                    .map(|&strategy| {
                        let candidate_index = candidate.index;
                        scope.spawn(move |_| {
                            evaluate_pair(prices, candidate_index, strategy, params)
                        })
                    })
                    .collect()
            })
            .collect();

        // joined in (candidate, strategy) order: an index-ordered merge
        handles
            .into_iter()
            .zip(candidates)
            .map(|(strategy_handles, candidate)| CandidateEvaluation {
                candidate: candidate.clone(),
                performances: strategy_handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap())
                    .collect(),
            })
            .collect()
    })
    .unwrap()
}

/// Sequential twin of `evaluate_candidates`; must produce identical results.
pub fn evaluate_candidates_sequential(
    prices: &[PricePoint],
    candidates: &[SimilarPeriodCandidate],
    params: &ScoringParams,
) -> Vec<CandidateEvaluation> {
    candidates
        .iter()
        .map(|candidate| CandidateEvaluation {
            candidate: candidate.clone(),
            performances: StrategyKind::ALL
                .iter()
                .map(|&strategy| evaluate_pair(prices, candidate.index, strategy, params))
                .collect(),
        })
        .collect()
}

/// Per-candidate score: the return in percent shrunk exponentially by the
/// drawdown (MDD is non-positive).
pub fn candidate_score(performance: &StrategyPerformance) -> Score {
    let return_rate_pct = performance.return_rate.to_f64().unwrap() * 100.0;
    let mdd_pct = performance.mdd.to_f64().unwrap() * 100.0;

    return_rate_pct * (mdd_pct * 0.01).exp()
}

pub fn score_strategies(
    evaluations: &[CandidateEvaluation],
    aggressive_excluded: bool,
) -> Vec<StrategyScore> {
    StrategyKind::ALL
        .iter()
        .enumerate()
        .map(|(slot, &strategy)| {
            let mut weighted_sum = 0.0;
            let mut similarity_sum = 0.0;

            let candidate_scores: Vec<Option<Score>> = evaluations
                .iter()
                .map(|evaluation| {
                    evaluation.performances[slot].as_ref().map(|performance| {
                        let score = candidate_score(performance);

                        weighted_sum += score * evaluation.candidate.similarity;
                        similarity_sum += evaluation.candidate.similarity;

                        score
                    })
                })
                .collect();

            StrategyScore {
                strategy,
                candidate_scores,
                weighted_average: (similarity_sum > 0.0).then(|| weighted_sum / similarity_sum),
                excluded: aggressive_excluded && strategy == StrategyKind::Aggressive,
            }
        })
        .collect()
}

/// The highest-scoring non-excluded strategy, if any produced a valid score.
pub fn recommended_strategy(scores: &[StrategyScore]) -> Option<StrategyKind> {
    scores
        .iter()
        .filter(|score| !score.excluded)
        .filter_map(|score| {
            score
                .weighted_average
                .map(|average| (score.strategy, average))
        })
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(strategy, _)| strategy)
}
