//! Adaptive backtest: the strategy is re-selected at every cycle boundary
//! using only information available as of yesterday.

use anyhow::{bail, Result};
use backtesting::cycle::{CompletedCycle, CycleNumber, CycleState};
use backtesting::engine::{opening_snapshot, simulate_day};
use backtesting::report::{cagr, max_drawdown, win_rate, Cagr, DailySnapshot, Mdd, ReturnRate, WinRate};
use backtesting::{Capital, DEFAULT_INITIAL_CAPITAL};
use base::entities::{PricePoint, StrategyKind, RATE_DECIMAL_PLACES};
use base::helpers::floor_dp;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

use crate::cache::IndicatorCache;
use crate::recommendation::{recommend, RecommendationParams};

#[derive(Debug, Clone)]
pub struct AdaptiveParams {
    pub recommendation: RecommendationParams,
    pub initial_capital: Capital,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            recommendation: Default::default(),
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }
}

/// The strategy chosen for one cycle, with the market state it was chosen in.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleDecision {
    pub cycle_number: CycleNumber,
    pub strategy: StrategyKind,
    pub reason: String,
    pub starting_rsi: Option<f64>,
    pub starting_golden_cross: Option<bool>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StrategyUsage {
    pub strategy: StrategyKind,
    pub cycles: u32,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: Capital,
    pub final_asset: Capital,
    pub return_rate: ReturnRate,
    pub cagr: Cagr,
    pub mdd: Mdd,
    pub total_cycles: usize,
    pub win_rate: WinRate,
    pub daily_history: Vec<DailySnapshot>,
    pub decisions: Vec<CycleDecision>,
    pub usage: Vec<StrategyUsage>,
}

/// Drives the daily simulation loop, re-deriving the strategy on every day
/// whose cycle has no trade yet; once a cycle trades, its strategy is frozen
/// until it completes.
pub fn run_adaptive(
    prices: &[PricePoint],
    ticker: &str,
    params: &AdaptiveParams,
    cache: &mut impl IndicatorCache,
) -> Result<AdaptiveReport> {
    if prices.len() < 2 {
        bail!(
            "at least 2 price points are required, but got {}",
            prices.len()
        );
    }

    if params.initial_capital <= dec!(0) {
        bail!(
            "initial capital should be positive, but got {}",
            params.initial_capital
        );
    }

    let mut cycle = CycleState::new(params.initial_capital);
    let mut completed_cycles: Vec<CompletedCycle> = Vec::new();
    let mut daily_history = Vec::with_capacity(prices.len());

    daily_history.push(opening_snapshot(&prices[0], &cycle));

    let mut current_strategy = StrategyKind::default();
    let mut current_config = current_strategy.config();

    let mut decisions: Vec<CycleDecision> = Vec::new();
    let mut usage: Vec<StrategyUsage> = StrategyKind::ALL
        .iter()
        .map(|&strategy| StrategyUsage {
            strategy,
            cycles: 0,
            days: 0,
        })
        .collect();

    for index in 1..prices.len() {
        if cycle.trade_count() == 0 {
            let decision = derive_decision(
                prices,
                ticker,
                index,
                cycle.cycle_number(),
                &params.recommendation,
                cache,
            );

            if decision.strategy != current_strategy {
                current_strategy = decision.strategy;
                current_config = current_strategy.config();
            }

            upsert_decision(&mut decisions, decision);
        }

        usage[current_strategy as usize].days += 1;

        let completed_before = completed_cycles.len();
        let snapshot = simulate_day(
            &mut cycle,
            &current_config,
            prices,
            index,
            &mut completed_cycles,
        )?;

        if completed_cycles.len() > completed_before {
            usage[current_strategy as usize].cycles += 1;
        }

        daily_history.push(snapshot);
    }

    let final_asset = daily_history
        .last()
        .map(|snapshot| snapshot.total_asset)
        .unwrap_or(params.initial_capital);

    Ok(AdaptiveReport {
        start_date: prices[0].date,
        end_date: prices[prices.len() - 1].date,
        initial_capital: params.initial_capital,
        final_asset,
        return_rate: floor_dp(
            (final_asset - params.initial_capital) / params.initial_capital,
            RATE_DECIMAL_PLACES,
        ),
        cagr: cagr(params.initial_capital, final_asset, prices.len() - 1),
        mdd: max_drawdown(&daily_history),
        total_cycles: completed_cycles.len(),
        win_rate: win_rate(&completed_cycles),
        daily_history,
        decisions,
        usage,
    })
}

/// Recommendation as of yesterday. Never raises during an otherwise-valid
/// simulation: any shortfall falls back to the default strategy with a
/// reason.
fn derive_decision(
    prices: &[PricePoint],
    ticker: &str,
    index: usize,
    cycle_number: CycleNumber,
    params: &RecommendationParams,
    cache: &mut impl IndicatorCache,
) -> CycleDecision {
    match recommend(&prices[..index], ticker, index - 1, params, cache) {
        Ok(report) => CycleDecision {
            cycle_number,
            strategy: report.recommended_strategy,
            reason: report.reason,
            starting_rsi: report.reference_indicators.rsi14,
            starting_golden_cross: report.reference_indicators.is_golden_cross,
        },
        Err(error) => {
            log::warn!(
                "recommendation failed as of day index {}: {:#}",
                index - 1,
                error
            );

            CycleDecision {
                cycle_number,
                strategy: StrategyKind::default(),
                reason: format!(
                    "fell back to {}: recommendation failed",
                    StrategyKind::default()
                ),
                starting_rsi: None,
                starting_golden_cross: None,
            }
        }
    }
}

/// One decision record per cycle; a pre-trade re-pick replaces the record of
/// the same cycle.
fn upsert_decision(decisions: &mut Vec<CycleDecision>, decision: CycleDecision) {
    match decisions.last_mut() {
        Some(last) if last.cycle_number == decision.cycle_number => *last = decision,
        _ => decisions.push(decision),
    }
}
