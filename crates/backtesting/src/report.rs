//! Result aggregation of one backtest run.

use base::entities::order::{OrderAction, TradeAction};
use base::entities::price::PriceValue;
use base::entities::{PricePoint, StrategyKind, RATE_DECIMAL_PLACES};
use base::helpers::{floor_dp, round_half_up_dp};
use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::cycle::{CompletedCycle, CycleNumber, CycleState, TierState};
use crate::Capital;

pub type ReturnRate = Decimal;
pub type Mdd = Decimal;
pub type WinRate = Decimal;
pub type Cagr = Decimal;

pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// One simulated trading day; an append-only sequence owned by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub open: PriceValue,
    pub high: PriceValue,
    pub low: PriceValue,
    pub close: PriceValue,
    pub adj_close: PriceValue,
    pub cash: Capital,
    pub holdings_value: Capital,
    pub total_asset: Capital,
    pub trades: Vec<TradeAction>,
    pub orders: Vec<OrderAction>,
    pub active_tier_count: usize,
    pub cycle_number: CycleNumber,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub strategy: StrategyKind,
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
    pub remaining_open_tiers: Vec<TierState>,
}

pub fn aggregate_report(
    strategy: StrategyKind,
    prices: &[PricePoint],
    initial_capital: Capital,
    cycle: &CycleState,
    completed_cycles: &[CompletedCycle],
    daily_history: Vec<DailySnapshot>,
) -> BacktestReport {
    let final_asset = daily_history
        .last()
        .map(|snapshot| snapshot.total_asset)
        .unwrap_or(initial_capital);

    BacktestReport {
        strategy,
        start_date: prices[0].date,
        end_date: prices[prices.len() - 1].date,
        initial_capital,
        final_asset,
        return_rate: floor_dp(
            (final_asset - initial_capital) / initial_capital,
            RATE_DECIMAL_PLACES,
        ),
        cagr: cagr(initial_capital, final_asset, prices.len() - 1),
        mdd: max_drawdown(&daily_history),
        total_cycles: completed_cycles.len(),
        win_rate: win_rate(completed_cycles),
        daily_history,
        remaining_open_tiers: cycle.active_tiers().cloned().collect(),
    }
}

/// Largest peak-to-trough decline of the total-asset curve, as a non-positive
/// rate; zero when the curve never dips below its running peak.
pub fn max_drawdown(daily_history: &[DailySnapshot]) -> Mdd {
    let mut peak = dec!(0);
    let mut worst = dec!(0);

    for snapshot in daily_history {
        if snapshot.total_asset > peak {
            peak = snapshot.total_asset;
        }

        if peak > dec!(0) {
            let drawdown = (snapshot.total_asset - peak) / peak;

            if drawdown < worst {
                worst = drawdown;
            }
        }
    }

    round_half_up_dp(worst, RATE_DECIMAL_PLACES)
}

/// Share of completed cycles that ended with a positive profit; zero when no
/// cycle completed.
pub fn win_rate(completed_cycles: &[CompletedCycle]) -> WinRate {
    if completed_cycles.is_empty() {
        return dec!(0);
    }

    let winners = completed_cycles
        .iter()
        .filter(|cycle| cycle.profit() > dec!(0))
        .count();

    round_half_up_dp(
        Decimal::from(winners) / Decimal::from(completed_cycles.len()),
        RATE_DECIMAL_PLACES,
    )
}

/// Compound annual growth rate from total return and elapsed trading days.
pub fn cagr(initial_capital: Capital, final_asset: Capital, elapsed_trading_days: usize) -> Cagr {
    if elapsed_trading_days == 0 || initial_capital <= dec!(0) {
        return dec!(0);
    }

    let growth = (final_asset / initial_capital).to_f64().unwrap();

    if growth <= 0.0 {
        return dec!(-1);
    }

    let annualized =
        growth.powf(TRADING_DAYS_PER_YEAR as f64 / elapsed_trading_days as f64) - 1.0;

    round_half_up_dp(
        Decimal::from_f64(annualized).unwrap_or_default(),
        RATE_DECIMAL_PLACES,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_total_asset(total_asset: Decimal) -> DailySnapshot {
        DailySnapshot {
            date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            open: dec!(100),
            high: dec!(100),
            low: dec!(100),
            close: dec!(100),
            adj_close: dec!(100),
            cash: total_asset,
            holdings_value: dec!(0),
            total_asset,
            trades: Vec::new(),
            orders: Vec::new(),
            active_tier_count: 0,
            cycle_number: 1,
        }
    }

    #[test]
    #[allow(non_snake_case)]
    fn max_drawdown__single_dip_curve__should_report_the_peak_to_trough_decline() {
        let history: Vec<_> = [dec!(10_000), dec!(12_000), dec!(9_000), dec!(11_000)]
            .into_iter()
            .map(snapshot_with_total_asset)
            .collect();

        assert_eq!(max_drawdown(&history), dec!(-0.25));
    }

    #[test]
    #[allow(non_snake_case)]
    fn max_drawdown__monotonically_rising_curve__should_be_zero() {
        let history: Vec<_> = [dec!(10_000), dec!(10_500), dec!(11_000)]
            .into_iter()
            .map(snapshot_with_total_asset)
            .collect();

        assert_eq!(max_drawdown(&history), dec!(0));
    }

    #[test]
    #[allow(non_snake_case)]
    fn win_rate__two_of_three_profitable_cycles__should_be_two_thirds() {
        let completed = vec![
            CompletedCycle {
                cycle_number: 1,
                initial_capital: dec!(10_000),
                ending_cash: dec!(10_100),
            },
            CompletedCycle {
                cycle_number: 2,
                initial_capital: dec!(10_100),
                ending_cash: dec!(10_000),
            },
            CompletedCycle {
                cycle_number: 3,
                initial_capital: dec!(10_000),
                ending_cash: dec!(10_300),
            },
        ];

        assert_eq!(win_rate(&completed), dec!(0.6667));
    }

    #[test]
    #[allow(non_snake_case)]
    fn win_rate__no_completed_cycles__should_be_zero() {
        assert_eq!(win_rate(&[]), dec!(0));
    }

    #[test]
    #[allow(non_snake_case)]
    fn cagr__doubling_over_a_trading_year__should_be_about_one() {
        assert_eq!(
            cagr(dec!(10_000), dec!(20_000), TRADING_DAYS_PER_YEAR as usize),
            dec!(1)
        );
    }

    #[test]
    #[allow(non_snake_case)]
    fn cagr__no_elapsed_days__should_be_zero() {
        assert_eq!(cagr(dec!(10_000), dec!(11_000), 0), dec!(0));
    }
}
