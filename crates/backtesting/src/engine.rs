//! The daily simulation loop driving the tier/cycle state machine under one
//! fixed strategy.

use anyhow::{bail, Result};
use base::entities::order::{OrderAction, OrderStyle, TradeAction, TradeType};
use base::entities::{PricePoint, StrategyConfig, StrategyKind};
use base::pricing::{
    buy_limit_price, buy_order_fills, buy_quantity, sell_limit_price, sell_order_fills,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::cycle::{CompletedCycle, CycleState};
use crate::report::{aggregate_report, BacktestReport, DailySnapshot};
use crate::Capital;

/// Runs the full simulation over a date-sorted price series.
///
/// Fails fast on fewer than 2 price points: the first day has no prior close
/// to derive a buy limit from.
pub fn run_backtest(
    prices: &[PricePoint],
    strategy: StrategyKind,
    initial_capital: Capital,
) -> Result<BacktestReport> {
    let config = strategy.config();
    config.validate()?;

    if prices.len() < 2 {
        bail!(
            "at least 2 price points are required, but got {}",
            prices.len()
        );
    }

    if initial_capital <= dec!(0) {
        bail!(
            "initial capital should be positive, but got {}",
            initial_capital
        );
    }

    let mut cycle = CycleState::new(initial_capital);
    let mut completed_cycles = Vec::new();
    let mut daily_history = Vec::with_capacity(prices.len());

    daily_history.push(opening_snapshot(&prices[0], &cycle));

    for index in 1..prices.len() {
        let snapshot = simulate_day(&mut cycle, &config, prices, index, &mut completed_cycles)?;
        daily_history.push(snapshot);
    }

    Ok(aggregate_report(
        strategy,
        prices,
        initial_capital,
        &cycle,
        &completed_cycles,
        daily_history,
    ))
}

/// The first day only records a snapshot: no prior close exists yet.
pub fn opening_snapshot(first: &PricePoint, cycle: &CycleState) -> DailySnapshot {
    DailySnapshot {
        date: first.date,
        open: first.open,
        high: first.high,
        low: first.low,
        close: first.close,
        adj_close: first.adj_close,
        cash: cycle.cash(),
        holdings_value: dec!(0),
        total_asset: cycle.cash(),
        trades: Vec::new(),
        orders: Vec::new(),
        active_tier_count: 0,
        cycle_number: cycle.cycle_number(),
    }
}

/// One simulated trading day, in the fixed evaluation order:
/// holding-day increments, stop-loss fills (against the tier set captured
/// before any same-day mutation), sell-limit fills, cycle roll, a single buy
/// attempt, snapshot.
pub fn simulate_day(
    cycle: &mut CycleState,
    config: &StrategyConfig,
    prices: &[PricePoint],
    index: usize,
    completed_cycles: &mut Vec<CompletedCycle>,
) -> Result<DailySnapshot> {
    if index == 0 || index >= prices.len() {
        bail!("day index {} is out of simulation range", index);
    }

    let today = &prices[index];
    let prev_close = prices[index - 1].close;

    let mut trades = Vec::new();
    let mut orders = Vec::new();

    cycle.advance_day();

    let stop_loss_tiers: Vec<_> = cycle
        .active_tiers()
        .filter(|tier| tier.holding_days >= config.stop_loss_days)
        .map(|tier| tier.tier)
        .collect();

    for tier in stop_loss_tiers {
        let closed = cycle.close_tier(tier, today.close)?;

        trades.push(TradeAction {
            r#type: TradeType::StopLoss,
            tier,
            style: OrderStyle::MarketOnClose,
            price: today.close,
            shares: closed.shares,
            amount: today.close * Decimal::from(closed.shares),
        });
    }

    let sell_tiers: Vec<_> = cycle
        .active_tiers()
        .filter(|tier| sell_order_fills(today.close, tier.sell_limit_price))
        .map(|tier| tier.tier)
        .collect();

    for tier in sell_tiers {
        let closed = cycle.close_tier(tier, today.close)?;

        trades.push(TradeAction {
            r#type: TradeType::Sell,
            tier,
            style: OrderStyle::LimitOnClose,
            price: today.close,
            shares: closed.shares,
            amount: today.close * Decimal::from(closed.shares),
        });
    }

    // compounding applies before today's buy is considered
    if cycle.is_complete() {
        completed_cycles.push(cycle.start_next_cycle());
    }

    if let Some(tier) = cycle.next_buy_tier() {
        let limit_price = buy_limit_price(prev_close, config.buy_threshold_pct);
        let tier_amount = cycle.tier_amount(tier, &config.tier_ratios)?;
        let shares = buy_quantity(tier_amount, limit_price)?;
        let filled = shares > 0 && buy_order_fills(today.close, limit_price);

        orders.push(OrderAction {
            r#type: TradeType::Buy,
            tier,
            style: OrderStyle::LimitOnClose,
            limit_price,
            shares,
            filled,
        });

        if filled {
            let sell_limit = sell_limit_price(today.close, config.sell_threshold_pct);

            cycle.open_tier(tier, today.close, shares, index, sell_limit)?;

            trades.push(TradeAction {
                r#type: TradeType::Buy,
                tier,
                style: OrderStyle::LimitOnClose,
                price: today.close,
                shares,
                amount: today.close * Decimal::from(shares),
            });
        }
    }

    let holdings_value: Decimal = cycle
        .active_tiers()
        .map(|tier| today.adj_close * Decimal::from(tier.shares))
        .sum();

    Ok(DailySnapshot {
        date: today.date,
        open: today.open,
        high: today.high,
        low: today.low,
        close: today.close,
        adj_close: today.adj_close,
        cash: cycle.cash(),
        holdings_value,
        total_asset: cycle.cash() + holdings_value,
        trades,
        orders,
        active_tier_count: cycle.active_tier_count(),
        cycle_number: cycle.cycle_number(),
    })
}
