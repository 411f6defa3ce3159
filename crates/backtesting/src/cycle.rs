//! Tier/cycle state machine.
//!
//! A cycle owns a fixed seven-slot tier arena. Tiers move Empty → Active on a
//! buy fill and back on a sell or stop-loss fill; the cycle is complete once
//! at least one trade occurred and no tier is active, and rolling its ending
//! cash forward is the sole compounding mechanism.

use anyhow::{bail, Result};
use base::entities::order::{Shares, TierNumber};
use base::entities::price::PriceValue;
use base::entities::strategy::{TierRatio, SPLIT_TIER_COUNT, TIER_COUNT};
use base::entities::CURRENCY_DECIMAL_PLACES;
use base::helpers::floor_dp;
use rust_decimal::Decimal;

use crate::Capital;

pub type CycleNumber = u32;
pub type DayIndex = usize;
pub type HoldingDays = u32;

pub const RESERVE_TIER: TierNumber = 7;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TierState {
    pub tier: TierNumber,
    pub buy_price: PriceValue,
    pub shares: Shares,
    pub buy_day_index: DayIndex,
    pub holding_days: HoldingDays,
    pub sell_limit_price: PriceValue,
}

/// A completed cycle, kept for win-rate aggregation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CompletedCycle {
    pub cycle_number: CycleNumber,
    pub initial_capital: Capital,
    pub ending_cash: Capital,
}

impl CompletedCycle {
    pub fn profit(&self) -> Decimal {
        self.ending_cash - self.initial_capital
    }
}

#[derive(Debug, Clone)]
pub struct CycleState {
    cycle_number: CycleNumber,
    cycle_initial_capital: Capital,
    cash: Capital,
    day_count: u32,
    trade_count: u32,
    tiers: [Option<TierState>; TIER_COUNT],
}

impl CycleState {
    pub fn new(initial_capital: Capital) -> Self {
        Self {
            cycle_number: 1,
            cycle_initial_capital: initial_capital,
            cash: initial_capital,
            day_count: 0,
            trade_count: 0,
            tiers: Default::default(),
        }
    }

    pub fn cycle_number(&self) -> CycleNumber {
        self.cycle_number
    }

    pub fn cycle_initial_capital(&self) -> Capital {
        self.cycle_initial_capital
    }

    pub fn cash(&self) -> Capital {
        self.cash
    }

    pub fn day_count(&self) -> u32 {
        self.day_count
    }

    pub fn trade_count(&self) -> u32 {
        self.trade_count
    }

    pub fn active_tiers(&self) -> impl Iterator<Item = &TierState> {
        self.tiers.iter().flatten()
    }

    pub fn active_tier_count(&self) -> usize {
        self.active_tiers().count()
    }

    pub fn tier(&self, tier: TierNumber) -> Result<Option<&TierState>> {
        Ok(self.tiers[Self::slot(tier)?].as_ref())
    }

    fn slot(tier: TierNumber) -> Result<usize> {
        if !(1..=TIER_COUNT as TierNumber).contains(&tier) {
            bail!("tier number should be within [1, 7], but got {}", tier);
        }

        Ok((tier - 1) as usize)
    }

    /// The lowest-numbered empty tier among 1–6; the reserve tier only once
    /// all of 1–6 are active.
    pub fn next_buy_tier(&self) -> Option<TierNumber> {
        for tier in 1..=SPLIT_TIER_COUNT as TierNumber {
            if self.tiers[(tier - 1) as usize].is_none() {
                return Some(tier);
            }
        }

        if self.tiers[(RESERVE_TIER - 1) as usize].is_none() {
            return Some(RESERVE_TIER);
        }

        None
    }

    /// The buy budget of a tier: a fixed share of the cycle capital for
    /// tiers 1–6 (never more than the current cash), all remaining cash for
    /// the reserve tier.
    pub fn tier_amount(
        &self,
        tier: TierNumber,
        tier_ratios: &[TierRatio; SPLIT_TIER_COUNT],
    ) -> Result<Capital> {
        let slot = Self::slot(tier)?;

        if tier == RESERVE_TIER {
            return Ok(self.cash);
        }

        let amount = floor_dp(
            self.cycle_initial_capital * tier_ratios[slot],
            CURRENCY_DECIMAL_PLACES,
        );

        Ok(amount.min(self.cash))
    }

    /// Advances the cycle day counter and every active tier's holding days.
    pub fn advance_day(&mut self) {
        self.day_count += 1;

        for tier in self.tiers.iter_mut().flatten() {
            tier.holding_days += 1;
        }
    }

    pub fn open_tier(
        &mut self,
        tier: TierNumber,
        price: PriceValue,
        shares: Shares,
        buy_day_index: DayIndex,
        sell_limit_price: PriceValue,
    ) -> Result<()> {
        let slot = Self::slot(tier)?;

        if self.tiers[slot].is_some() {
            bail!("tier {} is already active", tier);
        }

        let cost = price * Decimal::from(shares);

        if cost > self.cash {
            bail!("buy cost {} exceeds available cash {}", cost, self.cash);
        }

        self.cash -= cost;
        self.trade_count += 1;

        self.tiers[slot] = Some(TierState {
            tier,
            buy_price: price,
            shares,
            buy_day_index,
            holding_days: 0,
            sell_limit_price,
        });

        Ok(())
    }

    pub fn close_tier(&mut self, tier: TierNumber, price: PriceValue) -> Result<TierState> {
        let slot = Self::slot(tier)?;

        let state = match self.tiers[slot].take() {
            Some(state) => state,
            None => bail!("tier {} is not active", tier),
        };

        self.cash += price * Decimal::from(state.shares);
        self.trade_count += 1;

        Ok(state)
    }

    /// Complete iff at least one trade occurred and no tier is active.
    pub fn is_complete(&self) -> bool {
        self.trade_count > 0 && self.active_tier_count() == 0
    }

    /// Rolls the ending cash into the next cycle's initial capital.
    pub fn start_next_cycle(&mut self) -> CompletedCycle {
        let completed = CompletedCycle {
            cycle_number: self.cycle_number,
            initial_capital: self.cycle_initial_capital,
            ending_cash: self.cash,
        };

        log::debug!(
            "cycle {} completed: initial capital {}, ending cash {}",
            completed.cycle_number,
            completed.initial_capital,
            completed.ending_cash
        );

        self.cycle_number += 1;
        self.cycle_initial_capital = self.cash;
        self.day_count = 0;
        self.trade_count = 0;
        self.tiers = Default::default();

        completed
    }
}
