use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type TierRatio = Decimal;
pub type StopLossDays = u32;

pub const TIER_COUNT: usize = 7;
pub const SPLIT_TIER_COUNT: usize = 6;

const TIER_RATIO_SUM_TOLERANCE: Decimal = dec!(0.0000000001);

/// The closed set of fixed strategies, ordered by aggressiveness.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StrategyKind {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Conservative,
        StrategyKind::Balanced,
        StrategyKind::Aggressive,
    ];

    /// One downgrade step; the most conservative strategy is a fixed point.
    pub fn more_conservative(self) -> Self {
        match self {
            StrategyKind::Aggressive => StrategyKind::Balanced,
            StrategyKind::Balanced | StrategyKind::Conservative => StrategyKind::Conservative,
        }
    }

    pub fn config(self) -> StrategyConfig {
        match self {
            StrategyKind::Conservative => StrategyConfig {
                tier_ratios: [
                    dec!(0.10),
                    dec!(0.15),
                    dec!(0.15),
                    dec!(0.20),
                    dec!(0.20),
                    dec!(0.20),
                ],
                buy_threshold_pct: dec!(-0.01),
                sell_threshold_pct: dec!(0.025),
                stop_loss_days: 30,
            },
            StrategyKind::Balanced => StrategyConfig {
                tier_ratios: [
                    dec!(0.20),
                    dec!(0.20),
                    dec!(0.15),
                    dec!(0.15),
                    dec!(0.15),
                    dec!(0.15),
                ],
                buy_threshold_pct: dec!(-0.005),
                sell_threshold_pct: dec!(0.02),
                stop_loss_days: 20,
            },
            StrategyKind::Aggressive => StrategyConfig {
                tier_ratios: [
                    dec!(0.25),
                    dec!(0.20),
                    dec!(0.15),
                    dec!(0.15),
                    dec!(0.15),
                    dec!(0.10),
                ],
                buy_threshold_pct: dec!(-0.0001),
                sell_threshold_pct: dec!(0.015),
                stop_loss_days: 10,
            },
        }
    }
}

impl Display for StrategyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            StrategyKind::Conservative => write!(f, "conservative"),
            StrategyKind::Balanced => write!(f, "balanced"),
            StrategyKind::Aggressive => write!(f, "aggressive"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "conservative" => Ok(Self::Conservative),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            _ => anyhow::bail!("Invalid strategy kind: {}", input),
        }
    }
}

/// Tiered split-buy parameters of one fixed strategy.
///
/// Tiers 1–6 are sized as fixed shares of the cycle capital; tier 7 is the
/// reserve, always sized to all remaining cash.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StrategyConfig {
    pub tier_ratios: [TierRatio; SPLIT_TIER_COUNT],
    pub buy_threshold_pct: Decimal,
    pub sell_threshold_pct: Decimal,
    pub stop_loss_days: StopLossDays,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        let ratio_sum: Decimal = self.tier_ratios.iter().sum();

        if (ratio_sum - dec!(1)).abs() > TIER_RATIO_SUM_TOLERANCE {
            anyhow::bail!("tier ratios should sum to 1.0, but got {}", ratio_sum);
        }

        if self.buy_threshold_pct >= dec!(0) {
            anyhow::bail!(
                "buy threshold should be negative, but got {}",
                self.buy_threshold_pct
            );
        }

        if self.sell_threshold_pct <= dec!(0) {
            anyhow::bail!(
                "sell threshold should be positive, but got {}",
                self.sell_threshold_pct
            );
        }

        if self.stop_loss_days == 0 {
            anyhow::bail!("stop loss days should be positive");
        }

        Ok(())
    }
}
