use base::entities::{PricePoint, StrategyKind};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strategies::adaptive::{run_adaptive, AdaptiveParams};
use strategies::cache::InMemoryIndicatorCache;

const TICKER: &str = "TEST";

/// Deterministic linear congruential generator for a reproducible random walk.
struct Lcg(u64);

impl Lcg {
    fn next_fraction(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);

        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn random_walk_series(days: usize, seed: u64) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let mut generator = Lcg(seed);
    let mut close_cents: i64 = 15_000;

    (0..days)
        .map(|index| {
            let step = ((generator.next_fraction() - 0.5) * 0.04 * close_cents as f64) as i64;
            close_cents = (close_cents + step).max(1_000);
            let close = Decimal::new(close_cents, 2);

            PricePoint {
                date: start + Duration::days(index as i64),
                open: close,
                high: close,
                low: close,
                close,
                adj_close: close,
                volume: 1_000,
            }
        })
        .collect()
}

#[test]
#[allow(non_snake_case)]
fn run_adaptive__random_walk_series__should_simulate_every_day_without_errors() {
    let prices = random_walk_series(150, 31337);
    let params = AdaptiveParams::default();
    let mut cache = InMemoryIndicatorCache::new();

    let report = run_adaptive(&prices, TICKER, &params, &mut cache).unwrap();

    assert_eq!(report.daily_history.len(), prices.len());
    assert!(report.mdd <= dec!(0));

    for snapshot in &report.daily_history {
        assert!(snapshot.cash >= dec!(0));
        assert_eq!(
            snapshot.total_asset,
            snapshot.cash + snapshot.holdings_value
        );
    }

    // every simulated day is attributed to exactly one strategy
    let attributed_days: u32 = report.usage.iter().map(|usage| usage.days).sum();
    assert_eq!(attributed_days as usize, prices.len() - 1);

    let attributed_cycles: u32 = report.usage.iter().map(|usage| usage.cycles).sum();
    assert_eq!(attributed_cycles as usize, report.total_cycles);
}

#[test]
#[allow(non_snake_case)]
fn run_adaptive__early_days_without_history__should_record_a_fallback_decision() {
    let prices = random_walk_series(80, 11);
    let params = AdaptiveParams::default();
    let mut cache = InMemoryIndicatorCache::new();

    let report = run_adaptive(&prices, TICKER, &params, &mut cache).unwrap();

    assert!(!report.decisions.is_empty());
    assert_eq!(report.decisions[0].cycle_number, 1);
    // the default strategy is the fallback while history is too short
    assert_eq!(report.decisions[0].strategy, StrategyKind::default());
    assert!(report.decisions[0].reason.contains("fell back"));
}

#[test]
#[allow(non_snake_case)]
fn run_adaptive__repeated_runs_on_identical_input__should_produce_identical_reports() {
    let prices = random_walk_series(150, 271828);
    let params = AdaptiveParams::default();

    let mut first_cache = InMemoryIndicatorCache::new();
    let first = run_adaptive(&prices, TICKER, &params, &mut first_cache).unwrap();

    // the second run reuses the warmed cache and must not diverge
    let second = run_adaptive(&prices, TICKER, &params, &mut first_cache).unwrap();

    assert_eq!(first, second);
}

#[test]
#[allow(non_snake_case)]
fn run_adaptive__return_rate__should_match_the_reported_asset_figures() {
    let prices = random_walk_series(150, 5);
    let params = AdaptiveParams::default();
    let mut cache = InMemoryIndicatorCache::new();

    let report = run_adaptive(&prices, TICKER, &params, &mut cache).unwrap();

    let recomputed = (report.final_asset - report.initial_capital) / report.initial_capital;
    let floored =
        recomputed.round_dp_with_strategy(4, rust_decimal::RoundingStrategy::ToNegativeInfinity);

    assert_eq!(report.return_rate, floored);
}

#[test]
#[allow(non_snake_case)]
fn run_adaptive__fewer_than_two_price_points__should_return_error() {
    let prices = random_walk_series(1, 1);
    let params = AdaptiveParams::default();
    let mut cache = InMemoryIndicatorCache::new();

    assert!(run_adaptive(&prices, TICKER, &params, &mut cache)
        .unwrap_err()
        .to_string()
        .contains("at least 2 price points are required"));
}
