use base::entities::PricePoint;
use rust_decimal::prelude::ToPrimitive;

pub mod batch;
pub mod divergence;
pub mod naive;
pub mod snapshot;

pub const MA_SHORT_PERIOD: usize = 20;
pub const MA_LONG_PERIOD: usize = 60;
pub const MA_SLOPE_LOOKBACK: usize = 10;
pub const RSI_PERIOD: usize = 14;
pub const ROC_PERIOD: usize = 12;
pub const VOLATILITY_PERIOD: usize = 20;

/// Adjusted closes as the f64 series all indicators are computed over.
pub fn adjusted_closes(prices: &[PricePoint]) -> Vec<f64> {
    prices
        .iter()
        .map(|price| price.adj_close.to_f64().unwrap())
        .collect()
}
