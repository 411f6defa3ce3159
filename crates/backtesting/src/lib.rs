use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub mod cycle;
pub mod engine;
pub mod report;
pub mod serialization;

pub type Capital = Decimal;

pub const DEFAULT_INITIAL_CAPITAL: Capital = dec!(10_000);
