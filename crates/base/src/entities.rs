pub mod order;
pub mod price;
pub mod strategy;

pub use order::{OrderAction, OrderStyle, TradeAction, TradeType};
pub use price::PricePoint;
pub use strategy::{StrategyConfig, StrategyKind};

pub const CURRENCY_DECIMAL_PLACES: u32 = 2;
pub const RATE_DECIMAL_PLACES: u32 = 4;

pub type Ticker = String;
