use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::entities::order::Shares;
use crate::entities::price::PriceValue;
use crate::entities::CURRENCY_DECIMAL_PLACES;
use crate::helpers::floor_dp;

pub type LimitPrice = PriceValue;
pub type ThresholdPct = Decimal;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum PricingError {
    #[error("limit price should be positive, but got {0}")]
    NonPositiveLimitPrice(Decimal),
}

/// Limit price of the next buy order, derived from the previous close.
pub fn buy_limit_price(prev_close: PriceValue, buy_threshold_pct: ThresholdPct) -> LimitPrice {
    floor_dp(
        prev_close * (dec!(1) + buy_threshold_pct),
        CURRENCY_DECIMAL_PLACES,
    )
}

/// Limit price of the sell order derived at fill time.
pub fn sell_limit_price(fill_price: PriceValue, sell_threshold_pct: ThresholdPct) -> LimitPrice {
    floor_dp(
        fill_price * (dec!(1) + sell_threshold_pct),
        CURRENCY_DECIMAL_PLACES,
    )
}

/// Whole number of shares the tier amount can afford at the limit price.
///
/// A non-positive tier amount buys nothing; a non-positive limit price is a
/// caller error.
pub fn buy_quantity(tier_amount: Decimal, limit_price: LimitPrice) -> Result<Shares, PricingError> {
    if limit_price <= dec!(0) {
        return Err(PricingError::NonPositiveLimitPrice(limit_price));
    }

    if tier_amount <= dec!(0) {
        return Ok(0);
    }

    let quantity = floor_dp(tier_amount / limit_price, 0);

    Ok(quantity.to_u64().unwrap())
}

pub fn buy_order_fills(close: PriceValue, limit_price: LimitPrice) -> bool {
    close <= limit_price
}

pub fn sell_order_fills(close: PriceValue, limit_price: LimitPrice) -> bool {
    close >= limit_price
}
