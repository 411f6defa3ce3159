use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds toward negative infinity at the given number of decimal places.
pub fn floor_dp(value: Decimal, decimal_places: u32) -> Decimal {
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::ToNegativeInfinity)
}

/// Rounds half-up at the given number of decimal places.
pub fn round_half_up_dp(value: Decimal, decimal_places: u32) -> Decimal {
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}
