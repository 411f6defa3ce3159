use chrono::NaiveDate;
use rust_decimal::Decimal;

pub type PriceValue = Decimal;
pub type Volume = u64;

/// One calendar trading day of a date-sorted price series.
///
/// The adjusted close is the series used for holdings valuation and returns;
/// order limits derive from the raw close.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: PriceValue,
    pub high: PriceValue,
    pub low: PriceValue,
    pub close: PriceValue,
    pub adj_close: PriceValue,
    pub volume: Volume,
}
