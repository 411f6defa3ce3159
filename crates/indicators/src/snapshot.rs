/// Indicator values of one series index.
///
/// A field is `None` when its lookback window is not fully inside the
/// available series.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub ma_slope: Option<f64>,
    pub disparity: Option<f64>,
    pub rsi14: Option<f64>,
    pub roc12: Option<f64>,
    pub volatility20: Option<f64>,
    pub golden_cross: Option<f64>,
    pub is_golden_cross: Option<bool>,
}

pub const SIMILARITY_DIMENSIONS: usize = 5;

impl IndicatorSnapshot {
    /// [ma_slope, disparity, rsi14, roc12, volatility20], available only when
    /// every dimension is.
    pub fn similarity_vector(&self) -> Option<[f64; SIMILARITY_DIMENSIONS]> {
        Some([
            self.ma_slope?,
            self.disparity?,
            self.rsi14?,
            self.roc12?,
            self.volatility20?,
        ])
    }

    pub fn is_inverted_alignment(&self) -> bool {
        self.is_golden_cross == Some(false)
    }
}
