//! Historical-analogue search over indicator vectors.

use anyhow::{bail, Result};
use indicators::snapshot::{IndicatorSnapshot, SIMILARITY_DIMENSIONS};

pub type SimilarityScore = f64;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Dimension order: [ma_slope, disparity, rsi14, roc12, volatility20].
#[derive(Debug, Clone)]
pub struct SimilarityParams {
    /// Per-dimension weights, summing to 1.
    pub weights: [f64; SIMILARITY_DIMENSIONS],
    /// Per-dimension decay scales; smaller means sharper falloff.
    pub tolerances: [f64; SIMILARITY_DIMENSIONS],
    /// Minimum trading-day gap between a candidate and the reference.
    pub min_gap_days: usize,
    pub top_k: usize,
    /// Keep only candidates whose moving-average orientation matches the
    /// reference.
    pub match_orientation: bool,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            weights: [0.30, 0.20, 0.20, 0.15, 0.15],
            tolerances: [1.5, 3.0, 10.0, 4.0, 8.0],
            min_gap_days: 40,
            top_k: 3,
            match_orientation: true,
        }
    }
}

impl SimilarityParams {
    pub fn validate(&self) -> Result<()> {
        let weight_sum: f64 = self.weights.iter().sum();

        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            bail!(
                "similarity weights should sum to 1.0, but got {}",
                weight_sum
            );
        }

        if self.tolerances.iter().any(|&tolerance| tolerance <= 0.0) {
            bail!("similarity tolerances should all be positive");
        }

        if self.top_k == 0 {
            bail!("top_k should be positive");
        }

        Ok(())
    }
}

/// Weighted exponential-decay closeness of two indicator vectors, in [0, 1];
/// identical vectors score exactly 1.
pub fn similarity(
    reference: &[f64; SIMILARITY_DIMENSIONS],
    candidate: &[f64; SIMILARITY_DIMENSIONS],
    params: &SimilarityParams,
) -> SimilarityScore {
    reference
        .iter()
        .zip(candidate)
        .zip(params.weights.iter().zip(&params.tolerances))
        .map(|((reference_value, candidate_value), (weight, tolerance))| {
            weight * (-(reference_value - candidate_value).abs() / tolerance).exp()
        })
        .sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarPeriodCandidate {
    pub index: usize,
    pub snapshot: IndicatorSnapshot,
    pub similarity: SimilarityScore,
}

/// Top-K most similar historical indices among `0..=last_candidate_index`.
///
/// The temporal-gap guard always applies on top of the caller's cutoff, so a
/// candidate can never sit within `min_gap_days` of the reference. Ties break
/// toward the earlier date for a reproducible ranking. Returns fewer than K
/// candidates (possibly none) when history is short — the caller decides the
/// fallback.
pub fn find_similar(
    snapshots: &[IndicatorSnapshot],
    reference_index: usize,
    last_candidate_index: usize,
    params: &SimilarityParams,
) -> Result<Vec<SimilarPeriodCandidate>> {
    params.validate()?;

    let reference_snapshot = match snapshots.get(reference_index) {
        Some(snapshot) => snapshot,
        None => return Ok(Vec::new()),
    };

    let reference_vector = match reference_snapshot.similarity_vector() {
        Some(vector) => vector,
        None => return Ok(Vec::new()),
    };

    let gap_cutoff = match reference_index.checked_sub(params.min_gap_days) {
        Some(cutoff) => cutoff,
        None => return Ok(Vec::new()),
    };

    let cutoff = last_candidate_index.min(gap_cutoff).min(snapshots.len() - 1);

    let mut candidates = Vec::new();

    for index in 0..=cutoff {
        let snapshot = &snapshots[index];

        let vector = match snapshot.similarity_vector() {
            Some(vector) => vector,
            None => continue,
        };

        if params.match_orientation {
            match (reference_snapshot.is_golden_cross, snapshot.is_golden_cross) {
                (Some(reference_orientation), Some(candidate_orientation))
                    if reference_orientation == candidate_orientation => {}
                _ => continue,
            }
        }

        candidates.push(SimilarPeriodCandidate {
            index,
            snapshot: snapshot.clone(),
            similarity: similarity(&reference_vector, &vector, params),
        });
    }

    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });

    candidates.truncate(params.top_k);

    Ok(candidates)
}
