//! Weighted compatibility score generation.

use destiny_core::defaults::FALLBACK_SCORE;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::label::{MatchLabel, label_for};

/// Inclusive score range selected with probability `weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBand {
    /// Lowest score in the band.
    pub min: u8,
    /// Highest score in the band.
    pub max: u8,
    /// Selection weight; weights of a table should sum to 1.0.
    pub weight: f64,
}

impl ScoreBand {
    /// Create a band. Panics if `min > max`.
    pub const fn new(min: u8, max: u8, weight: f64) -> Self {
        assert!(min <= max, "score band min exceeds max");
        Self { min, max, weight }
    }

    /// Number of distinct scores in the band.
    #[inline]
    pub fn len(&self) -> usize {
        usize::from(self.max - self.min) + 1
    }

    /// Whether `score` falls inside the band.
    #[inline]
    pub fn contains(&self, score: u8) -> bool {
        (self.min..=self.max).contains(&score)
    }

    /// Label shared by every score in the band.
    #[inline]
    pub fn label(&self) -> MatchLabel {
        label_for(self.min)
    }
}

/// Default distribution, skewed toward high scores.
pub const DEFAULT_BANDS: [ScoreBand; 4] = [
    ScoreBand::new(60, 70, 0.15),
    ScoreBand::new(71, 80, 0.25),
    ScoreBand::new(81, 90, 0.35),
    ScoreBand::new(91, 98, 0.25),
];

/// Ordered band table walked by cumulative weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    bands: Vec<ScoreBand>,
    fallback: u8,
}

impl ScoreTable {
    /// Table over `bands`, walked in the given order.
    pub fn new(bands: impl Into<Vec<ScoreBand>>) -> Self {
        Self {
            bands: bands.into(),
            fallback: FALLBACK_SCORE,
        }
    }

    /// Override the score returned when no band covers the draw.
    pub fn with_fallback(mut self, score: u8) -> Self {
        self.fallback = score;
        self
    }

    /// Bands in walk order.
    #[inline]
    pub fn bands(&self) -> &[ScoreBand] {
        &self.bands
    }

    /// Index of the band containing `score`.
    pub fn band_of(&self, score: u8) -> Option<usize> {
        self.bands.iter().position(|b| b.contains(score))
    }

    /// Map two uniform draws in `[0, 1)` to a score.
    ///
    /// `r` selects the first band whose cumulative weight reaches it; `u`
    /// picks a score uniformly inside that band. If rounding leaves `r`
    /// uncovered the fallback score is returned.
    pub fn pick(&self, r: f64, u: f64) -> u8 {
        let mut cumulative = 0.0;
        for band in &self.bands {
            cumulative += band.weight;
            if cumulative >= r {
                let span = band.len();
                let offset = ((u * span as f64) as usize).min(span - 1);
                return band.min + offset as u8;
            }
        }
        self.fallback
    }
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self::new(DEFAULT_BANDS)
    }
}

/// Draws compatibility scores from a [`ScoreTable`].
///
/// Generic over the random source so tests can seed it.
///
/// # Example
/// ```
/// use destiny_score::{ScoreGenerator, label_for};
///
/// let mut scores = ScoreGenerator::seeded(7);
/// let score = scores.generate();
/// assert!((60..=98).contains(&score));
/// println!("{score}% {}", label_for(score));
/// ```
#[derive(Debug, Clone)]
pub struct ScoreGenerator<R = StdRng> {
    table: ScoreTable,
    rng: R,
}

impl ScoreGenerator<StdRng> {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for ScoreGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ScoreGenerator<R> {
    /// Generator over the default table using `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self {
            table: ScoreTable::default(),
            rng,
        }
    }

    /// Replace the band table.
    pub fn with_table(mut self, table: ScoreTable) -> Self {
        self.table = table;
        self
    }

    /// Table in use.
    #[inline]
    pub fn table(&self) -> &ScoreTable {
        &self.table
    }

    /// Produce one score.
    pub fn generate(&mut self) -> u8 {
        let r = self.rng.r#gen::<f64>();
        let u = self.rng.r#gen::<f64>();
        self.table.pick(r, u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let total: f64 = DEFAULT_BANDS.iter().map(|b| b.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pick_band_boundaries() {
        let table = ScoreTable::default();
        assert_eq!(table.pick(0.0, 0.0), 60);
        assert_eq!(table.pick(0.15, 0.999), 70);
        assert_eq!(table.pick(0.16, 0.0), 71);
        assert_eq!(table.pick(0.5, 0.0), 81);
        assert_eq!(table.pick(0.74, 0.999_999), 90);
        assert_eq!(table.pick(0.76, 0.0), 91);
        assert_eq!(table.pick(0.999_999, 0.999_999), 98);
    }

    #[test]
    fn test_pick_clamps_inner_draw() {
        let table = ScoreTable::default();
        assert_eq!(table.pick(0.9, 1.0), 98);
        assert_eq!(table.pick(0.9, -0.5), 91);
    }

    #[test]
    fn test_fallback_when_weights_fall_short() {
        let table = ScoreTable::new([ScoreBand::new(60, 70, 0.5)]);
        assert_eq!(table.pick(0.9, 0.0), 85);
        assert_eq!(table.clone().with_fallback(77).pick(0.9, 0.0), 77);
        assert_eq!(table.pick(0.4, 0.0), 60);
    }

    #[test]
    fn test_generate_range_and_distribution() {
        let mut generator = ScoreGenerator::seeded(0xDE57_1A7E);
        let mut per_band = [0usize; 4];
        let mut seen = [false; 99];
        let n = 100_000;

        for _ in 0..n {
            let score = generator.generate();
            assert!((60..=98).contains(&score), "score out of range: {score}");
            seen[usize::from(score)] = true;
            let band = generator.table().band_of(score).unwrap();
            per_band[band] += 1;
        }

        for (band, count) in DEFAULT_BANDS.iter().zip(per_band) {
            let observed = count as f64 / n as f64;
            assert!(
                (observed - band.weight).abs() < 0.01,
                "band {}-{}: observed {observed}, expected {}",
                band.min,
                band.max,
                band.weight
            );
        }
        assert!(seen[60..=98].iter().all(|s| *s), "every score should occur");
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a: Vec<u8> = {
            let mut g = ScoreGenerator::seeded(42);
            (0..32).map(|_| g.generate()).collect()
        };
        let b: Vec<u8> = {
            let mut g = ScoreGenerator::seeded(42);
            (0..32).map(|_| g.generate()).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_band_labels() {
        let labels: Vec<_> = DEFAULT_BANDS.iter().map(ScoreBand::label).collect();
        assert_eq!(
            labels,
            vec![
                MatchLabel::Acquainted,
                MatchLabel::Resonant,
                MatchLabel::PerfectMatch,
                MatchLabel::Destined
            ]
        );
    }
}
