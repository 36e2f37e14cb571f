//! Compatibility scores for destiny.
//!
//! Scores are drawn from a fixed piecewise distribution over `[60, 98]`
//! that favors higher results, and mapped to a qualitative [`MatchLabel`].

mod generator;
mod label;

pub use generator::{DEFAULT_BANDS, ScoreBand, ScoreGenerator, ScoreTable};
pub use label::{MatchLabel, label_for};
