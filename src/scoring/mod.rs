pub mod engine;
pub mod terms;
pub mod weights;

pub use engine::{ConfidenceEngine, ConfidenceScore, ScoreBreakdown, ScoreInput, ScoringConfig};
pub use weights::{WeightBound, WeightName, Weights, WeightsConfig};
