pub mod stats;
pub mod store;

pub use stats::{Category, DurationBook, DurationStat, LearningSnapshot, LearningStat, WinLoss};
pub use store::{LearningStore, DEFAULT_ROLLING_WINDOW};
