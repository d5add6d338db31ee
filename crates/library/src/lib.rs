pub mod store;
pub mod types;

pub use store::Library;
pub use types::{SavedScript, SavedStrategy, StrategySnapshot, StrategySummary};
