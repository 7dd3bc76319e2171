pub mod context;
pub mod scheduler;
pub mod sources;

pub use context::EngineContext;
pub use scheduler::run_scheduler;
pub use sources::{EventSource, JsonFileEventSource, JsonFilePriceSource, PriceSource, StaticSource};
