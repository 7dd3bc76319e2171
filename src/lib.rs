pub mod config;
pub mod decision;
pub mod entry_ledger;
pub mod error;
pub mod evaluator;
pub mod event_influence;
pub mod ingest;
pub mod learning;
pub mod optimizer;
pub mod runtime;
pub mod scoring;
pub mod snapshot_store;
pub mod trust;

pub mod model {
    pub mod entry;
    pub mod macro_event;
    pub mod sample;
    pub mod signal;
}

pub mod indicator {
    pub mod angle;
    pub mod momentum;
    pub mod pattern;
    pub mod sma;
    pub mod trend;
    pub mod volume;
}
