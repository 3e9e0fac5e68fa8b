//! File-backed storage for input tables, outputs and the run record

pub mod run_record;
pub mod staging;
pub mod tables;

pub use run_record::RunRecord;
pub use staging::StagedWrites;
pub use tables::{load_climate, load_history, write_table};
