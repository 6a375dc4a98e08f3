pub mod bam_loader;
pub mod config;
pub mod contingency;
pub mod edges;
pub mod error;
pub mod ground_truth;
pub mod output;
pub mod partition;
pub mod significance;
pub mod statistics;
pub mod structure;
pub mod types;
