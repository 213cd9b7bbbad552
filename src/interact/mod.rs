pub mod classifier;
pub mod executor;
pub mod outcome;
