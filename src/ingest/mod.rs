//! Run orchestration for the two ingestion modes
//!
//! Both follow the same shape: acquire an ordered list of remote units that
//! cover a time range, fetch them one at a time, accumulate, persist.

pub mod search;
pub mod shards;

pub use search::{SearchIngest, SearchRunOptions, SearchRunReport};
pub use shards::{ShardIngest, ShardRunOptions, ShardRunReport, artifact_name};
