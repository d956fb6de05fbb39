//! Remote data acquisition
//!
//! - `http`: shared HTTP client with bounded retry
//! - `shard`: downloads and decodes compressed shard payloads
//! - `search`: date-ranged search API queries
//! - `paginator`: offset cursor over capped search results

pub mod http;
pub mod paginator;
pub mod retry;
pub mod search;
pub mod shard;

pub use http::{FetchError, HttpClient};
pub use paginator::{
    PageSource, PageStore, PaginateError, PaginationCursor, PaginationOutcome, paginate,
};
pub use retry::RetryPolicy;
pub use search::{DateRange, SearchClient, SearchPage, build_query};
pub use shard::{Compression, DecodedShard, ShardError, ShardFetcher, decode_shard};
