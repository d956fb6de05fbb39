pub mod batch;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod manifest;
pub mod observability;
pub mod schema;
pub mod sink;
pub mod storage;
pub mod window;

pub use error::IngestError;
