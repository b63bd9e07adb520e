pub mod api;
pub mod config;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod listparse;
pub mod normalize;
pub mod reporter;
pub mod resolver;
pub mod store;
pub mod types;
pub mod version;
