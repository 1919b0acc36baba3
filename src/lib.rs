//! glimpse: semantic image search over an exact vector index.

pub mod builder;
pub mod client;
pub mod collection;
pub mod config;
pub mod deadline;
pub mod encoder;
pub mod enrich;
pub mod error;
pub mod image_format;
pub mod index;
pub mod metadata;
pub mod metrics;
pub mod search;
pub mod server;
pub mod storage;
pub mod types;
