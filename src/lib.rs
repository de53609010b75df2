pub mod batch;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod loader;
pub mod schema;
pub mod sink;
pub mod utils;

#[cfg(test)]
mod testing;
