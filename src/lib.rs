#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod facets;
pub mod upload;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use error::{IngestError, Result};
