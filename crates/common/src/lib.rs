pub mod config;
pub mod error;
pub mod graph;
pub mod types;

pub use config::{Config, RunSettings};
pub use error::{Error, Result};
pub use graph::{Graph, GraphError};
pub use types::*;
