pub mod config;
pub mod error;
pub mod types;

pub use config::NewslensConfig;
pub use error::{NewslensError, Result};
pub use types::*;
