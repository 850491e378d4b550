pub mod config;
pub mod error;

pub use config::ParleyConfig;
pub use error::{ParleyError, Result};
