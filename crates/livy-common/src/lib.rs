pub mod configuration;
pub mod error;

pub use configuration::Configuration;
pub use error::{Error, Result};
