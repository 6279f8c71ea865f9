pub mod types;
pub mod config;
pub mod error;
pub mod tags;
pub mod text;

pub use types::*;
pub use config::Config;
pub use error::JobSignalError;
pub use tags::*;
