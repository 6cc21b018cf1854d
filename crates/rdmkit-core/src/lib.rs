pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod storage;

pub use config::Config;
pub use error::{CoreError, ExitCode, Result};
