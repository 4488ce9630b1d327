// Re-export modules for library usage
pub mod ai;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod memory;
pub mod report;
pub mod setup;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use config::{EnvSnapshot, Settings};
pub use error::{Result, SetupError};
pub use report::{Outcome, Reporter};
pub use state::AppState;
pub use types::*;
