pub mod credentials;
pub mod env_file;
pub mod pipeline;

pub use credentials::clear_hub_credentials;
pub use env_file::{emit_env_file, emit_helper_script, write_file, EnvTemplate};
pub use pipeline::{env_template, run_setup, SetupDeps, SetupOptions, SetupSummary};
