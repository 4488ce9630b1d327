pub mod ai;
pub mod memory;
pub mod setup;

use crate::cli::Command;
use crate::error::Result;
use crate::report::Reporter;
use crate::state::AppState;

pub use ai::{fetch_model, probe};
pub use memory::smoke_test;
pub use setup::{setup, write_env};

/// Runs one subcommand; step outcomes accumulate on `reporter`
pub async fn dispatch(command: &Command, state: &mut AppState, reporter: &mut Reporter) -> Result<()> {
    match command {
        Command::Setup { .. } => setup(state, command.setup_options(), reporter).await,
        Command::SmokeTest { quick } => smoke_test(state, *quick, reporter).await,
        Command::Probe => {
            probe(state, reporter).await;
            Ok(())
        }
        Command::FetchModel => fetch_model(state, reporter).await.map(|_| ()),
        Command::WriteEnv => {
            write_env(state, reporter);
            Ok(())
        }
    }
}
