use crate::config::{env_vars, EnvSnapshot};
use crate::report::{Outcome, Reporter};

use std::fs;
use std::path::Path;

/// Removes a stale hub token file and reports the token variables that a
/// launched inference server will not inherit.
///
/// The parent shell keeps its variables; the env file's `unset` block
/// covers later sessions.
pub fn clear_hub_credentials(
    token_file: &Path,
    env: &EnvSnapshot,
    reporter: &mut Reporter,
) -> Outcome {
    let mut outcome = Outcome::Passed;

    if token_file.exists() {
        match fs::remove_file(token_file) {
            Ok(()) => reporter.ok(format!("Removed token file {}", token_file.display())),
            Err(err) => {
                reporter.warn(format!("Could not remove {}: {}", token_file.display(), err));
                outcome = Outcome::Warned(err.to_string());
            }
        }
    } else {
        reporter.detail("No stored hub token found");
    }

    for var in env_vars::HUB_TOKENS.iter().filter(|var| env.is_set(var)) {
        reporter.ok(format!("{} will not be passed to a launched server", var));
    }

    reporter.record("credential cleanup", outcome.clone());
    outcome
}
