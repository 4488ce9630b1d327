use crate::error::Result;
use crate::report::{Outcome, Reporter};
use crate::setup::{emit_env_file, env_template, run_setup, SetupOptions};
use crate::state::AppState;

pub async fn setup(state: &mut AppState, options: SetupOptions, reporter: &mut Reporter) -> Result<()> {
    let (settings, env, deps) = state.setup_parts(options);
    run_setup(settings, env, options, &deps, reporter).await.map(|_| ())
}

pub fn write_env(state: &AppState, reporter: &mut Reporter) -> Outcome {
    reporter.banner("📝 Creating environment configuration");
    emit_env_file(&env_template(state.settings()), reporter)
}
