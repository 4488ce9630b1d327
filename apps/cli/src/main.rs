use amem_setup_lib::cli::Cli;
use amem_setup_lib::config::FileConfig;
use amem_setup_lib::{commands, AppState, EnvSnapshot, Reporter, Settings};

use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let env = EnvSnapshot::capture();
    let file = FileConfig::discover(&env).context("failed to load config file")?;
    let mut settings = Settings::resolve(&env, file).context("failed to resolve settings")?;
    cli.apply(&mut settings);

    let command = cli.command();
    log::debug!("Running {:?}", command);

    let mut state = AppState::new(settings, env)?;
    let mut reporter = Reporter::stdout();

    let code = match commands::dispatch(&command, &mut state, &mut reporter).await {
        Ok(()) => reporter.exit_code(),
        Err(err) if err.is_fatal() => {
            log::error!("{}", err);
            reporter.plain("");
            reporter.plain(format!("❌ {}", err));
            1
        }
        Err(err) => return Err(err.into()),
    };

    std::process::exit(code);
}
