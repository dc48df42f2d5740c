use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use calclog::{
    config::CalculatorConfig,
    logging,
    repl::{self, EditorPrompt},
    session::Session,
};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let config = match CalculatorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Fatal error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CalculatorConfig) -> Result<()> {
    config
        .ensure_directories()
        .context("failed to prepare calculator directories")?;
    let _guard = logging::init(&config.log_file).context("failed to initialize logging")?;

    let mut session = Session::open(config);
    let mut prompt = EditorPrompt::new().context("failed to open terminal")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    repl::run(&mut session, &mut prompt, &mut out)?;
    Ok(())
}
