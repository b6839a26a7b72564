use std::process::ExitCode;

use clap::Parser;

use bootsplash::cli::Cli;
use bootsplash::run::{install_stop_handlers, run};
use bootsplash::{Settings, SplashError};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    match try_main(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            err.exit_code()
        }
    }
}

fn try_main(cli: &Cli) -> Result<(), SplashError> {
    let settings = Settings::load(cli)?;
    let stop = install_stop_handlers()?;
    run(&settings, stop)
}
