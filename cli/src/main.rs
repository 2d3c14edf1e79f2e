mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, run, show};
use terminal::logging;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();
    logging::init_logging(commands.verbosity());

    let result = match commands.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Show { target, config } => show::show(target, config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
