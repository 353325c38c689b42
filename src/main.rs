//! `stagehand` - staged section reveals driven by readiness signals

use clap::Parser;

use stagehand::cli::args::Cli;
use stagehand::cli::commands;
use stagehand::error::ExitCode;
use stagehand::observability::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    match commands::dispatch(cli).await {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
