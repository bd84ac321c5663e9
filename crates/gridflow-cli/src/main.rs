use clap::Parser;
use gridflow_cli::{load_config, Cli, Commands};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "configuration loaded");

    match &cli.command {
        Commands::Analyze(args) => commands::analyze::handle(args, &config),
        Commands::Inspect { data_dir, format } => {
            commands::inspect::handle(data_dir.as_deref(), *format, &config)
        }
        Commands::Solvers => commands::solvers::handle(&config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so that stdout carries only the report.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
