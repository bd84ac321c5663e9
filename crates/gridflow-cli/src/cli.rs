use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gridflow", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Configuration file (defaults to ./gridflow.toml when present)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the maximum transfer at a given line capacity
    Analyze(AnalyzeArgs),
    /// Reconcile the grid tables and check their topology
    Inspect {
        /// Directory holding the bus and branch tables
        #[arg(long, value_hint = ValueHint::DirPath)]
        data_dir: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// List available max-flow solvers
    Solvers,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Capacity of every transmission line, each direction (MW)
    #[arg(long, value_parser = parse_capacity)]
    pub capacity: f64,

    /// Directory holding the bus and branch tables
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// Max-flow solver (see `gridflow solvers`)
    #[arg(long)]
    pub solver: Option<String>,

    /// Tolerance for congestion and decomposition (MW)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,

    /// Keep flow circulating between buses instead of cancelling it
    #[arg(long)]
    pub keep_circulations: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Parse a line capacity, rejecting anything that is not a positive finite
/// number of MW.
pub fn parse_capacity(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("capacity must be positive, got {raw}"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn capacity_parser() {
        assert_eq!(parse_capacity("5").unwrap(), 5.0);
        assert_eq!(parse_capacity(" 2.5 ").unwrap(), 2.5);
        assert!(parse_capacity("abc").unwrap_err().contains("not a number"));
        assert!(parse_capacity("-1").unwrap_err().contains("must be positive"));
        assert!(parse_capacity("0").is_err());
        assert!(parse_capacity("inf").is_err());
    }

    #[test]
    fn analyze_flags_parse() {
        let cli = Cli::try_parse_from([
            "gridflow",
            "--log-level",
            "debug",
            "analyze",
            "--capacity",
            "50",
            "--solver",
            "lp",
            "--format",
            "json",
            "--keep-circulations",
        ])
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.capacity, 50.0);
                assert_eq!(args.solver.as_deref(), Some("lp"));
                assert_eq!(args.format, OutputFormat::Json);
                assert!(args.keep_circulations);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
