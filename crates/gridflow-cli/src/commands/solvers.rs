use std::io::{self, Write};

use anyhow::Result;
use gridflow_algo::MaxFlowSolverKind;
use gridflow_cli::config::GridflowConfig;
use tabwriter::TabWriter;

/// List compiled-in max-flow solvers, marking the configured default.
pub fn handle(config: &GridflowConfig) -> Result<()> {
    let default: Option<MaxFlowSolverKind> = config.solver.default.parse().ok();

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "SOLVER\tDESCRIPTION\tDEFAULT")?;
    for name in MaxFlowSolverKind::available() {
        let kind: MaxFlowSolverKind = name.parse()?;
        let marker = if Some(kind) == default { "*" } else { "" };
        writeln!(writer, "{}\t{}\t{}", kind, kind.description(), marker)?;
    }
    writer.flush()?;
    Ok(())
}
