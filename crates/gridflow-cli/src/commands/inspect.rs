//! `gridflow inspect`: reconcile the tables and check topology without
//! solving anything.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gridflow_algo::{check_completeness, reconcile_buses, rewrite_branches};
use gridflow_cli::cli::OutputFormat;
use gridflow_cli::config::GridflowConfig;
use gridflow_core::{Diagnostics, GridError};
use gridflow_io::load_grid_tables;
use serde::Serialize;
use tabwriter::TabWriter;

#[derive(Debug, Serialize)]
struct InspectReport {
    raw_buses: usize,
    canonical_buses: usize,
    superseded_buses: usize,
    raw_branches: usize,
    lines: usize,
    surplus_buses: usize,
    deficit_buses: usize,
    transshipment_buses: usize,
    total_generation_mw: f64,
    total_load_mw: f64,
    /// `None` when bus and branch tables agree
    completeness_error: Option<String>,
    diagnostics: Diagnostics,
}

pub fn handle(
    data_dir: Option<&Path>,
    format: OutputFormat,
    config: &GridflowConfig,
) -> Result<()> {
    let source = config.data.grid_source(data_dir);
    let tables = load_grid_tables(&source).context("loading grid tables")?;
    let reconciliation = reconcile_buses(&tables.buses).context("reconciling buses")?;

    let mut diagnostics = tables.diagnostics;
    diagnostics.merge(reconciliation.diagnostics);
    let lines = rewrite_branches(&tables.branches, &reconciliation.redirects, &mut diagnostics);

    let completeness_error = match check_completeness(&reconciliation.buses, &lines) {
        Ok(()) => None,
        Err(GridError::DataIntegrity(message)) => Some(message),
        Err(other) => return Err(other.into()),
    };
    if let Some(message) = &completeness_error {
        diagnostics.add_error("topology", message);
    }

    let buses = &reconciliation.buses;
    let injection = |sign: f64| {
        buses
            .iter()
            .filter(|bus| bus.net_injection().value() * sign > 0.0)
            .count()
    };
    let surplus_buses = injection(1.0);
    let deficit_buses = injection(-1.0);

    let report = InspectReport {
        raw_buses: tables.buses.len(),
        canonical_buses: buses.len(),
        superseded_buses: reconciliation.redirects.len(),
        raw_branches: tables.branches.len(),
        lines: lines.iter().filter(|line| !line.is_self_loop()).count(),
        surplus_buses,
        deficit_buses,
        transshipment_buses: buses.len() - surplus_buses - deficit_buses,
        total_generation_mw: buses.total_generation().value(),
        total_load_mw: buses.total_load().value(),
        completeness_error,
        diagnostics,
    };

    match format {
        OutputFormat::Plain => print_plain(&report)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &report)
                .map_err(|err| anyhow::anyhow!("serializing inspection to JSON: {err}"))?;
            println!();
        }
    }

    match report.completeness_error {
        Some(message) => Err(GridError::DataIntegrity(message).into()),
        None => Ok(()),
    }
}

fn print_plain(report: &InspectReport) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "raw buses\t{}", report.raw_buses)?;
    writeln!(
        writer,
        "canonical buses\t{} ({} superseded)",
        report.canonical_buses, report.superseded_buses
    )?;
    writeln!(
        writer,
        "branches\t{} ({} lines after reconciliation)",
        report.raw_branches, report.lines
    )?;
    writeln!(
        writer,
        "surplus/deficit/transshipment\t{}/{}/{}",
        report.surplus_buses, report.deficit_buses, report.transshipment_buses
    )?;
    writeln!(
        writer,
        "generation / load\t{:.1} MW / {:.1} MW",
        report.total_generation_mw, report.total_load_mw
    )?;
    match &report.completeness_error {
        None => writeln!(writer, "completeness\tok")?,
        Some(message) => writeln!(writer, "completeness\tFAILED: {message}")?,
    }
    writer.flush()?;

    print!("{}", report.diagnostics);
    Ok(())
}
