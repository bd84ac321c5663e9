//! `gridflow analyze`: maximum transfer, congested edges, flow paths.

use std::io::{self, Write};

use anyhow::{Context, Result};
use gridflow_algo::{
    analyze_transfer, CongestedEdge, MaxFlowSolverKind, TransferAnalysis, TransferConfig,
};
use gridflow_cli::cli::{AnalyzeArgs, OutputFormat};
use gridflow_cli::config::GridflowConfig;
use gridflow_core::FlowNode;
use gridflow_io::load_grid_tables;
use serde::Serialize;
use tabwriter::TabWriter;
use tracing::{info, warn};

pub fn handle(args: &AnalyzeArgs, config: &GridflowConfig) -> Result<()> {
    let source = config.data.grid_source(args.data_dir.as_deref());
    info!("Loading grid tables from {}", source.dir.display());
    let tables = load_grid_tables(&source).context("loading grid tables")?;

    let solver_name = args.solver.as_deref().unwrap_or(&config.solver.default);
    let solver: MaxFlowSolverKind = solver_name.parse()?;
    let mut transfer = TransferConfig::new(args.capacity)?
        .with_tolerance(args.tolerance.unwrap_or(config.solver.tolerance))?
        .with_solver(solver);
    if args.keep_circulations {
        transfer = transfer.keep_circulations();
    }

    let mut analysis = analyze_transfer(&tables.buses, &tables.branches, &transfer)
        .context("transfer analysis failed")?;
    analysis.diagnostics.merge(tables.diagnostics);
    for issue in &analysis.diagnostics.issues {
        warn!("{issue}");
    }

    match args.format {
        OutputFormat::Plain => print_plain(&analysis),
        OutputFormat::Json => print_json(&analysis, args.capacity),
    }
}

fn print_plain(analysis: &TransferAnalysis) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = TabWriter::new(stdout.lock());
    writeln!(
        writer,
        "max flow: {:.6} MW ({} solver)",
        analysis.total_flow(),
        analysis.solver
    )?;
    writeln!(writer)?;
    writeln!(writer, "FROM\tTO\tKIND\tFLOW\tCAPACITY")?;
    for edge in &analysis.congested {
        writeln!(
            writer,
            "{}\t{}\t{}\t{:.6}\t{:.6}",
            edge.from,
            edge.to,
            edge.kind.as_str(),
            edge.flow_mw,
            edge.capacity_mw
        )?;
    }
    writeln!(writer)?;
    for path in &analysis.paths {
        writeln!(writer, "path: {}, flow: {:.6}", path, path.flow)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct AnalysisReport<'a> {
    solver: &'a str,
    capacity_mw: f64,
    total_flow_mw: f64,
    congested: &'a [CongestedEdge],
    paths: Vec<PathReport<'a>>,
}

#[derive(Serialize)]
struct PathReport<'a> {
    nodes: &'a [FlowNode],
    flow_mw: f64,
}

fn print_json(analysis: &TransferAnalysis, capacity_mw: f64) -> Result<()> {
    let report = AnalysisReport {
        solver: analysis.solver,
        capacity_mw,
        total_flow_mw: analysis.total_flow(),
        congested: &analysis.congested,
        paths: analysis
            .paths
            .iter()
            .map(|path| PathReport {
                nodes: &path.nodes,
                flow_mw: path.flow,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(io::stdout(), &report)
        .map_err(|err| anyhow::anyhow!("serializing analysis to JSON: {err}"))?;
    println!();
    Ok(())
}
