//! End-to-end transfer analysis: reconcile, build, solve, report.

use crate::builder::{build_flow_network, validate_capacity};
use crate::circulation::cancel_circulations;
use crate::congestion::{congested_edges, CongestedEdge, DEFAULT_TOLERANCE};
use crate::decomposition::decompose_flow;
use crate::maxflow::{solve_max_flow, MaxFlowSolverKind};
use crate::reconcile::reconcile_buses;
use gridflow_core::{
    Branch, Diagnostics, FlowAssignment, FlowNetwork, FlowPath, GridError, GridResult, Megawatts,
    RawBus,
};
use tracing::{info, warn};

/// Parameters of one transfer study.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfig {
    /// Capacity of every transmission line, each direction (MW)
    pub capacity_mw: f64,
    /// Tolerance for congestion, flow presence and decomposition (MW)
    pub tolerance: f64,
    pub solver: MaxFlowSolverKind,
    /// Remove circulating flow before decomposition
    pub cancel_circulations: bool,
}

impl TransferConfig {
    pub fn new(capacity_mw: f64) -> GridResult<Self> {
        let config = Self {
            capacity_mw,
            tolerance: DEFAULT_TOLERANCE,
            solver: MaxFlowSolverKind::default(),
            cancel_circulations: true,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> GridResult<Self> {
        self.tolerance = tolerance;
        self.validate()?;
        Ok(self)
    }

    pub fn with_solver(mut self, solver: MaxFlowSolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn keep_circulations(mut self) -> Self {
        self.cancel_circulations = false;
        self
    }

    pub fn validate(&self) -> GridResult<()> {
        validate_capacity(Megawatts(self.capacity_mw))?;
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Everything a transfer study produces.
#[derive(Debug, Clone)]
pub struct TransferAnalysis {
    pub network: FlowNetwork,
    pub assignment: FlowAssignment,
    pub congested: Vec<CongestedEdge>,
    pub paths: Vec<FlowPath>,
    pub diagnostics: Diagnostics,
    /// Id of the max-flow backend used
    pub solver: &'static str,
}

impl TransferAnalysis {
    pub fn total_flow(&self) -> f64 {
        self.assignment.total()
    }
}

/// Run a full transfer study on raw grid tables.
pub fn analyze_transfer(
    raw_buses: &[RawBus],
    branches: &[Branch],
    config: &TransferConfig,
) -> GridResult<TransferAnalysis> {
    config.validate()?;

    let reconciliation = reconcile_buses(raw_buses)?;
    let mut diagnostics = reconciliation.diagnostics;

    let build = build_flow_network(
        &reconciliation.buses,
        branches,
        &reconciliation.redirects,
        Megawatts(config.capacity_mw),
    )?;
    diagnostics.merge(build.diagnostics);
    let network = build.network;

    let solver = config.solver.build_solver();
    let mut assignment = solve_max_flow(&network, solver.as_ref())?;
    if config.cancel_circulations {
        assignment = cancel_circulations(&network, &assignment, config.tolerance);
    }

    let congested = congested_edges(&network, &assignment, config.tolerance);
    let paths = decompose_flow(&network, &assignment, assignment.total(), config.tolerance)?;

    if diagnostics.has_issues() {
        warn!(
            summary = %diagnostics.summary(),
            reconcile = diagnostics.issues_by_category("reconcile").count(),
            topology = diagnostics.issues_by_category("topology").count(),
            "grid data was repaired during analysis"
        );
    }
    info!(
        total_mw = assignment.total(),
        congested = congested.len(),
        paths = paths.len(),
        "transfer analysis complete"
    );

    Ok(TransferAnalysis {
        network,
        assignment,
        congested,
        paths,
        diagnostics,
        solver: solver.id(),
    })
}
