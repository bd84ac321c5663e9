//! Maximum-flow solvers.
//!
//! A solver sees a [`MaxFlowProblem`]: a plain arc list in which arc `i` is
//! edge `i` of the [`FlowNetwork`]. It returns one flow value per arc.
//! [`solve_max_flow`] is the only entry point the rest of the crate uses; it
//! builds the problem, calls the selected backend and checks the response
//! before handing back a [`FlowAssignment`].
//!
//! ## Backends
//!
//! | Kind | Method | Feature |
//! |------|--------|---------|
//! | `dinic` | Level graph + blocking flow, exact combinatorial | always |
//! | `lp` | Throughput LP solved by Clarabel through `good_lp` | `solver-clarabel` |

mod dinic;
#[cfg(feature = "solver-clarabel")]
mod lp;
mod registry;

pub use dinic::DinicSolver;
#[cfg(feature = "solver-clarabel")]
pub use lp::LpSolver;
pub use registry::MaxFlowSolverKind;

use gridflow_core::{EdgeIndex, FlowAssignment, FlowNetwork, GridError, GridResult};
use tracing::{debug, info};

/// Relative tolerance applied to solver responses.
const RESPONSE_TOLERANCE: f64 = 1e-6;

/// A directed arc with an upper bound; the lower bound is always zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowArc {
    pub from: usize,
    pub to: usize,
    pub capacity: f64,
}

/// Solver input. Nodes are `0..node_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxFlowProblem {
    pub node_count: usize,
    pub arcs: Vec<FlowArc>,
    pub source: usize,
    pub sink: usize,
}

impl MaxFlowProblem {
    /// Arc `i` of the problem is `EdgeIndex::new(i)` of the network.
    pub fn from_network(network: &FlowNetwork) -> Self {
        let arcs = network
            .edge_indices()
            .map(|edge| {
                let (from, to) = network.endpoints(edge);
                FlowArc {
                    from: from.index(),
                    to: to.index(),
                    capacity: network.edge(edge).capacity.value(),
                }
            })
            .collect();
        Self {
            node_count: network.node_count(),
            arcs,
            source: network.source().index(),
            sink: network.sink().index(),
        }
    }

    /// Sum of capacities leaving the source; an upper bound on the flow.
    pub fn source_capacity(&self) -> f64 {
        self.arcs
            .iter()
            .filter(|arc| arc.from == self.source)
            .map(|arc| arc.capacity)
            .sum()
    }
}

/// Solver output.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxFlowSolution {
    /// One entry per problem arc, same order
    pub arc_flows: Vec<f64>,
    pub total_flow: f64,
}

/// A maximum-flow backend.
pub trait MaxFlowSolver: Send + Sync {
    /// Short identifier, e.g. `"dinic"`.
    fn id(&self) -> &'static str;

    /// Compute a maximum source-to-sink flow.
    fn solve(&self, problem: &MaxFlowProblem) -> GridResult<MaxFlowSolution>;
}

/// Solve the maximum-flow problem on `network` with `solver`.
///
/// The response is checked before it is accepted: one finite flow per edge,
/// flows within `[0, capacity]` up to numerical noise (which is clamped away),
/// conservation at every bus, and a net source outflow matching the reported
/// total. Any violation is a [`GridError::SolverFailure`].
pub fn solve_max_flow(
    network: &FlowNetwork,
    solver: &dyn MaxFlowSolver,
) -> GridResult<FlowAssignment> {
    let problem = MaxFlowProblem::from_network(network);
    debug!(
        solver = solver.id(),
        nodes = problem.node_count,
        arcs = problem.arcs.len(),
        "solving max flow"
    );

    let solution = solver.solve(&problem)?;
    let flows = check_solution(network, &problem, &solution, solver.id())?;

    // Clamping may shift the throughput slightly; the total is re-derived
    // from the clamped flows.
    let provisional = FlowAssignment::new(flows, 0.0);
    let total = provisional.net_outflow(network, network.source());
    let assignment = FlowAssignment::new(provisional.edge_flows().to_vec(), total);

    for node in network.graph().node_indices() {
        if node == network.source() || node == network.sink() {
            continue;
        }
        let imbalance = assignment.net_outflow(network, node);
        if imbalance.abs() > tolerance_for(&problem) {
            return Err(GridError::SolverFailure(format!(
                "{} solver violates conservation at {} by {imbalance:.3e} MW",
                solver.id(),
                network.node(node)
            )));
        }
    }

    if (total - solution.total_flow).abs() > tolerance_for(&problem) {
        return Err(GridError::SolverFailure(format!(
            "{} solver reported a total of {} MW but the source sends {} MW",
            solver.id(),
            solution.total_flow,
            total
        )));
    }

    info!(solver = solver.id(), total_mw = total, "max flow solved");
    Ok(assignment)
}

/// Validate the shape of a response and clamp noise into the arc bounds.
fn check_solution(
    network: &FlowNetwork,
    problem: &MaxFlowProblem,
    solution: &MaxFlowSolution,
    solver: &str,
) -> GridResult<Vec<f64>> {
    if solution.arc_flows.len() != problem.arcs.len() {
        return Err(GridError::SolverFailure(format!(
            "{solver} solver returned {} arc flows for {} arcs",
            solution.arc_flows.len(),
            problem.arcs.len()
        )));
    }
    if !solution.total_flow.is_finite() {
        return Err(GridError::SolverFailure(format!(
            "{solver} solver returned a non-finite total flow"
        )));
    }

    let tolerance = tolerance_for(problem);
    let mut flows = Vec::with_capacity(problem.arcs.len());
    for (index, (arc, flow)) in problem.arcs.iter().zip(&solution.arc_flows).enumerate() {
        if !flow.is_finite() {
            return Err(GridError::SolverFailure(format!(
                "{solver} solver returned a non-finite flow on {}",
                network.edge_label(EdgeIndex::new(index))
            )));
        }
        if *flow < -tolerance || *flow > arc.capacity + tolerance {
            return Err(GridError::SolverFailure(format!(
                "{solver} solver put {flow} MW on {} with capacity {} MW",
                network.edge_label(EdgeIndex::new(index)),
                arc.capacity
            )));
        }
        flows.push(flow.clamp(0.0, arc.capacity));
    }
    Ok(flows)
}

/// Absolute tolerance scaled to the size of the problem.
fn tolerance_for(problem: &MaxFlowProblem) -> f64 {
    RESPONSE_TOLERANCE * problem.source_capacity().max(1.0)
}
