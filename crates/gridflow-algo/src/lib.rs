//! # gridflow-algo: transfer-capability analysis
//!
//! Turns raw bus and branch tables into a maximum-flow study:
//!
//! 1. [`reconcile`] merges bus records that share a name,
//! 2. [`builder`] builds the capacitated flow network with a super-source and
//!    super-sink,
//! 3. [`maxflow`] computes a maximum flow through a pluggable backend,
//! 4. [`circulation`] removes flow that only loops between buses,
//! 5. [`congestion`] lists the edges at capacity,
//! 6. [`decomposition`] splits the flow into source-to-sink paths.
//!
//! [`pipeline::analyze_transfer`] runs all six steps.
//!
//! ```rust
//! use gridflow_algo::{analyze_transfer, TransferConfig};
//! use gridflow_core::{Branch, BusId, RawBus};
//!
//! let buses = vec![
//!     RawBus::new(1, "A", Some(10.0), None),
//!     RawBus::new(2, "B", None, Some(10.0)),
//! ];
//! let branches = vec![Branch::new(BusId::new(1), BusId::new(2))];
//!
//! let analysis = analyze_transfer(&buses, &branches, &TransferConfig::new(5.0)?)?;
//! assert_eq!(analysis.paths[0].to_string(), "S -> 1 -> 2 -> T");
//! # Ok::<(), gridflow_core::GridError>(())
//! ```

pub mod builder;
pub mod circulation;
pub mod congestion;
pub mod decomposition;
pub mod maxflow;
pub mod pipeline;
pub mod reconcile;

pub use builder::{build_flow_network, check_completeness, rewrite_branches, NetworkBuild};
pub use circulation::cancel_circulations;
pub use congestion::{congested_edges, CongestedEdge, DEFAULT_TOLERANCE};
pub use decomposition::{decompose_flow, replay_paths};
pub use maxflow::{
    solve_max_flow, DinicSolver, FlowArc, MaxFlowProblem, MaxFlowSolution, MaxFlowSolver,
    MaxFlowSolverKind,
};
#[cfg(feature = "solver-clarabel")]
pub use maxflow::LpSolver;
pub use pipeline::{analyze_transfer, TransferAnalysis, TransferConfig};
pub use reconcile::{merge_readings, reconcile_buses, Reconciliation};
