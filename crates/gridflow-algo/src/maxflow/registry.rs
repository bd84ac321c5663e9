use super::{DinicSolver, MaxFlowSolver};
use gridflow_core::GridError;
use std::str::FromStr;
use std::sync::Arc;

/// Registry of available max-flow backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MaxFlowSolverKind {
    #[default]
    Dinic,
    #[cfg(feature = "solver-clarabel")]
    Lp,
}

impl MaxFlowSolverKind {
    pub fn build_solver(self) -> Arc<dyn MaxFlowSolver> {
        match self {
            MaxFlowSolverKind::Dinic => Arc::new(DinicSolver),
            #[cfg(feature = "solver-clarabel")]
            MaxFlowSolverKind::Lp => Arc::new(super::LpSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        #[cfg(feature = "solver-clarabel")]
        {
            &["dinic", "lp"]
        }
        #[cfg(not(feature = "solver-clarabel"))]
        {
            &["dinic"]
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaxFlowSolverKind::Dinic => "dinic",
            #[cfg(feature = "solver-clarabel")]
            MaxFlowSolverKind::Lp => "lp",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MaxFlowSolverKind::Dinic => "level graph + blocking flow (exact)",
            #[cfg(feature = "solver-clarabel")]
            MaxFlowSolverKind::Lp => "linear program solved by Clarabel",
        }
    }
}

impl FromStr for MaxFlowSolverKind {
    type Err = GridError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "dinic" | "default" => Ok(MaxFlowSolverKind::Dinic),
            #[cfg(feature = "solver-clarabel")]
            "lp" | "clarabel" => Ok(MaxFlowSolverKind::Lp),
            other => Err(GridError::InvalidParameter(format!(
                "unknown max-flow solver '{}'; supported values: {}",
                other,
                Self::available().join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for MaxFlowSolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
