//! Max flow as a linear program.
//!
//! ```text
//! maximise   F
//! subject to 0 <= f_a <= c_a                       for every arc a
//!            out(v) - in(v) = F                    v = source
//!            out(v) - in(v) = -F                   v = sink
//!            out(v) - in(v) = 0                    otherwise
//! ```
//!
//! Solved with Clarabel through `good_lp`. Interior-point output is close to,
//! not exactly on, the bounds; [`super::solve_max_flow`] clamps the noise.

use super::{MaxFlowProblem, MaxFlowSolution, MaxFlowSolver};
use gridflow_core::{GridError, GridResult};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use tracing::debug;

/// LP backend. Slower than [`super::DinicSolver`], kept as an independent
/// cross-check.
#[derive(Debug, Clone, Default)]
pub struct LpSolver;

impl MaxFlowSolver for LpSolver {
    fn id(&self) -> &'static str {
        "lp"
    }

    fn solve(&self, problem: &MaxFlowProblem) -> GridResult<MaxFlowSolution> {
        let n = problem.node_count;
        if problem.source >= n || problem.sink >= n || problem.source == problem.sink {
            return Err(GridError::SolverFailure(format!(
                "invalid terminals: source {}, sink {}, {n} nodes",
                problem.source, problem.sink
            )));
        }

        let mut vars = variables!();
        let throughput = vars.add(variable().min(0.0).max(problem.source_capacity()));

        let mut arc_vars: Vec<Variable> = Vec::with_capacity(problem.arcs.len());
        let mut balance: Vec<Option<Expression>> = vec![None; n];
        for (index, arc) in problem.arcs.iter().enumerate() {
            if arc.from >= n || arc.to >= n {
                return Err(GridError::SolverFailure(format!(
                    "arc {index} references a node outside the problem"
                )));
            }
            let flow = vars.add(variable().min(0.0).max(arc.capacity));
            arc_vars.push(flow);

            *balance[arc.from].get_or_insert_with(|| Expression::from(0.0)) += flow;
            *balance[arc.to].get_or_insert_with(|| Expression::from(0.0)) -= flow;
        }

        let mut model = vars.maximise(throughput).using(clarabel);
        let mut rows = 0usize;
        for (node, expr) in balance.into_iter().enumerate() {
            let Some(expr) = expr else {
                continue;
            };
            model = if node == problem.source {
                model.with(constraint!(expr - throughput == 0.0))
            } else if node == problem.sink {
                model.with(constraint!(expr + throughput == 0.0))
            } else {
                model.with(constraint!(expr == 0.0))
            };
            rows += 1;
        }
        debug!(columns = arc_vars.len() + 1, rows, "max-flow LP assembled");

        let solution = model
            .solve()
            .map_err(|e| GridError::SolverFailure(format!("clarabel: {e}")))?;

        Ok(MaxFlowSolution {
            arc_flows: arc_vars.iter().map(|var| solution.value(*var)).collect(),
            total_flow: solution.value(throughput),
        })
    }
}
