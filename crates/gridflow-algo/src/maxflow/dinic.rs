//! Dinic's algorithm on a paired residual graph.
//!
//! Problem arc `i` becomes residual arc `2i` (forward, capacity `c_i`) and
//! residual arc `2i + 1` (backward, capacity 0). Pushing on one arc of a pair
//! frees the same amount on the other, so the flow on problem arc `i` is the
//! residual capacity left on arc `2i + 1`.

use super::{MaxFlowProblem, MaxFlowSolution, MaxFlowSolver};
use gridflow_core::{GridError, GridResult};
use std::collections::VecDeque;
use tracing::trace;

/// Residual capacities below this are treated as saturated.
const EPSILON: f64 = 1e-9;

/// Exact combinatorial max-flow. The default backend.
#[derive(Debug, Clone, Default)]
pub struct DinicSolver;

impl MaxFlowSolver for DinicSolver {
    fn id(&self) -> &'static str {
        "dinic"
    }

    fn solve(&self, problem: &MaxFlowProblem) -> GridResult<MaxFlowSolution> {
        let mut residual = Residual::new(problem)?;
        let mut total = 0.0;
        let mut phases = 0usize;

        while residual.build_levels(problem.source, problem.sink) {
            phases += 1;
            residual.reset_cursors();
            loop {
                let pushed = residual.augment(problem.source, problem.sink, f64::INFINITY);
                if pushed <= EPSILON {
                    break;
                }
                total += pushed;
            }
            trace!(phase = phases, total, "dinic blocking flow");
        }

        let arc_flows = (0..problem.arcs.len())
            .map(|index| residual.capacity[2 * index + 1])
            .collect();
        Ok(MaxFlowSolution {
            arc_flows,
            total_flow: total,
        })
    }
}

struct Residual {
    head: Vec<usize>,
    capacity: Vec<f64>,
    /// Residual arcs leaving each node
    adjacency: Vec<Vec<usize>>,
    level: Vec<Option<usize>>,
    cursor: Vec<usize>,
}

impl Residual {
    fn new(problem: &MaxFlowProblem) -> GridResult<Self> {
        let n = problem.node_count;
        if problem.source >= n || problem.sink >= n || problem.source == problem.sink {
            return Err(GridError::SolverFailure(format!(
                "invalid terminals: source {}, sink {}, {n} nodes",
                problem.source, problem.sink
            )));
        }

        let mut head = Vec::with_capacity(problem.arcs.len() * 2);
        let mut capacity = Vec::with_capacity(problem.arcs.len() * 2);
        let mut adjacency = vec![Vec::new(); n];

        for (index, arc) in problem.arcs.iter().enumerate() {
            if arc.from >= n || arc.to >= n {
                return Err(GridError::SolverFailure(format!(
                    "arc {index} references a node outside the problem"
                )));
            }
            if arc.capacity.is_nan() || arc.capacity < 0.0 {
                return Err(GridError::SolverFailure(format!(
                    "arc {index} has invalid capacity {}",
                    arc.capacity
                )));
            }
            adjacency[arc.from].push(2 * index);
            head.push(arc.to);
            capacity.push(arc.capacity);
            adjacency[arc.to].push(2 * index + 1);
            head.push(arc.from);
            capacity.push(0.0);
        }

        Ok(Self {
            head,
            capacity,
            adjacency,
            level: vec![None; n],
            cursor: vec![0; n],
        })
    }

    /// BFS levels from `source`; true when `sink` is reachable.
    fn build_levels(&mut self, source: usize, sink: usize) -> bool {
        self.level.iter_mut().for_each(|level| *level = None);
        self.level[source] = Some(0);
        let mut queue = VecDeque::from([source]);

        while let Some(node) = queue.pop_front() {
            let next = self.level[node].map(|level| level + 1);
            for &arc in &self.adjacency[node] {
                let to = self.head[arc];
                if self.capacity[arc] > EPSILON && self.level[to].is_none() {
                    self.level[to] = next;
                    queue.push_back(to);
                }
            }
        }
        self.level[sink].is_some()
    }

    fn reset_cursors(&mut self) {
        self.cursor.iter_mut().for_each(|cursor| *cursor = 0);
    }

    /// Push up to `limit` along one level-increasing path.
    fn augment(&mut self, node: usize, sink: usize, limit: f64) -> f64 {
        if node == sink {
            return limit;
        }
        while self.cursor[node] < self.adjacency[node].len() {
            let arc = self.adjacency[node][self.cursor[node]];
            let to = self.head[arc];
            let advances = match (self.level[node], self.level[to]) {
                (Some(here), Some(there)) => there == here + 1,
                _ => false,
            };
            if advances && self.capacity[arc] > EPSILON {
                let pushed = self.augment(to, sink, limit.min(self.capacity[arc]));
                if pushed > EPSILON {
                    self.capacity[arc] -= pushed;
                    self.capacity[arc ^ 1] += pushed;
                    return pushed;
                }
            }
            self.cursor[node] += 1;
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{solve_max_flow, FlowArc};
    use super::*;

    #[test]
    fn two_bus_flow_is_line_limited() {
        let network = two_bus(5.0);
        let assignment = solve_max_flow(&network, &DinicSolver).unwrap();

        assert!((assignment.total() - 5.0).abs() < 1e-9);
        // 1->2 carries everything, 2->1 nothing
        assert!((assignment.edge_flows()[0] - 5.0).abs() < 1e-9);
        assert_eq!(assignment.edge_flows()[1], 0.0);
    }

    #[test]
    fn two_bus_flow_is_supply_limited() {
        let network = two_bus(50.0);
        let assignment = solve_max_flow(&network, &DinicSolver).unwrap();
        assert!((assignment.total() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn diamond_reaches_cut_value() {
        // Bus 1 can only export over two 10 MW lines; with bus 2's own
        // 5 MW the cut {S, 1} is 25 MW, below both supply and demand.
        let network = diamond(10.0);
        let assignment = solve_max_flow(&network, &DinicSolver).unwrap();
        assert!((assignment.total() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_nodes() {
        let problem = MaxFlowProblem {
            node_count: 2,
            arcs: vec![FlowArc {
                from: 0,
                to: 5,
                capacity: 1.0,
            }],
            source: 0,
            sink: 1,
        };
        assert!(DinicSolver.solve(&problem).is_err());
    }

    #[test]
    fn disconnected_sink_gives_zero() {
        let problem = MaxFlowProblem {
            node_count: 3,
            arcs: vec![FlowArc {
                from: 0,
                to: 2,
                capacity: 4.0,
            }],
            source: 0,
            sink: 1,
        };
        let solution = DinicSolver.solve(&problem).unwrap();
        assert_eq!(solution.total_flow, 0.0);
        assert_eq!(solution.arc_flows, vec![0.0]);
    }
}
