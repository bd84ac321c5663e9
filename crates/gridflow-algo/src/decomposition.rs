//! Path decomposition of a source-to-sink flow.
//!
//! The decomposer works on a private copy of the edges that carry flow. Each
//! round it computes hop distances to `T` over the edges still carrying flow,
//! walks from `S` greedily towards `T`, and peels the walk's bottleneck off
//! every edge on it:
//!
//! ```text
//!   S --100--> 1 --50--> 2 --60--> T          round 1: S 1 2 T      50
//!              1 --50--> 5 --10--> 2          round 2: S 1 5 2 T    10
//!                        5 --40--> 4 --40--> T round 3: S 1 5 4 T    40
//! ```
//!
//! The bottleneck edge is always retired, so there are at most as many rounds
//! as edges carrying flow. Ties between equally short continuations go to the
//! lower edge index, which makes the output deterministic for a given
//! assignment.

use gridflow_core::{
    EdgeIndex, FlowAssignment, FlowNetwork, FlowPath, GridError, GridResult, NodeIndex,
};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone)]
struct WorkArc {
    edge: EdgeIndex,
    from: usize,
    to: usize,
    remaining: f64,
    live: bool,
}

/// Working copy of the flow-carrying edges, addressed by node index.
struct WorkGraph {
    arcs: Vec<WorkArc>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl WorkGraph {
    fn new(network: &FlowNetwork, assignment: &FlowAssignment, tolerance: f64) -> Self {
        let node_count = network.node_count();
        let mut graph = Self {
            arcs: Vec::new(),
            outgoing: vec![Vec::new(); node_count],
            incoming: vec![Vec::new(); node_count],
        };

        // Edge indices ascend, so adjacency lists are sorted by edge index.
        for (edge, flow) in assignment.iter() {
            if flow <= tolerance || edge.index() >= network.edge_count() {
                continue;
            }
            let (from, to) = network.endpoints(edge);
            let id = graph.arcs.len();
            graph.arcs.push(WorkArc {
                edge,
                from: from.index(),
                to: to.index(),
                remaining: flow,
                live: true,
            });
            graph.outgoing[from.index()].push(id);
            graph.incoming[to.index()].push(id);
        }
        graph
    }

    /// Hop distance to `sink` over live arcs.
    fn distances_to(&self, sink: usize) -> Vec<Option<usize>> {
        let mut distance = vec![None; self.outgoing.len()];
        distance[sink] = Some(0);
        let mut queue = VecDeque::from([sink]);

        while let Some(node) = queue.pop_front() {
            let next = distance[node].map(|d: usize| d + 1);
            for &id in &self.incoming[node] {
                let arc = &self.arcs[id];
                if arc.live && distance[arc.from].is_none() {
                    distance[arc.from] = next;
                    queue.push_back(arc.from);
                }
            }
        }
        distance
    }

    /// Next arc from `node`: shortest continuation to the sink, lowest edge
    /// index on ties.
    fn next_arc(&self, node: usize, distance: &[Option<usize>]) -> Option<usize> {
        self.outgoing[node]
            .iter()
            .copied()
            .filter(|id| self.arcs[*id].live)
            .filter_map(|id| distance[self.arcs[id].to].map(|d| (d, self.arcs[id].edge, id)))
            .min_by_key(|(d, edge, _)| (*d, *edge))
            .map(|(_, _, id)| id)
    }
}

/// Decompose `assignment` into source-to-sink paths.
///
/// Paths are returned in extraction order with their bottleneck flows. Their
/// flows sum to `total` and replaying them edge by edge reproduces the
/// assignment, both within `tolerance`, provided the assignment carries no
/// circulation (see [`crate::cancel_circulations`]).
///
/// Errors:
/// - [`GridError::InvalidParameter`] for a non-positive or non-finite
///   `tolerance`, or a negative or non-finite `total`;
/// - [`GridError::DataIntegrity`] when `S` can no longer reach `T` while flow
///   is still unaccounted for, e.g. for an assignment that violates
///   conservation.
pub fn decompose_flow(
    network: &FlowNetwork,
    assignment: &FlowAssignment,
    total: f64,
    tolerance: f64,
) -> GridResult<Vec<FlowPath>> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(GridError::InvalidParameter(format!(
            "decomposition tolerance must be positive and finite, got {tolerance}"
        )));
    }
    if !total.is_finite() || total < 0.0 {
        return Err(GridError::InvalidParameter(format!(
            "total flow must be finite and non-negative, got {total}"
        )));
    }

    let mut work = WorkGraph::new(network, assignment, tolerance);
    let source = network.source().index();
    let sink = network.sink().index();
    let mut remaining = total;
    let mut paths = Vec::new();

    while remaining > tolerance {
        let distance = work.distances_to(sink);
        if distance[source].is_none() {
            return Err(GridError::DataIntegrity(format!(
                "flow decomposition stranded: S no longer reaches T with {remaining:.6} MW \
                 unaccounted for"
            )));
        }

        let mut walked: Vec<usize> = Vec::new();
        let mut node = source;
        while node != sink {
            // A node at finite distance always has a live arc one hop closer.
            let Some(id) = work.next_arc(node, &distance) else {
                return Err(GridError::DataIntegrity(format!(
                    "flow decomposition stranded at {} with {remaining:.6} MW unaccounted for",
                    network.node(NodeIndex::new(node))
                )));
            };
            walked.push(id);
            node = work.arcs[id].to;
        }

        let bottleneck = walked
            .iter()
            .map(|id| work.arcs[*id].remaining)
            .fold(f64::INFINITY, f64::min);
        for id in &walked {
            let arc = &mut work.arcs[*id];
            arc.remaining -= bottleneck;
            if arc.remaining <= tolerance {
                arc.live = false;
            }
        }
        remaining -= bottleneck;

        let mut nodes = vec![network.node(network.source())];
        nodes.extend(
            walked
                .iter()
                .map(|id| network.node(NodeIndex::new(work.arcs[*id].to))),
        );
        let path = FlowPath {
            nodes,
            edges: walked.iter().map(|id| work.arcs[*id].edge).collect(),
            flow: bottleneck,
        };
        debug!(path = %path, flow = bottleneck, remaining, "extracted flow path");
        paths.push(path);
    }

    Ok(paths)
}

/// Per-edge flows obtained by replaying `paths`, for checking a
/// decomposition against the assignment it came from.
pub fn replay_paths(network: &FlowNetwork, paths: &[FlowPath]) -> FlowAssignment {
    let mut flows = vec![0.0; network.edge_count()];
    let mut total = 0.0;
    for path in paths {
        for edge in &path.edges {
            if let Some(slot) = flows.get_mut(edge.index()) {
                *slot += path.flow;
            }
        }
        total += path.flow;
    }
    FlowAssignment::new(flows, total)
}
