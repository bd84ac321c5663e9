//! Solver output and decomposed flow paths.

use crate::network::{FlowNetwork, FlowNode};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

/// Flow on every edge of a [`FlowNetwork`], plus the total throughput.
///
/// Edge flows are stored densely by edge index. An assignment is treated as
/// read-only once produced; consumers that need to modify flows work on a
/// copy.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowAssignment {
    edge_flows: Vec<f64>,
    total: f64,
}

impl FlowAssignment {
    /// `edge_flows[i]` is the flow on `EdgeIndex::new(i)`.
    pub fn new(edge_flows: Vec<f64>, total: f64) -> Self {
        Self { edge_flows, total }
    }

    /// All-zero assignment for `network`.
    pub fn zero(network: &FlowNetwork) -> Self {
        Self::new(vec![0.0; network.edge_count()], 0.0)
    }

    /// Assignment with the listed edges set and every other edge at zero.
    pub fn from_edges(
        network: &FlowNetwork,
        flows: impl IntoIterator<Item = (EdgeIndex, f64)>,
        total: f64,
    ) -> Self {
        let mut edge_flows = vec![0.0; network.edge_count()];
        for (edge, flow) in flows {
            if let Some(slot) = edge_flows.get_mut(edge.index()) {
                *slot = flow;
            }
        }
        Self::new(edge_flows, total)
    }

    /// Flow on `edge`; edges outside the assignment carry nothing.
    pub fn flow(&self, edge: EdgeIndex) -> f64 {
        self.edge_flows.get(edge.index()).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.edge_flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_flows.is_empty()
    }

    pub fn edge_flows(&self) -> &[f64] {
        &self.edge_flows
    }

    /// `(edge, flow)` pairs in edge-index order.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeIndex, f64)> + '_ {
        self.edge_flows
            .iter()
            .enumerate()
            .map(|(index, flow)| (EdgeIndex::new(index), *flow))
    }

    /// Outflow minus inflow at `node`.
    pub fn net_outflow(&self, network: &FlowNetwork, node: NodeIndex) -> f64 {
        let graph = network.graph();
        let out: f64 = graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| self.flow(edge.id()))
            .sum();
        let inflow: f64 = graph
            .edges_directed(node, Direction::Incoming)
            .map(|edge| self.flow(edge.id()))
            .sum();
        out - inflow
    }
}

/// One source-to-sink path of a flow decomposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowPath {
    /// Nodes from `S` to `T`
    pub nodes: Vec<FlowNode>,
    /// Edges walked, one fewer than `nodes`
    #[serde(skip)]
    pub edges: Vec<EdgeIndex>,
    /// Bottleneck flow at extraction time (MW)
    pub flow: f64,
}

impl std::fmt::Display for FlowPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (position, node) in self.nodes.iter().enumerate() {
            if position > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BusId, Megawatts};

    fn two_bus() -> FlowNetwork {
        let mut network = FlowNetwork::new(Megawatts(5.0));
        let a = network.ensure_bus(BusId::new(1));
        let b = network.ensure_bus(BusId::new(2));
        network.add_transmission_pair(a, b);
        network.add_supply(a, Megawatts(10.0));
        network.add_demand(b, Megawatts(10.0));
        network
    }

    #[test]
    fn test_from_edges_and_balance() {
        let network = two_bus();
        let s_a = network
            .find_edge(FlowNode::Source, FlowNode::Bus(BusId::new(1)))
            .unwrap();
        let a_b = network
            .find_edge(FlowNode::Bus(BusId::new(1)), FlowNode::Bus(BusId::new(2)))
            .unwrap();
        let b_t = network
            .find_edge(FlowNode::Bus(BusId::new(2)), FlowNode::Sink)
            .unwrap();
        let assignment =
            FlowAssignment::from_edges(&network, [(s_a, 5.0), (a_b, 5.0), (b_t, 5.0)], 5.0);

        assert_eq!(assignment.len(), network.edge_count());
        assert_eq!(assignment.flow(a_b), 5.0);
        assert_eq!(assignment.net_outflow(&network, network.source()), 5.0);
        assert_eq!(assignment.net_outflow(&network, network.sink()), -5.0);
        let a = network.bus_node(BusId::new(1)).unwrap();
        assert_eq!(assignment.net_outflow(&network, a), 0.0);
    }

    #[test]
    fn test_missing_edge_reads_zero() {
        let assignment = FlowAssignment::new(vec![1.0], 1.0);
        assert_eq!(assignment.flow(EdgeIndex::new(5)), 0.0);
    }

    #[test]
    fn test_path_display() {
        let path = FlowPath {
            nodes: vec![
                FlowNode::Source,
                FlowNode::Bus(BusId::new(1)),
                FlowNode::Bus(BusId::new(2)),
                FlowNode::Sink,
            ],
            edges: vec![EdgeIndex::new(2), EdgeIndex::new(0), EdgeIndex::new(3)],
            flow: 5.0,
        };
        assert_eq!(path.to_string(), "S -> 1 -> 2 -> T");
    }
}
