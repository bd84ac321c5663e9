//! Edges running at capacity.

use gridflow_core::{EdgeIndex, EdgeKind, FlowAssignment, FlowNetwork, FlowNode};
use serde::Serialize;

/// Default absolute tolerance (MW) for "at capacity" and for "carries flow".
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// A directed edge whose flow equals its capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestedEdge {
    #[serde(skip)]
    pub edge: EdgeIndex,
    pub from: FlowNode,
    pub to: FlowNode,
    pub kind: EdgeKind,
    pub flow_mw: f64,
    pub capacity_mw: f64,
}

/// Edges with `|flow - capacity| <= tolerance`, ascending by edge index.
///
/// Includes supply and demand edges as well as transmission edges; filter on
/// [`CongestedEdge::kind`] for lines only.
pub fn congested_edges(
    network: &FlowNetwork,
    assignment: &FlowAssignment,
    tolerance: f64,
) -> Vec<CongestedEdge> {
    network
        .edge_indices()
        .filter_map(|edge| {
            let data = network.edge(edge);
            let flow = assignment.flow(edge);
            let capacity = data.capacity.value();
            if (flow - capacity).abs() > tolerance {
                return None;
            }
            let (from, to) = network.endpoints(edge);
            Some(CongestedEdge {
                edge,
                from: network.node(from),
                to: network.node(to),
                kind: data.kind,
                flow_mw: flow,
                capacity_mw: capacity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridflow_core::{BusId, Megawatts};

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
    fn reports_saturated_line_only() {
        let network = two_bus();
        // 1->2, 2->1, S->1, 2->T
        let assignment = FlowAssignment::new(vec![5.0, 0.0, 5.0, 5.0], 5.0);
        let congested = congested_edges(&network, &assignment, DEFAULT_TOLERANCE);

        assert_eq!(congested.len(), 1);
        assert_eq!(congested[0].from, FlowNode::Bus(BusId::new(1)));
        assert_eq!(congested[0].to, FlowNode::Bus(BusId::new(2)));
        assert_eq!(congested[0].kind, EdgeKind::Transmission);
    }

    #[test]
    fn tolerance_is_inclusive_and_absolute() {
        let network = two_bus();
        let assignment = FlowAssignment::new(vec![5.0 - 1e-7, 0.0, 10.0 - 1e-3, 5.0], 5.0);
        let congested = congested_edges(&network, &assignment, 1e-6);
        assert_eq!(congested.len(), 1);
        assert_eq!(congested[0].edge, EdgeIndex::new(0));
    }

    #[test]
    fn idempotent() {
        let network = two_bus();
        let assignment = FlowAssignment::new(vec![5.0, 0.0, 10.0, 10.0], 10.0);
        let first = congested_edges(&network, &assignment, DEFAULT_TOLERANCE);
        let second = congested_edges(&network, &assignment, DEFAULT_TOLERANCE);
        assert_eq!(first, second);
        let edges: Vec<usize> = first.iter().map(|c| c.edge.index()).collect();
        assert_eq!(edges, vec![0, 2, 3]);
    }
}
