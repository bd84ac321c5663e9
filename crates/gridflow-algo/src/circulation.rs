//! Removal of flow circulating around directed cycles.
//!
//! A max-flow assignment may push flow both ways along a branch, or around a
//! longer loop of lines. Such circulation carries nothing from `S` to `T`, and
//! a path decomposition cannot reproduce it. Cancelling it leaves throughput
//! and conservation unchanged.

use gridflow_core::{EdgeIndex, FlowAssignment, FlowNetwork};
use tracing::debug;

/// Return a copy of `assignment` with every directed cycle carrying more than
/// `tolerance` reduced by its bottleneck until no such cycle remains.
///
/// Flows that drop to `tolerance` or below are set to exactly zero.
pub fn cancel_circulations(
    network: &FlowNetwork,
    assignment: &FlowAssignment,
    tolerance: f64,
) -> FlowAssignment {
    let mut flows = assignment.edge_flows().to_vec();
    let mut cancelled = 0usize;

    while let Some(cycle) = find_cycle(network, &flows, tolerance) {
        let bottleneck = cycle
            .iter()
            .map(|edge| flows[edge.index()])
            .fold(f64::INFINITY, f64::min);
        for edge in &cycle {
            let flow = &mut flows[edge.index()];
            *flow -= bottleneck;
            if *flow <= tolerance {
                *flow = 0.0;
            }
        }
        cancelled += 1;
        debug!(
            edges = cycle.len(),
            flow = bottleneck,
            "cancelled circulating flow"
        );
    }
    if cancelled > 0 {
        debug!(cycles = cancelled, "circulations cancelled");
    }

    FlowAssignment::new(flows, assignment.total())
}

/// First directed cycle found over edges carrying more than `tolerance`,
/// as an edge list in traversal order.
fn find_cycle(network: &FlowNetwork, flows: &[f64], tolerance: f64) -> Option<Vec<EdgeIndex>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }

    let live = |edge: &EdgeIndex| flows.get(edge.index()).is_some_and(|f| *f > tolerance);
    let node_count = network.node_count();
    let mut mark = vec![Mark::Unvisited; node_count];

    for start in network.graph().node_indices() {
        if mark[start.index()] != Mark::Unvisited {
            continue;
        }

        // (node, live outgoing edges, next position) plus the edge used to
        // enter each stacked node
        let mut stack = vec![(start, network.outgoing(start), 0usize)];
        let mut entered_by: Vec<EdgeIndex> = Vec::new();
        mark[start.index()] = Mark::OnStack;

        while let Some((node, edges, position)) = stack.last_mut() {
            let Some(offset) = edges[*position..].iter().position(&live) else {
                mark[node.index()] = Mark::Done;
                stack.pop();
                entered_by.pop();
                continue;
            };
            let edge = edges[*position + offset];
            *position += offset + 1;

            let (_, head) = network.endpoints(edge);
            match mark[head.index()] {
                Mark::OnStack => {
                    let depth = stack
                        .iter()
                        .position(|(n, _, _)| *n == head)
                        .unwrap_or(0);
                    let mut cycle: Vec<EdgeIndex> = entered_by[depth..].to_vec();
                    cycle.push(edge);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    mark[head.index()] = Mark::OnStack;
                    entered_by.push(edge);
                    stack.push((head, network.outgoing(head), 0));
                }
                Mark::Done => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridflow_core::{BusId, FlowNode, Megawatts};

    fn node(id: usize) -> FlowNode {
        FlowNode::Bus(BusId::new(id))
    }

    fn triangle() -> FlowNetwork {
        let mut network = FlowNetwork::new(Megawatts(10.0));
        let a = network.ensure_bus(BusId::new(1));
        let b = network.ensure_bus(BusId::new(2));
        let c = network.ensure_bus(BusId::new(3));
        network.add_transmission_pair(a, b);
        network.add_transmission_pair(b, c);
        network.add_transmission_pair(c, a);
        network.add_supply(a, Megawatts(10.0));
        network.add_demand(c, Megawatts(10.0));
        network
    }

    fn edge(network: &FlowNetwork, from: FlowNode, to: FlowNode) -> EdgeIndex {
        network.find_edge(from, to).unwrap()
    }

    #[test]
    fn removes_two_way_flow_on_a_branch() {
        let network = triangle();
        let assignment = FlowAssignment::from_edges(
            &network,
            [
                (edge(&network, FlowNode::Source, node(1)), 6.0),
                (edge(&network, node(1), node(3)), 8.0),
                (edge(&network, node(3), node(1)), 2.0),
                (edge(&network, node(3), FlowNode::Sink), 6.0),
            ],
            6.0,
        );
        let cancelled = cancel_circulations(&network, &assignment, 1e-9);

        assert_eq!(cancelled.flow(edge(&network, node(1), node(3))), 6.0);
        assert_eq!(cancelled.flow(edge(&network, node(3), node(1))), 0.0);
        assert_eq!(cancelled.total(), 6.0);
        assert_eq!(cancelled.net_outflow(&network, network.source()), 6.0);
    }

    #[test]
    fn removes_longer_loop() {
        let network = triangle();
        let assignment = FlowAssignment::from_edges(
            &network,
            [
                (edge(&network, FlowNode::Source, node(1)), 5.0),
                (edge(&network, node(1), node(3)), 5.0),
                (edge(&network, node(3), FlowNode::Sink), 5.0),
                // 1 -> 2 -> 3 -> 1 at 3 MW
                (edge(&network, node(1), node(2)), 3.0),
                (edge(&network, node(2), node(3)), 3.0),
                (edge(&network, node(3), node(1)), 3.0),
            ],
            5.0,
        );
        let cancelled = cancel_circulations(&network, &assignment, 1e-9);

        assert_eq!(cancelled.flow(edge(&network, node(1), node(2))), 0.0);
        assert_eq!(cancelled.flow(edge(&network, node(2), node(3))), 0.0);
        assert_eq!(cancelled.flow(edge(&network, node(3), node(1))), 0.0);
        assert_eq!(cancelled.flow(edge(&network, node(1), node(3))), 5.0);
        for bus in 1..=3 {
            let index = network.bus_node(BusId::new(bus)).unwrap();
            assert_eq!(cancelled.net_outflow(&network, index), 0.0);
        }
    }

    #[test]
    fn acyclic_assignment_is_unchanged() {
        let network = triangle();
        let assignment = FlowAssignment::from_edges(
            &network,
            [
                (edge(&network, FlowNode::Source, node(1)), 10.0),
                (edge(&network, node(1), node(2)), 4.0),
                (edge(&network, node(2), node(3)), 4.0),
                (edge(&network, node(1), node(3)), 6.0),
                (edge(&network, node(3), FlowNode::Sink), 10.0),
            ],
            10.0,
        );
        assert_eq!(cancel_circulations(&network, &assignment, 1e-9), assignment);
    }
}
