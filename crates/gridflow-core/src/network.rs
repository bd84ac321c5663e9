//! Directed capacitated network handed to the max-flow solver.
//!
//! Every branch becomes a pair of opposing [`EdgeKind::Transmission`] edges
//! sharing the network-wide capacity. Surplus buses get one
//! [`EdgeKind::Supply`] edge from the super-source, deficit buses one
//! [`EdgeKind::Demand`] edge into the super-sink.
//!
//! The graph only grows while it is being built. Edge indices are therefore
//! stable for the lifetime of the network, which is what lets a
//! [`FlowAssignment`](crate::FlowAssignment) be a plain vector.

use crate::{BusId, Megawatts};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::BTreeMap;

/// A node of the flow network.
///
/// Serializes as its display form: `"S"`, `"T"` or the bus index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlowNode {
    /// Super-source feeding every surplus bus
    Source,
    /// Super-sink drained by every deficit bus
    Sink,
    Bus(BusId),
}

impl FlowNode {
    pub fn bus_id(&self) -> Option<BusId> {
        match self {
            FlowNode::Bus(id) => Some(*id),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowNode::Source => write!(f, "S"),
            FlowNode::Sink => write!(f, "T"),
            FlowNode::Bus(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for FlowNode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Role of an edge in the flow network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Super-source to surplus bus
    Supply,
    /// One direction of a transmission line
    Transmission,
    /// Deficit bus to super-sink
    Demand,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Supply => "supply",
            EdgeKind::Transmission => "line",
            EdgeKind::Demand => "demand",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowEdge {
    pub kind: EdgeKind,
    pub capacity: Megawatts,
}

/// The flow network: canonical buses plus super-source and super-sink.
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    graph: DiGraph<FlowNode, FlowEdge>,
    source: NodeIndex,
    sink: NodeIndex,
    bus_nodes: BTreeMap<BusId, NodeIndex>,
    transmission_capacity: Megawatts,
}

impl FlowNetwork {
    /// Empty network holding only the super-source and super-sink.
    pub fn new(transmission_capacity: Megawatts) -> Self {
        let mut graph = DiGraph::new();
        let source = graph.add_node(FlowNode::Source);
        let sink = graph.add_node(FlowNode::Sink);
        Self {
            graph,
            source,
            sink,
            bus_nodes: BTreeMap::new(),
            transmission_capacity,
        }
    }

    /// Node for `bus`, created on first use.
    pub fn ensure_bus(&mut self, bus: BusId) -> NodeIndex {
        if let Some(node) = self.bus_nodes.get(&bus) {
            return *node;
        }
        let node = self.graph.add_node(FlowNode::Bus(bus));
        self.bus_nodes.insert(bus, node);
        node
    }

    /// Add `a -> b` and `b -> a`, both at the network-wide capacity.
    pub fn add_transmission_pair(&mut self, a: NodeIndex, b: NodeIndex) -> (EdgeIndex, EdgeIndex) {
        let edge = FlowEdge {
            kind: EdgeKind::Transmission,
            capacity: self.transmission_capacity,
        };
        let forward = self.graph.add_edge(a, b, edge);
        let reverse = self.graph.add_edge(b, a, edge);
        (forward, reverse)
    }

    /// Add `S -> bus` with the bus's surplus as capacity.
    pub fn add_supply(&mut self, bus: NodeIndex, surplus: Megawatts) -> EdgeIndex {
        self.graph.add_edge(
            self.source,
            bus,
            FlowEdge {
                kind: EdgeKind::Supply,
                capacity: surplus,
            },
        )
    }

    /// Add `bus -> T` with the bus's deficit as capacity.
    pub fn add_demand(&mut self, bus: NodeIndex, deficit: Megawatts) -> EdgeIndex {
        self.graph.add_edge(
            bus,
            self.sink,
            FlowEdge {
                kind: EdgeKind::Demand,
                capacity: deficit,
            },
        )
    }

    pub fn graph(&self) -> &DiGraph<FlowNode, FlowEdge> {
        &self.graph
    }

    pub fn source(&self) -> NodeIndex {
        self.source
    }

    pub fn sink(&self) -> NodeIndex {
        self.sink
    }

    pub fn transmission_capacity(&self) -> Megawatts {
        self.transmission_capacity
    }

    pub fn bus_node(&self, bus: BusId) -> Option<NodeIndex> {
        self.bus_nodes.get(&bus).copied()
    }

    pub fn node(&self, node: NodeIndex) -> FlowNode {
        self.graph[node]
    }

    pub fn edge(&self, edge: EdgeIndex) -> &FlowEdge {
        &self.graph[edge]
    }

    /// Tail and head of `edge`.
    pub fn endpoints(&self, edge: EdgeIndex) -> (NodeIndex, NodeIndex) {
        // Edges are never removed, so every index handed out stays valid.
        self.graph
            .edge_endpoints(edge)
            .unwrap_or((NodeIndex::end(), NodeIndex::end()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edge indices in insertion order.
    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> {
        self.graph.edge_indices()
    }

    /// Outgoing edges of `node`, ascending by edge index.
    pub fn outgoing(&self, node: NodeIndex) -> Vec<EdgeIndex> {
        let mut edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| edge.id())
            .collect();
        edges.sort();
        edges
    }

    /// The edge `from -> to`, if present.
    pub fn find_edge(&self, from: FlowNode, to: FlowNode) -> Option<EdgeIndex> {
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;
        self.graph.find_edge(a, b)
    }

    pub fn index_of(&self, node: FlowNode) -> Option<NodeIndex> {
        match node {
            FlowNode::Source => Some(self.source),
            FlowNode::Sink => Some(self.sink),
            FlowNode::Bus(id) => self.bus_node(id),
        }
    }

    /// Human-readable `from->to` label for an edge.
    pub fn edge_label(&self, edge: EdgeIndex) -> String {
        let (from, to) = self.endpoints(edge);
        format!("{}->{}", self.graph[from], self.graph[to])
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            num_buses: self.bus_nodes.len(),
            ..NetworkStats::default()
        };

        for edge in self.graph.edge_weights() {
            match edge.kind {
                EdgeKind::Supply => {
                    stats.num_supply_buses += 1;
                    stats.total_supply_mw += edge.capacity.value();
                }
                EdgeKind::Demand => {
                    stats.num_demand_buses += 1;
                    stats.total_demand_mw += edge.capacity.value();
                }
                EdgeKind::Transmission => stats.num_transmission_edges += 1,
            }
        }
        stats.num_transshipment_buses = stats
            .num_buses
            .saturating_sub(stats.num_supply_buses + stats.num_demand_buses);
        stats
    }
}

/// Size and balance summary of a flow network.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_supply_buses: usize,
    pub num_demand_buses: usize,
    pub num_transshipment_buses: usize,
    pub num_transmission_edges: usize,
    pub total_supply_mw: f64,
    pub total_demand_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses ({} surplus, {} deficit, {} transshipment), {} lines, supply {:.1} MW, demand {:.1} MW",
            self.num_buses,
            self.num_supply_buses,
            self.num_demand_buses,
            self.num_transshipment_buses,
            self.num_transmission_edges / 2,
            self.total_supply_mw,
            self.total_demand_mw
        )
    }
}
