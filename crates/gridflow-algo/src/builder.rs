//! Flow-network construction from the reconciled grid.
//!
//! Branches are rewritten onto canonical buses and deduplicated, the bus set
//! referenced by branches is checked against the bus table, and only then is
//! the network grown: a pair of opposing transmission edges per branch plus
//! the terminal edges of each endpoint.

use gridflow_core::{
    Branch, BusId, BusTable, Diagnostics, FlowNetwork, GridError, GridResult, Megawatts,
    RedirectMap,
};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Output of [`build_flow_network`].
#[derive(Debug, Clone)]
pub struct NetworkBuild {
    pub network: FlowNetwork,
    /// Surviving branches after rewriting and deduplication, in input order
    pub branches: Vec<Branch>,
    pub diagnostics: Diagnostics,
}

/// Build the flow network for a transfer study at transmission capacity
/// `capacity`.
///
/// Fails with [`GridError::InvalidParameter`] for a non-positive or non-finite
/// capacity and with [`GridError::DataIntegrity`] when the buses referenced by
/// branches differ from the bus table. Both checks run before any edge is
/// created.
pub fn build_flow_network(
    buses: &BusTable,
    branches: &[Branch],
    redirects: &RedirectMap,
    capacity: Megawatts,
) -> GridResult<NetworkBuild> {
    validate_capacity(capacity)?;

    let mut diagnostics = Diagnostics::new();
    let branches = rewrite_branches(branches, redirects, &mut diagnostics);
    check_completeness(buses, &branches)?;

    let mut network = FlowNetwork::new(capacity);
    let mut supplied: BTreeSet<BusId> = BTreeSet::new();
    let mut drained: BTreeSet<BusId> = BTreeSet::new();

    for branch in &branches {
        let first = network.ensure_bus(branch.first);
        let second = network.ensure_bus(branch.second);

        if branch.is_self_loop() {
            diagnostics.add_warning_with_entity(
                "topology",
                "branch collapses onto a single bus after reconciliation; no line added",
                &format!("branch {branch}"),
            );
        } else {
            network.add_transmission_pair(first, second);
        }

        for (bus_id, node) in [(branch.first, first), (branch.second, second)] {
            // Completeness has been checked, every endpoint is in the table.
            let Some(bus) = buses.get(bus_id) else {
                continue;
            };
            let injection = bus.net_injection();
            if injection.value() > 0.0 {
                if supplied.insert(bus_id) {
                    network.add_supply(node, injection);
                }
            } else if injection.value() < 0.0 && drained.insert(bus_id) {
                network.add_demand(node, -injection);
            }
        }
    }

    let stats = network.stats();
    info!(
        buses = stats.num_buses,
        lines = branches.len(),
        supply_mw = stats.total_supply_mw,
        demand_mw = stats.total_demand_mw,
        capacity_mw = capacity.value(),
        "built flow network"
    );

    Ok(NetworkBuild {
        network,
        branches,
        diagnostics,
    })
}

pub(crate) fn validate_capacity(capacity: Megawatts) -> GridResult<()> {
    if !capacity.is_finite() || capacity.value() <= 0.0 {
        return Err(GridError::InvalidParameter(format!(
            "transmission capacity must be a positive number of MW, got {}",
            capacity.value()
        )));
    }
    Ok(())
}

/// Rewrite branch endpoints onto canonical buses and drop repeated lines.
///
/// Two branches are the same line when their rewritten endpoints match in
/// either order; the first occurrence is kept.
pub fn rewrite_branches(
    branches: &[Branch],
    redirects: &RedirectMap,
    diagnostics: &mut Diagnostics,
) -> Vec<Branch> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(branches.len());

    for (position, original) in branches.iter().enumerate() {
        let rewritten = redirects.rewrite(*original);
        if seen.insert(rewritten.unordered_key()) {
            kept.push(rewritten);
        } else {
            diagnostics.add_warning_with_entity(
                "topology",
                &format!(
                    "duplicate branch dropped (row {} rewritten to {})",
                    position + 1,
                    rewritten
                ),
                &format!("branch {original}"),
            );
        }
    }

    debug!(
        input = branches.len(),
        kept = kept.len(),
        "rewrote branch endpoints"
    );
    kept
}

/// Check that branches reference exactly the buses of the table.
pub fn check_completeness(buses: &BusTable, branches: &[Branch]) -> GridResult<()> {
    let referenced: BTreeSet<BusId> = branches
        .iter()
        .flat_map(|branch| [branch.first, branch.second])
        .collect();
    let table = buses.ids();

    if referenced == table {
        return Ok(());
    }

    let isolated: Vec<BusId> = table.difference(&referenced).copied().collect();
    let unknown: Vec<BusId> = referenced.difference(&table).copied().collect();

    let mut problems = Vec::new();
    if !isolated.is_empty() {
        problems.push(format!(
            "buses without any branch: {}",
            format_ids(&isolated)
        ));
    }
    if !unknown.is_empty() {
        problems.push(format!(
            "branches reference unknown buses: {}",
            format_ids(&unknown)
        ));
    }
    Err(GridError::DataIntegrity(format!(
        "branch table and bus table disagree ({})",
        problems.join("; ")
    )))
}

fn format_ids(ids: &[BusId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridflow_core::{Bus, EdgeKind, FlowNode};

    fn bus(id: usize, gen: f64, load: f64) -> Bus {
        Bus {
            id: BusId::new(id),
            name: format!("bus {id}"),
            generation: Megawatts(gen),
            load: Megawatts(load),
        }
    }

    fn branch(a: usize, b: usize) -> Branch {
        Branch::new(BusId::new(a), BusId::new(b))
    }

    fn node(id: usize) -> FlowNode {
        FlowNode::Bus(BusId::new(id))
    }

    #[test]
    fn two_bus_network_layout() {
        let buses: BusTable = vec![bus(1, 10.0, 0.0), bus(2, 0.0, 10.0)]
            .into_iter()
            .collect();
        let build = build_flow_network(
            &buses,
            &[branch(1, 2)],
            &RedirectMap::default(),
            Megawatts(5.0),
        )
        .unwrap();
        let network = &build.network;

        assert_eq!(network.node_count(), 4);
        assert_eq!(network.edge_count(), 4);
        let forward = network.find_edge(node(1), node(2)).unwrap();
        let reverse = network.find_edge(node(2), node(1)).unwrap();
        assert_eq!(network.edge(forward).capacity, Megawatts(5.0));
        assert_eq!(network.edge(reverse).capacity, Megawatts(5.0));

        let supply = network.find_edge(FlowNode::Source, node(1)).unwrap();
        assert_eq!(network.edge(supply).kind, EdgeKind::Supply);
        assert_eq!(network.edge(supply).capacity, Megawatts(10.0));
        let demand = network.find_edge(node(2), FlowNode::Sink).unwrap();
        assert_eq!(network.edge(demand).capacity, Megawatts(10.0));
        assert!(network.find_edge(FlowNode::Source, node(2)).is_none());
    }

    #[test]
    fn terminal_edges_added_once_per_bus() {
        let buses: BusTable = vec![bus(1, 30.0, 0.0), bus(2, 0.0, 10.0), bus(3, 0.0, 20.0)]
            .into_iter()
            .collect();
        let build = build_flow_network(
            &buses,
            &[branch(1, 2), branch(1, 3), branch(2, 3)],
            &RedirectMap::default(),
            Megawatts(15.0),
        )
        .unwrap();
        let stats = build.network.stats();

        assert_eq!(stats.num_supply_buses, 1);
        assert_eq!(stats.num_demand_buses, 2);
        assert_eq!(stats.num_transmission_edges, 6);
        assert_eq!(stats.total_demand_mw, 30.0);
    }

    #[test]
    fn balanced_bus_is_pure_transshipment() {
        let buses: BusTable = vec![bus(1, 10.0, 0.0), bus(2, 7.0, 7.0), bus(3, 0.0, 10.0)]
            .into_iter()
            .collect();
        let build = build_flow_network(
            &buses,
            &[branch(1, 2), branch(2, 3)],
            &RedirectMap::default(),
            Megawatts(5.0),
        )
        .unwrap();
        let network = &build.network;

        assert!(network.find_edge(FlowNode::Source, node(2)).is_none());
        assert!(network.find_edge(node(2), FlowNode::Sink).is_none());
        assert_eq!(network.stats().num_transshipment_buses, 1);
    }

    #[test]
    fn rewritten_graph_never_references_superseded_ids() {
        let buses: BusTable = vec![bus(1, 10.0, 0.0), bus(2, 0.0, 10.0)]
            .into_iter()
            .collect();
        let redirects = RedirectMap::from_pairs([(BusId::new(9), BusId::new(1))]);
        let build = build_flow_network(
            &buses,
            &[branch(9, 2), branch(1, 2), branch(2, 1)],
            &redirects,
            Megawatts(5.0),
        )
        .unwrap();

        assert_eq!(build.branches, vec![branch(1, 2)]);
        assert!(build.network.bus_node(BusId::new(9)).is_none());
        assert_eq!(build.network.edge_count(), 4);
        assert_eq!(build.diagnostics.issues_by_category("topology").count(), 2);
    }

    #[test]
    fn isolated_bus_fails_completeness() {
        let buses: BusTable = vec![bus(1, 10.0, 0.0), bus(2, 0.0, 10.0), bus(3, 5.0, 0.0)]
            .into_iter()
            .collect();
        let err = build_flow_network(
            &buses,
            &[branch(1, 2)],
            &RedirectMap::default(),
            Megawatts(5.0),
        )
        .unwrap_err();

        assert!(matches!(err, GridError::DataIntegrity(_)));
        assert!(err.to_string().contains("buses without any branch: 3"));
    }

    #[test]
    fn unknown_branch_endpoint_fails_completeness() {
        let buses: BusTable = vec![bus(1, 10.0, 0.0), bus(2, 0.0, 10.0)]
            .into_iter()
            .collect();
        let err = build_flow_network(
            &buses,
            &[branch(1, 2), branch(2, 44)],
            &RedirectMap::default(),
            Megawatts(5.0),
        )
        .unwrap_err();

        assert!(matches!(err, GridError::DataIntegrity(_)));
        assert!(err.to_string().contains("unknown buses: 44"));
    }

    #[test]
    fn self_loop_keeps_terminal_edges() {
        let buses: BusTable = vec![bus(1, 10.0, 0.0), bus(2, 0.0, 10.0)]
            .into_iter()
            .collect();
        let redirects = RedirectMap::from_pairs([(BusId::new(3), BusId::new(1))]);
        let build = build_flow_network(
            &buses,
            &[branch(1, 3), branch(1, 2)],
            &redirects,
            Megawatts(5.0),
        )
        .unwrap();

        assert_eq!(build.network.stats().num_transmission_edges, 2);
        assert!(build.network.find_edge(node(1), node(1)).is_none());
        assert_eq!(build.network.stats().num_supply_buses, 1);
        assert_eq!(build.diagnostics.warning_count(), 1);
    }

    #[test]
    fn rejects_bad_capacity_before_building() {
        let buses: BusTable = vec![bus(1, 10.0, 0.0)].into_iter().collect();
        for capacity in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = build_flow_network(&buses, &[], &RedirectMap::default(), Megawatts(capacity))
                .unwrap_err();
            assert!(matches!(err, GridError::InvalidParameter(_)));
        }
    }
}
