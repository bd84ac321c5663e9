//! # gridflow-core: transmission transfer data model
//!
//! Data structures shared by the gridflow crates: bus and branch records as
//! read from the grid tables, the canonical bus table produced by
//! reconciliation, and the directed flow network handed to a max-flow solver.
//!
//! ## Design
//!
//! The grid is treated as a capacitated transportation network. There is no
//! impedance, voltage or loss model:
//! - **Buses** carry generation and load; their difference is the net injection.
//! - **Branches** are bidirectional lines sharing one network-wide capacity.
//! - A [`FlowNetwork`] adds a super-source `S` feeding every surplus bus and a
//!   super-sink `T` drained by every deficit bus.
//!
//! The flow network is a `petgraph` arena: nodes and edges are addressed by
//! stable [`NodeIndex`]/[`EdgeIndex`] values, and per-edge solver output
//! ([`FlowAssignment`]) is a dense vector keyed by edge index.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridflow_core::*;
//!
//! let mut network = FlowNetwork::new(Megawatts(5.0));
//! let a = network.ensure_bus(BusId::new(1));
//! let b = network.ensure_bus(BusId::new(2));
//! network.add_transmission_pair(a, b);
//! network.add_supply(a, Megawatts(10.0));
//! network.add_demand(b, Megawatts(10.0));
//!
//! assert_eq!(network.edge_count(), 4);
//! ```
//!
//! ## Modules
//!
//! - [`network`] - the flow network and its statistics
//! - [`flow`] - solver output and decomposed paths
//! - [`diagnostics`] - non-fatal findings
//! - [`error`] - [`GridError`] and [`GridResult`]
//! - [`units`] - [`Megawatts`]

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub mod diagnostics;
pub mod error;
pub mod flow;
pub mod network;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GridError, GridResult};
pub use flow::{FlowAssignment, FlowPath};
pub use network::{EdgeKind, FlowEdge, FlowNetwork, FlowNode, NetworkStats};
pub use petgraph::graph::{EdgeIndex, NodeIndex};
pub use units::Megawatts;

/// Bus index as it appears in the raw bus table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BusId(usize);

impl BusId {
    #[inline]
    pub fn new(value: usize) -> Self {
        BusId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the raw bus table. Several rows may share a name.
///
/// Readings are optional so that a missing value stays distinguishable from a
/// reading of zero until reconciliation decides what to do with it. An empty
/// name marks an unnamed bus; unnamed buses are never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBus {
    pub id: BusId,
    pub name: String,
    pub generation: Option<Megawatts>,
    pub load: Option<Megawatts>,
}

impl RawBus {
    pub fn new(
        id: usize,
        name: impl Into<String>,
        generation: Option<f64>,
        load: Option<f64>,
    ) -> Self {
        Self {
            id: BusId::new(id),
            name: name.into(),
            generation: generation.map(Megawatts),
            load: load.map(Megawatts),
        }
    }
}

/// A reconciled bus: unique name, concrete readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub generation: Megawatts,
    pub load: Megawatts,
}

impl Bus {
    /// Generation minus load. Positive buses feed the super-source side,
    /// negative ones the super-sink side.
    pub fn net_injection(&self) -> Megawatts {
        self.generation - self.load
    }
}

/// A bidirectional transmission line between two buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Branch {
    pub first: BusId,
    pub second: BusId,
}

impl Branch {
    pub fn new(first: BusId, second: BusId) -> Self {
        Self { first, second }
    }

    /// Endpoint pair with the smaller id first, so `(a, b)` and `(b, a)`
    /// compare equal.
    pub fn unordered_key(&self) -> (BusId, BusId) {
        if self.first <= self.second {
            (self.first, self.second)
        } else {
            (self.second, self.first)
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.first == self.second
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

/// Canonical bus table keyed by bus index.
#[derive(Debug, Clone, Default)]
pub struct BusTable {
    buses: BTreeMap<BusId, Bus>,
}

impl BusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bus, returning the previous bus with the same index if any.
    pub fn insert(&mut self, bus: Bus) -> Option<Bus> {
        self.buses.insert(bus.id, bus)
    }

    pub fn get(&self, id: BusId) -> Option<&Bus> {
        self.buses.get(&id)
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// Buses in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = &Bus> {
        self.buses.values()
    }

    pub fn ids(&self) -> BTreeSet<BusId> {
        self.buses.keys().copied().collect()
    }

    pub fn total_generation(&self) -> Megawatts {
        self.buses.values().map(|bus| bus.generation).sum()
    }

    pub fn total_load(&self) -> Megawatts {
        self.buses.values().map(|bus| bus.load).sum()
    }
}

impl FromIterator<Bus> for BusTable {
    fn from_iter<T: IntoIterator<Item = Bus>>(iter: T) -> Self {
        Self {
            buses: iter.into_iter().map(|bus| (bus.id, bus)).collect(),
        }
    }
}

/// Superseded bus index -> canonical bus index.
///
/// Produced once by reconciliation; there is no way to modify it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectMap {
    targets: BTreeMap<BusId, BusId>,
}

impl RedirectMap {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (BusId, BusId)>) -> Self {
        Self {
            targets: pairs.into_iter().collect(),
        }
    }

    /// Canonical index for `id`; ids that were never superseded map to
    /// themselves.
    pub fn resolve(&self, id: BusId) -> BusId {
        self.targets.get(&id).copied().unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BusId, BusId)> + '_ {
        self.targets.iter().map(|(from, to)| (*from, *to))
    }

    /// Rewrite both endpoints of a branch onto canonical buses.
    pub fn rewrite(&self, branch: Branch) -> Branch {
        Branch::new(self.resolve(branch.first), self.resolve(branch.second))
    }
}
