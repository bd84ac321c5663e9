//! Duplicate-bus reconciliation.
//!
//! Bus exports repeat a substation under several indices when it is split
//! across voltage levels or data sources. Rows sharing a name are folded into
//! the numerically-first index of the group:
//!
//! ```text
//!   raw                                   canonical
//!   3  A  gen 0     load 5        ──►     3  A  gen 10  load 5
//!   7  A  gen 10    load 0                redirect 7 → 3
//! ```
//!
//! Merged readings are the mean of the group's non-zero, non-missing values.
//! A zero reading is treated as "no measurement" whenever the group has a real
//! one; a group with no real readings at all merges to exactly zero.

use gridflow_core::{
    Bus, BusId, BusTable, Diagnostics, GridError, GridResult, Megawatts, RawBus, RedirectMap,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Output of [`reconcile_buses`].
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// One bus per distinct name, keyed by canonical index
    pub buses: BusTable,
    /// Superseded index -> canonical index
    pub redirects: RedirectMap,
    pub diagnostics: Diagnostics,
}

/// Merge raw bus rows that share a name.
///
/// Rows are ordered by raw index before grouping, so the canonical index of a
/// group never depends on the order the rows were supplied in. Two rows with
/// the same raw index are a [`GridError::DataIntegrity`] error.
pub fn reconcile_buses(raw: &[RawBus]) -> GridResult<Reconciliation> {
    let mut ordered: Vec<&RawBus> = raw.iter().collect();
    ordered.sort_by_key(|bus| bus.id);

    if let Some(pair) = ordered.windows(2).find(|pair| pair[0].id == pair[1].id) {
        return Err(GridError::DataIntegrity(format!(
            "bus index {} appears more than once in the raw bus table ('{}' and '{}')",
            pair[0].id, pair[0].name, pair[1].name
        )));
    }

    let mut groups: BTreeMap<GroupKey<'_>, Vec<&RawBus>> = BTreeMap::new();
    for bus in &ordered {
        groups.entry(GroupKey::of(bus)).or_default().push(bus);
    }

    let mut buses = BusTable::new();
    let mut redirects = Vec::new();
    let mut diagnostics = Diagnostics::new();
    let mut defaulted = 0usize;

    for members in groups.into_values() {
        let canonical = members[0];
        let name = canonical.name.trim();

        let (generation, load) = if members.len() > 1 {
            let superseded: Vec<BusId> = members[1..].iter().map(|bus| bus.id).collect();
            redirects.extend(superseded.iter().map(|id| (*id, canonical.id)));
            diagnostics.add_warning_with_entity(
                "reconcile",
                &format!(
                    "merged {} records named '{}' (superseded: {})",
                    members.len(),
                    name,
                    join_ids(&superseded)
                ),
                &format!("bus {}", canonical.id),
            );
            (
                merge_readings(members.iter().map(|bus| bus.generation)),
                merge_readings(members.iter().map(|bus| bus.load)),
            )
        } else {
            defaulted += usize::from(canonical.generation.is_none());
            defaulted += usize::from(canonical.load.is_none());
            (
                canonical.generation.unwrap_or(Megawatts::ZERO),
                canonical.load.unwrap_or(Megawatts::ZERO),
            )
        };

        buses.insert(Bus {
            id: canonical.id,
            name: name.to_string(),
            generation,
            load,
        });
    }

    if defaulted > 0 {
        diagnostics.add_warning(
            "reconcile",
            &format!("{defaulted} missing generation/load readings defaulted to 0 MW"),
        );
    }

    debug!(
        raw = raw.len(),
        canonical = buses.len(),
        superseded = redirects.len(),
        "reconciled bus table"
    );

    Ok(Reconciliation {
        buses,
        redirects: RedirectMap::from_pairs(redirects),
        diagnostics,
    })
}

/// Rows group by trimmed name. A row without a name stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey<'a> {
    Named(&'a str),
    Unnamed(BusId),
}

impl<'a> GroupKey<'a> {
    fn of(bus: &'a RawBus) -> Self {
        match bus.name.trim() {
            "" => GroupKey::Unnamed(bus.id),
            name => GroupKey::Named(name),
        }
    }
}

/// Mean of the readings that are present and non-zero; zero when there are
/// none.
pub fn merge_readings(readings: impl IntoIterator<Item = Option<Megawatts>>) -> Megawatts {
    let mut sum = 0.0;
    let mut count = 0usize;
    for reading in readings.into_iter().flatten() {
        let value = reading.value();
        if value != 0.0 && !value.is_nan() {
            sum += value;
            count += 1;
        }
    }
    if count == 0 {
        Megawatts::ZERO
    } else {
        Megawatts(sum / count as f64)
    }
}

fn join_ids(ids: &[BusId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_duplicate_pair_into_first_index() {
        let raw = vec![
            RawBus::new(7, "A", Some(10.0), Some(0.0)),
            RawBus::new(3, "A", Some(0.0), Some(5.0)),
        ];
        let result = reconcile_buses(&raw).unwrap();

        assert_eq!(result.buses.len(), 1);
        let bus = result.buses.get(BusId::new(3)).unwrap();
        assert_eq!(bus.generation, Megawatts(10.0));
        assert_eq!(bus.load, Megawatts(5.0));
        assert!(result.buses.get(BusId::new(7)).is_none());
        assert_eq!(result.redirects.resolve(BusId::new(7)), BusId::new(3));
        assert_eq!(result.redirects.len(), 1);
    }

    #[test]
    fn mean_excludes_zero_and_missing() {
        let raw = vec![
            RawBus::new(1, "HUB", Some(30.0), None),
            RawBus::new(2, "HUB", None, Some(6.0)),
            RawBus::new(5, "HUB", Some(0.0), Some(2.0)),
            RawBus::new(9, "HUB", Some(60.0), Some(0.0)),
        ];
        let result = reconcile_buses(&raw).unwrap();
        let hub = result.buses.get(BusId::new(1)).unwrap();

        assert_eq!(hub.generation, Megawatts(45.0));
        assert_eq!(hub.load, Megawatts(4.0));
        let superseded: Vec<usize> = result.redirects.iter().map(|(from, _)| from.value()).collect();
        assert_eq!(superseded, vec![2, 5, 9]);
    }

    #[test]
    fn all_zero_group_merges_to_zero_not_nan() {
        let raw = vec![
            RawBus::new(4, "IDLE", Some(0.0), None),
            RawBus::new(8, "IDLE", None, Some(0.0)),
        ];
        let result = reconcile_buses(&raw).unwrap();
        let bus = result.buses.get(BusId::new(4)).unwrap();

        assert_eq!(bus.generation, Megawatts::ZERO);
        assert_eq!(bus.load, Megawatts::ZERO);
        assert!(!bus.generation.value().is_nan());
    }

    #[test]
    fn singletons_default_missing_to_zero() {
        let raw = vec![
            RawBus::new(1, "A", Some(12.0), None),
            RawBus::new(2, "B", None, Some(3.0)),
        ];
        let result = reconcile_buses(&raw).unwrap();

        assert_eq!(result.buses.get(BusId::new(1)).unwrap().load, Megawatts::ZERO);
        assert_eq!(
            result.buses.get(BusId::new(2)).unwrap().generation,
            Megawatts::ZERO
        );
        assert!(result.redirects.is_empty());
        assert_eq!(result.diagnostics.issues_by_category("reconcile").count(), 1);
    }

    #[test]
    fn canonical_index_independent_of_input_order() {
        let forward = vec![
            RawBus::new(2, "X", Some(1.0), None),
            RawBus::new(11, "X", Some(3.0), None),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let a = reconcile_buses(&forward).unwrap();
        let b = reconcile_buses(&backward).unwrap();
        assert_eq!(a.redirects, b.redirects);
        assert!(a.buses.get(BusId::new(2)).is_some());
        assert!(b.buses.get(BusId::new(2)).is_some());
    }

    #[test]
    fn unnamed_buses_are_never_merged() {
        let raw = vec![
            RawBus::new(4, "", Some(5.0), None),
            RawBus::new(5, "bus 4", None, Some(2.0)),
            RawBus::new(6, "  ", Some(1.0), None),
        ];
        let result = reconcile_buses(&raw).unwrap();

        assert_eq!(result.buses.len(), 3);
        assert!(result.redirects.is_empty());
        assert_eq!(result.buses.get(BusId::new(4)).unwrap().generation, Megawatts(5.0));
        assert_eq!(result.buses.get(BusId::new(5)).unwrap().name, "bus 4");
    }

    #[test]
    fn repeated_raw_index_is_data_integrity_error() {
        let raw = vec![
            RawBus::new(1, "A", Some(1.0), None),
            RawBus::new(1, "B", None, Some(1.0)),
        ];
        let err = reconcile_buses(&raw).unwrap_err();
        assert!(matches!(err, GridError::DataIntegrity(_)));
    }

    #[test]
    fn merge_readings_edge_cases() {
        assert_eq!(merge_readings(Vec::<Option<Megawatts>>::new()), Megawatts::ZERO);
        assert_eq!(merge_readings([None, Some(Megawatts(0.0))]), Megawatts::ZERO);
        assert_eq!(
            merge_readings([Some(Megawatts(-4.0)), Some(Megawatts(2.0))]),
            Megawatts(-1.0)
        );
    }
}
