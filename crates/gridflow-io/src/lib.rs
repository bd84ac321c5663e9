//! # gridflow-io: grid table ingestion
//!
//! Reads the bus and branch tables that describe a regional transmission grid.
//! Readers do no reconciliation: duplicate bus names, missing readings and
//! repeated branches are passed through untouched so that
//! `gridflow-algo` can apply one documented policy to them. Repairs made here
//! (skipped blank rows, unnamed buses) are reported through
//! [`gridflow_core::Diagnostics`].
//!
//! ```rust,no_run
//! use gridflow_io::importers::{load_grid_tables, GridSource};
//!
//! let tables = load_grid_tables(&GridSource::new("NewYorkElectricGrid"))?;
//! println!("{} bus rows, {} branch rows", tables.buses.len(), tables.branches.len());
//! # Ok::<(), gridflow_core::GridError>(())
//! ```

pub mod importers;

pub use importers::{load_grid_tables, read_branch_table, read_bus_table, GridSource, GridTables};
