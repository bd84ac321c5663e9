//! Optional `gridflow.toml` configuration.
//!
//! ```toml
//! [data]
//! dir = "NewYorkElectricGrid"
//! bus_preamble_rows = 1
//!
//! [solver]
//! default = "dinic"
//! tolerance = 1e-6
//! ```
//!
//! Every field has a default; command-line flags override file values.

use gridflow_core::{GridError, GridResult};
use gridflow_io::GridSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "gridflow.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GridflowConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Where the grid tables live and how they are laid out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_buses_file")]
    pub buses_file: String,
    #[serde(default = "default_branches_file")]
    pub branches_file: String,
    /// Lines before the bus table header
    #[serde(default = "default_bus_preamble_rows")]
    pub bus_preamble_rows: usize,
    /// Lines before the branch table header
    #[serde(default)]
    pub branch_preamble_rows: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            buses_file: default_buses_file(),
            branches_file: default_branches_file(),
            bus_preamble_rows: default_bus_preamble_rows(),
            branch_preamble_rows: 0,
        }
    }
}

impl DataConfig {
    /// Table locations, with `dir` replaced by `override_dir` when given.
    pub fn grid_source(&self, override_dir: Option<&Path>) -> GridSource {
        GridSource {
            dir: override_dir.map_or_else(|| self.dir.clone(), Path::to_path_buf),
            buses_file: self.buses_file.clone(),
            branches_file: self.branches_file.clone(),
            bus_preamble_rows: self.bus_preamble_rows,
            branch_preamble_rows: self.branch_preamble_rows,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_buses_file() -> String {
    "nyisobuses.csv".to_string()
}

fn default_branches_file() -> String {
    "nyisobranches.csv".to_string()
}

fn default_bus_preamble_rows() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverConfig {
    /// Max-flow solver used when `--solver` is not given
    #[serde(default = "default_solver")]
    pub default: String,
    /// Tolerance used when `--tolerance` is not given (MW)
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            default: default_solver(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_solver() -> String {
    "dinic".to_string()
}

fn default_tolerance() -> f64 {
    gridflow_algo::DEFAULT_TOLERANCE
}

/// Load `path`, or `./gridflow.toml` when it exists, or the defaults.
///
/// An unreadable or malformed file is a [`GridError::Config`].
pub fn load_config(path: Option<&Path>) -> GridResult<GridflowConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !local.exists() {
                return Ok(GridflowConfig::default());
            }
            local
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|err| {
        GridError::Config(format!("reading config file {}: {err}", path.display()))
    })?;
    toml::from_str(&contents).map_err(|err| {
        GridError::Config(format!("parsing config file {}: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_gives_defaults() {
        let config: GridflowConfig = toml::from_str("").unwrap();
        assert_eq!(config, GridflowConfig::default());
        assert_eq!(config.data.bus_preamble_rows, 1);
        assert_eq!(config.solver.default, "dinic");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: GridflowConfig = toml::from_str(
            r#"
            [data]
            dir = "grid"

            [solver]
            tolerance = 0.001
            "#,
        )
        .unwrap();
        assert_eq!(config.data.dir, PathBuf::from("grid"));
        assert_eq!(config.data.buses_file, "nyisobuses.csv");
        assert_eq!(config.solver.tolerance, 0.001);
        assert_eq!(config.solver.default, "dinic");
    }

    #[test]
    fn load_reports_bad_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gridflow.toml");
        std::fs::write(&path, "[solver]\ntolerance = \"tight\"\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
        assert!(err.to_string().contains("parsing config file"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: reading config file"));
    }

    #[test]
    fn data_dir_override() {
        let data = DataConfig::default();
        let source = data.grid_source(Some(Path::new("/data/grid")));
        assert_eq!(source.dir, PathBuf::from("/data/grid"));
        assert_eq!(source.bus_preamble_rows, 1);
        assert_eq!(data.grid_source(None).dir, PathBuf::from("."));
    }
}
