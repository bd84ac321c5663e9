//! CSV readers for the bus and branch tables.
//!
//! Bus table layout (one title line precedes the header in the NYISO export):
//!
//! ```csv
//! NYISO bus table
//! Number,Name,Gen MW,Load MW
//! 1,ALBANY,120,
//! 2,BUFFALO,,80
//! ```
//!
//! The first column is the bus index. `Gen MW`, `Load MW` and `Name` are
//! located by header, trimmed and case-insensitive. Empty cells and `nan`/`NA`
//! markers are missing readings, kept distinct from `0`.
//!
//! Branch table layout:
//!
//! ```csv
//!  first bus number, second bus number
//! 1,2
//! ```

use csv::{ReaderBuilder, StringRecord, Trim};
use gridflow_core::{Branch, BusId, Diagnostics, GridError, GridResult, Megawatts, RawBus};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const GEN_COLUMN: &str = "gen mw";
const LOAD_COLUMN: &str = "load mw";
const NAME_COLUMN: &str = "name";
const FIRST_BUS_COLUMN: &str = "first bus number";
const SECOND_BUS_COLUMN: &str = "second bus number";

/// Where the two grid tables live and how they are laid out.
#[derive(Debug, Clone)]
pub struct GridSource {
    pub dir: PathBuf,
    pub buses_file: String,
    pub branches_file: String,
    /// Lines before the bus table header
    pub bus_preamble_rows: usize,
    /// Lines before the branch table header
    pub branch_preamble_rows: usize,
}

impl GridSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn buses_path(&self) -> PathBuf {
        self.dir.join(&self.buses_file)
    }

    pub fn branches_path(&self) -> PathBuf {
        self.dir.join(&self.branches_file)
    }
}

impl Default for GridSource {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            buses_file: "nyisobuses.csv".to_string(),
            branches_file: "nyisobranches.csv".to_string(),
            bus_preamble_rows: 1,
            branch_preamble_rows: 0,
        }
    }
}

/// Raw tables as read from disk, before reconciliation.
#[derive(Debug, Clone, Default)]
pub struct GridTables {
    pub buses: Vec<RawBus>,
    pub branches: Vec<Branch>,
    pub diagnostics: Diagnostics,
}

/// Read both tables described by `source`.
pub fn load_grid_tables(source: &GridSource) -> GridResult<GridTables> {
    let mut diagnostics = Diagnostics::new();

    let buses_path = source.buses_path();
    let buses = read_bus_table(
        open_table(&buses_path)?,
        source.bus_preamble_rows,
        &mut diagnostics,
    )
    .map_err(|err| with_path(err, &buses_path))?;

    let branches_path = source.branches_path();
    let branches = read_branch_table(
        open_table(&branches_path)?,
        source.branch_preamble_rows,
        &mut diagnostics,
    )
    .map_err(|err| with_path(err, &branches_path))?;

    Ok(GridTables {
        buses,
        branches,
        diagnostics,
    })
}

/// Parse the bus table. `preamble_rows` lines are skipped before the header.
pub fn read_bus_table<R: Read>(
    reader: R,
    preamble_rows: usize,
    diagnostics: &mut Diagnostics,
) -> GridResult<Vec<RawBus>> {
    let text = read_text(reader)?;
    let mut rdr = csv_reader(strip_preamble(&text, preamble_rows));

    let headers = rdr
        .headers()
        .map_err(|err| GridError::Parse(format!("reading bus table header: {err}")))?
        .clone();
    if headers.is_empty() {
        return Err(GridError::Parse("bus table has no header".to_string()));
    }
    let columns = column_index(&headers);
    let gen_col = require_column(&columns, GEN_COLUMN, "bus")?;
    let load_col = require_column(&columns, LOAD_COLUMN, "bus")?;
    let name_col = require_column(&columns, NAME_COLUMN, "bus")?;

    let mut buses = Vec::new();
    let mut seen = HashSet::new();
    for result in rdr.records() {
        let record =
            result.map_err(|err| GridError::Parse(format!("reading bus record: {err}")))?;
        let line = record_line(&record, preamble_rows);
        if is_blank(&record) {
            diagnostics.add_warning_at_line("parse", "blank bus row skipped", line);
            continue;
        }

        let id = parse_bus_id(record.get(0).unwrap_or(""))
            .map_err(|msg| GridError::Parse(format!("bus index at line {line}: {msg}")))?;
        if !seen.insert(id) {
            return Err(GridError::Parse(format!(
                "bus index {id} appears more than once (line {line})"
            )));
        }

        let generation = parse_reading(record.get(gen_col).unwrap_or(""))
            .map_err(|msg| GridError::Parse(format!("{GEN_COLUMN} at line {line}: {msg}")))?;
        let load = parse_reading(record.get(load_col).unwrap_or(""))
            .map_err(|msg| GridError::Parse(format!("{LOAD_COLUMN} at line {line}: {msg}")))?;

        let name = record.get(name_col).map(str::trim).unwrap_or("").to_string();
        if name.is_empty() {
            diagnostics.add_warning_at_line(
                "parse",
                &format!("bus {id} has no name; it will not be merged with any other bus"),
                line,
            );
        }

        buses.push(RawBus {
            id,
            name,
            generation,
            load,
        });
    }

    Ok(buses)
}

/// Parse the branch table. `preamble_rows` lines are skipped before the header.
pub fn read_branch_table<R: Read>(
    reader: R,
    preamble_rows: usize,
    diagnostics: &mut Diagnostics,
) -> GridResult<Vec<Branch>> {
    let text = read_text(reader)?;
    let mut rdr = csv_reader(strip_preamble(&text, preamble_rows));

    let headers = rdr
        .headers()
        .map_err(|err| GridError::Parse(format!("reading branch table header: {err}")))?
        .clone();
    let columns = column_index(&headers);
    let first_col = require_column(&columns, FIRST_BUS_COLUMN, "branch")?;
    let second_col = require_column(&columns, SECOND_BUS_COLUMN, "branch")?;

    let mut branches = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|err| GridError::Parse(format!("reading branch record: {err}")))?;
        let line = record_line(&record, preamble_rows);
        if is_blank(&record) {
            diagnostics.add_warning_at_line("parse", "blank branch row skipped", line);
            continue;
        }

        let first = parse_bus_id(record.get(first_col).unwrap_or("")).map_err(|msg| {
            GridError::Parse(format!("{FIRST_BUS_COLUMN} at line {line}: {msg}"))
        })?;
        let second = parse_bus_id(record.get(second_col).unwrap_or("")).map_err(|msg| {
            GridError::Parse(format!("{SECOND_BUS_COLUMN} at line {line}: {msg}"))
        })?;
        branches.push(Branch::new(first, second));
    }

    Ok(branches)
}

fn open_table(path: &Path) -> GridResult<File> {
    File::open(path).map_err(|err| {
        GridError::Io(std::io::Error::new(
            err.kind(),
            format!("opening {}: {err}", path.display()),
        ))
    })
}

fn with_path(err: GridError, path: &Path) -> GridError {
    match err {
        GridError::Parse(msg) => GridError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    }
}

fn read_text<R: Read>(mut reader: R) -> GridResult<String> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes())
}

/// Drop the first `rows` lines of `text`.
fn strip_preamble(text: &str, rows: usize) -> &str {
    let mut rest = text;
    for _ in 0..rows {
        match rest.find('\n') {
            Some(end) => rest = &rest[end + 1..],
            None => return "",
        }
    }
    rest
}

fn column_index(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.trim().to_ascii_lowercase(), index))
        .collect()
}

fn require_column(columns: &HashMap<String, usize>, name: &str, table: &str) -> GridResult<usize> {
    columns
        .get(name)
        .copied()
        .ok_or_else(|| GridError::Parse(format!("{table} table is missing column '{name}'")))
}

fn record_line(record: &StringRecord, preamble_rows: usize) -> usize {
    record
        .position()
        .map(|pos| pos.line() as usize + preamble_rows)
        .unwrap_or(0)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Bus indices are integers, sometimes exported as integral floats (`12.0`).
fn parse_bus_id(field: &str) -> Result<BusId, String> {
    let field = field.trim();
    if let Ok(value) = field.parse::<usize>() {
        return Ok(BusId::new(value));
    }
    match field.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
            Ok(BusId::new(value as usize))
        }
        _ => Err(format!("'{field}' is not a bus index")),
    }
}

/// A generation or load reading; `None` when the cell holds no measurement.
fn parse_reading(field: &str) -> Result<Option<Megawatts>, String> {
    let field = field.trim();
    if field.is_empty()
        || field.eq_ignore_ascii_case("nan")
        || field.eq_ignore_ascii_case("na")
        || field.eq_ignore_ascii_case("null")
    {
        return Ok(None);
    }
    let value: f64 = field
        .parse()
        .map_err(|_| format!("'{field}' is not a number"))?;
    if value.is_nan() {
        Ok(None)
    } else if value.is_finite() {
        Ok(Some(Megawatts(value)))
    } else {
        Err(format!("'{field}' is not finite"))
    }
}
