use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::{types::ValueRef, Connection, OpenFlags};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::error::DataSourceError;
use crate::models::{Cell, Column, TabularResult, TypeTag};

/// Executes a query and hands back the full result, column-major.
pub trait DataSource {
    fn execute(&self, query: &str) -> Result<TabularResult, DataSourceError>;
}

impl<F> DataSource for F
where
    F: Fn(&str) -> Result<TabularResult, DataSourceError>,
{
    fn execute(&self, query: &str) -> Result<TabularResult, DataSourceError> {
        self(query)
    }
}

/// Read-only SQLite database. Every `execute` opens its own connection and
/// closes it before returning, on success and on error alike.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, DataSourceError> {
        if !self.path.exists() {
            error!("Database not found at {}", self.path.display());
            return Err(DataSourceError::MissingDatabase(self.path.clone()));
        }

        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DataSourceError::Open {
            path: self.path.clone(),
            source,
        })
    }
}

impl DataSource for SqliteSource {
    fn execute(&self, query: &str) -> Result<TabularResult, DataSourceError> {
        let start = std::time::Instant::now();
        debug!("Executing SQL query: {}", query);

        let conn = self.connect()?;
        let result = run_query(&conn, query);
        drop(conn);

        match &result {
            Ok(table) => debug!(
                "Query returned {} rows x {} columns in {:?}",
                table.row_count(),
                table.column_count(),
                start.elapsed()
            ),
            Err(e) => error!("Query failed: {}", e),
        }
        result
    }
}

fn run_query(conn: &Connection, query: &str) -> Result<TabularResult, DataSourceError> {
    let mut stmt = conn.prepare(query)?;

    let mut seen = HashSet::new();
    let schema: Vec<(String, Option<String>)> = stmt
        .columns()
        .iter()
        .map(|c| {
            (
                unique_column_name(c.name(), &mut seen),
                c.decl_type().map(str::to_string),
            )
        })
        .collect();

    let column_count = schema.len();
    let mut raw: Vec<Vec<Cell>> = vec![Vec::new(); column_count];

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (i, values) in raw.iter_mut().enumerate() {
            let value = match row.get_ref(i)? {
                ValueRef::Null => Cell::Null,
                ValueRef::Integer(v) => Cell::Integer(v),
                ValueRef::Real(f) => Cell::Real(f),
                ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(b) => Cell::Text(blob_label(b)),
            };
            values.push(value);
        }
    }

    let columns = schema
        .into_iter()
        .zip(raw)
        .map(|((name, decl), values)| {
            let tag = match decl.as_deref() {
                Some(decl) => tag_from_decl(decl),
                None => tag_from_values(&values),
            };
            Column::new(name, tag, coerce(tag, values))
        })
        .collect();

    Ok(TabularResult::new(columns)?)
}

/// Joins routinely return the same name twice (`a.id`, `b.id`); later
/// copies get a numeric suffix.
pub fn unique_column_name(name: &str, seen: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut counter = 1;
    while !seen.insert(candidate.clone()) {
        candidate = format!("{}_{}", name, counter);
        counter += 1;
    }
    candidate
}

/// Blobs are profiled as categories keyed by their content.
fn blob_label(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("<blob {} bytes {:016x}>", bytes.len(), hasher.finish())
}

/// SQLite affinity rules, with date/time names checked first.
pub fn tag_from_decl(decl: &str) -> TypeTag {
    let decl = decl.to_ascii_uppercase();
    if decl.contains("DATE") || decl.contains("TIME") {
        TypeTag::Temporal
    } else if decl.contains("BOOL") {
        TypeTag::Boolean
    } else if decl.contains("INT") {
        TypeTag::Integer
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        TypeTag::Text
    } else if decl.contains("BLOB") || decl.is_empty() {
        TypeTag::Blob
    } else {
        TypeTag::Real
    }
}

/// Expression columns carry no declared type; fall back to the storage
/// classes present in the result.
pub fn tag_from_values(values: &[Cell]) -> TypeTag {
    let mut saw_value = false;
    let mut saw_real = false;
    for value in values {
        match value {
            Cell::Null => {}
            Cell::Integer(_) => saw_value = true,
            Cell::Real(_) => {
                saw_value = true;
                saw_real = true;
            }
            _ => return TypeTag::Text,
        }
    }

    match (saw_value, saw_real) {
        (false, _) => TypeTag::Text,
        (true, false) => TypeTag::Integer,
        (true, true) => TypeTag::Real,
    }
}

fn coerce(tag: TypeTag, values: Vec<Cell>) -> Vec<Cell> {
    match tag {
        TypeTag::Temporal => values.into_iter().map(to_temporal).collect(),
        TypeTag::Boolean => values
            .into_iter()
            .map(|v| match v {
                Cell::Integer(i) => Cell::Boolean(i != 0),
                other => other,
            })
            .collect(),
        // SQLite may keep numeric-looking text in a numeric column; the
        // profiler decides whether that is acceptable.
        TypeTag::Integer | TypeTag::Real | TypeTag::Text | TypeTag::Blob => values,
    }
}

/// Integers are Unix seconds. Text that matches no known format is kept
/// as text.
fn to_temporal(value: Cell) -> Cell {
    match value {
        Cell::Integer(secs) => DateTime::from_timestamp(secs, 0)
            .map(|dt| Cell::Temporal(dt.naive_utc()))
            .unwrap_or(Cell::Integer(secs)),
        Cell::Text(s) => parse_timestamp(&s).map_or(Cell::Text(s), Cell::Temporal),
        other => other,
    }
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 7] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.fZ",
    ];
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
