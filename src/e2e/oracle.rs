//! Reference engines the suite checks the engine against.
//!
//! [`SqliteReference`] loads the pipe-separated tables into an in-memory
//! SQLite database and runs each query's SQLite form. [`StoredResults`]
//! replays results captured by an earlier `generator` run.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::e2e::schema::{table_files, table_schema};
use crate::storage::csv::RecordReader;
use crate::storage::FileFormat;
use crate::types::error::{Error, Result};
use crate::types::{Column, OutputSchema, ResultSet, Row, Value};

/// One query as the reference engine sees it.
#[derive(Debug, Clone)]
pub struct ReferenceQuery {
    pub query_type: String,
    pub query_id: String,
    pub sql: String,
}

pub trait ReferenceEngine {
    fn name(&self) -> &str;

    /// Makes `tables` from `data_dir` queryable. Engines that replay stored
    /// results have nothing to load.
    fn load_tables(&mut self, _data_dir: &Path, _tables: &[&str]) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, query: &ReferenceQuery) -> Result<ResultSet>;
}

pub struct SqliteReference {
    conn: Connection,
}

impl SqliteReference {
    pub fn open_in_memory() -> Result<SqliteReference> {
        Ok(SqliteReference {
            conn: Connection::open_in_memory()?,
        })
    }
}

/// Reads a `.psv` file as SQLite parameters. Empty fields become NULL;
/// column affinity turns the rest into numbers where declared.
fn read_fields(path: &Path, width: usize) -> Result<Vec<Vec<SqlValue>>> {
    let mut records = RecordReader::open(path, width)?;
    let mut rows = Vec::new();
    while let Some(record) = records.next_record()? {
        rows.push(
            record
                .iter()
                .map(|field| match field {
                    "" => SqlValue::Null,
                    text => SqlValue::Text(text.to_string()),
                })
                .collect(),
        );
    }
    Ok(rows)
}

fn from_sqlite(value: ValueRef) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Long(i),
        ValueRef::Real(r) => Value::Double(r),
        ValueRef::Text(t) => Value::Str(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Str(String::from_utf8_lossy(b).into_owned()),
    }
}

impl ReferenceEngine for SqliteReference {
    fn name(&self) -> &str {
        "sqlite"
    }

    /// Creates `tables` and fills them from the `.psv` files in `data_dir`,
    /// replacing existing tables of the same name.
    fn load_tables(&mut self, data_dir: &Path, tables: &[&str]) -> Result<()> {
        for table in tables {
            let schema = table_schema(table)?;
            let files = table_files(data_dir, table, FileFormat::Csv)?;
            if files.is_empty() {
                return Err(Error::Harness(format!(
                    "No csv files for table '{}' in {}",
                    table,
                    data_dir.display()
                )));
            }

            let definition = schema
                .columns
                .iter()
                .map(|c| {
                    let data_type = c.data_type.map_or("TEXT", |t| t.sqlite_name());
                    format!("{} {}", c.name, data_type)
                })
                .collect::<Vec<String>>()
                .join(", ");
            self.conn.execute_batch(&format!(
                "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({definition});"
            ))?;

            let placeholders = vec!["?"; schema.len()].join(", ");
            let insert = format!("INSERT INTO {} VALUES ({})", table, placeholders);

            let tx = self.conn.transaction()?;
            let mut loaded = 0usize;
            {
                let mut stmt = tx.prepare(&insert)?;
                for file in &files {
                    for fields in read_fields(file, schema.len())? {
                        stmt.execute(params_from_iter(fields))?;
                        loaded += 1;
                    }
                }
            }
            tx.commit()?;
            tracing::debug!(table = *table, rows = loaded, "loaded reference table");
        }
        Ok(())
    }

    fn run(&mut self, query: &ReferenceQuery) -> Result<ResultSet> {
        let mut stmt = self.conn.prepare(&query.sql)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(Column::untyped)
            .collect::<Vec<Column>>();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sqlite(row.get_ref(i)?));
            }
            rows.push(values);
        }

        Ok(ResultSet::from_rows(OutputSchema::new(columns), rows))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredResult {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// Reference results on disk, one JSON file per query at
/// `<dir>/<query type>/<query id>.json`.
pub struct StoredResults {
    dir: PathBuf,
}

impl StoredResults {
    pub fn new(dir: &Path) -> StoredResults {
        StoredResults {
            dir: dir.to_path_buf(),
        }
    }

    fn path(&self, query: &ReferenceQuery) -> PathBuf {
        self.dir
            .join(&query.query_type)
            .join(format!("{}.json", query.query_id))
    }

    pub fn write(&self, query: &ReferenceQuery, result: &ResultSet) -> Result<PathBuf> {
        let path = self.path(query);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredResult {
            columns: result.column_names(),
            rows: result.rows().cloned().collect(),
        };
        fs::write(&path, serde_json::to_string_pretty(&stored)?)?;
        Ok(path)
    }
}

impl ReferenceEngine for StoredResults {
    fn name(&self) -> &str {
        "stored results"
    }

    fn run(&mut self, query: &ReferenceQuery) -> Result<ResultSet> {
        let path = self.path(query);
        let text = fs::read_to_string(&path).map_err(|e| {
            Error::Harness(format!(
                "No stored result for {} {} at {}: {}",
                query.query_type,
                query.query_id,
                path.display(),
                e
            ))
        })?;
        let stored: StoredResult = serde_json::from_str(&text)?;
        let columns = stored
            .columns
            .iter()
            .map(|name| Column::untyped(name))
            .collect();
        Ok(ResultSet::from_rows(OutputSchema::new(columns), stored.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv;

    fn query(id: &str, sql: &str) -> ReferenceQuery {
        ReferenceQuery {
            query_type: "Timestampdiff".to_string(),
            query_id: id.to_string(),
            sql: sql.to_string(),
        }
    }

    #[test]
    fn sqlite_reads_pipe_separated_tables() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            vec![
                Value::Long(0),
                Value::Str("ALGERIA".into()),
                Value::Long(0),
                Value::Str("final|quiet".into()),
            ],
            vec![
                Value::Long(1),
                Value::Str("ARGENTINA".into()),
                Value::Long(1),
                Value::Null,
            ],
        ];
        csv::write_table(&dir.path().join("nation_0.psv"), &rows).unwrap();

        let mut sqlite = SqliteReference::open_in_memory().unwrap();
        sqlite.load_tables(dir.path(), &["nation"]).unwrap();
        let result = sqlite
            .run(&query(
                "TEST_00",
                "select n_nationkey, n_comment from nation order by n_nationkey",
            ))
            .unwrap();

        assert_eq!(result.column_names(), vec!["n_nationkey", "n_comment"]);
        let rows = result.into_rows();
        assert_eq!(rows[0], vec![Value::Long(0), Value::Str("final|quiet".into())]);
        assert_eq!(rows[1], vec![Value::Long(1), Value::Null]);
    }

    #[test]
    fn stored_results_round_trip_and_report_missing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut stored = StoredResults::new(dir.path());
        let result = ResultSet::from_rows(
            OutputSchema::new(vec![Column::untyped("d")]),
            vec![vec![Value::Str("1995-07-06".into())]],
        );

        let path = stored.write(&query("TEST_04", ""), &result).unwrap();
        assert!(path.ends_with("Timestampdiff/TEST_04.json"));
        let read = stored.run(&query("TEST_04", "")).unwrap();
        assert_eq!(read.into_rows(), result.into_rows());

        let missing = stored.run(&query("TEST_99", "")).unwrap_err();
        assert!(missing.to_string().contains("TEST_99"));
    }
}
