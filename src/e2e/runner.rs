//! Runs one query against the engine and the reference engine, records the
//! outcome and writes the run log.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::database::Database;
use crate::e2e::compare::{compare_results, CompareOptions};
use crate::e2e::config::{ExecutionMode, Settings};
use crate::e2e::oracle::{ReferenceEngine, ReferenceQuery, SqliteReference, StoredResults};
use crate::e2e::schema;
use crate::storage::FileFormat;
use crate::types::error::Result;

/// A single test query with its comparison settings.
#[derive(Debug, Clone)]
pub struct QueryCase {
    pub id: String,
    pub query: String,
    /// The same query in the reference engine's dialect, when it differs.
    pub reference_query: Option<String>,
    pub worder: bool,
    pub order_by: Option<String>,
    pub acceptable_difference: f64,
    pub use_percentage: bool,
}

impl QueryCase {
    pub fn new(id: &str, query: &str) -> QueryCase {
        let options = CompareOptions::default();
        QueryCase {
            id: id.to_string(),
            query: query.to_string(),
            reference_query: None,
            worder: options.worder,
            order_by: options.order_by,
            acceptable_difference: options.acceptable_difference,
            use_percentage: options.use_percentage,
        }
    }

    pub fn with_reference(mut self, query: &str) -> QueryCase {
        self.reference_query = Some(query.to_string());
        self
    }

    fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            worder: self.worder,
            order_by: self.order_by.clone(),
            acceptable_difference: self.acceptable_difference,
            use_percentage: self.use_percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
    /// The engine returned an error.
    Crash,
    /// The reference engine returned an error.
    Error,
    Generated,
    Executed,
}

impl Status {
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Fail | Status::Crash | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Status::Success => "success",
            Status::Fail => "fail",
            Status::Crash => "crash",
            Status::Error => "error",
            Status::Generated => "generated",
            Status::Executed => "executed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestRecord {
    pub query_type: String,
    pub query_id: String,
    pub file_format: FileFormat,
    pub status: Status,
    pub message: Option<String>,
    pub elapsed_ms: Option<f64>,
    pub rows: Option<usize>,
}

#[derive(Serialize)]
struct RunLog<'a> {
    query_type: &'a str,
    execution_mode: ExecutionMode,
    finished_at: String,
    summary: BTreeMap<Status, usize>,
    records: Vec<&'a TestRecord>,
}

pub struct Runner {
    settings: Settings,
    engine: Database,
    reference: Option<Box<dyn ReferenceEngine>>,
    store: Option<StoredResults>,
    loaded: HashSet<String>,
    log: Vec<TestRecord>,
}

impl Runner {
    /// Builds the engine and the reference engine the configured mode needs.
    pub fn new(settings: Settings) -> Result<Runner> {
        let results = &settings.test.results_directory;
        let reference: Option<Box<dyn ReferenceEngine>> = if !settings.uses_reference() {
            None
        } else if settings.run.execution_mode == ExecutionMode::Ci {
            Some(Box::new(StoredResults::new(results)))
        } else {
            Some(Box::new(SqliteReference::open_in_memory()?))
        };
        let store = (settings.run.execution_mode == ExecutionMode::Generator)
            .then(|| StoredResults::new(results));

        tracing::info!(
            mode = %settings.run.execution_mode,
            reference = reference.as_ref().map_or("none", |r| r.name()),
            "starting e2e run"
        );
        Ok(Runner {
            settings,
            engine: Database::new(),
            reference,
            store,
            loaded: HashSet::new(),
            log: Vec::new(),
        })
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.log
    }

    pub fn failures(&self) -> usize {
        self.log.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Registers `tables` in `format` with the engine and makes sure the
    /// reference engine has them too.
    pub fn create_tables(&mut self, format: FileFormat, tables: &[&str]) -> Result<()> {
        let data_dir = self.settings.test.data_directory.clone();
        if self.settings.run.execution_mode != ExecutionMode::Generator {
            schema::create_tables(&mut self.engine, &data_dir, format, tables)?;
        }

        let missing = tables
            .iter()
            .copied()
            .filter(|t| !self.loaded.contains(*t))
            .collect::<Vec<&str>>();
        if let Some(reference) = self.reference.as_mut() {
            if !missing.is_empty() {
                reference.load_tables(&data_dir, &missing)?;
            }
        }
        self.loaded.extend(missing.iter().map(|t| t.to_string()));
        Ok(())
    }

    /// Runs `case` and records the outcome.
    pub fn run_query(&mut self, case: &QueryCase, query_type: &str, file_format: FileFormat) {
        let query = ReferenceQuery {
            query_type: query_type.to_string(),
            query_id: case.id.clone(),
            sql: case
                .reference_query
                .clone()
                .unwrap_or_else(|| case.query.clone()),
        };

        let mut record = TestRecord {
            query_type: query_type.to_string(),
            query_id: case.id.clone(),
            file_format,
            status: Status::Executed,
            message: None,
            elapsed_ms: None,
            rows: None,
        };

        if self.settings.run.execution_mode == ExecutionMode::Generator {
            self.generate(&query, &mut record);
        } else {
            self.check(case, &query, &mut record);
        }

        match record.status {
            Status::Success | Status::Generated | Status::Executed => tracing::info!(
                query_type,
                id = %record.query_id,
                format = %file_format,
                status = %record.status,
                "query finished"
            ),
            _ => tracing::warn!(
                query_type,
                id = %record.query_id,
                format = %file_format,
                status = %record.status,
                message = record.message.as_deref().unwrap_or(""),
                "query failed"
            ),
        }
        self.log.push(record);
    }

    fn generate(&mut self, query: &ReferenceQuery, record: &mut TestRecord) {
        let (Some(reference), Some(store)) = (self.reference.as_mut(), self.store.as_ref()) else {
            record.status = Status::Error;
            record.message = Some("generator mode needs a reference engine".to_string());
            return;
        };

        match reference.run(query).and_then(|expected| {
            let rows = expected.row_count();
            store.write(query, &expected).map(|path| (rows, path))
        }) {
            Ok((rows, path)) => {
                record.status = Status::Generated;
                record.rows = Some(rows);
                record.message = Some(path.display().to_string());
            }
            Err(e) => {
                record.status = Status::Error;
                record.message = Some(e.to_string());
            }
        }
    }

    fn check(&mut self, case: &QueryCase, query: &ReferenceQuery, record: &mut TestRecord) {
        let start = Instant::now();
        let actual = self.engine.execute(&case.query);
        record.elapsed_ms = Some(start.elapsed().as_secs_f64() * 1000.0);

        let actual = match actual {
            Ok(actual) => actual,
            Err(e) => {
                record.status = Status::Crash;
                record.message = Some(e.to_string());
                return;
            }
        };
        record.rows = Some(actual.row_count());

        let Some(reference) = self.reference.as_mut() else {
            record.status = Status::Executed;
            return;
        };
        let expected = match reference.run(query) {
            Ok(expected) => expected,
            Err(e) => {
                record.status = Status::Error;
                record.message = Some(format!("{}: {}", reference.name(), e));
                return;
            }
        };

        match compare_results(&expected, &actual, &case.compare_options()) {
            Ok(()) => record.status = Status::Success,
            Err(mismatch) => {
                record.status = Status::Fail;
                record.message = Some(mismatch.to_string());
            }
        }
    }

    fn summary(records: &[&TestRecord]) -> BTreeMap<Status, usize> {
        let mut summary = BTreeMap::new();
        for record in records {
            *summary.entry(record.status).or_insert(0) += 1;
        }
        summary
    }

    /// Writes one JSON log per query type under the log directory and prints
    /// a summary table.
    pub fn save_log(&self) -> Result<Vec<PathBuf>> {
        let log_dir = &self.settings.test.log_directory;
        fs::create_dir_all(log_dir)?;
        let stamp = Utc::now();

        let mut query_types = self
            .log
            .iter()
            .map(|r| r.query_type.as_str())
            .collect::<Vec<&str>>();
        query_types.sort_unstable();
        query_types.dedup();

        let mut paths = Vec::new();
        for query_type in query_types {
            let records = self
                .log
                .iter()
                .filter(|r| r.query_type == query_type)
                .collect::<Vec<&TestRecord>>();
            let log = RunLog {
                query_type,
                execution_mode: self.settings.run.execution_mode,
                finished_at: stamp.to_rfc3339(),
                summary: Self::summary(&records),
                records,
            };
            let path = log_path(log_dir, query_type, &stamp.format("%Y%m%dT%H%M%SZ").to_string());
            fs::write(&path, serde_json::to_string_pretty(&log)?)?;
            tracing::info!(path = %path.display(), "saved run log");
            paths.push(path);
        }

        println!("{}", self.summary_table());
        Ok(paths)
    }

    pub fn summary_table(&self) -> String {
        let mut builder = Builder::default();
        builder.set_header(["query type", "id", "format", "status", "ms", "message"]);
        for record in &self.log {
            builder.push_record([
                record.query_type.clone(),
                record.query_id.clone(),
                record.file_format.to_string(),
                record.status.to_string(),
                record
                    .elapsed_ms
                    .map_or(String::new(), |ms| format!("{:.1}", ms)),
                record.message.clone().unwrap_or_default(),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        table.to_string()
    }
}

fn log_path(log_dir: &Path, query_type: &str, stamp: &str) -> PathBuf {
    log_dir.join(format!("{}-{}.json", query_type, stamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Crash).unwrap(), "\"crash\"");
        assert!(Status::Error.is_failure());
        assert!(!Status::Generated.is_failure());
    }

    #[test]
    fn engine_errors_are_recorded_as_crashes() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.run.compare_results = false;
        settings.test.log_directory = dir.path().to_path_buf();

        let mut runner = Runner::new(settings).unwrap();
        runner.run_query(
            &QueryCase::new("TEST_01", "select * from missing"),
            "Timestampdiff",
            FileFormat::Csv,
        );
        runner.run_query(&QueryCase::new("TEST_02", "select 1"), "Timestampdiff", FileFormat::Csv);

        assert_eq!(runner.records()[0].status, Status::Crash);
        assert_eq!(runner.records()[1].status, Status::Executed);
        assert_eq!(runner.failures(), 1);

        let paths = runner.save_log().unwrap();
        assert_eq!(paths.len(), 1);
        let text = fs::read_to_string(&paths[0]).unwrap();
        let log: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(log["summary"]["crash"], 1);
        assert_eq!(log["records"][1]["query_id"], "TEST_02");
    }
}
