use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::error::{Error, Result};
use crate::types::{Chunk, OutputSchema};

pub mod csv;
pub mod parquet;

use self::csv::CsvReader;
use self::parquet::ParquetReader;

pub const CHUNK_SIZE: usize = 1024;

pub trait StorageReader {
    fn next_chunk(&mut self) -> Result<Chunk>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Parquet,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "psv",
            FileFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Parquet => write!(f, "parquet"),
        }
    }
}

/// Files backing one table, all of the same format.
#[derive(Debug, Clone)]
pub struct TableSource {
    pub format: FileFormat,
    pub files: Vec<PathBuf>,
    pub schema: OutputSchema,
}

impl TableSource {
    /// Pipe-separated files carry no types, so the caller supplies the schema.
    pub fn csv(files: Vec<PathBuf>, schema: OutputSchema) -> Result<TableSource> {
        if files.is_empty() {
            return Err(Error::Storage("A table needs at least one file".to_string()));
        }
        Ok(TableSource {
            format: FileFormat::Csv,
            files,
            schema,
        })
    }

    pub fn parquet(files: Vec<PathBuf>) -> Result<TableSource> {
        let first = files
            .first()
            .ok_or_else(|| Error::Storage("A table needs at least one file".to_string()))?;
        let schema = ParquetReader::read_metadata(first)?;
        Ok(TableSource {
            format: FileFormat::Parquet,
            files,
            schema,
        })
    }

    pub fn open(&self) -> Box<dyn StorageReader> {
        Box::new(FileChain {
            format: self.format,
            schema: self.schema.clone(),
            pending: self.files.iter().cloned().collect(),
            current: None,
        })
    }
}

/// Reads the files of a table one after the other.
struct FileChain {
    format: FileFormat,
    schema: OutputSchema,
    pending: VecDeque<PathBuf>,
    current: Option<Box<dyn StorageReader>>,
}

impl FileChain {
    fn open_next(&mut self) -> Result<bool> {
        let path = match self.pending.pop_front() {
            Some(path) => path,
            None => return Ok(false),
        };
        tracing::debug!(path = %path.display(), format = %self.format, "opening table file");
        let reader: Box<dyn StorageReader> = match self.format {
            FileFormat::Csv => Box::new(CsvReader::new(&path, self.schema.clone())?),
            FileFormat::Parquet => Box::new(ParquetReader::new(&path, self.schema.clone())?),
        };
        self.current = Some(reader);
        Ok(true)
    }
}

impl StorageReader for FileChain {
    fn next_chunk(&mut self) -> Result<Chunk> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                let chunk = reader.next_chunk()?;
                if !chunk.is_empty() {
                    return Ok(chunk);
                }
                self.current = None;
            }
            if !self.open_next()? {
                return Ok(Chunk::default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, DataType, Row, Value};

    fn rows(from: i64, to: i64) -> Vec<Row> {
        (from..to)
            .map(|i| {
                vec![
                    Value::Long(i),
                    Value::Date(chrono::NaiveDate::from_ymd_opt(1995, 7, 6).unwrap()),
                    if i % 2 == 0 { Value::Null } else { Value::Str(format!("r{}", i)) },
                ]
            })
            .collect()
    }

    fn schema() -> OutputSchema {
        OutputSchema::new(vec![
            Column::new("k", DataType::BigInt),
            Column::new("d", DataType::Date),
            Column::new("s", DataType::Varchar),
        ])
    }

    fn read_all(source: &TableSource) -> Vec<Row> {
        let mut reader = source.open();
        let mut out = Vec::new();
        loop {
            let chunk = reader.next_chunk().unwrap();
            if chunk.is_empty() {
                break;
            }
            out.extend(chunk.rows);
        }
        out
    }

    #[test]
    fn chains_files_in_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let (first, second) = (rows(0, CHUNK_SIZE as i64 + 5), rows(2000, 2003));

        let psv = [dir.path().join("t_0.psv"), dir.path().join("t_1.psv")];
        csv::write_table(&psv[0], &first).unwrap();
        csv::write_table(&psv[1], &second).unwrap();
        let csv_source = TableSource::csv(psv.to_vec(), schema()).unwrap();

        let pq = [dir.path().join("t_0.parquet"), dir.path().join("t_1.parquet")];
        parquet::write_table(&pq[0], &schema(), &first).unwrap();
        parquet::write_table(&pq[1], &schema(), &second).unwrap();
        let parquet_source = TableSource::parquet(pq.to_vec()).unwrap();

        let expected = first.iter().chain(second.iter()).cloned().collect::<Vec<Row>>();
        assert_eq!(read_all(&csv_source), expected);
        assert_eq!(read_all(&parquet_source), expected);
        assert_eq!(parquet_source.schema.columns[1].data_type, Some(DataType::Date));
    }

    #[test]
    fn tables_need_files() {
        assert!(TableSource::csv(vec![], schema()).is_err());
        assert!(TableSource::parquet(vec![]).is_err());
    }
}
