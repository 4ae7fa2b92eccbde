//! Pipe-separated text tables in the TPC-H `.tbl` layout: no header and a
//! trailing separator on every line. Fields holding the separator are quoted.

use std::fs::File;
use std::path::{Path, PathBuf};

use ::csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, WriterBuilder};

use crate::types::error::{Error, Result};
use crate::types::{Chunk, OutputSchema, Row, Value};

use super::{StorageReader, CHUNK_SIZE};

pub const SEPARATOR: u8 = b'|';

/// Raw records of one file, checked against the expected width. Shared by the
/// engine's scan and the reference loader.
pub struct RecordReader {
    path: PathBuf,
    width: usize,
    records: StringRecordsIntoIter<File>,
}

impl RecordReader {
    pub fn open(path: &Path, width: usize) -> Result<RecordReader> {
        let reader = ReaderBuilder::new()
            .delimiter(SEPARATOR)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::Storage(format!("Could not open {}: {}", path.display(), e)))?;
        Ok(RecordReader {
            path: path.to_path_buf(),
            width,
            records: reader.into_records(),
        })
    }

    pub fn next_record(&mut self) -> Result<Option<StringRecord>> {
        let mut record = match self.records.next() {
            Some(record) => record.map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?,
            None => return Ok(None),
        };

        if record.len() == self.width + 1 && record.get(self.width) == Some("") {
            record.truncate(self.width);
        }
        if record.len() != self.width {
            return Err(Error::Storage(format!(
                "{}:{}: expected {} fields, found {}",
                self.path.display(),
                self.line(&record),
                self.width,
                record.len()
            )));
        }
        Ok(Some(record))
    }

    pub fn line(&self, record: &StringRecord) -> u64 {
        record.position().map_or(0, |p| p.line())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub struct CsvReader {
    records: RecordReader,
    schema: OutputSchema,
}

impl CsvReader {
    pub fn new(path: &Path, schema: OutputSchema) -> Result<CsvReader> {
        Ok(CsvReader {
            records: RecordReader::open(path, schema.len())?,
            schema,
        })
    }

    fn parse_record(&self, record: &StringRecord) -> Result<Row> {
        record
            .iter()
            .zip(self.schema.columns.iter())
            .map(|(text, column)| match column.data_type {
                Some(data_type) => Value::parse_as(text, data_type).map_err(|e| {
                    Error::Storage(format!(
                        "{}:{}: {}",
                        self.records.path().display(),
                        self.records.line(record),
                        e
                    ))
                }),
                None => Ok(Value::Str(text.to_string())),
            })
            .collect()
    }
}

impl StorageReader for CsvReader {
    fn next_chunk(&mut self) -> Result<Chunk> {
        let mut chunk = Chunk::default();

        while chunk.len() < CHUNK_SIZE {
            match self.records.next_record()? {
                Some(record) => chunk.rows.push(self.parse_record(&record)?),
                None => break,
            }
        }

        Ok(chunk)
    }
}

/// Writes rows in the same layout the reader expects. NULL becomes an empty
/// field.
pub fn write_table(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(SEPARATOR)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Storage(format!("Could not create {}: {}", path.display(), e)))?;

    for row in rows {
        let mut fields = row
            .iter()
            .map(|value| match value {
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect::<Vec<String>>();
        fields.push(String::new());
        writer
            .write_record(&fields)
            .map_err(|e| Error::Storage(format!("{}: {}", path.display(), e)))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, DataType};

    #[test]
    fn separator_inside_a_field_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes_0.psv");
        let rows = vec![
            vec![Value::Long(1), Value::Str("a|b".into())],
            vec![Value::Long(2), Value::Null],
        ];
        write_table(&path, &rows).unwrap();

        let schema = OutputSchema::new(vec![
            Column::new("id", DataType::BigInt),
            Column::new("note", DataType::Varchar),
        ]);
        let chunk = CsvReader::new(&path, schema).unwrap().next_chunk().unwrap();
        assert_eq!(chunk.rows, rows);
    }

    #[test]
    fn trailing_separator_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t_0.psv");
        std::fs::write(&path, "1|x|\n2|y\n\n").unwrap();

        let mut records = RecordReader::open(&path, 2).unwrap();
        assert_eq!(records.next_record().unwrap().unwrap().len(), 2);
        assert_eq!(records.next_record().unwrap().unwrap().get(1), Some("y"));
        assert!(records.next_record().unwrap().is_none());
    }

    #[test]
    fn wrong_width_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t_0.psv");
        std::fs::write(&path, "1|x|\n2|y|z|w\n").unwrap();

        let mut records = RecordReader::open(&path, 2).unwrap();
        records.next_record().unwrap();
        let err = records.next_record().unwrap_err().to_string();
        assert!(err.contains(":2: expected 2 fields, found 4"), "{}", err);
    }
}
