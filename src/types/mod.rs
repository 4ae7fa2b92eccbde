use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::{builder::Builder, settings::Style};

pub mod error;
pub mod temporal;
pub mod value;

use self::error::{Error, Result};
pub use self::value::{DataType, Value};

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub relation: Option<String>,
    pub data_type: Option<DataType>,
}

impl Column {
    pub fn new(name: &str, data_type: DataType) -> Column {
        Column {
            name: name.to_string(),
            relation: None,
            data_type: Some(data_type),
        }
    }

    pub fn untyped(name: &str) -> Column {
        Column {
            name: name.to_string(),
            relation: None,
            data_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSchema {
    pub columns: Vec<Column>,
}

impl OutputSchema {
    pub fn new(columns: Vec<Column>) -> OutputSchema {
        OutputSchema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, relation: Option<&str>, name: &str) -> bool {
        self.resolve(relation, name).is_ok()
    }

    /// Every column re-labelled with `relation`, as seen through a table alias.
    pub fn with_relation(&self, relation: &str) -> OutputSchema {
        OutputSchema {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    relation: Some(relation.to_string()),
                    ..c.clone()
                })
                .collect(),
        }
    }

    /// Index of the column called `name`, case-insensitive. A qualified
    /// lookup also has to match the column's relation.
    pub fn resolve(&self, relation: Option<&str>, name: &str) -> Result<usize> {
        let mut matches = self.columns.iter().enumerate().filter(|(_, c)| {
            c.name.eq_ignore_ascii_case(name)
                && match relation {
                    Some(r) => c
                        .relation
                        .as_deref()
                        .map_or(false, |cr| cr.eq_ignore_ascii_case(r)),
                    None => true,
                }
        });

        let qualified = match relation {
            Some(r) => format!("{}.{}", r, name),
            None => name.to_string(),
        };
        match (matches.next(), matches.next()) {
            (Some((index, _)), None) => Ok(index),
            (Some(_), Some(_)) => Err(Error::Planner(format!(
                "Column reference '{}' is ambiguous",
                qualified
            ))),
            (None, _) => Err(Error::Planner(format!("Column '{}' not found", qualified))),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Chunk {
    pub rows: Vec<Row>,
}

impl Chunk {
    pub fn new(rows: Vec<Row>) -> Chunk {
        Chunk { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Default)]
pub struct ResultSet {
    pub output_schema: OutputSchema,
    pub chunks: Vec<Chunk>,
}

impl ResultSet {
    pub fn from_rows(output_schema: OutputSchema, rows: Vec<Row>) -> ResultSet {
        ResultSet {
            output_schema,
            chunks: vec![Chunk::new(rows)],
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.chunks.iter().flat_map(|chunk| chunk.rows.iter())
    }

    pub fn row_count(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.output_schema
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.chunks.into_iter().flat_map(|chunk| chunk.rows).collect()
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = Builder::default();
        builder.set_header(self.column_names());

        for row in self.rows() {
            builder.push_record(row.iter().map(|value| value.to_string()));
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        write!(f, "{}", table)
    }
}
