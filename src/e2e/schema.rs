//! TPC-H table definitions and the helpers that register them with an engine.

use std::path::{Path, PathBuf};

use crate::database::Database;
use crate::storage::{FileFormat, TableSource};
use crate::types::error::{Error, Result};
use crate::types::{Column, DataType, OutputSchema};

use crate::types::DataType::{BigInt, Date, Double, Varchar};

const NATION: &[(&str, DataType)] = &[
    ("n_nationkey", BigInt),
    ("n_name", Varchar),
    ("n_regionkey", BigInt),
    ("n_comment", Varchar),
];

const ORDERS: &[(&str, DataType)] = &[
    ("o_orderkey", BigInt),
    ("o_custkey", BigInt),
    ("o_orderstatus", Varchar),
    ("o_totalprice", Double),
    ("o_orderdate", Date),
    ("o_orderpriority", Varchar),
    ("o_clerk", Varchar),
    ("o_shippriority", BigInt),
    ("o_comment", Varchar),
];

const LINEITEM: &[(&str, DataType)] = &[
    ("l_orderkey", BigInt),
    ("l_partkey", BigInt),
    ("l_suppkey", BigInt),
    ("l_linenumber", BigInt),
    ("l_quantity", Double),
    ("l_extendedprice", Double),
    ("l_discount", Double),
    ("l_tax", Double),
    ("l_returnflag", Varchar),
    ("l_linestatus", Varchar),
    ("l_shipdate", Date),
    ("l_commitdate", Date),
    ("l_receiptdate", Date),
    ("l_shipinstruct", Varchar),
    ("l_shipmode", Varchar),
    ("l_comment", Varchar),
];

pub fn table_schema(table: &str) -> Result<OutputSchema> {
    let definition = match table.to_lowercase().as_str() {
        "nation" => NATION,
        "orders" => ORDERS,
        "lineitem" => LINEITEM,
        _ => return Err(Error::Harness(format!("Unknown TPC-H table '{}'", table))),
    };
    Ok(OutputSchema::new(
        definition
            .iter()
            .map(|(name, data_type)| Column::new(name, *data_type))
            .collect(),
    ))
}

/// Path of the `part`-th file of `table` in `format`.
pub fn table_file(data_dir: &Path, table: &str, format: FileFormat, part: usize) -> PathBuf {
    data_dir.join(format!("{}_{}.{}", table, part, format.extension()))
}

/// Files holding `table` in `format`, in name order.
pub fn table_files(data_dir: &Path, table: &str, format: FileFormat) -> Result<Vec<PathBuf>> {
    let pattern = data_dir.join(format!("{}_*.{}", table, format.extension()));
    let pattern = pattern.to_string_lossy();
    let mut files = glob::glob(&pattern)
        .map_err(|e| Error::Harness(format!("Invalid table pattern {}: {}", pattern, e)))?
        .collect::<std::result::Result<Vec<PathBuf>, glob::GlobError>>()
        .map_err(|e| Error::Harness(e.to_string()))?;
    files.sort();
    Ok(files)
}

/// Registers `tables` from `data_dir` in `format`, replacing earlier
/// registrations of the same names.
pub fn create_tables(
    db: &mut Database,
    data_dir: &Path,
    format: FileFormat,
    tables: &[&str],
) -> Result<()> {
    for table in tables {
        let files = table_files(data_dir, table, format)?;
        if files.is_empty() {
            return Err(Error::Harness(format!(
                "No {} files for table '{}' in {}",
                format,
                table,
                data_dir.display()
            )));
        }

        let source = match format {
            FileFormat::Csv => TableSource::csv(files, table_schema(table)?)?,
            FileFormat::Parquet => TableSource::parquet(files)?,
        };
        tracing::info!(table = *table, format = %format, "created table");
        db.register_table(table, source);
    }
    Ok(())
}

/// Whether every table has at least one file in every format.
pub fn data_present(data_dir: &Path, tables: &[&str], formats: &[FileFormat]) -> Result<bool> {
    for table in tables {
        for format in formats {
            if table_files(data_dir, table, *format)?.is_empty() {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
