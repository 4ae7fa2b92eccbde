use sqlengine::e2e::schema::{create_tables, table_file, table_schema};
use sqlengine::storage::{csv, parquet, FileFormat, StorageReader};
use sqlengine::types::{DataType, Row};
use sqlengine::{database::Database, types::error::Error};
use sqllogictest::{self, DBOutput, DefaultColumnType};
use tempfile::TempDir;

const NATION: &str = "\
0|ALGERIA|0|haggle. carefully final deposits|
1|ARGENTINA|1|al foxes promise slyly|
2|BRAZIL|1|y alongside of the pending deposits|
";

const ORDERS: &str = "\
1|370|O|172799.49|1996-01-02|5-LOW|Clerk#000000951|0|nstructions sleep furiously|
2|781|O|38426.09|1996-12-01|1-URGENT|Clerk#000000880|0|foxes. pending accounts|
3|1234|F|205654.3|1993-10-14|5-LOW|Clerk#000000955|0|sly final accounts|
4|1369|O|56000.91|1995-10-11|5-LOW|Clerk#000000124|0|sits. slyly regular|
5|445|F|105367.67|1994-07-30|5-LOW|Clerk#000000925|0|quickly. bold deposits|
6|557|F|45523.1|1992-02-21|4-NOT SPECIFIED|Clerk#000000058|0|ggle. special packages|
7|392|O|271885.66|1996-01-10|2-HIGH|Clerk#000000470|0|ly special requests|
32|1301|O|198665.57|1995-07-16|2-HIGH|Clerk#000000616|0||
";

const LINEITEM: &str = "\
1|1552|93|1|17.0|24710.35|0.04|0.02|N|O|1996-03-13|1996-02-12|1996-03-22|DELIVER IN PERSON|TRUCK|egular courts|
1|674|75|2|36.0|56688.12|0.09|0.06|N|O|1996-04-12|1996-02-28|1996-04-20|TAKE BACK RETURN|MAIL|ly final dependencies|
3|191|70|1|45.0|54058.05|0.06|0.0|R|F|1994-02-02|1994-01-04|1994-02-23|NONE|AIR|ongside of the furiously|
5|1086|87|1|15.0|14847.0|0.02|0.04|R|F|1994-10-31|1994-08-31|1994-11-20|NONE|AIR|ts wake furiously|
";

pub const TABLES: [&str; 3] = ["nation", "orders", "lineitem"];

fn read_rows(path: &std::path::Path, table: &str) -> Vec<Row> {
    let mut reader = csv::CsvReader::new(path, table_schema(table).unwrap()).unwrap();
    let mut rows = Vec::new();
    loop {
        let chunk = reader.next_chunk().unwrap();
        if chunk.is_empty() {
            return rows;
        }
        rows.extend(chunk.rows);
    }
}

/// Writes the fixture tables in both formats and returns their directory.
pub fn write_fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (table, text) in [("nation", NATION), ("orders", ORDERS), ("lineitem", LINEITEM)] {
        let psv = table_file(dir.path(), table, FileFormat::Csv, 0);
        std::fs::write(&psv, text).unwrap();
        let rows = read_rows(&psv, table);
        parquet::write_table(
            &table_file(dir.path(), table, FileFormat::Parquet, 0),
            &table_schema(table).unwrap(),
            &rows,
        )
        .unwrap();
    }
    dir
}

/// A database over the fixture tables in `format`. Keep the directory alive
/// for as long as the database is queried.
pub fn fixture_database(format: FileFormat) -> (Database, TempDir) {
    let dir = write_fixture();
    let mut db = Database::new();
    create_tables(&mut db, dir.path(), format, &TABLES).unwrap();
    (db, dir)
}

pub struct DatabaseTestHelper(pub Database);

fn column_type(data_type: Option<DataType>) -> DefaultColumnType {
    match data_type {
        Some(DataType::Int) | Some(DataType::BigInt) => DefaultColumnType::Integer,
        Some(DataType::Double) => DefaultColumnType::FloatingPoint,
        Some(_) => DefaultColumnType::Text,
        None => DefaultColumnType::Any,
    }
}

impl sqllogictest::DB for DatabaseTestHelper {
    type Error = Error;
    type ColumnType = DefaultColumnType;
    fn run(&mut self, sql: &str) -> Result<sqllogictest::DBOutput<Self::ColumnType>, Self::Error> {
        let result_set = self.0.execute(sql)?;
        let rows: Vec<Row> = result_set.rows().cloned().collect();
        let types = (0..result_set.output_schema.len())
            .map(|i| {
                let value_type = rows.iter().find_map(|row| row[i].data_type());
                column_type(value_type.or(result_set.output_schema.columns[i].data_type))
            })
            .collect();
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        Ok(DBOutput::Rows { types, rows })
    }
}
