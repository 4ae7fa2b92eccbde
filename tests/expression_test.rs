use common::{fixture_database, DatabaseTestHelper};
use sqlengine::storage::FileFormat;

mod common;

fn run_slt(format: FileFormat, file: &str) {
    let (db, _dir) = fixture_database(format);
    let db_helper = DatabaseTestHelper(db);
    let mut tester = sqllogictest::Runner::new(db_helper);
    tester.run_file(file).unwrap();
}

#[test]
fn test_query_csv() {
    run_slt(FileFormat::Csv, "tests/resources/sql/query.slt");
}

#[test]
fn test_query_parquet() {
    run_slt(FileFormat::Parquet, "tests/resources/sql/query.slt");
}
