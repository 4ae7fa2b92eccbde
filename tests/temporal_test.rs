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
fn test_timestampadd() {
    run_slt(FileFormat::Csv, "tests/resources/sql/timestampadd.slt");
    run_slt(FileFormat::Parquet, "tests/resources/sql/timestampadd.slt");
}

#[test]
fn test_timestampdiff() {
    run_slt(FileFormat::Csv, "tests/resources/sql/timestampdiff.slt");
    run_slt(FileFormat::Parquet, "tests/resources/sql/timestampdiff.slt");
}
