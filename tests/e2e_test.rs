use std::path::Path;

use sqlengine::e2e::config::{ExecutionMode, GeneratorConfig, Settings, SkipRule};
use sqlengine::e2e::runner::Status;
use sqlengine::e2e::{self, timestampdiff};
use sqlengine::storage::FileFormat;

fn settings(root: &Path, mode: ExecutionMode) -> Settings {
    let mut settings = Settings::default();
    settings.run.execution_mode = mode;
    settings.test.data_directory = root.join("data");
    settings.test.log_directory = root.join("logs");
    settings.test.results_directory = root.join("results");
    settings.test.generator = GeneratorConfig {
        orders: 200,
        seed: 7,
    };
    settings
}

fn messages(runner: &e2e::runner::Runner) -> Vec<String> {
    runner
        .records()
        .iter()
        .filter(|r| r.status != Status::Success)
        .map(|r| format!("{} {} {}: {:?}", r.query_id, r.file_format, r.status, r.message))
        .collect()
}

#[test]
fn full_run_matches_sqlite() {
    let root = tempfile::tempdir().unwrap();
    let runner = e2e::run(settings(root.path(), ExecutionMode::Full)).unwrap();

    assert_eq!(runner.records().len(), 2 * timestampdiff::cases().len());
    assert!(messages(&runner).is_empty(), "{:#?}", messages(&runner));

    let logs = std::fs::read_dir(root.path().join("logs")).unwrap().count();
    assert_eq!(logs, 1);
}

#[test]
fn generated_results_replay_in_ci() {
    let root = tempfile::tempdir().unwrap();

    let generator = e2e::run(settings(root.path(), ExecutionMode::Generator)).unwrap();
    assert_eq!(generator.records().len(), timestampdiff::cases().len());
    assert!(generator
        .records()
        .iter()
        .all(|r| r.status == Status::Generated));
    assert!(root
        .path()
        .join("results")
        .join(timestampdiff::QUERY_TYPE)
        .join("TEST_32.json")
        .exists());
    assert!(!root.path().join("logs").exists());

    let ci = e2e::run(settings(root.path(), ExecutionMode::Ci)).unwrap();
    assert_eq!(ci.failures(), 0, "{:#?}", messages(&ci));
    assert_eq!(ci.records().len(), 2 * timestampdiff::cases().len());
    assert_eq!(std::fs::read_dir(root.path().join("logs")).unwrap().count(), 1);
}

#[test]
fn skip_rules_leave_out_formats() {
    let root = tempfile::tempdir().unwrap();
    let mut settings = settings(root.path(), ExecutionMode::Full);
    settings.run.compare_results = false;
    settings.skip.push(SkipRule {
        query_type: Some(timestampdiff::QUERY_TYPE.to_string()),
        file_format: Some(FileFormat::Csv),
    });

    let runner = e2e::run(settings).unwrap();
    assert_eq!(runner.records().len(), timestampdiff::cases().len());
    assert!(runner
        .records()
        .iter()
        .all(|r| r.file_format == FileFormat::Parquet && r.status == Status::Executed));
}
