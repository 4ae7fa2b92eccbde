//! End-to-end test driver: generates the TPC-H subset, registers it with the
//! engine and checks every suite query against a reference engine.

use crate::types::error::Result;

pub mod compare;
pub mod config;
pub mod datagen;
pub mod oracle;
pub mod runner;
pub mod schema;
pub mod timestampdiff;

use self::config::{ExecutionMode, Settings};
use self::runner::Runner;

/// Runs every suite under `settings` and saves the log, except in `generator`
/// mode where the stored results are the output. The returned runner holds
/// the records.
pub fn run(settings: Settings) -> Result<Runner> {
    let data_dir = &settings.test.data_directory;
    if settings.test.generate_data
        && settings.run.execution_mode != ExecutionMode::Ci
        && !schema::data_present(data_dir, &timestampdiff::TABLES, &timestampdiff::FILE_FORMATS)?
    {
        datagen::generate(data_dir, &settings.test.generator)?;
    }

    let mut runner = Runner::new(settings.clone())?;
    timestampdiff::execution_test(&mut runner, &settings)?;
    if settings.run.execution_mode != ExecutionMode::Generator {
        runner.save_log()?;
    }
    Ok(runner)
}
