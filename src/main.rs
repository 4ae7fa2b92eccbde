use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use sqlengine::database::Database;
use sqlengine::e2e::{self, config::ExecutionMode, config::Settings, datagen, schema, timestampdiff};
use sqlengine::storage::FileFormat;
use sqlengine::types::error::{Error, Result};

#[derive(Debug, Parser)]
#[command(about = "End-to-end temporal function tests for the SQL engine")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the suites and compare against the reference engine
    Run {
        /// TOML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long = "data-dir")]
        data_dir: Option<PathBuf>,

        #[arg(long, value_enum)]
        mode: Option<ExecutionMode>,
    },

    /// Write the TPC-H subset in every format
    GenerateData {
        #[arg(long = "data-dir", default_value = "data")]
        data_dir: PathBuf,

        #[arg(long)]
        orders: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Interactive SQL over the generated tables
    Shell {
        #[arg(long = "data-dir", default_value = "data")]
        data_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = FileFormat::Parquet)]
        format: FileFormat,
    },
}

fn cmd_run(config: Option<PathBuf>, data_dir: Option<PathBuf>, mode: Option<ExecutionMode>) -> Result<bool> {
    let mut settings = match config {
        Some(path) => Settings::from_file(&path)?,
        None => Settings::default(),
    };
    if let Some(data_dir) = data_dir {
        settings.test.data_directory = data_dir;
    }
    if let Some(mode) = mode {
        settings.run.execution_mode = mode;
    }

    let runner = e2e::run(settings)?;
    let failures = runner.failures();
    tracing::info!(records = runner.records().len(), failures, "run finished");
    Ok(failures == 0)
}

fn cmd_generate(data_dir: &Path, orders: Option<usize>, seed: Option<u64>) -> Result<()> {
    let mut config = Settings::default().test.generator;
    if let Some(orders) = orders {
        config.orders = orders;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    datagen::generate(data_dir, &config)
}

fn cmd_shell(data_dir: &Path, format: FileFormat) -> Result<()> {
    let mut db = Database::new();
    if schema::data_present(data_dir, &timestampdiff::TABLES, &[format])? {
        schema::create_tables(&mut db, data_dir, format, &timestampdiff::TABLES)?;
    } else {
        tracing::warn!(dir = %data_dir.display(), "no tables found, run generate-data first");
    }

    let mut rl = DefaultEditor::new().map_err(|e| Error::Harness(e.to_string()))?;

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                if line.trim() == ".tables" {
                    println!("{}", db.catalog().table_names().join("\n"));
                    continue;
                }
                match db.execute(line.as_str()) {
                    Ok(result_set) => println!("{}", result_set),
                    Err(e) => println!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("{}", e);
                break;
            }
        }
    }
    Ok(())
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run {
            config,
            data_dir,
            mode,
        } => cmd_run(config, data_dir, mode),
        Command::GenerateData {
            data_dir,
            orders,
            seed,
        } => cmd_generate(&data_dir, orders, seed).map(|_| true),
        Command::Shell { data_dir, format } => cmd_shell(&data_dir, format).map(|_| true),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
