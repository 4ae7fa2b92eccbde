use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Parser Error: {0}")]
    Parser(String),
    #[error("Planner Error: {0}")]
    Planner(String),
    #[error("Execution Error: {0}")]
    Execution(String),
    #[error("Expression Error: {0}")]
    Expression(String),
    #[error("Storage Error: {0}")]
    Storage(String),
    #[error("Config Error: {0}")]
    Config(String),
    #[error("Harness Error: {0}")]
    Harness(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
