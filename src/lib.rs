pub mod catalog;
pub mod database;
pub mod e2e;
pub mod executor;
pub mod optimizer;
pub mod parser;
pub mod planner;
pub mod storage;
pub mod types;
