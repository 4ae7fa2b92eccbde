use std::collections::HashMap;

use crate::storage::TableSource;
use crate::types::error::{Error, Result};

/// Registered tables, looked up case-insensitively.
#[derive(Default)]
pub struct Catalog {
    tables: HashMap<String, TableSource>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    /// Registers `source` under `name`, replacing any previous table.
    pub fn register(&mut self, name: &str, source: TableSource) -> Option<TableSource> {
        self.tables.insert(name.to_lowercase(), source)
    }

    pub fn drop_table(&mut self, name: &str) -> Result<TableSource> {
        self.tables
            .remove(&name.to_lowercase())
            .ok_or_else(|| Error::Planner(format!("Table '{}' does not exist", name)))
    }

    pub fn get(&self, name: &str) -> Result<&TableSource> {
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::Planner(format!("Table '{}' does not exist", name)))
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names = self.tables.keys().cloned().collect::<Vec<String>>();
        names.sort();
        names
    }
}
