use crate::catalog::Catalog;
use crate::executor;
use crate::optimizer;
use crate::parser;
use crate::planner;
use crate::storage::TableSource;
use crate::types::error::Result;
use crate::types::ResultSet;

pub struct Database {
    parser: parser::SQLParser,
    planner: planner::Planner,
    optimizer: optimizer::Optimizer,
    executor: executor::ExecutionEngine,
    catalog: Catalog,
}

impl Database {
    pub fn new() -> Database {
        Database {
            parser: parser::SQLParser::new(),
            planner: planner::Planner::new(),
            optimizer: optimizer::Optimizer::new(),
            executor: executor::ExecutionEngine::new(),
            catalog: Catalog::new(),
        }
    }

    pub fn register_table(&mut self, name: &str, source: TableSource) {
        tracing::debug!(table = name, format = %source.format, files = source.files.len(), "registering table");
        if self.catalog.register(name, source).is_some() {
            tracing::debug!(table = name, "replaced existing table");
        }
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.catalog.drop_table(name).map(|_| ())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn execute(&self, sql: &str) -> Result<ResultSet> {
        let ast = self.parser.parse(sql)?;
        tracing::debug!(statements = ast.len(), "parsed");
        let plan = self.planner.build_statements(&ast, &self.catalog)?;
        let optimized_plan = self.optimizer.optimize(plan)?;
        tracing::debug!("planned and optimized");
        let result_set = self.executor.execute(optimized_plan)?;
        tracing::debug!(rows = result_set.row_count(), "executed");
        Ok(result_set)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv;
    use crate::types::{Column, DataType, OutputSchema, Value};

    fn numbers_table(dir: &std::path::Path) -> TableSource {
        let path = dir.join("numbers_0.psv");
        let rows = (1..=3).map(|i| vec![Value::Long(i)]).collect::<Vec<_>>();
        csv::write_table(&path, &rows).unwrap();
        TableSource::csv(
            vec![path],
            OutputSchema::new(vec![Column::new("n", DataType::BigInt)]),
        )
        .unwrap()
    }

    #[test]
    fn registered_tables_can_be_queried_and_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::new();
        db.register_table("Numbers", numbers_table(dir.path()));
        assert_eq!(db.catalog().table_names(), vec!["numbers"]);

        let result = db.execute("select n from numbers where n > 1").unwrap();
        assert_eq!(result.row_count(), 2);

        db.drop_table("NUMBERS").unwrap();
        assert!(db.execute("select n from numbers").is_err());
        assert!(db.drop_table("numbers").is_err());
    }
}
