use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::types::error::{Error, Result};

pub struct SQLParser {
    dialect: GenericDialect,
}

impl SQLParser {
    pub fn new() -> SQLParser {
        SQLParser {
            dialect: GenericDialect {},
        }
    }

    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>> {
        Parser::parse_sql(&self.dialect, sql).map_err(|e| Error::Parser(e.to_string()))
    }
}

impl Default for SQLParser {
    fn default() -> Self {
        Self::new()
    }
}
