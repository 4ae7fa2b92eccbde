use sqlparser::ast::Expr;

use crate::executor::expression::ExprEvaluator;
use crate::storage::{StorageReader, TableSource};
use crate::types::error::Result;
use crate::types::{Chunk, OutputSchema};

use super::Executor;

pub struct Scan {
    filter: Option<Expr>,
    output_schema: OutputSchema,

    reader: Box<dyn StorageReader>,
}

impl Scan {
    pub fn new(
        table: String,
        source: TableSource,
        filter: Option<Expr>,
        output_schema: OutputSchema,
    ) -> Result<Box<Scan>> {
        tracing::debug!(table = %table, files = source.files.len(), format = %source.format, "scanning table");

        Ok(Box::new(Scan {
            reader: source.open(),
            filter,
            output_schema,
        }))
    }
}

impl Executor for Scan {
    fn next_chunk(&mut self) -> Result<Chunk> {
        loop {
            let mut chunk = self.reader.next_chunk()?;
            let filter = match &self.filter {
                Some(filter) if !chunk.is_empty() => filter,
                _ => return Ok(chunk),
            };

            let mut kept = Vec::with_capacity(chunk.len());
            for row in chunk.rows.drain(..) {
                if ExprEvaluator::predicate(filter, &row, &self.output_schema)? {
                    kept.push(row);
                }
            }
            // an all-filtered chunk must not read as end of input
            if !kept.is_empty() {
                return Ok(Chunk::new(kept));
            }
        }
    }

    fn get_output_schema(&self) -> OutputSchema {
        self.output_schema.clone()
    }
}
