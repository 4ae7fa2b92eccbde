use sqlparser::ast::Expr;

use crate::executor::expression::ExprEvaluator;
use crate::executor::Executor;
use crate::types::error::Result;
use crate::types::{Chunk, OutputSchema};

pub struct Filter {
    filter: Expr,
    child: Box<dyn Executor>,
    output_schema: OutputSchema,
}

impl Filter {
    pub fn new(
        child: Box<dyn Executor>,
        filter: Expr,
        output_schema: OutputSchema,
    ) -> Result<Box<Filter>> {
        Ok(Box::new(Filter {
            filter,
            child,
            output_schema,
        }))
    }
}

impl Executor for Filter {
    fn next_chunk(&mut self) -> Result<Chunk> {
        loop {
            let chunk = self.child.next_chunk()?;
            if chunk.is_empty() {
                return Ok(chunk);
            }

            let schema = self.child.get_output_schema();
            let mut kept = Vec::new();
            for row in chunk.rows {
                if ExprEvaluator::predicate(&self.filter, &row, &schema)? {
                    kept.push(row);
                }
            }

            if !kept.is_empty() {
                return Ok(Chunk::new(kept));
            }
        }
    }

    fn get_output_schema(&self) -> OutputSchema {
        self.output_schema.clone()
    }
}
