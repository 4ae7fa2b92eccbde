use sqlparser::ast::Expr;

use crate::executor::expression::ExprEvaluator;
use crate::executor::Executor;
use crate::types::error::Result;
use crate::types::{Chunk, OutputSchema, Row};

pub struct Projection {
    exprs: Vec<Expr>,
    child: Box<dyn Executor>,
    output_schema: OutputSchema,
}

impl Projection {
    pub fn new(
        child: Box<dyn Executor>,
        exprs: Vec<Expr>,
        output_schema: OutputSchema,
    ) -> Result<Box<Projection>> {
        Ok(Box::new(Projection {
            exprs,
            child,
            output_schema,
        }))
    }
}

impl Executor for Projection {
    fn next_chunk(&mut self) -> Result<Chunk> {
        let chunk = self.child.next_chunk()?;
        let input_schema = self.child.get_output_schema();

        let rows = chunk
            .rows
            .iter()
            .map(|row| {
                self.exprs
                    .iter()
                    .map(|expr| ExprEvaluator::evaluate(expr, row, &input_schema))
                    .collect::<Result<Row>>()
            })
            .collect::<Result<Vec<Row>>>()?;

        Ok(Chunk::new(rows))
    }

    fn get_output_schema(&self) -> OutputSchema {
        self.output_schema.clone()
    }
}
