mod empty;
mod expression;
mod filter;
mod limit;
mod projection;
mod scan;
mod sort;

use crate::{
    planner::{Node, Plan, PlanNode},
    types::{error::Result, Chunk, OutputSchema, ResultSet, Row},
};

use self::{
    empty::Empty, filter::Filter, limit::Limit, projection::Projection, scan::Scan, sort::Sort,
};

pub use self::expression::ExprEvaluator;

const VECTOR_SIZE_THRESHOLD: usize = 1024;

pub trait Executor {
    fn get_output_schema(&self) -> OutputSchema;
    fn next_chunk(&mut self) -> Result<Chunk>;
}

/// Rows waiting to be handed to the parent in chunks.
#[derive(Default)]
pub struct Buffer {
    rows: std::collections::VecDeque<Row>,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer::default()
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn add_row(&mut self, row: Row) {
        self.rows.push_back(row);
    }

    pub fn get_sized_chunk(&mut self, size: usize) -> Chunk {
        let take = size.min(self.rows.len());
        Chunk::new(self.rows.drain(..take).collect())
    }
}

struct ExecutorBuilder {}

impl ExecutorBuilder {
    fn build_from_plan(plan: Plan) -> Result<Box<dyn Executor>> {
        Self::build(plan.root)
    }

    fn build(plan_node: PlanNode) -> Result<Box<dyn Executor>> {
        let output_schema = plan_node.output_schema;
        match plan_node.node {
            Node::Scan {
                table_name,
                source,
                filter,
            } => Ok(Scan::new(table_name, source, filter, output_schema)?),
            Node::Filter { filter, child } => {
                let child = Self::build(*child)?;
                Ok(Filter::new(child, filter, output_schema)?)
            }
            Node::Projection { exprs, child } => {
                let child = Self::build(*child)?;
                Ok(Projection::new(child, exprs, output_schema)?)
            }
            Node::Sort { keys, fetch, child } => {
                let child = Self::build(*child)?;
                Ok(Sort::new(child, keys, fetch, output_schema)?)
            }
            Node::Limit {
                limit,
                offset,
                child,
            } => {
                let child = Self::build(*child)?;
                Ok(Limit::new(child, limit, offset, output_schema)?)
            }
            Node::Empty {} => Ok(Empty::new()?),
        }
    }
}

pub struct ExecutionEngine {}

impl ExecutionEngine {
    pub fn new() -> ExecutionEngine {
        ExecutionEngine {}
    }

    pub fn execute(&self, plan: Plan) -> Result<ResultSet> {
        tracing::debug!("executing plan");
        let mut executor = ExecutorBuilder::build_from_plan(plan)?;
        let mut result = ResultSet {
            output_schema: executor.get_output_schema(),
            ..ResultSet::default()
        };

        loop {
            let chunk = executor.next_chunk()?;

            if chunk.is_empty() {
                break;
            }

            result.chunks.push(chunk);
        }

        Ok(result)
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}
