use std::cmp::Ordering;

use crate::executor::expression::ExprEvaluator;
use crate::executor::Executor;
use crate::planner::SortKey;
use crate::types::error::Result;
use crate::types::{Chunk, OutputSchema, Row, Value};

use super::{Buffer, VECTOR_SIZE_THRESHOLD};

pub struct Sort {
    output_schema: OutputSchema,
    keys: Vec<SortKey>,
    fetch: Option<u64>,
    child: Box<dyn Executor>,

    sorted: Option<Buffer>,
}

impl Sort {
    pub fn new(
        child: Box<dyn Executor>,
        keys: Vec<SortKey>,
        fetch: Option<u64>,
        output_schema: OutputSchema,
    ) -> Result<Box<Sort>> {
        Ok(Box::new(Sort {
            output_schema,
            keys,
            fetch,
            child,
            sorted: None,
        }))
    }

    fn compare(keys: &[SortKey], left: &[Value], right: &[Value]) -> Ordering {
        for (key, (l, r)) in keys.iter().zip(left.iter().zip(right.iter())) {
            let ordering = match (l.is_null(), r.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) if key.nulls_first => Ordering::Less,
                (true, false) => Ordering::Greater,
                (false, true) if key.nulls_first => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) if key.asc => l.sort_cmp(r),
                (false, false) => r.sort_cmp(l),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn sort_input(&mut self) -> Result<Buffer> {
        let schema = self.child.get_output_schema();
        let mut keyed: Vec<(Row, Row)> = Vec::new();

        loop {
            let chunk = self.child.next_chunk()?;
            if chunk.is_empty() {
                break;
            }
            for row in chunk.rows {
                let key = self
                    .keys
                    .iter()
                    .map(|k| ExprEvaluator::evaluate(&k.expr, &row, &schema))
                    .collect::<Result<Row>>()?;
                keyed.push((key, row));
            }
        }

        // stable, so ties keep their input order
        let keys = &self.keys;
        keyed.sort_by(|(l, _), (r, _)| Self::compare(keys, l, r));
        if let Some(fetch) = self.fetch {
            keyed.truncate(usize::try_from(fetch).unwrap_or(usize::MAX));
        }
        tracing::debug!(rows = keyed.len(), "sorted input");

        let mut buffer = Buffer::new();
        for (_, row) in keyed {
            buffer.add_row(row);
        }
        Ok(buffer)
    }
}

impl Executor for Sort {
    fn next_chunk(&mut self) -> Result<Chunk> {
        if self.sorted.is_none() {
            self.sorted = Some(self.sort_input()?);
        }
        match self.sorted.as_mut() {
            Some(buffer) => Ok(buffer.get_sized_chunk(VECTOR_SIZE_THRESHOLD)),
            None => Ok(Chunk::default()),
        }
    }

    fn get_output_schema(&self) -> OutputSchema {
        self.output_schema.clone()
    }
}
