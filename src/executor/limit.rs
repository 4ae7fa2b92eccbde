use crate::executor::Executor;
use crate::types::error::Result;
use crate::types::{Chunk, OutputSchema};

use super::{Buffer, VECTOR_SIZE_THRESHOLD};

pub struct Limit {
    output_schema: OutputSchema,
    limit: Option<u64>,
    offset: u64,
    child: Box<dyn Executor>,

    buffer: Buffer,
    exhausted: bool,
}

impl Limit {
    pub fn new(
        child: Box<dyn Executor>,
        limit: Option<u64>,
        offset: u64,
        output_schema: OutputSchema,
    ) -> Result<Box<Limit>> {
        Ok(Box::new(Limit {
            limit,
            offset,
            child,
            output_schema,
            buffer: Buffer::new(),
            exhausted: false,
        }))
    }

    fn done(&self) -> bool {
        self.exhausted || self.limit == Some(0)
    }
}

impl Executor for Limit {
    fn next_chunk(&mut self) -> Result<Chunk> {
        while !self.done() && self.buffer.size() < VECTOR_SIZE_THRESHOLD {
            let next_chunk = self.child.next_chunk()?;

            if next_chunk.is_empty() {
                self.exhausted = true;
                break;
            }

            for row in next_chunk.rows {
                if self.offset > 0 {
                    self.offset -= 1;
                    continue;
                }
                self.buffer.add_row(row);
                if let Some(limit) = self.limit.as_mut() {
                    *limit -= 1;
                    if *limit == 0 {
                        break;
                    }
                }
            }
        }

        Ok(self.buffer.get_sized_chunk(VECTOR_SIZE_THRESHOLD))
    }

    fn get_output_schema(&self) -> OutputSchema {
        self.output_schema.clone()
    }
}
