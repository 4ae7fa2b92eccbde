use std::mem::swap;

use crate::executor::Executor;
use crate::types::error::Result;
use crate::types::{Chunk, OutputSchema};

/// Source for `SELECT` without `FROM`: a single row with no columns.
pub struct Empty {
    buffer: Chunk,
}

impl Empty {
    pub fn new() -> Result<Box<Empty>> {
        Ok(Box::new(Empty {
            buffer: Chunk::new(vec![vec![]]),
        }))
    }
}

impl Executor for Empty {
    fn next_chunk(&mut self) -> Result<Chunk> {
        let mut res = Chunk::default();
        swap(&mut res, &mut self.buffer);
        Ok(res)
    }

    fn get_output_schema(&self) -> OutputSchema {
        OutputSchema::default()
    }
}
