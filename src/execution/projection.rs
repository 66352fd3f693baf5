// Grounded in original_source's `Projection` (algebra.h/algebra.cc):
// passes `next` straight through to the child, re-deriving `output` as a
// reordered subset of the child's registers.

use crate::error::Result;
use crate::execution::operator::Operator;
use crate::execution::register::Register;

pub struct Projection<O> {
    input: O,
    attr_indexes: Vec<usize>,
    current: Vec<Register>,
}

impl<O: Operator> Projection<O> {
    pub fn new(input: O, attr_indexes: Vec<usize>) -> Self {
        Self {
            input,
            attr_indexes,
            current: Vec::new(),
        }
    }
}

impl<O: Operator> Operator for Projection<O> {
    fn open(&mut self) -> Result<()> {
        self.input.open()
    }

    fn next(&mut self) -> Result<bool> {
        if self.input.next()? {
            let src = self.input.output();
            self.current = self.attr_indexes.iter().map(|&i| src[i]).collect();
            Ok(true)
        } else {
            self.current.clear();
            Ok(false)
        }
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }

    fn output(&self) -> &[Register] {
        &self.current
    }
}
