// Grounded in original_source's `Print` (algebra.h/algebra.cc): writes each
// tuple as comma-separated attributes terminated by a newline, one line per
// `next()` call.

use std::io::Write;

use crate::error::Result;
use crate::execution::operator::Operator;
use crate::execution::register::Register;

pub struct Print<'a, O> {
    input: O,
    stream: &'a mut dyn Write,
}

impl<'a, O: Operator> Print<'a, O> {
    pub fn new(input: O, stream: &'a mut dyn Write) -> Self {
        Self { input, stream }
    }
}

impl<'a, O: Operator> Operator for Print<'a, O> {
    fn open(&mut self) -> Result<()> {
        self.input.open()
    }

    fn next(&mut self) -> Result<bool> {
        if !self.input.next()? {
            return Ok(false);
        }
        let line = self
            .input
            .output()
            .iter()
            .map(Register::display)
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.stream, "{line}")?;
        Ok(true)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }

    fn output(&self) -> &[Register] {
        self.input.output()
    }
}
