//! A fixed in-memory `Operator` used only by this module's own unit tests,
//! standing in for a table scan.

use crate::error::Result;
use crate::execution::operator::Operator;
use crate::execution::register::Register;

pub struct VecOperator {
    rows: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl VecOperator {
    pub fn new(rows: Vec<Vec<Register>>) -> Self {
        Self { rows, index: None }
    }
}

impl Operator for VecOperator {
    fn open(&mut self) -> Result<()> {
        self.index = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        let next_index = self.index.map_or(0, |i| i + 1);
        self.index = Some(next_index);
        Ok(next_index < self.rows.len())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn output(&self) -> &[Register] {
        match self.index {
            Some(i) if i < self.rows.len() => &self.rows[i],
            _ => &[],
        }
    }
}
