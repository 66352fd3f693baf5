// Grounded in original_source's `HashJoin` (algebra.h/algebra.cc): builds a
// `key -> [tuple]` table from the left child in `open` (the C++
// `unordered_map<Register, vector<Register>, RegisterHasher>`, generalized
// here to store whole tuples rather than single registers), then probes it
// per right tuple in `next`, buffering every left match before advancing.

use std::collections::{HashMap, VecDeque};

use crate::error::Result;
use crate::execution::operator::Operator;
use crate::execution::register::Register;

pub struct HashJoin<L, R> {
    left: L,
    right: R,
    key_left: usize,
    key_right: usize,
    table: HashMap<Register, Vec<Vec<Register>>>,
    pending: VecDeque<Vec<Register>>,
    current: Vec<Register>,
}

impl<L: Operator, R: Operator> HashJoin<L, R> {
    pub fn new(left: L, right: R, key_left: usize, key_right: usize) -> Self {
        Self {
            left,
            right,
            key_left,
            key_right,
            table: HashMap::new(),
            pending: VecDeque::new(),
            current: Vec::new(),
        }
    }
}

impl<L: Operator, R: Operator> Operator for HashJoin<L, R> {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.table.clear();
        while self.left.next()? {
            let tuple = self.left.output().to_vec();
            let key = tuple[self.key_left];
            self.table.entry(key).or_default().push(tuple);
        }
        self.right.open()?;
        self.pending.clear();
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        loop {
            if let Some(joined) = self.pending.pop_front() {
                self.current = joined;
                return Ok(true);
            }
            if !self.right.next()? {
                self.current.clear();
                return Ok(false);
            }
            let right_tuple = self.right.output();
            let key = right_tuple[self.key_right];
            if let Some(matches) = self.table.get(&key) {
                for left_tuple in matches {
                    let mut joined = left_tuple.clone();
                    joined.extend_from_slice(right_tuple);
                    self.pending.push_back(joined);
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.left.close()?;
        self.right.close()
    }

    fn output(&self) -> &[Register] {
        &self.current
    }
}
