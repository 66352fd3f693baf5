// Grounded in original_source's `Sort` (algebra.h/algebra.cc): materializes
// the child fully in `open`, then replays it in sorted order. The original
// comments out a hand-rolled quicksort (`isLess`/`partition`/`swap`); this
// version uses a multi-key comparator with `slice::sort_by`, matching the
// teacher's preference for standard-library sorting over hand-rolled
// algorithms elsewhere in the codebase.

use crate::error::Result;
use crate::execution::operator::Operator;
use crate::execution::register::Register;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
pub struct Criterion {
    pub attr_index: usize,
    pub descending: bool,
}

pub struct Sort<O> {
    input: O,
    criteria: Vec<Criterion>,
    tuples: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl<O: Operator> Sort<O> {
    pub fn new(input: O, criteria: Vec<Criterion>) -> Self {
        Self {
            input,
            criteria,
            tuples: Vec::new(),
            index: None,
        }
    }
}

impl<O: Operator> Operator for Sort<O> {
    fn open(&mut self) -> Result<()> {
        self.input.open()?;
        self.tuples.clear();
        while self.input.next()? {
            self.tuples.push(self.input.output().to_vec());
        }
        self.tuples.sort_by(|a, b| {
            for c in &self.criteria {
                let ord = a[c.attr_index].cmp(&b[c.attr_index]);
                let ord = if c.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        self.index = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        let next_index = self.index.map_or(0, |i| i + 1);
        self.index = Some(next_index);
        Ok(next_index < self.tuples.len())
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }

    fn output(&self) -> &[Register] {
        match self.index {
            Some(i) if i < self.tuples.len() => &self.tuples[i],
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::test_support::VecOperator;

    #[test]
    fn sorts_by_single_ascending_key() {
        let input = VecOperator::new(vec![
            vec![Register::from_int(3)],
            vec![Register::from_int(1)],
            vec![Register::from_int(2)],
        ]);
        let mut sort = Sort::new(
            input,
            vec![Criterion {
                attr_index: 0,
                descending: false,
            }],
        );
        sort.open().unwrap();
        let mut out = Vec::new();
        while sort.next().unwrap() {
            out.push(sort.output()[0].as_int().unwrap());
        }
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn sorts_by_multiple_keys_with_mixed_direction() {
        let input = VecOperator::new(vec![
            vec![Register::from_int(1), Register::from_int(2)],
            vec![Register::from_int(1), Register::from_int(1)],
            vec![Register::from_int(0), Register::from_int(9)],
        ]);
        let mut sort = Sort::new(
            input,
            vec![
                Criterion {
                    attr_index: 0,
                    descending: false,
                },
                Criterion {
                    attr_index: 1,
                    descending: true,
                },
            ],
        );
        sort.open().unwrap();
        let mut out = Vec::new();
        while sort.next().unwrap() {
            out.push((sort.output()[0].as_int().unwrap(), sort.output()[1].as_int().unwrap()));
        }
        assert_eq!(out, vec![(0, 9), (1, 2), (1, 1)]);
    }
}
