// Grounded in original_source's `Select` (algebra.h): one of three predicate
// shapes (attribute-vs-int-constant, attribute-vs-char16-constant,
// attribute-vs-attribute), unified here into a single `Predicate` enum
// instead of the three constructor overloads the C++ class uses to pick
// between its three private predicate fields.

use crate::error::Result;
use crate::execution::operator::Operator;
use crate::execution::register::{Register, CHAR16_LEN};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl PredicateOp {
    fn matches(self, ord: Ordering) -> bool {
        match self {
            PredicateOp::Eq => ord == Ordering::Equal,
            PredicateOp::Ne => ord != Ordering::Equal,
            PredicateOp::Lt => ord == Ordering::Less,
            PredicateOp::Le => ord != Ordering::Greater,
            PredicateOp::Gt => ord == Ordering::Greater,
            PredicateOp::Ge => ord != Ordering::Less,
        }
    }
}

pub enum Predicate {
    AttrConstInt {
        attr_index: usize,
        constant: i64,
        op: PredicateOp,
    },
    AttrConstChar16 {
        attr_index: usize,
        constant: [u8; CHAR16_LEN],
        op: PredicateOp,
    },
    AttrAttr {
        left_index: usize,
        right_index: usize,
        op: PredicateOp,
    },
}

impl Predicate {
    fn eval(&self, tuple: &[Register]) -> bool {
        match self {
            Predicate::AttrConstInt { attr_index, constant, op } => {
                let v = tuple[*attr_index].as_int().expect("predicate attribute is not INT64");
                op.matches(v.cmp(constant))
            }
            Predicate::AttrConstChar16 { attr_index, constant, op } => {
                let v = tuple[*attr_index]
                    .as_char16()
                    .expect("predicate attribute is not CHAR16");
                op.matches(v.cmp(constant))
            }
            Predicate::AttrAttr { left_index, right_index, op } => {
                op.matches(tuple[*left_index].cmp(&tuple[*right_index]))
            }
        }
    }
}

pub struct Select<O> {
    input: O,
    predicate: Predicate,
    current: Vec<Register>,
}

impl<O: Operator> Select<O> {
    pub fn new(input: O, predicate: Predicate) -> Self {
        Self {
            input,
            predicate,
            current: Vec::new(),
        }
    }
}

impl<O: Operator> Operator for Select<O> {
    fn open(&mut self) -> Result<()> {
        self.input.open()
    }

    fn next(&mut self) -> Result<bool> {
        loop {
            if !self.input.next()? {
                self.current.clear();
                return Ok(false);
            }
            if self.predicate.eval(self.input.output()) {
                self.current = self.input.output().to_vec();
                return Ok(true);
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }

    fn output(&self) -> &[Register] {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::test_support::VecOperator;

    fn rows() -> VecOperator {
        VecOperator::new(vec![
            vec![Register::from_int(1), Register::from_str("a")],
            vec![Register::from_int(2), Register::from_str("b")],
            vec![Register::from_int(3), Register::from_str("c")],
        ])
    }

    #[test]
    fn filters_by_int_constant() {
        let mut select = Select::new(
            rows(),
            Predicate::AttrConstInt {
                attr_index: 0,
                constant: 2,
                op: PredicateOp::Ge,
            },
        );
        select.open().unwrap();
        let mut seen = Vec::new();
        while select.next().unwrap() {
            seen.push(select.output()[0].as_int().unwrap());
        }
        assert_eq!(seen, vec![2, 3]);
    }

    #[test]
    fn filters_by_attr_attr() {
        let input = VecOperator::new(vec![
            vec![Register::from_int(1), Register::from_int(1)],
            vec![Register::from_int(1), Register::from_int(2)],
        ]);
        let mut select = Select::new(
            input,
            Predicate::AttrAttr {
                left_index: 0,
                right_index: 1,
                op: PredicateOp::Eq,
            },
        );
        select.open().unwrap();
        assert!(select.next().unwrap());
        assert!(!select.next().unwrap());
    }
}
