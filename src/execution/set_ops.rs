// Grounded in original_source's `Union`/`UnionAll`/`Intersect`/`IntersectAll`/
// `Except`/`ExceptAll` (algebra.h/algebra.cc): binary operators over two
// inputs sharing a schema, materializing both sides in `open` and treating
// the whole tuple as the set/bag key. The original leaves `Union`/`UnionAll`
// bodies as `// TODO: add your implementation here`; this fills them in
// with the same `result`/`resultIndex` replay shape the other four classes
// already use.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::execution::operator::Operator;
use crate::execution::register::Register;

macro_rules! replay_operator {
    ($name:ident) => {
        impl<L: Operator, R: Operator> Operator for $name<L, R> {
            fn open(&mut self) -> Result<()> {
                self.left.open()?;
                self.right.open()?;
                self.rows = self.compute()?;
                self.index = None;
                Ok(())
            }

            fn next(&mut self) -> Result<bool> {
                let next_index = self.index.map_or(0, |i| i + 1);
                self.index = Some(next_index);
                Ok(next_index < self.rows.len())
            }

            fn close(&mut self) -> Result<()> {
                self.left.close()?;
                self.right.close()
            }

            fn output(&self) -> &[Register] {
                match self.index {
                    Some(i) if i < self.rows.len() => &self.rows[i],
                    _ => &[],
                }
            }
        }
    };
}

fn drain_rows<O: Operator>(op: &mut O) -> Result<Vec<Vec<Register>>> {
    let mut rows = Vec::new();
    while op.next()? {
        rows.push(op.output().to_vec());
    }
    Ok(rows)
}

pub struct Union<L, R> {
    left: L,
    right: R,
    rows: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl<L: Operator, R: Operator> Union<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            rows: Vec::new(),
            index: None,
        }
    }

    fn compute(&mut self) -> Result<Vec<Vec<Register>>> {
        let mut seen: HashSet<Vec<Register>> = HashSet::new();
        let mut rows = Vec::new();
        for t in drain_rows(&mut self.left)?.into_iter().chain(drain_rows(&mut self.right)?) {
            if seen.insert(t.clone()) {
                rows.push(t);
            }
        }
        Ok(rows)
    }
}
replay_operator!(Union);

pub struct UnionAll<L, R> {
    left: L,
    right: R,
    rows: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl<L: Operator, R: Operator> UnionAll<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            rows: Vec::new(),
            index: None,
        }
    }

    fn compute(&mut self) -> Result<Vec<Vec<Register>>> {
        let mut rows = drain_rows(&mut self.left)?;
        rows.extend(drain_rows(&mut self.right)?);
        Ok(rows)
    }
}
replay_operator!(UnionAll);

pub struct Intersect<L, R> {
    left: L,
    right: R,
    rows: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl<L: Operator, R: Operator> Intersect<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            rows: Vec::new(),
            index: None,
        }
    }

    fn compute(&mut self) -> Result<Vec<Vec<Register>>> {
        let left_set: HashSet<Vec<Register>> = drain_rows(&mut self.left)?.into_iter().collect();
        let mut emitted: HashSet<Vec<Register>> = HashSet::new();
        let mut rows = Vec::new();
        for t in drain_rows(&mut self.right)? {
            if left_set.contains(&t) && emitted.insert(t.clone()) {
                rows.push(t);
            }
        }
        Ok(rows)
    }
}
replay_operator!(Intersect);

pub struct IntersectAll<L, R> {
    left: L,
    right: R,
    rows: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl<L: Operator, R: Operator> IntersectAll<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            rows: Vec::new(),
            index: None,
        }
    }

    fn compute(&mut self) -> Result<Vec<Vec<Register>>> {
        let mut left_counts: HashMap<Vec<Register>, usize> = HashMap::new();
        for t in drain_rows(&mut self.left)? {
            *left_counts.entry(t).or_insert(0) += 1;
        }
        let mut rows = Vec::new();
        for t in drain_rows(&mut self.right)? {
            if let Some(c) = left_counts.get_mut(&t) {
                if *c > 0 {
                    *c -= 1;
                    rows.push(t);
                }
            }
        }
        Ok(rows)
    }
}
replay_operator!(IntersectAll);

pub struct Except<L, R> {
    left: L,
    right: R,
    rows: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl<L: Operator, R: Operator> Except<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            rows: Vec::new(),
            index: None,
        }
    }

    fn compute(&mut self) -> Result<Vec<Vec<Register>>> {
        let right_set: HashSet<Vec<Register>> = drain_rows(&mut self.right)?.into_iter().collect();
        let mut emitted: HashSet<Vec<Register>> = HashSet::new();
        let mut rows = Vec::new();
        for t in drain_rows(&mut self.left)? {
            if !right_set.contains(&t) && emitted.insert(t.clone()) {
                rows.push(t);
            }
        }
        Ok(rows)
    }
}
replay_operator!(Except);

pub struct ExceptAll<L, R> {
    left: L,
    right: R,
    rows: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl<L: Operator, R: Operator> ExceptAll<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            rows: Vec::new(),
            index: None,
        }
    }

    fn compute(&mut self) -> Result<Vec<Vec<Register>>> {
        let mut right_counts: HashMap<Vec<Register>, usize> = HashMap::new();
        for t in drain_rows(&mut self.right)? {
            *right_counts.entry(t).or_insert(0) += 1;
        }
        let mut rows = Vec::new();
        for t in drain_rows(&mut self.left)? {
            if let Some(c) = right_counts.get_mut(&t) {
                if *c > 0 {
                    *c -= 1;
                    continue;
                }
            }
            rows.push(t);
        }
        Ok(rows)
    }
}
replay_operator!(ExceptAll);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::test_support::VecOperator;

    fn ints(vals: &[i64]) -> VecOperator {
        VecOperator::new(vals.iter().map(|&v| vec![Register::from_int(v)]).collect())
    }

    fn collect_ints<O: Operator>(op: &mut O) -> Vec<i64> {
        let mut out = Vec::new();
        while op.next().unwrap() {
            out.push(op.output()[0].as_int().unwrap());
        }
        out.sort_unstable();
        out
    }

    #[test]
    fn union_dedups_across_both_sides() {
        let mut u = Union::new(ints(&[1, 2, 2]), ints(&[2, 3]));
        u.open().unwrap();
        assert_eq!(collect_ints(&mut u), vec![1, 2, 3]);
    }

    #[test]
    fn union_all_keeps_duplicates() {
        let mut u = UnionAll::new(ints(&[1, 2, 2]), ints(&[2, 3]));
        u.open().unwrap();
        assert_eq!(collect_ints(&mut u), vec![1, 2, 2, 2, 3]);
    }

    #[test]
    fn intersect_dedups() {
        let mut op = Intersect::new(ints(&[1, 2, 2, 3]), ints(&[2, 2, 3, 4]));
        op.open().unwrap();
        assert_eq!(collect_ints(&mut op), vec![2, 3]);
    }

    #[test]
    fn intersect_all_keeps_min_multiplicity() {
        let mut op = IntersectAll::new(ints(&[2, 2, 2, 3]), ints(&[2, 2, 4]));
        op.open().unwrap();
        assert_eq!(collect_ints(&mut op), vec![2, 2]);
    }

    #[test]
    fn except_dedups() {
        let mut op = Except::new(ints(&[1, 1, 2, 3]), ints(&[2]));
        op.open().unwrap();
        assert_eq!(collect_ints(&mut op), vec![1, 3]);
    }

    #[test]
    fn except_all_subtracts_multiplicity() {
        let mut op = ExceptAll::new(ints(&[2, 2, 2, 3]), ints(&[2]));
        op.open().unwrap();
        assert_eq!(collect_ints(&mut op), vec![2, 2, 3]);
    }
}
