// Grounded in original_source's `HashAggregation` (algebra.h/algebra.cc):
// `AggrFunc` with `{MIN, MAX, SUM, COUNT}` over one attribute index, built
// by draining the child in `open` and hashing by the `group_by` projection.
// The empty-input/empty-`group_by` edge case (the spec's "COUNT of empty
// input is 0") is resolved here by still emitting the single implicit
// group's row; since MIN/MAX/SUM have no defined value over zero rows,
// they default to `Int64(0)` in that case, matching a `COUNT(*)`-only query
// over an empty table rather than leaving those columns undefined.

use std::collections::HashMap;

use crate::error::Result;
use crate::execution::operator::Operator;
use crate::execution::register::Register;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggrFunc {
    Min,
    Max,
    Sum,
    Count,
}

#[derive(Debug, Clone, Copy)]
pub struct Aggregate {
    pub func: AggrFunc,
    pub attr_index: usize,
}

enum AccState {
    MinMax(Option<Register>),
    Sum(i64),
    Count(i64),
}

impl AccState {
    fn init(func: AggrFunc) -> Self {
        match func {
            AggrFunc::Min | AggrFunc::Max => AccState::MinMax(None),
            AggrFunc::Sum => AccState::Sum(0),
            AggrFunc::Count => AccState::Count(0),
        }
    }

    fn accumulate(&mut self, func: AggrFunc, value: Register) {
        match (self, func) {
            (AccState::MinMax(acc), AggrFunc::Min) => {
                *acc = Some(match *acc {
                    Some(a) if a <= value => a,
                    _ => value,
                });
            }
            (AccState::MinMax(acc), AggrFunc::Max) => {
                *acc = Some(match *acc {
                    Some(a) if a >= value => a,
                    _ => value,
                });
            }
            (AccState::Sum(total), AggrFunc::Sum) => {
                *total += value.as_int().expect("SUM requires an INT64 attribute");
            }
            (AccState::Count(count), AggrFunc::Count) => {
                *count += 1;
            }
            (state, func) => unreachable!("aggregate state/function mismatch: {func:?} on {state:?}"),
        }
    }

    fn finalize(self) -> Register {
        match self {
            AccState::MinMax(v) => v.unwrap_or(Register::Int64(0)),
            AccState::Sum(v) => Register::Int64(v),
            AccState::Count(v) => Register::Int64(v),
        }
    }
}

impl std::fmt::Debug for AccState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccState::MinMax(v) => write!(f, "MinMax({v:?})"),
            AccState::Sum(v) => write!(f, "Sum({v})"),
            AccState::Count(v) => write!(f, "Count({v})"),
        }
    }
}

pub struct HashAggregation<O> {
    input: O,
    group_by: Vec<usize>,
    aggregates: Vec<Aggregate>,
    rows: Vec<Vec<Register>>,
    index: Option<usize>,
}

impl<O: Operator> HashAggregation<O> {
    pub fn new(input: O, group_by: Vec<usize>, aggregates: Vec<Aggregate>) -> Self {
        Self {
            input,
            group_by,
            aggregates,
            rows: Vec::new(),
            index: None,
        }
    }
}

impl<O: Operator> Operator for HashAggregation<O> {
    fn open(&mut self) -> Result<()> {
        self.input.open()?;

        let mut groups: Vec<(Vec<Register>, Vec<AccState>)> = Vec::new();
        let mut index: HashMap<Vec<Register>, usize> = HashMap::new();

        while self.input.next()? {
            let tuple = self.input.output();
            let key: Vec<Register> = self.group_by.iter().map(|&i| tuple[i]).collect();

            let gi = match index.get(&key) {
                Some(&i) => i,
                None => {
                    let states = self.aggregates.iter().map(|a| AccState::init(a.func)).collect();
                    groups.push((key.clone(), states));
                    let i = groups.len() - 1;
                    index.insert(key, i);
                    i
                }
            };

            for (agg, state) in self.aggregates.iter().zip(groups[gi].1.iter_mut()) {
                state.accumulate(agg.func, tuple[agg.attr_index]);
            }
        }

        if groups.is_empty() && self.group_by.is_empty() {
            let states = self.aggregates.iter().map(|a| AccState::init(a.func)).collect();
            groups.push((Vec::new(), states));
        }

        self.rows = groups
            .into_iter()
            .map(|(key, states)| {
                let mut row = key;
                row.extend(states.into_iter().map(AccState::finalize));
                row
            })
            .collect();
        self.index = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        let next_index = self.index.map_or(0, |i| i + 1);
        self.index = Some(next_index);
        Ok(next_index < self.rows.len())
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }

    fn output(&self) -> &[Register] {
        match self.index {
            Some(i) if i < self.rows.len() => &self.rows[i],
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::test_support::VecOperator;
    use std::collections::HashSet;

    #[test]
    fn groups_and_sums_per_key() {
        let input = VecOperator::new(vec![
            vec![Register::from_int(1), Register::from_int(10)],
            vec![Register::from_int(1), Register::from_int(20)],
            vec![Register::from_int(2), Register::from_int(5)],
        ]);
        let mut agg = HashAggregation::new(
            input,
            vec![0],
            vec![Aggregate {
                func: AggrFunc::Sum,
                attr_index: 1,
            }],
        );
        agg.open().unwrap();

        let mut got = HashSet::new();
        while agg.next().unwrap() {
            let row = agg.output();
            got.insert((row[0].as_int().unwrap(), row[1].as_int().unwrap()));
        }
        assert_eq!(got, HashSet::from([(1, 30), (2, 5)]));
    }

    #[test]
    fn empty_group_by_is_single_implicit_group() {
        let input = VecOperator::new(vec![
            vec![Register::from_int(10)],
            vec![Register::from_int(20)],
            vec![Register::from_int(30)],
        ]);
        let mut agg = HashAggregation::new(
            input,
            vec![],
            vec![
                Aggregate {
                    func: AggrFunc::Count,
                    attr_index: 0,
                },
                Aggregate {
                    func: AggrFunc::Sum,
                    attr_index: 0,
                },
            ],
        );
        agg.open().unwrap();
        assert!(agg.next().unwrap());
        assert_eq!(agg.output()[0].as_int().unwrap(), 3);
        assert_eq!(agg.output()[1].as_int().unwrap(), 60);
        assert!(!agg.next().unwrap());
    }

    #[test]
    fn count_of_empty_input_is_zero() {
        let input = VecOperator::new(vec![]);
        let mut agg = HashAggregation::new(
            input,
            vec![],
            vec![Aggregate {
                func: AggrFunc::Count,
                attr_index: 0,
            }],
        );
        agg.open().unwrap();
        assert!(agg.next().unwrap());
        assert_eq!(agg.output()[0].as_int().unwrap(), 0);
        assert!(!agg.next().unwrap());
    }

    #[test]
    fn nonempty_group_by_over_empty_input_yields_no_rows() {
        let input = VecOperator::new(vec![]);
        let mut agg = HashAggregation::new(
            input,
            vec![0],
            vec![Aggregate {
                func: AggrFunc::Count,
                attr_index: 0,
            }],
        );
        agg.open().unwrap();
        assert!(!agg.next().unwrap());
    }
}
