// The operator contract. Grounded in original_source's `Operator`/
// `UnaryOperator`/`BinaryOperator` class hierarchy
// (task-5-operators/include/moderndbs/algebra.h), flattened to a single
// trait (a capability set of open/next/close/output) rather than a base
// class, since concrete operators hold their child(ren) by value as a
// generic field instead of a `Operator*` pointer.

use crate::error::Result;
use crate::execution::register::Register;

pub trait Operator {
    /// Initializes the operator, recursively opening its children.
    fn open(&mut self) -> Result<()>;

    /// Advances to the next tuple. Returns `false` at end of stream.
    fn next(&mut self) -> Result<bool>;

    /// Tears down the operator, recursively closing its children.
    fn close(&mut self) -> Result<()>;

    /// The tuple made current by the last `next() == true`.
    fn output(&self) -> &[Register];
}

impl Operator for Box<dyn Operator> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn next(&mut self) -> Result<bool> {
        (**self).next()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn output(&self) -> &[Register] {
        (**self).output()
    }
}
