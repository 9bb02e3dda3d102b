use std::fmt;

/// Handle to a node stored in a [`Graph`](crate::Graph).
///
/// Handles are plain arena indices. They compare by identity, never by value, and are only
/// meaningful for the graph that handed them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScalarId(usize);

impl ScalarId {
    pub(crate) fn new(index: usize) -> ScalarId {
        ScalarId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ScalarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The operation that produced a node.
///
/// The backward engine dispatches on this tag instead of calling a per-node closure.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ScalarOp {
    Leaf,
    Add,
    Mul,
    /// Raise to a constant exponent. The exponent is not part of the graph.
    Pow(f64),
    Relu,
}

impl ScalarOp {
    /// Number of operands a node of this kind links to.
    pub fn arity(&self) -> usize {
        match self {
            ScalarOp::Leaf => 0,
            ScalarOp::Pow(_) | ScalarOp::Relu => 1,
            ScalarOp::Add | ScalarOp::Mul => 2,
        }
    }
}

impl fmt::Display for ScalarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarOp::Leaf => write!(f, ""),
            ScalarOp::Add => write!(f, "+"),
            ScalarOp::Mul => write!(f, "*"),
            ScalarOp::Pow(k) => write!(f, "**{}", k),
            ScalarOp::Relu => write!(f, "ReLU"),
        }
    }
}

/// One value in the computation together with its gradient accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub(crate) val: f64,
    pub(crate) grad: f64,
    operands: Vec<ScalarId>,
    op: ScalarOp,
}

impl Scalar {
    pub(crate) fn leaf(val: f64) -> Scalar {
        Scalar::with_operands(val, Vec::new(), ScalarOp::Leaf)
    }

    pub(crate) fn with_operands(val: f64, operands: Vec<ScalarId>, op: ScalarOp) -> Scalar {
        debug_assert_eq!(operands.len(), op.arity());
        Scalar {
            val,
            grad: 0.0,
            operands,
            op,
        }
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    pub fn grad(&self) -> f64 {
        self.grad
    }

    pub fn operands(&self) -> &[ScalarId] {
        &self.operands
    }

    pub fn op(&self) -> ScalarOp {
        self.op
    }

    pub fn is_leaf(&self) -> bool {
        self.operands.is_empty()
    }
}
