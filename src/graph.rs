//! Arena of scalar nodes, the operation builders and the backward engine.
//!
//! Every node lives in a [`Graph`] and refers to its operands by [`ScalarId`]. Nodes are only
//! created from operands that already exist, so the graph is acyclic by construction and an
//! operand's index is always lower than its dependent's.

use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::scalar::{Scalar, ScalarId, ScalarOp};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Scalar>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node behind `id`, or `None` if the handle does not belong to this graph.
    pub fn node(&self, id: ScalarId) -> Option<&Scalar> {
        self.nodes.get(id.index())
    }

    pub fn value(&self, id: ScalarId) -> f64 {
        self.nodes[id.index()].val
    }

    pub fn grad(&self, id: ScalarId) -> f64 {
        self.nodes[id.index()].grad
    }

    pub fn op(&self, id: ScalarId) -> ScalarOp {
        self.nodes[id.index()].op()
    }

    pub fn operands(&self, id: ScalarId) -> &[ScalarId] {
        self.nodes[id.index()].operands()
    }

    /// Resets the gradient of a single node. Nothing is reset automatically.
    pub fn zero_grad(&mut self, id: ScalarId) {
        self.nodes[id.index()].grad = 0.0;
    }

    fn push(&mut self, node: Scalar) -> ScalarId {
        let id = ScalarId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Creates an input or parameter node. Any float is accepted, NaN and infinities included.
    pub fn leaf(&mut self, val: f64) -> ScalarId {
        self.push(Scalar::leaf(val))
    }

    pub fn add(&mut self, a: ScalarId, b: ScalarId) -> ScalarId {
        let val = self.value(a) + self.value(b);
        self.push(Scalar::with_operands(val, vec![a, b], ScalarOp::Add))
    }

    pub fn mul(&mut self, a: ScalarId, b: ScalarId) -> ScalarId {
        let val = self.value(a) * self.value(b);
        self.push(Scalar::with_operands(val, vec![a, b], ScalarOp::Mul))
    }

    /// Raises `a` to the constant `exponent`. No gradient flows into the exponent.
    pub fn pow(&mut self, a: ScalarId, exponent: f64) -> ScalarId {
        let val = self.value(a).powf(exponent);
        self.push(Scalar::with_operands(val, vec![a], ScalarOp::Pow(exponent)))
    }

    /// Rectified linear unit, `max(0, a)`.
    pub fn relu(&mut self, a: ScalarId) -> ScalarId {
        let input = self.value(a);
        // NaN must stay NaN, so no f64::max here.
        let val = if input < 0.0 { 0.0 } else { input };
        self.push(Scalar::with_operands(val, vec![a], ScalarOp::Relu))
    }

    pub fn neg(&mut self, a: ScalarId) -> ScalarId {
        let minus_one = self.leaf(-1.0);
        self.mul(a, minus_one)
    }

    pub fn sub(&mut self, a: ScalarId, b: ScalarId) -> ScalarId {
        let neg_b = self.neg(b);
        self.add(a, neg_b)
    }

    pub fn div(&mut self, a: ScalarId, b: ScalarId) -> ScalarId {
        let inv_b = self.pow(b, -1.0);
        self.mul(a, inv_b)
    }

    /// Adds up `terms` as a left fold starting from a zero leaf.
    pub fn sum<I>(&mut self, terms: I) -> ScalarId
    where
        I: IntoIterator<Item = ScalarId>,
    {
        let zero = self.leaf(0.0);
        terms.into_iter().fold(zero, |acc, term| self.add(acc, term))
    }

    /// Lists every node reachable from `root` exactly once, operands before their dependents.
    ///
    /// `root` is always the last entry.
    pub fn topo_order(&self, root: ScalarId) -> Vec<ScalarId> {
        let mut visited = vec![false; root.index() + 1];
        let mut order = Vec::new();
        // (node, operands already scheduled)
        let mut stack = vec![(root, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if visited[id.index()] {
                continue;
            }
            visited[id.index()] = true;
            stack.push((id, true));
            for &operand in self.operands(id).iter().rev() {
                if !visited[operand.index()] {
                    stack.push((operand, false));
                }
            }
        }

        order
    }

    /// Computes d`root`/d`node` for every node reachable from `root`.
    ///
    /// The root gradient is overwritten with 1, every other gradient is accumulated into. Running
    /// this twice over shared nodes without [`Graph::zero_grad`] in between sums both passes.
    pub fn backward(&mut self, root: ScalarId) {
        let order = self.topo_order(root);
        self.run_backward(root, &order);
    }

    /// Like [`Graph::backward`], but refuses to start if a reachable node still carries a
    /// gradient from an earlier pass. Gradients are left untouched on error.
    pub fn backward_checked(&mut self, root: ScalarId) -> Result<()> {
        let order = self.topo_order(root);
        if let Some(&node) = order.iter().find(|id| self.grad(**id) != 0.0) {
            warn!("backward from {} refused: {} still holds a gradient", root, node);
            return Err(Error::StaleGradient {
                node,
                grad: self.grad(node),
            });
        }
        self.run_backward(root, &order);
        Ok(())
    }

    fn run_backward(&mut self, root: ScalarId, order: &[ScalarId]) {
        debug!("backward from {} over {} nodes", root, order.len());
        self.nodes[root.index()].grad = 1.0;
        for &id in order.iter().rev() {
            self.propagate(id);
        }
    }

    /// Adds the local contribution of `id` into the gradients of its operands.
    fn propagate(&mut self, id: ScalarId) {
        let node = &self.nodes[id.index()];
        let upstream = node.grad;
        let contributions: [Option<(ScalarId, f64)>; 2] = match (node.op(), node.operands()) {
            (ScalarOp::Leaf, _) => return,
            (ScalarOp::Add, &[a, b]) => [Some((a, upstream)), Some((b, upstream))],
            (ScalarOp::Mul, &[a, b]) => {
                // Both multiplicands are read before any gradient is written; with a == b the
                // second contribution must not see the first.
                let a_val = self.nodes[a.index()].val;
                let b_val = self.nodes[b.index()].val;
                [Some((a, b_val * upstream)), Some((b, a_val * upstream))]
            }
            (ScalarOp::Pow(k), &[a]) => {
                let a_val = self.nodes[a.index()].val;
                [Some((a, k * a_val.powf(k - 1.0) * upstream)), None]
            }
            (ScalarOp::Relu, &[a]) => {
                let local = if node.val > 0.0 { upstream } else { 0.0 };
                [Some((a, local)), None]
            }
            (op, operands) => unreachable!("{:?} node built with {} operands", op, operands.len()),
        };

        trace!("propagate {} ({}) grad {}", id, node.op(), upstream);
        for (target, delta) in contributions.into_iter().flatten() {
            self.nodes[target.index()].grad += delta;
        }
    }
}
