//! Backward pass correctness: local rules per operation, gradient accumulation over shared
//! operands, traversal order, and the explicit reset contract.

use approx::assert_relative_eq;

use crate::{Error, Graph, ScalarOp};

#[test]
fn leaf_identity() {
    let mut g = Graph::new();
    let a = g.leaf(7.25);
    assert_eq!(g.value(a), 7.25);
    assert_eq!(g.grad(a), 0.0);
    assert_eq!(g.op(a), ScalarOp::Leaf);
    assert!(g.operands(a).is_empty());
}

#[test]
fn add_backward() {
    let mut g = Graph::new();
    let a = g.leaf(1.0);
    let b = g.leaf(2.0);
    let s = g.add(a, b);
    assert_eq!(g.value(s), 3.0);
    g.backward(s);
    assert_eq!(g.grad(s), 1.0);
    assert_eq!(g.grad(a), 1.0);
    assert_eq!(g.grad(b), 1.0);
}

#[test]
fn mul_backward() {
    let mut g = Graph::new();
    let a = g.leaf(3.0);
    let b = g.leaf(4.0);
    let p = g.mul(a, b);
    assert_eq!(g.value(p), 12.0);
    g.backward(p);
    assert_eq!(g.grad(a), 4.0);
    assert_eq!(g.grad(b), 3.0);
}

#[test]
fn pow_backward() {
    let mut g = Graph::new();
    let a = g.leaf(2.0);
    let q = g.pow(a, 3.0);
    assert_eq!(g.value(q), 8.0);
    g.backward(q);
    assert_eq!(g.grad(a), 12.0);
    assert_eq!(g.op(q).to_string(), "**3");
}

#[test]
fn relu_negative_is_gated() {
    let mut g = Graph::new();
    let a = g.leaf(-5.0);
    let r = g.relu(a);
    assert_eq!(g.value(r), 0.0);
    g.backward(r);
    assert_eq!(g.grad(a), 0.0);
}

#[test]
fn relu_positive_passes_through() {
    let mut g = Graph::new();
    let a = g.leaf(5.0);
    let r = g.relu(a);
    assert_eq!(g.value(r), 5.0);
    g.backward(r);
    assert_eq!(g.grad(a), 1.0);
}

#[test]
fn relu_at_zero_is_inactive() {
    let mut g = Graph::new();
    let a = g.leaf(0.0);
    let r = g.relu(a);
    g.backward(r);
    assert_eq!(g.grad(a), 0.0);
}

#[test]
fn mul_of_node_with_itself_uses_values() {
    // d/dx x*x = 2x; reading the already-updated gradient instead of the value would give 3x + 9x^2.
    let mut g = Graph::new();
    let x = g.leaf(3.0);
    let sq = g.mul(x, x);
    g.backward(sq);
    assert_eq!(g.grad(x), 6.0);
}

#[test]
fn shared_operand_sums_all_paths() {
    // y = x*x + x, dy/dx = 2x + 1
    let mut g = Graph::new();
    let x = g.leaf(3.0);
    let sq = g.mul(x, x);
    let y = g.add(sq, x);
    assert_eq!(g.value(y), 12.0);
    g.backward(y);
    assert_eq!(g.grad(x), 7.0);
    assert_eq!(g.grad(sq), 1.0);
}

#[test]
fn diamond_accumulates() {
    // b and c both depend on a; d = b * c with b = a + 1, c = a * 2
    let mut g = Graph::new();
    let a = g.leaf(2.0);
    let one = g.leaf(1.0);
    let two = g.leaf(2.0);
    let b = g.add(a, one);
    let c = g.mul(a, two);
    let d = g.mul(b, c);
    assert_eq!(g.value(d), 12.0);
    g.backward(d);
    // dd/da = c * 1 + b * 2 = 4 + 6
    assert_eq!(g.grad(a), 10.0);
    assert_eq!(g.grad(b), 4.0);
    assert_eq!(g.grad(c), 3.0);
}

#[test]
fn chain_through_every_op() {
    // loss = relu(a * b + c) ** 2 with a=1, b=2, c=-1 -> inner 1
    let mut g = Graph::new();
    let a = g.leaf(1.0);
    let b = g.leaf(2.0);
    let c = g.leaf(-1.0);
    let ab = g.mul(a, b);
    let inner = g.add(ab, c);
    let r = g.relu(inner);
    let loss = g.pow(r, 2.0);
    assert_eq!(g.value(loss), 1.0);
    g.backward(loss);
    // dloss/dinner = 2 * 1
    assert_relative_eq!(g.grad(a), 4.0);
    assert_relative_eq!(g.grad(b), 2.0);
    assert_relative_eq!(g.grad(c), 2.0);
}

#[test]
fn leaf_root_gets_unit_gradient() {
    let mut g = Graph::new();
    let a = g.leaf(42.0);
    g.backward(a);
    assert_eq!(g.grad(a), 1.0);
    assert_eq!(g.topo_order(a), vec![a]);
}

#[test]
fn root_gradient_is_overwritten_not_accumulated() {
    let mut g = Graph::new();
    let a = g.leaf(1.0);
    let b = g.leaf(2.0);
    let s = g.add(a, b);
    g.backward(s);
    g.backward(s);
    assert_eq!(g.grad(s), 1.0);
    assert_eq!(g.grad(a), 2.0);
}

#[test]
fn topo_order_visits_each_node_once() {
    let mut g = Graph::new();
    let x = g.leaf(1.5);
    let sq = g.mul(x, x);
    let twice = g.add(sq, sq);
    let y = g.add(twice, x);
    let order = g.topo_order(y);

    assert_eq!(order.len(), 4);
    assert_eq!(*order.last().unwrap(), y);
    for (pos, id) in order.iter().enumerate() {
        assert_eq!(order.iter().filter(|other| *other == id).count(), 1);
        for operand in g.operands(*id) {
            let operand_pos = order.iter().position(|o| o == operand).unwrap();
            assert!(operand_pos < pos, "{} must come before {}", operand, id);
        }
    }
}

#[test]
fn topo_order_ignores_unreachable_nodes() {
    let mut g = Graph::new();
    let a = g.leaf(1.0);
    let b = g.leaf(2.0);
    let unrelated = g.leaf(9.0);
    let s = g.add(a, b);
    let _other = g.mul(unrelated, a);
    let order = g.topo_order(s);
    assert_eq!(order.len(), 3);
    assert!(!order.contains(&unrelated));

    g.backward(s);
    assert_eq!(g.grad(unrelated), 0.0);
}

#[test]
fn repeated_backward_without_reset_doubles() {
    let mut g = Graph::new();
    let a = g.leaf(3.0);
    let b = g.leaf(4.0);
    let p = g.mul(a, b);
    g.backward(p);
    g.backward(p);
    assert_eq!(g.grad(a), 8.0);
    assert_eq!(g.grad(b), 6.0);

    g.zero_grad(a);
    g.zero_grad(b);
    g.backward(p);
    assert_eq!(g.grad(a), 4.0);
    assert_eq!(g.grad(b), 3.0);
}

#[test]
fn backward_checked_rejects_stale_gradients() {
    let mut g = Graph::new();
    let a = g.leaf(3.0);
    let b = g.leaf(4.0);
    let p = g.mul(a, b);
    assert_eq!(g.backward_checked(p), Ok(()));
    assert_eq!(g.grad(a), 4.0);

    let err = g.backward_checked(p).unwrap_err();
    assert!(matches!(err, Error::StaleGradient { .. }));
    // untouched on failure
    assert_eq!(g.grad(a), 4.0);
    assert_eq!(g.grad(b), 3.0);

    for id in [a, b, p] {
        g.zero_grad(id);
    }
    assert_eq!(g.backward_checked(p), Ok(()));
    assert_eq!(g.grad(a), 4.0);
}

#[test]
fn derived_ops() {
    let mut g = Graph::new();
    let a = g.leaf(6.0);
    let b = g.leaf(2.0);

    let n = g.neg(a);
    assert_eq!(g.value(n), -6.0);

    let d = g.sub(a, b);
    assert_eq!(g.value(d), 4.0);
    g.backward(d);
    assert_eq!(g.grad(a), 1.0);
    assert_eq!(g.grad(b), -1.0);

    g.zero_grad(a);
    g.zero_grad(b);
    let q = g.div(a, b);
    assert_eq!(g.value(q), 3.0);
    g.backward(q);
    assert_relative_eq!(g.grad(a), 0.5);
    // d/db a/b = -a/b^2
    assert_relative_eq!(g.grad(b), -1.5);
}

#[test]
fn sum_folds_from_zero() {
    let mut g = Graph::new();
    let terms: Vec<_> = [1.0, 2.0, 3.5].into_iter().map(|v| g.leaf(v)).collect();
    let total = g.sum(terms.iter().copied());
    assert_eq!(g.value(total), 6.5);
    g.backward(total);
    for t in terms {
        assert_eq!(g.grad(t), 1.0);
    }

    let empty = g.sum(std::iter::empty());
    assert_eq!(g.value(empty), 0.0);
}

#[test]
fn non_finite_values_flow_through() {
    let mut g = Graph::new();
    let zero = g.leaf(0.0);
    let inv = g.pow(zero, -1.0);
    assert!(g.value(inv).is_infinite());

    let nan = g.leaf(f64::NAN);
    let r = g.relu(nan);
    assert!(g.value(r).is_nan());
    g.backward(r);
    assert_eq!(g.grad(nan), 0.0);
}

#[test]
fn foreign_handle_is_not_found() {
    let mut big = Graph::new();
    big.leaf(1.0);
    let far = big.leaf(2.0);
    let small = Graph::new();
    assert!(small.node(far).is_none());
    assert!(small.is_empty());
    assert_eq!(big.len(), 2);
}
