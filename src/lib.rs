//! Reverse-mode automatic differentiation over scalar values.
//!
//! Arithmetic on a [`Graph`] records every intermediate result as a node. [`Graph::backward`]
//! then walks the recorded graph from an output node and accumulates `d output / d node` into
//! every node it can reach.
//!
//! ```
//! use scalargrad::Graph;
//!
//! let mut g = Graph::new();
//! let x = g.leaf(3.0);
//! let sq = g.mul(x, x);
//! let y = g.add(sq, x);
//! g.backward(y);
//! assert_eq!(g.grad(x), 7.0);
//! ```

pub mod error;
pub mod graph;
pub mod nn;
pub mod render;
pub mod scalar;

pub use error::{Error, Result};
pub use graph::Graph;
pub use nn::{Layer, Mlp, Module, Neuron, WeightInit};
pub use render::ScalarView;
pub use scalar::{Scalar, ScalarId, ScalarOp};
