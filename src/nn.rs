//! Parameter containers built on top of the graph: neurons, layers and multi-layer perceptrons.
//!
//! Parameters are ordinary leaf nodes of the caller's [`Graph`]. A container only remembers their
//! handles; every `forward` call appends a fresh expression to the same graph.

use std::fmt;

use log::debug;
use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};
use crate::{Graph, ScalarId};

/// Anything that owns trainable parameters.
pub trait Module {
    /// Handles of every parameter, in a stable order.
    fn parameters(&self) -> Vec<ScalarId>;

    /// Resets the gradient of every parameter to 0.
    fn zero_grad(&self, graph: &mut Graph) {
        for p in self.parameters() {
            graph.zero_grad(p);
        }
    }
}

/// Distribution the initial weights are drawn from. Biases always start at 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInit {
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std: f64 },
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::Uniform {
            low: -1.0,
            high: 1.0,
        }
    }
}

impl WeightInit {
    fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        match *self {
            WeightInit::Uniform { low, high } => {
                // Uniform::new panics when the span itself overflows.
                let span = high - low;
                if !(low.is_finite() && high.is_finite() && low < high && span.is_finite()) {
                    return Err(Error::Init(format!(
                        "uniform range [{}, {}) is empty or not finite",
                        low, high
                    )));
                }
                let dist = Uniform::new(low, high);
                Ok((0..n).map(|_| dist.sample(rng)).collect())
            }
            WeightInit::Normal { mean, std } => {
                // Normal::new only rejects a non-finite std; a negative one would mirror samples.
                if !(mean.is_finite() && std.is_finite() && std >= 0.0) {
                    return Err(Error::Init(format!(
                        "normal mean {} / std {} must be finite with std >= 0",
                        mean, std
                    )));
                }
                let dist = Normal::new(mean, std).map_err(|e| Error::Init(e.to_string()))?;
                Ok((0..n).map(|_| dist.sample(rng)).collect())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Neuron {
    weights: Vec<ScalarId>,
    bias: ScalarId,
    nonlin: bool,
}

impl Neuron {
    pub fn new<R: Rng + ?Sized>(
        graph: &mut Graph,
        nin: usize,
        nonlin: bool,
        init: &WeightInit,
        rng: &mut R,
    ) -> Result<Neuron> {
        let weights = init
            .sample_n(nin, rng)?
            .into_iter()
            .map(|w| graph.leaf(w))
            .collect();
        let bias = graph.leaf(0.0);
        Ok(Neuron {
            weights,
            bias,
            nonlin,
        })
    }

    /// Builds `Σ w_i * x_i + b`, rectified when the neuron is nonlinear.
    pub fn forward(&self, graph: &mut Graph, inputs: &[ScalarId]) -> Result<ScalarId> {
        if inputs.len() != self.weights.len() {
            return Err(Error::InputArity {
                expected: self.weights.len(),
                actual: inputs.len(),
            });
        }

        let mut act = graph.leaf(0.0);
        for (&w, &x) in self.weights.iter().zip(inputs) {
            let wx = graph.mul(w, x);
            act = graph.add(act, wx);
        }
        act = graph.add(act, self.bias);

        if self.nonlin {
            Ok(graph.relu(act))
        } else {
            Ok(act)
        }
    }

    pub fn nin(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[ScalarId] {
        &self.weights
    }

    pub fn bias(&self) -> ScalarId {
        self.bias
    }

    pub fn is_nonlinear(&self) -> bool {
        self.nonlin
    }
}

impl Module for Neuron {
    fn parameters(&self) -> Vec<ScalarId> {
        let mut params = self.weights.clone();
        params.push(self.bias);
        params
    }
}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.nonlin { "ReLU" } else { "Linear" };
        write!(f, "{}Neuron({})", kind, self.weights.len())
    }
}

/// A row of independent neurons sharing the same inputs.
#[derive(Debug, Clone)]
pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        graph: &mut Graph,
        nin: usize,
        nout: usize,
        nonlin: bool,
        init: &WeightInit,
        rng: &mut R,
    ) -> Result<Layer> {
        let neurons = (0..nout)
            .map(|_| Neuron::new(graph, nin, nonlin, init, rng))
            .collect::<Result<Vec<_>>>()?;
        debug!("layer {} -> {} (nonlin: {})", nin, nout, nonlin);
        Ok(Layer { neurons })
    }

    pub fn forward(&self, graph: &mut Graph, inputs: &[ScalarId]) -> Result<Vec<ScalarId>> {
        self.neurons
            .iter()
            .map(|n| n.forward(graph, inputs))
            .collect()
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }
}

impl Module for Layer {
    fn parameters(&self) -> Vec<ScalarId> {
        self.neurons.iter().flat_map(Neuron::parameters).collect()
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer of [")?;
        for (i, n) in self.neurons.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", n)?;
        }
        write!(f, "]")
    }
}

/// Stack of layers; every layer but the last is rectified.
#[derive(Debug, Clone)]
pub struct Mlp {
    layers: Vec<Layer>,
}

impl Mlp {
    pub fn new<R: Rng + ?Sized>(
        graph: &mut Graph,
        nin: usize,
        nouts: &[usize],
        init: &WeightInit,
        rng: &mut R,
    ) -> Result<Mlp> {
        let mut layers = Vec::with_capacity(nouts.len());
        let mut fan_in = nin;
        for (i, &nout) in nouts.iter().enumerate() {
            let nonlin = i + 1 != nouts.len();
            layers.push(Layer::new(graph, fan_in, nout, nonlin, init, rng)?);
            fan_in = nout;
        }
        Ok(Mlp { layers })
    }

    pub fn forward(&self, graph: &mut Graph, inputs: &[ScalarId]) -> Result<Vec<ScalarId>> {
        let mut x = inputs.to_vec();
        for layer in &self.layers {
            x = layer.forward(graph, &x)?;
        }
        Ok(x)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl Module for Mlp {
    fn parameters(&self) -> Vec<ScalarId> {
        self.layers.iter().flat_map(Layer::parameters).collect()
    }
}

impl fmt::Display for Mlp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MLP of [")?;
        for (i, l) in self.layers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", l)?;
        }
        write!(f, "]")
    }
}
