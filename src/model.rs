//! Fixed-topology three-layer perceptron.
//!
//! `input_size → hidden_size → bottleneck_size → output_size`, no activations.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub const DEFAULT_HIDDEN_SIZE: usize = 10_000;
pub const DEFAULT_BOTTLENECK_SIZE: usize = 1_000;

/// Layer sizes for an [`Mlp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlpConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub bottleneck_size: usize,
    pub output_size: usize,
}

impl MlpConfig {
    /// `input_size → 10000 → 1000 → output_size`.
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            bottleneck_size: DEFAULT_BOTTLENECK_SIZE,
            output_size,
        }
    }

    pub fn with_hidden_sizes(mut self, hidden_size: usize, bottleneck_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self.bottleneck_size = bottleneck_size;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let dims = [
            ("input_size", self.input_size),
            ("hidden_size", self.hidden_size),
            ("bottleneck_size", self.bottleneck_size),
            ("output_size", self.output_size),
        ];
        for (name, dim) in dims {
            if dim == 0 {
                return Err(ModelError::ZeroDimension { name });
            }
        }
        Ok(())
    }

    /// Allocate a freshly initialized module on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Mlp<B>, ModelError> {
        self.validate()?;
        Ok(Mlp {
            fc1: LinearConfig::new(self.input_size, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.bottleneck_size).init(device),
            fc3: LinearConfig::new(self.bottleneck_size, self.output_size).init(device),
            input_size: self.input_size,
            output_size: self.output_size,
        })
    }
}

/// The network module: three chained linear layers.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    input_size: usize,
    output_size: usize,
}

impl<B: Backend> Mlp<B> {
    /// `fc3(fc2(fc1(x)))` over a `[batch, input_size]` matrix.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.fc3.forward(self.fc2.forward(self.fc1.forward(x)))
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// `[d_input, d_output]` of fc1, fc2 and fc3, read from the weights.
    pub fn layer_dims(&self) -> [(&'static str, [usize; 2]); 3] {
        [
            ("fc1", self.fc1.weight.val().dims()),
            ("fc2", self.fc2.weight.val().dims()),
            ("fc3", self.fc3.weight.val().dims()),
        ]
    }

    /// The configuration this module was built from.
    pub fn config(&self) -> MlpConfig {
        let [(_, fc1), (_, fc2), _] = self.layer_dims();
        MlpConfig {
            input_size: self.input_size,
            hidden_size: fc1[1],
            bottleneck_size: fc2[1],
            output_size: self.output_size,
        }
    }
}
