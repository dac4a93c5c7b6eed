use crate::cost::quadratic_cost_derivative;
use crate::error::Result;
use crate::network::{Network, check_shape, sigmoid, sigmoid_derivative};
use itertools::izip;
use ndarray::{Array, Array2};

/// Gradients of the quadratic cost with respect to every weight and bias of a network. The same
/// type serves as the per-example result of backpropagation and as the per-batch accumulator.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    pub nabla_weights: Vec<Array2<f64>>,
    pub nabla_biases: Vec<Array2<f64>>,
}

impl Gradients {
    // Zero-initialized matrices matching the size of the network's weights and biases matrices.
    pub fn zeros_like(network: &Network) -> Gradients {
        Gradients {
            nabla_weights: network
                .weights
                .iter()
                .map(|weight| Array::zeros(weight.raw_dim()))
                .collect(),
            nabla_biases: network
                .biases
                .iter()
                .map(|bias| Array::zeros(bias.raw_dim()))
                .collect(),
        }
    }

    pub fn accumulate(&mut self, other: &Gradients) {
        for (sum, nabla) in self.nabla_weights.iter_mut().zip(other.nabla_weights.iter()) {
            *sum += nabla;
        }
        for (sum, nabla) in self.nabla_biases.iter_mut().zip(other.nabla_biases.iter()) {
            *sum += nabla;
        }
    }
}

// Everything the forward pass produced for a single example. It only lives for the duration of
// one backpropagation call.
struct ActivationTrace {
    // activations[0] is the input, activations[num_layers - 1] the output.
    activations: Vec<Array2<f64>>,
    // zs[i] is the weighted input of layer i + 1 before the sigmoid was applied.
    zs: Vec<Array2<f64>>,
}

impl Network {
    // Calculate the gradients of the quadratic cost for a single (input, expected output) pair.
    pub fn backpropagate(
        &self,
        input: &Array2<f64>,
        expected_output: &Array2<f64>,
    ) -> Result<Gradients> {
        check_shape("input", input, (1, self.input_size()))?;
        check_shape("expected output", expected_output, (1, self.output_size()))?;

        let ActivationTrace { activations, zs } = self.trace(input);
        let last = self.weights.len() - 1;

        let mut nabla_weights = Vec::with_capacity(self.weights.len());
        let mut nabla_biases = Vec::with_capacity(self.biases.len());

        // Output layer error: δ = (a - y) ⊙ σ'(z).
        let error = quadratic_cost_derivative(&activations[last + 1], expected_output);
        let mut delta = error * zs[last].mapv(sigmoid_derivative);
        nabla_weights.push(activations[last].t().dot(&delta));
        nabla_biases.push(delta.clone());

        // Walk backwards through the remaining layers, pushing the error through the transpose of
        // the weights that follow each layer. The gradients are collected from the output end and
        // reversed at the end.
        for i in (0..last).rev() {
            delta = delta.dot(&self.weights[i + 1].t()) * zs[i].mapv(sigmoid_derivative);
            nabla_weights.push(activations[i].t().dot(&delta));
            nabla_biases.push(delta.clone());
        }

        nabla_weights.reverse();
        nabla_biases.reverse();

        Ok(Gradients {
            nabla_weights,
            nabla_biases,
        })
    }

    // The forward pass of backpropagation, which unlike feedforward keeps every intermediate
    // array around. The input shape has already been checked.
    fn trace(&self, input: &Array2<f64>) -> ActivationTrace {
        let mut activation = input.clone();
        let mut activations = Vec::with_capacity(self.num_layers());
        let mut zs = Vec::with_capacity(self.num_layers() - 1);

        // Pushing the activation moves it, so the next activation is computed from the weighted
        // input before the previous one is stored.
        for (weight, bias) in izip!(&self.weights, &self.biases) {
            let z = activation.dot(weight) + bias;
            activations.push(activation);
            activation = z.mapv(sigmoid);
            zs.push(z);
        }
        activations.push(activation);

        ActivationTrace { activations, zs }
    }
}
