use crate::error::{Error, Result};
use ndarray::{Array, Array2};
use ndarray_rand::{RandomExt, rand::Rng, rand_distr::StandardNormal};
use tracing::info;

// Activations flow through the network as row vectors: an activation for a layer with n neurons
// is a [1 x n] array. Consequently the weights between a layer of size m and a layer of size n
// form an [m x n] array and the next activation is computed as σ(a.w + b), where b is a [1 x n]
// bias row.
#[derive(Clone, Debug)]
pub struct Network {
    pub(crate) sizes: Vec<usize>,
    pub(crate) weights: Vec<Array2<f64>>,
    pub(crate) biases: Vec<Array2<f64>>,
}

impl Network {
    pub fn new<R: Rng + ?Sized>(sizes: Vec<usize>, rng: &mut R) -> Result<Network> {
        validate_sizes(&sizes)?;

        let weights = sizes
            // For each size in sizes...
            .iter()
            // Paired with the following size in sizes...
            .zip(sizes.iter().skip(1))
            // Make a [current_size x next_size] array of numbers randomly chosen from a standard
            // normal distribution (a normal distribution with mean 0 and standard deviation 1).
            .map(|(&current_size, &next_size)| {
                Array::random_using((current_size, next_size), StandardNormal, rng)
            })
            .collect();
        let biases = sizes
            // Every layer except the input layer gets a [1 x size] bias row.
            .iter()
            .skip(1)
            .map(|&size| Array::random_using((1, size), StandardNormal, rng))
            .collect();

        info!(?sizes, "initialized network");

        Ok(Network {
            sizes,
            weights,
            biases,
        })
    }

    /// Builds a network around existing parameters. The layer sizes are recovered from the
    /// weight shapes, and every weight and bias must agree with its neighbours.
    pub fn from_parameters(weights: Vec<Array2<f64>>, biases: Vec<Array2<f64>>) -> Result<Network> {
        if weights.is_empty() {
            return Err(Error::TooFewLayers { given: 0 });
        }
        if weights.len() != biases.len() {
            return Err(Error::ShapeMismatch {
                what: "bias list",
                expected: (weights.len(), 1),
                found: (biases.len(), 1),
            });
        }

        let mut sizes = Vec::with_capacity(weights.len() + 1);
        sizes.push(weights[0].nrows());
        for (weight, bias) in weights.iter().zip(biases.iter()) {
            let previous = *sizes.last().unwrap_or(&0);
            check_shape("weight matrix", weight, (previous, weight.ncols()))?;
            check_shape("bias row", bias, (1, weight.ncols()))?;
            sizes.push(weight.ncols());
        }
        validate_sizes(&sizes)?;

        Ok(Network {
            sizes,
            weights,
            biases,
        })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn num_layers(&self) -> usize {
        self.sizes.len()
    }

    pub fn input_size(&self) -> usize {
        self.sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    pub fn weights(&self) -> &[Array2<f64>] {
        &self.weights
    }

    pub fn biases(&self) -> &[Array2<f64>] {
        &self.biases
    }

    // Calculates the activations of the output layer, given the activations of the input layer.
    // The input must be a [1 x self.sizes[0]] array; anything else is reported as a shape mismatch
    // instead of failing inside the dot product.
    pub fn feedforward(&self, input_activation: &Array2<f64>) -> Result<Array2<f64>> {
        check_shape("input", input_activation, (1, self.input_size()))?;

        // Only the prior activation is needed to compute the next one, so keep overwriting it.
        let mut activation = input_activation.clone();
        for (weight, bias) in self.weights.iter().zip(self.biases.iter()) {
            activation = activation.dot(weight) + bias;
            activation.mapv_inplace(sigmoid);
        }

        Ok(activation)
    }
}

fn validate_sizes(sizes: &[usize]) -> Result<()> {
    if sizes.len() < 2 {
        return Err(Error::TooFewLayers { given: sizes.len() });
    }
    match sizes.iter().position(|&size| size == 0) {
        Some(index) => Err(Error::ZeroLayerSize { index }),
        None => Ok(()),
    }
}

pub(crate) fn check_shape(
    what: &'static str,
    array: &Array2<f64>,
    expected: (usize, usize),
) -> Result<()> {
    let found = array.dim();
    if found != expected {
        return Err(Error::ShapeMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + f64::exp(-z))
}

pub fn sigmoid_derivative(z: f64) -> f64 {
    (1.0 - sigmoid(z)) * sigmoid(z)
}
