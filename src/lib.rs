//! A small multilayer feedforward neural network with sigmoid activations, trained by mini-batch
//! stochastic gradient descent on the quadratic cost.
//!
//! ```
//! use ndarray::array;
//! use ndarray_rand::rand::{SeedableRng, rngs::StdRng};
//! use sigmoid_sgd::{Network, SgdConfig, TrainingExample};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut network = Network::new(vec![2, 3, 1], &mut rng)?;
//! let data = vec![TrainingExample::new(array![[1.0, 0.0]], array![[1.0]])];
//! network.stochastic_gradient_descent(&data, &SgdConfig::new(3.0, 1)?, None)?;
//! assert_eq!(network.feedforward(&array![[1.0, 0.0]])?.dim(), (1, 1));
//! # Ok::<(), sigmoid_sgd::Error>(())
//! ```

pub mod backprop;
pub mod config;
pub mod cost;
pub mod error;
pub mod network;
pub mod persist;
pub mod sgd;

pub use backprop::Gradients;
pub use config::SgdConfig;
pub use error::{Error, Result};
pub use network::Network;
pub use sgd::{AcceptancePredicate, Evaluation, TrainingExample, mini_batches};
