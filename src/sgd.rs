use crate::backprop::Gradients;
use crate::config::{SgdConfig, check_learning_rate};
use crate::cost::quadratic_cost;
use crate::error::{Error, Result};
use crate::network::{Network, check_shape};
use itertools::izip;
use ndarray::Array2;
use std::fmt;
use tracing::{debug, info};

// A single pair of a network input and the output the network should produce for it. The input
// is a [1 x input_size] array and the expected output a [1 x output_size] array.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingExample {
    pub input: Array2<f64>,
    pub expected_output: Array2<f64>,
}

impl TrainingExample {
    pub fn new(input: Array2<f64>, expected_output: Array2<f64>) -> TrainingExample {
        TrainingExample {
            input,
            expected_output,
        }
    }
}

// Data arriving as a loose sequence of arrays must hold exactly an input followed by an output.
impl TryFrom<Vec<Array2<f64>>> for TrainingExample {
    type Error = Error;

    fn try_from(mut pair: Vec<Array2<f64>>) -> Result<Self> {
        if pair.len() != 2 {
            return Err(Error::MalformedExample { len: pair.len() });
        }
        let expected_output = pair.pop().ok_or(Error::MalformedExample { len: 0 })?;
        let input = pair.pop().ok_or(Error::MalformedExample { len: 1 })?;
        Ok(TrainingExample::new(input, expected_output))
    }
}

/// Decides whether an output produced by the network is close enough to the desired output to
/// count as correct.
pub trait AcceptancePredicate {
    fn accept(&self, output: &Array2<f64>, desired_output: &Array2<f64>) -> bool;
}

impl<F> AcceptancePredicate for F
where
    F: Fn(&Array2<f64>, &Array2<f64>) -> bool,
{
    fn accept(&self, output: &Array2<f64>, desired_output: &Array2<f64>) -> bool {
        self(output, desired_output)
    }
}

/// How many test examples the network got right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

// Splits the training data into consecutive batches of mini_batch_size examples, in the order
// given. The last batch is shorter when the data doesn't divide evenly.
pub fn mini_batches(
    training_data: &[TrainingExample],
    mini_batch_size: usize,
) -> Result<std::slice::Chunks<'_, TrainingExample>> {
    if mini_batch_size == 0 {
        return Err(Error::InvalidBatchSize);
    }
    Ok(training_data.chunks(mini_batch_size))
}

impl Network {
    // Trains the network with one pass of mini-batch stochastic gradient descent. The training data
    // is divided into batches of config.mini_batch_size() examples without reordering. For each
    // batch the gradient of the cost is calculated through backpropagation, and the network's
    // biases and weights are adjusted accordingly. After all batches have been used, the network
    // is evaluated against the test data, if any, and the result returned.
    pub fn stochastic_gradient_descent(
        &mut self,
        training_data: &[TrainingExample],
        config: &SgdConfig,
        test: Option<(&[TrainingExample], &dyn AcceptancePredicate)>,
    ) -> Result<Option<Evaluation>> {
        if self.weights.is_empty() || self.num_layers() < 2 {
            return Err(Error::NotInitialized);
        }

        // Every example is checked up front so that a bad one late in the data can't leave the
        // network with only some of its batches applied.
        self.check_examples(training_data)?;
        if let Some((test_data, _)) = test {
            self.check_examples(test_data)?;
        }

        let mut batches = 0;
        let mini_batch_size = config.mini_batch_size();
        for (index, mini_batch) in mini_batches(training_data, mini_batch_size)?.enumerate() {
            debug!(batch = index, size = mini_batch.len(), "updating mini-batch");
            self.update_mini_batch(mini_batch, config.learning_rate())?;
            batches += 1;
        }
        info!(
            examples = training_data.len(),
            batches,
            learning_rate = config.learning_rate(),
            "finished training pass"
        );

        match test {
            Some((test_data, predicate)) => {
                let evaluation = self.evaluate(test_data, predicate)?;
                info!(%evaluation, "success");
                Ok(Some(evaluation))
            }
            None => Ok(None),
        }
    }

    // Adjust the network's biases and weights according to the given batch of training data. All
    // gradients are computed against the parameters as they were before this batch; nothing is
    // written until the whole batch has been backpropagated.
    pub fn update_mini_batch(
        &mut self,
        mini_batch: &[TrainingExample],
        learning_rate: f64,
    ) -> Result<()> {
        check_learning_rate(learning_rate)?;
        if mini_batch.is_empty() {
            return Ok(());
        }

        let mut nabla = Gradients::zeros_like(self);
        for example in mini_batch {
            let gradients = self.backpropagate(&example.input, &example.expected_output)?;
            nabla.accumulate(&gradients);
        }

        // Average over the examples actually present, so a short final batch isn't under-weighted.
        let scale = learning_rate / mini_batch.len() as f64;
        for (weight, bias, nabla_weight, nabla_bias) in izip!(
            self.weights.iter_mut(),
            self.biases.iter_mut(),
            nabla.nabla_weights.iter_mut(),
            nabla.nabla_biases.iter_mut()
        ) {
            // The accumulator is dropped after this, so it can be scaled in place.
            nabla_weight.mapv_inplace(|nw| nw * scale);
            nabla_bias.mapv_inplace(|nb| nb * scale);
            *weight -= &*nabla_weight;
            *bias -= &*nabla_bias;
        }

        Ok(())
    }

    fn check_examples(&self, examples: &[TrainingExample]) -> Result<()> {
        for example in examples {
            check_shape("input", &example.input, (1, self.input_size()))?;
            check_shape("expected output", &example.expected_output, (1, self.output_size()))?;
        }
        Ok(())
    }

    // Run the network on all test data and count how many outputs the predicate accepts.
    pub fn evaluate(
        &self,
        test_data: &[TrainingExample],
        predicate: &dyn AcceptancePredicate,
    ) -> Result<Evaluation> {
        let mut correct = 0;
        for example in test_data {
            check_shape("expected output", &example.expected_output, (1, self.output_size()))?;
            let output = self.feedforward(&example.input)?;
            if predicate.accept(&output, &example.expected_output) {
                correct += 1;
            }
        }

        Ok(Evaluation {
            correct,
            total: test_data.len(),
        })
    }

    // Mean quadratic cost of the network over the given data.
    pub fn total_cost(&self, data: &[TrainingExample]) -> Result<f64> {
        if data.is_empty() {
            return Ok(0.0);
        }
        let mut cost = 0.0;
        for example in data {
            check_shape("expected output", &example.expected_output, (1, self.output_size()))?;
            cost += quadratic_cost(&self.feedforward(&example.input)?, &example.expected_output);
        }
        Ok(cost / data.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand::{SeedableRng, rngs::StdRng};

    fn examples(count: usize) -> Vec<TrainingExample> {
        (0..count)
            .map(|i| TrainingExample::new(array![[i as f64 / 10.0]], array![[0.5]]))
            .collect()
    }

    #[test]
    fn batches_cover_the_data_in_order() {
        for (n, size) in [(10, 3), (9, 3), (1, 5), (7, 1), (0, 4)] {
            let data = examples(n);
            let batches: Vec<_> = mini_batches(&data, size).unwrap().collect();
            assert_eq!(batches.len(), n.div_ceil(size));
            assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), n);
            for batch in batches.iter().take(batches.len().saturating_sub(1)) {
                assert_eq!(batch.len(), size);
            }
            let flattened: Vec<_> = batches.iter().flat_map(|b| b.iter()).cloned().collect();
            assert_eq!(flattened, data);
        }
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(matches!(mini_batches(&examples(3), 0), Err(Error::InvalidBatchSize)));
    }

    #[test]
    fn malformed_pairs_are_rejected() {
        let one = vec![array![[1.0]]];
        let three = vec![array![[1.0]], array![[2.0]], array![[3.0]]];
        assert!(matches!(
            TrainingExample::try_from(one),
            Err(Error::MalformedExample { len: 1 })
        ));
        assert!(matches!(
            TrainingExample::try_from(three),
            Err(Error::MalformedExample { len: 3 })
        ));
        let pair = TrainingExample::try_from(vec![array![[1.0]], array![[2.0]]]).unwrap();
        assert_eq!(pair.input, array![[1.0]]);
        assert_eq!(pair.expected_output, array![[2.0]]);
    }

    #[test]
    fn single_example_step_follows_gradient() {
        let mut network = Network::new(vec![2, 3, 1], &mut StdRng::seed_from_u64(21)).unwrap();
        let example = TrainingExample::new(array![[1.0, 0.0]], array![[1.0]]);
        let gradients = network
            .backpropagate(&example.input, &example.expected_output)
            .unwrap();
        let before = network.clone();

        network.update_mini_batch(std::slice::from_ref(&example), 0.5).unwrap();

        for i in 0..2 {
            let expected_weight = &before.weights()[i] - &(&gradients.nabla_weights[i] * 0.5);
            let expected_bias = &before.biases()[i] - &(&gradients.nabla_biases[i] * 0.5);
            for (a, b) in network.weights()[i].iter().zip(expected_weight.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
            for (a, b) in network.biases()[i].iter().zip(expected_bias.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn batch_gradients_use_pre_update_parameters() {
        let mut network = Network::new(vec![1, 2, 1], &mut StdRng::seed_from_u64(22)).unwrap();
        let batch = vec![
            TrainingExample::new(array![[0.2]], array![[1.0]]),
            TrainingExample::new(array![[0.9]], array![[0.0]]),
        ];
        let mut sum = Gradients::zeros_like(&network);
        for example in &batch {
            sum.accumulate(
                &network
                    .backpropagate(&example.input, &example.expected_output)
                    .unwrap(),
            );
        }
        let before = network.clone();

        network.update_mini_batch(&batch, 2.0).unwrap();

        for i in 0..2 {
            let expected = &before.weights()[i] - &(&sum.nabla_weights[i] * (2.0 / 2.0));
            for (a, b) in network.weights()[i].iter().zip(expected.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn short_final_batch_is_averaged_by_its_own_size() {
        let start = Network::new(vec![1, 1], &mut StdRng::seed_from_u64(23)).unwrap();
        let data = vec![
            TrainingExample::new(array![[0.1]], array![[0.0]]),
            TrainingExample::new(array![[0.2]], array![[0.0]]),
            TrainingExample::new(array![[0.3]], array![[1.0]]),
        ];

        // Driving the pass with a batch size of 2 must equal two explicit updates, the second
        // covering only the last example.
        let mut driven = start.clone();
        let config = SgdConfig::new(1.5, 2).unwrap();
        let evaluation = driven
            .stochastic_gradient_descent(&data, &config, None)
            .unwrap();
        assert_eq!(evaluation, None);

        let mut manual = start.clone();
        manual.update_mini_batch(&data[..2], 1.5).unwrap();
        let last = manual
            .backpropagate(&data[2].input, &data[2].expected_output)
            .unwrap();
        let expected_weight = &manual.weights()[0] - &(&last.nabla_weights[0] * 1.5);
        manual.update_mini_batch(&data[2..], 1.5).unwrap();

        assert_eq!(driven.weights(), manual.weights());
        assert_eq!(driven.biases(), manual.biases());
        assert_abs_diff_eq!(
            driven.weights()[0][[0, 0]],
            expected_weight[[0, 0]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn evaluation_counts_accepted_outputs() {
        let network = Network::from_parameters(vec![array![[0.0]]], vec![array![[0.0]]]).unwrap();
        // This network always outputs σ(0) = 0.5.
        let test = vec![
            TrainingExample::new(array![[1.0]], array![[0.5]]),
            TrainingExample::new(array![[2.0]], array![[0.55]]),
            TrainingExample::new(array![[3.0]], array![[0.9]]),
        ];
        let within = |output: &Array2<f64>, desired: &Array2<f64>| {
            (output[[0, 0]] - desired[[0, 0]]).abs() < 0.1
        };
        let evaluation = network.evaluate(&test, &within).unwrap();
        assert_eq!(evaluation, Evaluation { correct: 2, total: 3 });
        assert_eq!(evaluation.to_string(), "2/3");
        assert_abs_diff_eq!(evaluation.accuracy(), 2.0 / 3.0);
    }

    #[test]
    fn training_reduces_cost() {
        let mut network = Network::new(vec![2, 4, 1], &mut StdRng::seed_from_u64(24)).unwrap();
        let data: Vec<_> = (0..200)
            .map(|i| {
                let x = (i % 2) as f64;
                TrainingExample::new(array![[x, 1.0 - x]], array![[x]])
            })
            .collect();
        let before = network.total_cost(&data).unwrap();
        let config = SgdConfig::new(3.0, 10).unwrap();
        network.stochastic_gradient_descent(&data, &config, None).unwrap();
        assert!(network.total_cost(&data).unwrap() < before);
    }

    #[test]
    fn bad_example_late_in_the_data_leaves_network_untouched() {
        let mut network = Network::new(vec![2, 1], &mut StdRng::seed_from_u64(26)).unwrap();
        let before = network.clone();
        let data = vec![
            TrainingExample::new(array![[1.0, 0.0]], array![[1.0]]),
            TrainingExample::new(array![[1.0]], array![[1.0]]),
        ];
        let config = SgdConfig::new(3.0, 1).unwrap();
        assert!(matches!(
            network.stochastic_gradient_descent(&data, &config, None),
            Err(Error::ShapeMismatch { what: "input", .. })
        ));
        assert_eq!(network.weights(), before.weights());
        assert_eq!(network.biases(), before.biases());
    }

    #[test]
    fn bad_test_example_is_reported_before_training() {
        let mut network = Network::new(vec![2, 1], &mut StdRng::seed_from_u64(27)).unwrap();
        let before = network.clone();
        let data = vec![TrainingExample::new(array![[1.0, 0.0]], array![[1.0]])];
        let test_data = vec![TrainingExample::new(array![[1.0, 0.0]], array![[1.0, 0.0]])];
        let always = |_: &Array2<f64>, _: &Array2<f64>| true;
        let test: (&[TrainingExample], &dyn AcceptancePredicate) = (&test_data, &always);
        let config = SgdConfig::new(3.0, 1).unwrap();
        assert!(matches!(
            network.stochastic_gradient_descent(&data, &config, Some(test)),
            Err(Error::ShapeMismatch {
                what: "expected output",
                ..
            })
        ));
        assert_eq!(network.weights(), before.weights());
        assert_eq!(network.biases(), before.biases());
    }

    #[test]
    fn update_rejects_bad_learning_rates() {
        let mut network = Network::new(vec![1, 1], &mut StdRng::seed_from_u64(28)).unwrap();
        let before = network.clone();
        let batch = vec![TrainingExample::new(array![[0.5]], array![[1.0]])];
        for eta in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                network.update_mini_batch(&batch, eta),
                Err(Error::InvalidLearningRate(_))
            ));
        }
        assert_eq!(network.weights(), before.weights());
        assert_eq!(network.biases(), before.biases());
    }

    #[test]
    fn training_rejects_mismatched_examples() {
        let mut network = Network::new(vec![2, 1], &mut StdRng::seed_from_u64(25)).unwrap();
        let data = vec![TrainingExample::new(array![[1.0]], array![[1.0]])];
        let config = SgdConfig::new(1.0, 1).unwrap();
        assert!(matches!(
            network.stochastic_gradient_descent(&data, &config, None),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
