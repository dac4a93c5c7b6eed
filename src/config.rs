use crate::error::{Error, Result};

/// Hyperparameters for one pass of mini-batch stochastic gradient descent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SgdConfig {
    learning_rate: f64,
    mini_batch_size: usize,
}

impl SgdConfig {
    pub fn new(learning_rate: f64, mini_batch_size: usize) -> Result<SgdConfig> {
        check_learning_rate(learning_rate)?;
        if mini_batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }
        Ok(SgdConfig {
            learning_rate,
            mini_batch_size,
        })
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn mini_batch_size(&self) -> usize {
        self.mini_batch_size
    }
}

pub(crate) fn check_learning_rate(learning_rate: f64) -> Result<()> {
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
        return Err(Error::InvalidLearningRate(learning_rate));
    }
    Ok(())
}
