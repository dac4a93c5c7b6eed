use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A network needs at least an input and an output layer.
    #[error("need a minimum of two layers in the network, got {given}")]
    TooFewLayers { given: usize },

    #[error("layer {index} has zero neurons")]
    ZeroLayerSize { index: usize },

    #[error("network has no parameters to train")]
    NotInitialized,

    /// A training example must hold exactly an input and an expected output.
    #[error("training example must contain an input and an output, got {len} elements")]
    MalformedExample { len: usize },

    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("stored matrix {index} has shape {found:?}, but the network expects {expected:?}")]
    PersistedShapeMismatch {
        index: usize,
        expected: (usize, usize),
        found: (i64, i64),
    },

    #[error("learning rate must be positive and finite, got {0}")]
    InvalidLearningRate(f64),

    #[error("mini-batch size must be at least 1")]
    InvalidBatchSize,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
