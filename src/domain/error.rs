// ============================================================
// Layer 3 — Core Error Type
// ============================================================
// Every contract violation the pointer network can detect.
// Nothing here is recovered inside the core: the training
// driver receives the error and decides to abort or log.

use thiserror::Error;

/// Failures raised by the model core and the data layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PointerError {
    /// A tensor or vector disagrees with the configured dimensions.
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Which argument was malformed
        what: &'static str,
        /// Dimensions implied by the configuration
        expected: Vec<usize>,
        /// Dimensions actually received
        actual: Vec<usize>,
    },

    /// A target row is not a one-hot vector.
    #[error("Target at step {step} is not a one-hot vector")]
    InvalidTarget {
        /// Decoder step whose target is malformed
        step: usize,
    },

    /// Target pointers do not describe a permutation followed by the end sentinel.
    #[error("Pointers {0:?} are not a permutation of 1..=L followed by the end sentinel 0")]
    InvalidPermutation(Vec<usize>),

    /// The loss evaluated to NaN or infinity.
    #[error("Non-finite {what} loss: {value}")]
    NonFiniteLoss {
        /// Which loss diverged (training or evaluation)
        what: &'static str,
        /// The offending value
        value: f64,
    },

    /// A batch with no samples was supplied.
    #[error("Batch contains no samples")]
    EmptyBatch,

    /// A hyperparameter is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PointerResult<T> = Result<T, PointerError>;

impl PointerError {
    /// Shorthand for [`PointerError::ShapeMismatch`].
    pub fn shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual:   actual.to_vec(),
        }
    }
}
