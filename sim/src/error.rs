/// Fatal conditions raised by the descriptor sequencer.
///
/// None of them is retryable. They indicate a defect in the driver or in the
/// program that was loaded, so the caller should stop the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeqError {
    /// `step` was called before any program was loaded.
    NotProgrammed,
    /// A descriptor carries a state tag outside of the known set.
    InvalidDescriptorState(u8),
    /// An index (weight index or descriptor index) is outside its table.
    IndexOutOfRange { index: i64, len: usize },
    /// Moving the weight index by `y_modify` would leave the `i64` range.
    WeightIndexOverflow { weight_idx: i64, y_modify: i64 },
    /// `step` was called after the last descriptor completed.
    ProgramExhausted { len: usize },
}

impl std::fmt::Display for SeqError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeqError::NotProgrammed => {
                write!(f, "attempted to update pe state without it being programmed")
            }
            SeqError::InvalidDescriptorState(tag) => {
                write!(f, "invalid descriptor state tag: {tag:#x}")
            }
            SeqError::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for table of length {len}")
            }
            SeqError::WeightIndexOverflow {
                weight_idx,
                y_modify,
            } => {
                write!(f, "weight index {weight_idx} overflows when moved by {y_modify}")
            }
            SeqError::ProgramExhausted { len } => {
                write!(f, "program of {len} descriptors has already completed")
            }
        }
    }
}

impl std::error::Error for SeqError {}
