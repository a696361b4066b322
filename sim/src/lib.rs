//! Simulator of the descriptor sequencer that selects weights in a
//! processing element of a systolic array.

mod asm;
pub mod error;
pub mod framework;
pub mod isa;
mod object;
pub mod record;
pub mod sequencer;
pub mod test;
mod utils;

pub use asm::{assemble, AssembleOption};
pub use error::SeqError;
pub use object::PeImage;
pub use sequencer::{Descriptor, DescriptorState, RawDescriptor, Sequencer, Snapshot, Weight};
