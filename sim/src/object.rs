use crate::sequencer::{Descriptor, Sequencer, Weight};

/// Weights per `.weights` line in the listing.
const WEIGHTS_PER_LINE: usize = 16;

/// Everything needed to program one processing element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeImage {
    pub weights: Vec<Weight>,
    pub program: Vec<Descriptor>,
}

impl PeImage {
    /// Reset `seq` and load this image into it.
    pub fn load_into(&self, seq: &mut Sequencer) {
        seq.reset();
        seq.load_weights(&self.weights);
        seq.load_program(&self.program);
    }
}

impl std::fmt::Display for PeImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.weights.chunks(WEIGHTS_PER_LINE) {
            let vals: Vec<String> = chunk.iter().map(|w| w.to_string()).collect();
            writeln!(f, ".weights {}", vals.join(", "))?;
        }
        for desc in &self.program {
            writeln!(
                f,
                "{:<7} x={} y={} m={}",
                desc.state, desc.x_count, desc.y_count, desc.y_modify
            )?;
        }
        Ok(())
    }
}
