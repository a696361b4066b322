//! This module contains utilities for verifying the cycle-stepped simulator
//! against the closed-form model in [`crate::isa::simulate`].


use crate::framework::{PeSim, RunOutcome};

/// Checks programs by running them cycle by cycle.
pub struct SimTester {
    max_cycles: u64,
}

impl Default for SimTester {
    fn default() -> Self {
        Self {
            max_cycles: 3_000_000,
        }
    }
}

impl SimTester {
    pub fn new(max_cycles: u64) -> Self {
        Self { max_cycles }
    }

    fn simulate(&self, src: &str) -> anyhow::Result<PeSim> {
        let image = make_image(src)?;
        let mut sim = PeSim::new(&image, false);
        match sim.run(self.max_cycles)? {
            RunOutcome::Exhausted { .. } => Ok(sim),
            RunOutcome::CycleLimit { .. } => anyhow::bail!("exceed maximum cycle limit"),
        }
    }
}

fn make_image(src: &str) -> anyhow::Result<crate::PeImage> {
    crate::assemble(src, crate::AssembleOption::default().set_verbose(false))
}
