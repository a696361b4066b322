//! A cycle driver around the [`Sequencer`]. The driver owns the clock: it
//! calls [`Sequencer::step`] once per cycle and records what the processing
//! element exposes afterwards.

use anyhow::Context;

use crate::{
    error::SeqError,
    object::PeImage,
    record::{CycleRecord, Tracer},
    sequencer::{Sequencer, Weight},
};

/// Read-only access to the weight a processing element currently exposes.
/// This is all that downstream stages (e.g. packetization) see of it.
pub trait WeightSource {
    fn current_weight(&self) -> Result<Weight, SeqError>;
}

impl WeightSource for Sequencer {
    fn current_weight(&self) -> Result<Weight, SeqError> {
        Sequencer::current_weight(self)
    }
}

/// A simulator advanced by an external clock, one cycle per [`CycleSim::step`].
pub trait CycleSim {
    /// Run one cycle. Errors are fatal: the simulator terminates and further
    /// cycles are not expected.
    fn step(&mut self) -> anyhow::Result<()>;

    /// Whether the simulation is terminated.
    fn is_terminate(&self) -> bool;

    fn cycle_count(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program ran past its last descriptor.
    Exhausted { cycles: u64 },
    /// The cycle limit was hit first, e.g. because a descriptor is suspended.
    CycleLimit { cycles: u64 },
}

/// Processing element simulator.
pub struct PeSim {
    seq: Sequencer,
    tracer: Tracer,
    /// See [`PeSim::is_terminate`].
    terminate: bool,
    /// Whether to print the output to tty
    tty_out: bool,
    cycle_count: u64,
}

impl PeSim {
    /// Initialize the simulator with a programmed sequencer.
    ///
    /// tty_out: whether to print rich-text information
    pub fn new(image: &PeImage, tty_out: bool) -> Self {
        let mut seq = Sequencer::new();
        image.load_into(&mut seq);
        Self {
            terminate: seq.is_exhausted(),
            seq,
            tracer: Tracer::default(),
            tty_out,
            cycle_count: 0,
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.seq
    }

    /// Access for an external controller, e.g. to suspend or resume a
    /// descriptor between cycles.
    pub fn sequencer_mut(&mut self) -> &mut Sequencer {
        &mut self.seq
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Step until the program is exhausted or `max_cycles` cycles have run in
    /// total.
    pub fn run(&mut self, max_cycles: u64) -> anyhow::Result<RunOutcome> {
        while !self.terminate {
            if self.cycle_count >= max_cycles {
                tracing::debug!("cycle limit {max_cycles} reached");
                return Ok(RunOutcome::CycleLimit {
                    cycles: self.cycle_count,
                });
            }
            self.step()?;
        }
        Ok(RunOutcome::Exhausted {
            cycles: self.cycle_count,
        })
    }
}

impl CycleSim for PeSim {
    fn step(&mut self) -> anyhow::Result<()> {
        if let Err(e) = self.seq.step() {
            self.terminate = true;
            return Err(e).with_context(|| format!("cycle {}", self.cycle_count));
        }
        self.cycle_count += 1;

        let record = CycleRecord::capture(self.cycle_count, &self.seq);
        if self.tty_out {
            record.print(&self.seq);
        }
        self.tracer.push(record);

        if self.seq.is_exhausted() {
            tracing::info!("program exhausted after {} cycles", self.cycle_count);
            self.terminate = true;
        }
        Ok(())
    }

    fn is_terminate(&self) -> bool {
        self.terminate
    }

    fn cycle_count(&self) -> u64 {
        self.cycle_count
    }
}

impl WeightSource for PeSim {
    fn current_weight(&self) -> Result<Weight, SeqError> {
        self.seq.current_weight()
    }
}
