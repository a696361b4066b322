use ansi_term::Colour::{Cyan, Green, Red, Yellow};

use crate::sequencer::{Sequencer, Weight};

/// What the processing element exposes at the end of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRecord {
    pub cycle: u64,
    pub prog_idx: usize,
    pub weight_idx: i64,
    /// `None` if the weight index is outside the weight table.
    pub weight: Option<Weight>,
}

impl CycleRecord {
    pub fn capture(cycle: u64, seq: &Sequencer) -> Self {
        Self {
            cycle,
            prog_idx: seq.prog_idx(),
            weight_idx: seq.weight_idx(),
            weight: seq.current_weight().ok(),
        }
    }

    /// Print a colored one-line summary to stderr.
    pub fn print(&self, seq: &Sequencer) {
        let desc = match seq.program().get(self.prog_idx) {
            Some(d) => format!("{:<7} x={:<3} y={:<3}", d.state, d.x_counter(), d.y_counter()),
            None => Yellow.paint("done").to_string(),
        };
        let weight = match self.weight {
            Some(w) => Green.paint(w.to_string()),
            None => Red.paint("--"),
        };
        eprintln!(
            "{} desc[{}] {desc} weight[{}] = {weight}",
            Cyan.paint(format!("#{:<6}", self.cycle)),
            self.prog_idx,
            self.weight_idx,
        );
    }
}

/// Per-cycle history of a simulation run.
#[derive(Debug, Default, Clone)]
pub struct Tracer {
    pub records: Vec<CycleRecord>,
}

impl Tracer {
    pub fn push(&mut self, record: CycleRecord) {
        self.records.push(record)
    }

    /// The sequence of weights handed to downstream consumers, one per cycle.
    pub fn weight_stream(&self) -> impl Iterator<Item = Option<Weight>> + '_ {
        self.records.iter().map(|r| r.weight)
    }

    pub fn last(&self) -> Option<&CycleRecord> {
        self.records.last()
    }
}
