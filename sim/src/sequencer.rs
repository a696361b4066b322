//! The descriptor-driven loop sequencer of a processing element.
//!
//! A program is a list of descriptors, each describing a two-level counted
//! loop. Every call to [`Sequencer::step`] is one clock tick: the inner
//! counter of the current descriptor goes down by one, and each time it runs
//! out the outer counter goes down and (for `GenWait`) the weight index moves
//! by `y_modify`. When the outer counter runs out the program counter moves
//! to the next descriptor.

use crate::{error::SeqError, isa::state_code};

/// Value type of the weight table.
pub type Weight = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorState {
    /// Count, and move the weight index on every outer iteration.
    GenWait,
    /// Count without touching the weight index. Used to burn cycles.
    Wait,
    /// Parked. Steps are accepted but do nothing.
    Suspended,
}

impl DescriptorState {
    pub fn code(self) -> u8 {
        match self {
            DescriptorState::GenWait => state_code::GENWAIT,
            DescriptorState::Wait => state_code::WAIT,
            DescriptorState::Suspended => state_code::SUSPENDED,
        }
    }
}

impl TryFrom<u8> for DescriptorState {
    type Error = SeqError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            state_code::GENWAIT => Ok(DescriptorState::GenWait),
            state_code::WAIT => Ok(DescriptorState::Wait),
            state_code::SUSPENDED => Ok(DescriptorState::Suspended),
            _ => Err(SeqError::InvalidDescriptorState(code)),
        }
    }
}

impl std::fmt::Display for DescriptorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            DescriptorState::GenWait => "genwait",
            DescriptorState::Wait => "wait",
            DescriptorState::Suspended => "suspend",
        })
    }
}

/// One instruction of a sequencer program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub state: DescriptorState,
    /// Reload value of the inner counter.
    pub x_count: u32,
    /// Reload value of the outer counter.
    pub y_count: u32,
    /// Added to the weight index on every outer iteration of a `GenWait`.
    pub y_modify: i64,
    x_counter: i64,
    y_counter: i64,
}

impl Descriptor {
    /// Create a descriptor with its counters loaded.
    pub fn new(state: DescriptorState, x_count: u32, y_count: u32, y_modify: i64) -> Self {
        Self {
            state,
            x_count,
            y_count,
            y_modify,
            x_counter: x_count.into(),
            y_counter: y_count.into(),
        }
    }

    /// Restore both counters to their reload values.
    pub fn reload(&mut self) {
        self.x_counter = self.x_count.into();
        self.y_counter = self.y_count.into();
    }

    pub fn x_counter(&self) -> i64 {
        self.x_counter
    }

    pub fn y_counter(&self) -> i64 {
        self.y_counter
    }

    /// Whether the outer counter has run out.
    pub fn is_done(&self) -> bool {
        self.y_counter < 0
    }

    /// Number of steps this descriptor takes from a freshly loaded state.
    /// Up to `2^64`, hence the wide type.
    pub fn ticks(&self) -> u128 {
        (u128::from(self.x_count) + 1) * (u128::from(self.y_count) + 1)
    }
}

/// Total number of steps needed to exhaust `program`.
pub fn total_ticks(program: &[Descriptor]) -> u128 {
    program.iter().map(Descriptor::ticks).sum()
}

/// A descriptor whose state is still an undecoded tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDescriptor {
    pub state: u8,
    pub x_count: u32,
    pub y_count: u32,
    pub y_modify: i64,
}

impl TryFrom<RawDescriptor> for Descriptor {
    type Error = SeqError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let state = DescriptorState::try_from(raw.state)?;
        Ok(Descriptor::new(state, raw.x_count, raw.y_count, raw.y_modify))
    }
}

/// Observable state of a [`Sequencer`], used to compare before and after a
/// step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub weight_idx: i64,
    pub prog_idx: usize,
    pub programmed: bool,
    pub program: Vec<Descriptor>,
}

#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    weights: Vec<Weight>,
    program: Vec<Descriptor>,
    /// Index of the descriptor currently executing. Equals `program.len()`
    /// once the program has completed.
    prog_idx: usize,
    /// May go negative in the middle of a program. Only checked on read.
    weight_idx: i64,
    programmed: bool,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the weight table, the program and both indices.
    pub fn reset(&mut self) {
        tracing::debug!("reset sequencer");
        self.weights.clear();
        self.program.clear();
        self.prog_idx = 0;
        self.weight_idx = 0;
        self.programmed = false;
    }

    /// Replace the weight table. The weight index is left as is.
    pub fn load_weights(&mut self, values: &[Weight]) {
        tracing::debug!("load {} weights", values.len());
        self.weights = values.to_vec();
    }

    /// Replace the program and start it from the first descriptor.
    ///
    /// The descriptors are copied in with their counters reloaded, so the
    /// caller's copy may be changed or reused freely afterwards.
    pub fn load_program(&mut self, program: &[Descriptor]) {
        tracing::debug!("load program of {} descriptors", program.len());
        self.program = program
            .iter()
            .cloned()
            .map(|mut desc| {
                desc.reload();
                desc
            })
            .collect();
        self.prog_idx = 0;
        self.programmed = true;
    }

    /// Decode and load a program of raw descriptors. If any tag is invalid
    /// the current program is kept.
    pub fn load_raw_program(&mut self, program: &[RawDescriptor]) -> Result<(), SeqError> {
        let program = program
            .iter()
            .map(|&raw| Descriptor::try_from(raw))
            .collect::<Result<Vec<_>, _>>()?;
        self.load_program(&program);
        Ok(())
    }

    /// The weight currently selected by the weight index.
    pub fn current_weight(&self) -> Result<Weight, SeqError> {
        usize::try_from(self.weight_idx)
            .ok()
            .and_then(|i| self.weights.get(i).copied())
            .ok_or(SeqError::IndexOutOfRange {
                index: self.weight_idx,
                len: self.weights.len(),
            })
    }

    /// Advance the current descriptor by one tick.
    ///
    /// On error nothing is changed.
    pub fn step(&mut self) -> Result<(), SeqError> {
        if !self.programmed {
            return Err(SeqError::NotProgrammed);
        }
        let len = self.program.len();
        let Some(desc) = self.program.get_mut(self.prog_idx) else {
            return Err(SeqError::ProgramExhausted { len });
        };

        let moves_weight = match desc.state {
            DescriptorState::GenWait => true,
            DescriptorState::Wait => false,
            DescriptorState::Suspended => return Ok(()),
        };

        // inner loop runs out on this tick
        let wraps = desc.x_counter < 1;
        let weight_idx = if moves_weight && wraps {
            self.weight_idx
                .checked_add(desc.y_modify)
                .ok_or(SeqError::WeightIndexOverflow {
                    weight_idx: self.weight_idx,
                    y_modify: desc.y_modify,
                })?
        } else {
            self.weight_idx
        };

        if wraps {
            desc.x_counter = desc.x_count.into();
            desc.y_counter -= 1;
        } else {
            desc.x_counter -= 1;
        }
        self.weight_idx = weight_idx;
        tracing::trace!(
            prog_idx = self.prog_idx,
            x = desc.x_counter,
            y = desc.y_counter,
            weight_idx = self.weight_idx,
            "step {}",
            desc.state
        );

        // checked even if the inner loop did not run out on this tick
        if desc.y_counter < 0 {
            tracing::debug!("descriptor {} done", self.prog_idx);
            self.prog_idx += 1;
        }
        Ok(())
    }

    /// Change the state of a loaded descriptor, e.g. to suspend or resume it.
    /// Its counters are kept.
    pub fn set_state(&mut self, index: usize, state: DescriptorState) -> Result<(), SeqError> {
        let len = self.program.len();
        let desc = self
            .program
            .get_mut(index)
            .ok_or(SeqError::IndexOutOfRange {
                index: index as i64,
                len,
            })?;
        tracing::debug!("descriptor {index}: {} -> {state}", desc.state);
        desc.state = state;
        Ok(())
    }

    pub fn weight_idx(&self) -> i64 {
        self.weight_idx
    }

    pub fn prog_idx(&self) -> usize {
        self.prog_idx
    }

    pub fn is_programmed(&self) -> bool {
        self.programmed
    }

    /// Whether a loaded program has run past its last descriptor.
    pub fn is_exhausted(&self) -> bool {
        self.programmed && self.prog_idx >= self.program.len()
    }

    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }

    pub fn program(&self) -> &[Descriptor] {
        &self.program
    }

    pub fn current_descriptor(&self) -> Option<&Descriptor> {
        self.program.get(self.prog_idx)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            weight_idx: self.weight_idx,
            prog_idx: self.prog_idx,
            programmed: self.programmed,
            program: self.program.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DescriptorState::*;

    fn programmed(weights: &[Weight], program: &[Descriptor]) -> Sequencer {
        let mut seq = Sequencer::new();
        seq.load_weights(weights);
        seq.load_program(program);
        seq
    }

    #[test]
    fn test_genwait_trace() {
        let mut seq = programmed(&[10, 20, 30], &[Descriptor::new(GenWait, 1, 1, 1)]);
        assert_eq!(seq.current_weight(), Ok(10));

        for (weight, prog_idx) in [(10, 0), (20, 0), (20, 0), (30, 1)] {
            seq.step().unwrap();
            assert_eq!(seq.current_weight(), Ok(weight));
            assert_eq!(seq.prog_idx(), prog_idx);
        }
        assert!(seq.is_exhausted());
        assert_eq!(seq.weight_idx(), 2);
    }

    #[test]
    fn test_counters_per_step() {
        let mut seq = programmed(&[0; 4], &[Descriptor::new(GenWait, 1, 1, 1)]);
        let mut seen = vec![];
        for _ in 0..4 {
            seq.step().unwrap();
            let d = &seq.program()[0];
            seen.push((d.x_counter(), d.y_counter(), seq.weight_idx()));
        }
        assert_eq!(seen, vec![(0, 1, 0), (1, 0, 1), (0, 0, 1), (1, -1, 2)]);
    }

    #[test]
    fn test_not_programmed() {
        let mut seq = Sequencer::new();
        seq.load_weights(&[1, 2]);
        let before = seq.snapshot();
        for _ in 0..3 {
            assert_eq!(seq.step(), Err(SeqError::NotProgrammed));
            assert_eq!(seq.snapshot(), before);
        }
    }

    #[test]
    fn test_suspended_is_noop() {
        let mut seq = programmed(
            &[1, 2, 3],
            &[
                Descriptor::new(GenWait, 0, 0, 1),
                Descriptor::new(Suspended, 2, 3, 1),
            ],
        );
        seq.step().unwrap();
        assert_eq!(seq.prog_idx(), 1);
        let before = seq.snapshot();
        for _ in 0..100 {
            seq.step().unwrap();
        }
        assert_eq!(seq.snapshot(), before);
        assert!(!seq.is_exhausted());
    }

    #[test]
    fn test_resume_after_suspend() {
        let mut seq = programmed(&[5, 6, 7], &[Descriptor::new(Suspended, 0, 1, 1)]);
        seq.step().unwrap();
        assert_eq!(seq.weight_idx(), 0);

        seq.set_state(0, GenWait).unwrap();
        seq.step().unwrap();
        seq.step().unwrap();
        assert!(seq.is_exhausted());
        assert_eq!(seq.current_weight(), Ok(7));

        assert_eq!(
            seq.set_state(1, Wait),
            Err(SeqError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_suspend_midway_keeps_position() {
        let mut seq = programmed(&[0; 8], &[Descriptor::new(GenWait, 2, 2, 1)]);
        for _ in 0..4 {
            seq.step().unwrap();
        }
        seq.set_state(0, Suspended).unwrap();
        let parked = seq.snapshot();
        for _ in 0..10 {
            seq.step().unwrap();
        }
        assert_eq!(seq.program(), parked.program.as_slice());

        seq.set_state(0, GenWait).unwrap();
        let mut n = 0;
        while !seq.is_exhausted() {
            seq.step().unwrap();
            n += 1;
        }
        assert_eq!(n, 9 - 4);
        assert_eq!(seq.weight_idx(), 3);
    }

    #[test]
    fn test_wait_keeps_weight_idx() {
        for m in [-5, 0, 1, 7] {
            let mut seq = programmed(&[42], &[Descriptor::new(Wait, 2, 3, m)]);
            for _ in 0..12 {
                seq.step().unwrap();
                assert_eq!(seq.weight_idx(), 0);
                assert_eq!(seq.current_weight(), Ok(42));
            }
            assert!(seq.is_exhausted());
        }
    }

    #[test]
    fn test_genwait_grid() {
        for x in 0..4u32 {
            for y in 0..4u32 {
                for m in [-2i64, 1, 3] {
                    let mut seq = programmed(
                        &[],
                        &[
                            Descriptor::new(GenWait, x, y, m),
                            Descriptor::new(Wait, 0, 0, 0),
                        ],
                    );
                    let inner = x as usize + 1;
                    for _ in 0..inner - 1 {
                        seq.step().unwrap();
                    }
                    assert_eq!(seq.weight_idx(), 0);
                    seq.step().unwrap();
                    assert_eq!(seq.weight_idx(), m);

                    for _ in inner..inner * (y as usize + 1) {
                        assert_eq!(seq.prog_idx(), 0);
                        seq.step().unwrap();
                    }
                    assert_eq!(seq.weight_idx(), m * (i64::from(y) + 1));
                    assert_eq!(seq.prog_idx(), 1);
                }
            }
        }
    }

    #[test]
    fn test_total_ticks() {
        let program = [
            Descriptor::new(GenWait, 3, 1, 1),
            Descriptor::new(Wait, 0, 0, 0),
            Descriptor::new(Wait, 2, 4, 0),
            Descriptor::new(GenWait, 0, 2, -1),
        ];
        let mut seq = programmed(&[0; 16], &program);
        let mut n = 0;
        while !seq.is_exhausted() {
            seq.step().unwrap();
            n += 1;
        }
        assert_eq!(n, total_ticks(&program));
        assert_eq!(n, 8 + 1 + 15 + 3);
        assert_eq!(
            seq.step(),
            Err(SeqError::ProgramExhausted { len: program.len() })
        );
    }

    #[test]
    fn test_ticks_max_counts() {
        let desc = Descriptor::new(Wait, u32::MAX, u32::MAX, 0);
        assert_eq!(desc.ticks(), 1u128 << 64);
        assert_eq!(total_ticks(&[desc.clone(), desc]), 1u128 << 65);
    }

    #[test]
    fn test_weight_idx_overflow() {
        let mut seq = programmed(&[], &[Descriptor::new(GenWait, 0, 1, i64::MAX)]);
        seq.step().unwrap();
        assert_eq!(seq.weight_idx(), i64::MAX);

        let before = seq.snapshot();
        assert_eq!(
            seq.step(),
            Err(SeqError::WeightIndexOverflow {
                weight_idx: i64::MAX,
                y_modify: i64::MAX
            })
        );
        assert_eq!(seq.snapshot(), before);

        let mut seq = programmed(&[], &[Descriptor::new(GenWait, 0, 1, i64::MIN)]);
        seq.step().unwrap();
        assert!(seq.step().is_err());
        assert_eq!(seq.weight_idx(), i64::MIN);
        assert_eq!(seq.program()[0].y_counter(), 0);
    }

    #[test]
    fn test_completed_counters_stay_terminal() {
        let mut seq = programmed(
            &[],
            &[Descriptor::new(Wait, 1, 0, 0), Descriptor::new(Wait, 5, 5, 0)],
        );
        seq.step().unwrap();
        seq.step().unwrap();
        assert_eq!(seq.prog_idx(), 1);
        seq.step().unwrap();
        let done = &seq.program()[0];
        assert_eq!(done.y_counter(), -1);
        assert!(done.is_done());
        assert_eq!(done.x_counter(), 1);
    }

    #[test]
    fn test_empty_program() {
        let mut seq = programmed(&[1], &[]);
        assert!(seq.is_programmed());
        assert!(seq.is_exhausted());
        assert_eq!(seq.step(), Err(SeqError::ProgramExhausted { len: 0 }));
        assert_eq!(seq.prog_idx(), 0);
    }

    #[test]
    fn test_reset_like_new() {
        let mut seq = programmed(&[1, 2, 3], &[Descriptor::new(GenWait, 0, 3, 1)]);
        seq.step().unwrap();
        seq.reset();
        let fresh = Sequencer::new();
        assert_eq!(seq.snapshot(), fresh.snapshot());
        assert!(seq.weights().is_empty());
        assert_eq!(seq.weight_idx(), 0);
        assert!(!seq.is_programmed());
        seq.reset();
        assert_eq!(seq.snapshot(), fresh.snapshot());
    }

    #[test]
    fn test_load_weights_keeps_program() {
        let mut seq = programmed(&[1, 2], &[Descriptor::new(GenWait, 1, 2, 1)]);
        seq.step().unwrap();
        seq.step().unwrap();
        let before = seq.snapshot();
        seq.load_weights(&[7, 8, 9, 10]);
        assert_eq!(seq.snapshot(), before);
        assert_eq!(seq.current_weight(), Ok(8));
    }

    #[test]
    fn test_load_program_copies_and_reloads() {
        let mut program = vec![Descriptor::new(GenWait, 0, 1, 1)];
        let mut seq = programmed(&[0, 1, 2], &program);
        program[0].state = Suspended;
        program[0].y_modify = 100;
        seq.step().unwrap();
        assert_eq!(seq.weight_idx(), 1);

        // a half-run descriptor taken from another sequencer starts over
        let taken = seq.program().to_vec();
        assert_eq!(taken[0].y_counter(), 0);
        let mut other = programmed(&[0, 1, 2], &taken);
        assert_eq!(other.program()[0].y_counter(), 1);
        other.step().unwrap();
        assert_eq!(other.prog_idx(), 0);
    }

    #[test]
    fn test_reload_keeps_weight_idx() {
        let mut seq = programmed(&[0, 1, 2, 3], &[Descriptor::new(GenWait, 0, 0, 2)]);
        seq.step().unwrap();
        seq.load_program(&[Descriptor::new(GenWait, 0, 0, 1)]);
        assert_eq!(seq.prog_idx(), 0);
        seq.step().unwrap();
        assert_eq!(seq.current_weight(), Ok(3));
    }

    #[test]
    fn test_current_weight_out_of_range() {
        let mut seq = programmed(&[1, 2], &[Descriptor::new(GenWait, 0, 1, -1)]);
        seq.step().unwrap();
        assert_eq!(
            seq.current_weight(),
            Err(SeqError::IndexOutOfRange { index: -1, len: 2 })
        );
        // negative excursions are allowed as long as nobody reads them
        seq.load_program(&[Descriptor::new(GenWait, 0, 0, 2)]);
        seq.step().unwrap();
        assert_eq!(seq.current_weight(), Ok(2));

        let empty = Sequencer::new();
        assert_eq!(
            empty.current_weight(),
            Err(SeqError::IndexOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_raw_program() {
        let raw = |state| RawDescriptor {
            state,
            x_count: 0,
            y_count: 0,
            y_modify: 1,
        };
        let mut seq = Sequencer::new();
        seq.load_raw_program(&[raw(state_code::GENWAIT), raw(state_code::WAIT)])
            .unwrap();
        assert_eq!(seq.program()[1].state, Wait);

        let before = seq.snapshot();
        assert_eq!(
            seq.load_raw_program(&[raw(state_code::SUSPENDED), raw(3)]),
            Err(SeqError::InvalidDescriptorState(3))
        );
        assert_eq!(seq.snapshot(), before);
    }

    #[test]
    fn test_state_code() {
        for state in [GenWait, Wait, Suspended] {
            assert_eq!(DescriptorState::try_from(state.code()), Ok(state));
        }
        assert_eq!(
            DescriptorState::try_from(0xff),
            Err(SeqError::InvalidDescriptorState(0xff))
        );
    }
}
