//! Phasor: a ramp in `[0, 1)` driven by an audio-rate frequency input.

use crate::invariant_rt::INV_PHASE_WRAPPED;
use crate::node::{audio_input, BlockInputs, BlockOutputs, ExecuteError, Node, NodeClass, NodeInfo};
use crate::port::{PortDecl, PortDefault, PortKind, VertexInterface};
use crate::settings::OperatorSettings;

/// Largest `f32` strictly below 1.0.
const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

pub const IN: usize = 0;
pub const OUT: usize = 0;

const INPUTS: &[PortDecl] = &[PortDecl::with_default(
    "In",
    "Ramp frequency in Hz, per sample. Negative values ramp downward.",
    PortDefault::Audio(0.0),
)];
const OUTPUTS: &[PortDecl] = &[PortDecl::new("Out", PortKind::Audio, "Ramp in [0, 1).")];

static INFO: NodeInfo = NodeInfo {
    name: "Phasor",
    display_name: "Phasor (Audio)",
    major_version: 1,
    minor_version: 0,
    description: "Generates a ramp between 0 and 1 (or 1 and 0) at the frequency given by the input signal.",
    category: "Utils",
    author: None,
    interface: VertexInterface {
        inputs: INPUTS,
        outputs: OUTPUTS,
    },
};

/// Wrap `phase` into `[0, 1)`.
///
/// `%` keeps the sign of the dividend, so negative remainders are lifted by
/// one. A remainder of `-tiny` lifts to exactly 1.0 in floating point and is
/// folded to 0.0.
#[inline]
pub fn wrap_phase(phase: f64) -> f64 {
    let mut wrapped = phase % 1.0;
    if wrapped < 0.0 {
        wrapped += 1.0;
    }
    if wrapped >= 1.0 {
        wrapped = 0.0;
    }
    wrapped
}

/// Phase accumulator. Owns the phase and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseAccumulator {
    phase: f64,
    inv_sample_rate: f64,
}

impl PhaseAccumulator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            inv_sample_rate: 1.0 / sample_rate as f64,
        }
    }

    /// Current phase, always in `[0, 1)`.
    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Advance by one sample at `frequency` Hz and return the new phase.
    ///
    /// Returns `(phase, wrapped)`. A non-finite frequency leaves the phase
    /// where it is.
    #[inline]
    pub fn tick(&mut self, frequency: f32) -> (f64, bool) {
        let increment = frequency as f64 * self.inv_sample_rate;
        if !increment.is_finite() {
            return (self.phase, false);
        }
        let unwrapped = self.phase + increment;
        self.phase = wrap_phase(unwrapped);
        (self.phase, !(0.0..1.0).contains(&unwrapped))
    }

    /// Fill `out` with the post-increment phase for each frequency sample.
    ///
    /// Returns true if the ramp wrapped anywhere in the block.
    pub fn process(&mut self, frequency: &[f32], out: &mut [f32]) -> bool {
        let mut wrapped_any = false;
        for (o, &f) in out.iter_mut().zip(frequency) {
            let (phase, wrapped) = self.tick(f);
            wrapped_any |= wrapped;
            *o = (phase as f32).min(BELOW_ONE);
        }
        wrapped_any
    }
}

/// The Phasor node.
#[derive(Debug)]
pub struct Phasor {
    accumulator: PhaseAccumulator,
    block_size: usize,
}

impl Phasor {
    #[inline]
    pub fn phase(&self) -> f64 {
        self.accumulator.phase()
    }
}

impl NodeClass for Phasor {
    fn info() -> &'static NodeInfo {
        &INFO
    }

    fn create(settings: &OperatorSettings) -> Self {
        Self {
            accumulator: PhaseAccumulator::new(settings.sample_rate()),
            block_size: settings.block_size(),
        }
    }
}

impl Node for Phasor {
    fn describe(&self) -> &'static NodeInfo {
        &INFO
    }

    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError> {
        let frequency = audio_input(inputs, IN, self.block_size)?;
        let out = outputs.audio_mut(OUT)?;
        if self.accumulator.process(frequency, out) {
            outputs.signal(INV_PHASE_WRAPPED);
        }
        Ok(())
    }
}
