//! Trigger timer: seconds elapsed between trigger edges, sample accurate.
//!
//! A block is walked as contiguous segments split at trigger offsets.
//! Samples before an edge accumulate into the elapsed counter; at the edge
//! the counter plus the distance into the current segment is emitted and
//! the counter restarts from that offset.
//!
//! Two classes share the counter:
//!
//! - `Timer` v1.0 honors only the first edge of a block. Later edges in the
//!   same block neither emit nor reset; their samples keep accumulating.
//! - `Timer` v2.0 emits at every edge and holds the last emission.

use crate::invariant_rt::{INV_TRIGGER_HONORED, INV_TRIGGER_IGNORED};
use crate::node::{BlockInputs, BlockOutputs, ExecuteError, Node, NodeClass, NodeInfo};
use crate::port::{PortDecl, PortDefault, PortKind, VertexInterface};
use crate::settings::OperatorSettings;

pub const IN: usize = 0;
pub const OUT: usize = 0;

const INPUTS: &[PortDecl] = &[PortDecl::with_default(
    "In",
    "Each trigger outputs the time since the previous one.",
    PortDefault::NoTriggers,
)];
const OUTPUTS: &[PortDecl] = &[PortDecl::new(
    "Out",
    PortKind::Time,
    "Seconds between the last two honored triggers.",
)];
const INTERFACE: VertexInterface = VertexInterface {
    inputs: INPUTS,
    outputs: OUTPUTS,
};

static FIRST_EDGE_INFO: NodeInfo = NodeInfo {
    name: "Timer",
    display_name: "Timer",
    major_version: 1,
    minor_version: 0,
    description: "Outputs time between triggers (does not support multiple triggers in a single block).",
    category: "Utils",
    author: Some("Chris Wratt"),
    interface: INTERFACE,
};

static EVERY_EDGE_INFO: NodeInfo = NodeInfo {
    name: "Timer",
    display_name: "Timer (Every Edge)",
    major_version: 2,
    minor_version: 0,
    description: "Outputs time between triggers, emitting at every trigger within a block.",
    category: "Utils",
    author: None,
    interface: INTERFACE,
};

/// Which edges of a block produce an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    FirstEdge,
    EveryEdge,
}

/// Result of processing one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerOutcome {
    /// Last time emitted in this block, in seconds.
    pub emitted: Option<f64>,
    pub honored: usize,
    pub ignored: usize,
}

/// Elapsed-sample counter with block splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerTimer {
    elapsed: u64,
    sample_rate: f64,
    mode: TimerMode,
}

impl TriggerTimer {
    pub fn new(sample_rate: u32, mode: TimerMode) -> Self {
        Self {
            elapsed: 0,
            sample_rate: sample_rate as f64,
            mode,
        }
    }

    /// Samples counted since the last honored edge, up to the end of the
    /// last processed block.
    #[inline]
    pub fn elapsed_samples(&self) -> u64 {
        self.elapsed
    }

    #[inline]
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Process one block of `block_size` samples with edges at `offsets`.
    ///
    /// `offsets` must be strictly increasing and below `block_size`.
    pub fn process(&mut self, offsets: &[usize], block_size: usize) -> TimerOutcome {
        debug_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(offsets.last().map_or(true, |&last| last < block_size));

        let mut segment_start = 0;
        let mut emitted = None;
        let mut honored = 0;
        for &offset in offsets {
            if self.mode == TimerMode::FirstEdge && honored == 1 {
                break;
            }
            let samples = self.elapsed + offset.saturating_sub(segment_start) as u64;
            emitted = Some(samples as f64 / self.sample_rate);
            self.elapsed = 0;
            segment_start = offset;
            honored += 1;
        }
        self.elapsed += block_size.saturating_sub(segment_start) as u64;

        TimerOutcome {
            emitted,
            honored,
            ignored: offsets.len() - honored,
        }
    }
}

fn execute_timer(
    timer: &mut TriggerTimer,
    block_size: usize,
    inputs: &BlockInputs<'_>,
    outputs: &mut BlockOutputs<'_>,
) -> Result<(), ExecuteError> {
    let triggers = inputs.triggers(IN)?;
    let time = outputs.time_mut(OUT)?;
    let outcome = timer.process(triggers.offsets(), block_size);
    if let Some(seconds) = outcome.emitted {
        *time = seconds;
    }
    if outcome.honored > 0 {
        outputs.signal(INV_TRIGGER_HONORED);
    }
    if outcome.ignored > 0 {
        outputs.signal(INV_TRIGGER_IGNORED);
    }
    Ok(())
}

/// `Timer` v1.0: honors the first trigger of each block.
#[derive(Debug)]
pub struct Timer {
    timer: TriggerTimer,
    block_size: usize,
}

impl Timer {
    #[inline]
    pub fn elapsed_samples(&self) -> u64 {
        self.timer.elapsed_samples()
    }
}

impl NodeClass for Timer {
    fn info() -> &'static NodeInfo {
        &FIRST_EDGE_INFO
    }

    fn create(settings: &OperatorSettings) -> Self {
        Self {
            timer: TriggerTimer::new(settings.sample_rate(), TimerMode::FirstEdge),
            block_size: settings.block_size(),
        }
    }
}

impl Node for Timer {
    fn describe(&self) -> &'static NodeInfo {
        &FIRST_EDGE_INFO
    }

    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError> {
        execute_timer(&mut self.timer, self.block_size, inputs, outputs)
    }
}

/// `Timer` v2.0: emits at every trigger.
#[derive(Debug)]
pub struct EveryEdgeTimer {
    timer: TriggerTimer,
    block_size: usize,
}

impl EveryEdgeTimer {
    #[inline]
    pub fn elapsed_samples(&self) -> u64 {
        self.timer.elapsed_samples()
    }
}

impl NodeClass for EveryEdgeTimer {
    fn info() -> &'static NodeInfo {
        &EVERY_EDGE_INFO
    }

    fn create(settings: &OperatorSettings) -> Self {
        Self {
            timer: TriggerTimer::new(settings.sample_rate(), TimerMode::EveryEdge),
            block_size: settings.block_size(),
        }
    }
}

impl Node for EveryEdgeTimer {
    fn describe(&self) -> &'static NodeInfo {
        &EVERY_EDGE_INFO
    }

    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError> {
        execute_timer(&mut self.timer, self.block_size, inputs, outputs)
    }
}
