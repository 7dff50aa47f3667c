//! Single-node harness: drives one node instance with host-fed inputs.
//!
//! Inputs default to each port's declared default, or silence when none is
//! declared. Used by the integration tests and benches.

use crate::buffer::{PortBuffer, TriggerBuffer, TriggerError};
use crate::invariant_rt::new_invariant_queue;
use crate::node::{BlockInputs, BlockOutputs, ExecuteError, Node, NodeClass};
use crate::settings::OperatorSettings;
use rtrb::{Consumer, Producer};

/// Harness owning one node and its port buffers.
pub struct NodeHarness<N: Node> {
    node: N,
    settings: OperatorSettings,
    inputs: Vec<PortBuffer>,
    outputs: Vec<PortBuffer>,
    tx: Producer<u8>,
    rx: Consumer<u8>,
}

impl<N: NodeClass> NodeHarness<N> {
    /// Create the node and buffers for `settings`.
    pub fn new(settings: OperatorSettings) -> Self {
        let node = N::create(&settings);
        Self::with_node(node, settings)
    }
}

impl<N: Node> NodeHarness<N> {
    /// Wrap an existing node instance.
    pub fn with_node(node: N, settings: OperatorSettings) -> Self {
        let interface = &node.describe().interface;
        let block_size = settings.block_size();
        let inputs = interface
            .inputs
            .iter()
            .map(|decl| match decl.default {
                Some(default) => PortBuffer::from_default(default, block_size),
                None => PortBuffer::silent(decl.kind, block_size),
            })
            .collect();
        let outputs = interface
            .outputs
            .iter()
            .map(|decl| PortBuffer::silent(decl.kind, block_size))
            .collect();
        let (tx, rx) = new_invariant_queue();
        Self {
            node,
            settings,
            inputs,
            outputs,
            tx,
            rx,
        }
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn settings(&self) -> &OperatorSettings {
        &self.settings
    }

    /// Replace the buffer of input `port`.
    pub fn set_input(&mut self, port: usize, buffer: PortBuffer) {
        if let Some(slot) = self.inputs.get_mut(port) {
            *slot = buffer;
        }
    }

    pub fn input_mut(&mut self, port: usize) -> Option<&mut PortBuffer> {
        self.inputs.get_mut(port)
    }

    /// Fill audio input `port` with `value`.
    pub fn fill_audio(&mut self, port: usize, value: f32) {
        if let Some(PortBuffer::Audio(samples)) = self.inputs.get_mut(port) {
            samples.fill(value);
        }
    }

    /// Replace the edges on trigger input `port`.
    pub fn set_triggers(&mut self, port: usize, offsets: &[usize]) -> Result<(), TriggerError> {
        let mut triggers = TriggerBuffer::new(self.settings.block_size());
        for &offset in offsets {
            triggers.trigger_frame(offset)?;
        }
        self.set_input(port, PortBuffer::Trigger(triggers));
        Ok(())
    }

    /// Run one block.
    pub fn run_block(&mut self) -> Result<(), ExecuteError> {
        let inputs = BlockInputs::direct(&self.inputs);
        let mut outputs = BlockOutputs::with_signals(&mut self.outputs, &mut self.tx);
        self.node.execute(&inputs, &mut outputs)
    }

    pub fn output(&self, port: usize) -> Option<&PortBuffer> {
        self.outputs.get(port)
    }

    pub fn audio_output(&self, port: usize) -> Option<&[f32]> {
        match self.outputs.get(port) {
            Some(PortBuffer::Audio(samples)) => Some(samples),
            _ => None,
        }
    }

    pub fn time_output(&self, port: usize) -> Option<f64> {
        match self.outputs.get(port) {
            Some(PortBuffer::Time(value)) => Some(*value),
            _ => None,
        }
    }

    /// RT signals raised since the last drain.
    pub fn drain_signals(&mut self) -> Vec<u8> {
        crate::invariant_rt::drain_invariant_signals(&mut self.rx)
    }
}
