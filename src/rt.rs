//! RT module: real-time execution engine.
//!
//! Every buffer is allocated when the runtime is built. `process_block`
//! executes nodes in insertion order and never allocates, locks or logs;
//! progress and faults are reported through the optional signal channel.

// IMPORTANT: Do not call assert_invariant or any tracing macro in RT paths.

use crate::buffer::{PortBuffer, TriggerBuffer};
use crate::graph::{ExternalId, Graph, NodeId, PortId};
use crate::invariant_ppt::{assert_invariant, BUFFERS_PREALLOCATED};
use crate::invariant_rt::{signal_invariant, INV_BLOCK_EXECUTED, INV_NODE_FAULT_CONTAINED};
use crate::node::{BlockInputs, BlockOutputs, ExecuteError, Node};
use crate::plan::{Plan, PlanError};
use crate::port::PortKind;
use crate::settings::OperatorSettings;
use rtrb::Producer;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Why a node's last faulted block was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFault {
    Error(ExecuteError),
    Panic,
}

/// Errors from host-side access to a runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("node {node} has no output port {port}")]
    UnknownOutput { node: NodeId, port: PortId },
    #[error("output {port} of node {node} carries {found} data, not audio")]
    NotAudio {
        node: NodeId,
        port: PortId,
        found: PortKind,
    },
}

/// The runtime engine.
pub struct Runtime {
    plan: Plan,
    nodes: Vec<Box<dyn Node>>,
    labels: Vec<String>,
    outputs: Vec<Vec<PortBuffer>>,
    // Scalar outputs saved before each call, restored if the call faults.
    held: Vec<Vec<PortBuffer>>,
    externals: Vec<PortBuffer>,
    fault_counts: Vec<u64>,
    last_faults: Vec<Option<NodeFault>>,
    signals: Option<Producer<u8>>,
    blocks: u64,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("labels", &self.labels)
            .field("blocks", &self.blocks)
            .field("fault_counts", &self.fault_counts)
            .finish_non_exhaustive()
    }
}

fn scalar_slot(buffer: &PortBuffer) -> PortBuffer {
    match buffer {
        PortBuffer::Audio(_) => PortBuffer::Audio(Vec::new()),
        PortBuffer::Trigger(_) => PortBuffer::Trigger(TriggerBuffer::new(0)),
        other => other.clone(),
    }
}

fn save_scalars(outputs: &[PortBuffer], held: &mut [PortBuffer]) {
    for (slot, buffer) in held.iter_mut().zip(outputs) {
        match (slot, buffer) {
            (PortBuffer::Time(slot), PortBuffer::Time(value)) => *slot = *value,
            (PortBuffer::Enum(slot), PortBuffer::Enum(value)) => *slot = *value,
            _ => {}
        }
    }
}

/// Degrade a faulted node's outputs: silence audio, drop triggers, hold
/// scalars at their pre-block value.
fn silence_outputs(outputs: &mut [PortBuffer], held: &[PortBuffer]) {
    for (buffer, slot) in outputs.iter_mut().zip(held) {
        match (buffer, slot) {
            (PortBuffer::Audio(samples), _) => samples.fill(0.0),
            (PortBuffer::Trigger(triggers), _) => triggers.clear(),
            (PortBuffer::Time(value), PortBuffer::Time(saved)) => *value = *saved,
            (PortBuffer::Enum(value), PortBuffer::Enum(saved)) => *value = *saved,
            _ => {}
        }
    }
}

impl Runtime {
    /// Create a runtime from a plan and the graph it was compiled from.
    pub fn new(plan: Plan, graph: Graph) -> Result<Self, PlanError> {
        plan.check_matches(&graph)?;
        let block_size = plan.settings().block_size();

        let mut nodes = Vec::with_capacity(plan.node_count());
        let mut labels = Vec::with_capacity(plan.node_count());
        for data in graph.into_nodes() {
            nodes.push(data.node);
            labels.push(data.label);
        }

        let outputs: Vec<Vec<PortBuffer>> = plan
            .execution_order()
            .iter()
            .map(|&id| {
                plan.output_kinds(id)
                    .unwrap_or_default()
                    .iter()
                    .map(|&kind| PortBuffer::silent(kind, block_size))
                    .collect()
            })
            .collect();
        let held = outputs
            .iter()
            .map(|ports| ports.iter().map(scalar_slot).collect())
            .collect();
        let externals: Vec<PortBuffer> = plan
            .external_kinds()
            .iter()
            .map(|&kind| PortBuffer::silent(kind, block_size))
            .collect();

        assert_invariant(
            BUFFERS_PREALLOCATED,
            outputs.iter().flatten().chain(&externals).all(|b| match b {
                PortBuffer::Audio(samples) => samples.len() == block_size,
                PortBuffer::Trigger(triggers) => triggers.block_size() == block_size,
                _ => true,
            }),
            "Every port buffer sized for one block",
            Some("Runtime::new"),
        );
        tracing::debug!(nodes = nodes.len(), externals = externals.len(), block_size, "runtime ready");

        let count = nodes.len();
        Ok(Self {
            plan,
            nodes,
            labels,
            outputs,
            held,
            externals,
            fault_counts: vec![0; count],
            last_faults: vec![None; count],
            signals: None,
            blocks: 0,
        })
    }

    /// Compile `graph` and build a runtime from it.
    pub fn from_graph(graph: Graph) -> Result<Self, PlanError> {
        let plan = Plan::compile(&graph)?;
        Self::new(plan, graph)
    }

    /// Forward RT invariant signals to `tx` from now on.
    pub fn set_signal_channel(&mut self, tx: Producer<u8>) {
        self.signals = Some(tx);
    }

    pub fn settings(&self) -> &OperatorSettings {
        self.plan.settings()
    }

    pub fn block_size(&self) -> usize {
        self.plan.settings().block_size()
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Process one block.
    ///
    /// A node that returns an error or panics has its outputs degraded and
    /// the block continues with the next node.
    pub fn process_block(&mut self) {
        let sources = self.plan.all_sources();
        let defaults = self.plan.defaults();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let (upstream, rest) = self.outputs.split_at_mut(index);
            let Some((own, _)) = rest.split_first_mut() else {
                continue;
            };
            let Some(node_sources) = sources.get(index) else {
                continue;
            };
            let held = &mut self.held[index];
            save_scalars(own, held);

            let inputs = BlockInputs::resolved(node_sources, upstream, &self.externals, defaults);
            let mut outputs = match self.signals.as_mut() {
                Some(tx) => BlockOutputs::with_signals(own, tx),
                None => BlockOutputs::new(own),
            };
            let result = catch_unwind(AssertUnwindSafe(|| node.execute(&inputs, &mut outputs)));
            let fault = match result {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(NodeFault::Error(err)),
                Err(_) => Some(NodeFault::Panic),
            };

            if let Some(fault) = fault {
                silence_outputs(own, held);
                self.fault_counts[index] += 1;
                self.last_faults[index] = Some(fault);
                if let Some(tx) = self.signals.as_mut() {
                    signal_invariant(tx, INV_NODE_FAULT_CONTAINED);
                }
            }
        }

        for external in &mut self.externals {
            if let PortBuffer::Trigger(triggers) = external {
                triggers.clear();
            }
        }
        self.blocks += 1;
        if let Some(tx) = self.signals.as_mut() {
            signal_invariant(tx, INV_BLOCK_EXECUTED);
        }
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks
    }

    /// Audio samples of external `id`, written before `process_block`.
    /// The slice length is fixed at `block_size`.
    pub fn external_audio_mut(&mut self, id: ExternalId) -> Option<&mut [f32]> {
        match self.externals.get_mut(id.0) {
            Some(PortBuffer::Audio(samples)) => Some(samples),
            _ => None,
        }
    }

    /// Trigger edges for the next block. Cleared when the block completes.
    pub fn external_triggers_mut(&mut self, id: ExternalId) -> Option<&mut TriggerBuffer> {
        match self.externals.get_mut(id.0) {
            Some(PortBuffer::Trigger(triggers)) => Some(triggers),
            _ => None,
        }
    }

    /// Set an enum external. Returns false if `id` is not an enum input.
    pub fn set_external_enum(&mut self, id: ExternalId, value: i32) -> bool {
        match self.externals.get_mut(id.0) {
            Some(PortBuffer::Enum(slot)) => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Set a time external. Returns false if `id` is not a time input.
    pub fn set_external_time(&mut self, id: ExternalId, value: f64) -> bool {
        match self.externals.get_mut(id.0) {
            Some(PortBuffer::Time(slot)) => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    pub fn output(&self, node: NodeId, port: PortId) -> Option<&PortBuffer> {
        self.outputs.get(node.0).and_then(|ports| ports.get(port.0))
    }

    pub fn audio_output(&self, node: NodeId, port: PortId) -> Option<&[f32]> {
        match self.output(node, port) {
            Some(PortBuffer::Audio(samples)) => Some(samples),
            _ => None,
        }
    }

    pub fn time_output(&self, node: NodeId, port: PortId) -> Option<f64> {
        match self.output(node, port) {
            Some(PortBuffer::Time(value)) => Some(*value),
            _ => None,
        }
    }

    /// Blocks in which `node` faulted.
    pub fn fault_count(&self, node: NodeId) -> u64 {
        self.fault_counts.get(node.0).copied().unwrap_or(0)
    }

    pub fn last_fault(&self, node: NodeId) -> Option<NodeFault> {
        self.last_faults.get(node.0).copied().flatten()
    }

    /// Log every node that has faulted so far. Call from a non-RT thread.
    ///
    /// Returns the total number of faulted blocks across all nodes.
    pub fn report_faults(&self) -> u64 {
        let mut total = 0;
        for (index, &count) in self.fault_counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            total += count;
            tracing::warn!(
                node = %NodeId(index),
                label = %self.labels[index],
                faults = count,
                last = ?self.last_faults[index],
                "node faulted; outputs were degraded"
            );
        }
        total
    }

    /// Run `blocks` blocks and collect one audio output.
    pub fn render_offline(
        &mut self,
        node: NodeId,
        port: PortId,
        blocks: usize,
    ) -> Result<Vec<f32>, RuntimeError> {
        match self.output(node, port) {
            Some(PortBuffer::Audio(_)) => {}
            Some(other) => {
                return Err(RuntimeError::NotAudio {
                    node,
                    port,
                    found: other.kind(),
                })
            }
            None => return Err(RuntimeError::UnknownOutput { node, port }),
        }

        let mut rendered = Vec::with_capacity(blocks * self.block_size());
        for _ in 0..blocks {
            self.process_block();
            if let Some(samples) = self.audio_output(node, port) {
                rendered.extend_from_slice(samples);
            }
        }
        tracing::debug!(%node, samples = rendered.len(), "rendered offline");
        Ok(rendered)
    }
}
