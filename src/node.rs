//! The block execution contract implemented by every processing node.

#![forbid(unsafe_code)]

use crate::buffer::{PortBuffer, TriggerBuffer};
use crate::plan::InputSource;
use crate::port::{PortKind, VertexInterface};
use crate::settings::OperatorSettings;
use rtrb::Producer;

/// Descriptive metadata of a node class. Has no behavioral effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeInfo {
    /// Class name used for registry lookup.
    pub name: &'static str,
    pub display_name: &'static str,
    pub major_version: u32,
    pub minor_version: u32,
    pub description: &'static str,
    pub category: &'static str,
    pub author: Option<&'static str>,
    /// Port layout.
    pub interface: VertexInterface,
}

/// How one input port was wired by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// A producer of this kind feeds the port.
    Connected(PortKind),
    /// Nothing feeds the port.
    Unbound,
}

/// Build-time binding errors, reported before a node is instantiated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("required input '{port}' of '{node}' is not bound")]
    MissingBinding {
        node: &'static str,
        port: &'static str,
    },
    #[error("input '{port}' of '{node}' expects {expected} data, got {found}")]
    KindMismatch {
        node: &'static str,
        port: &'static str,
        expected: PortKind,
        found: PortKind,
    },
    #[error("'{node}' declares {expected} inputs, {found} bindings supplied")]
    ArityMismatch {
        node: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Faults raised inside `execute`. Never crosses into the host: the runtime
/// absorbs it and degrades the node's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    #[error("port {port} is not available")]
    MissingPort { port: usize },
    #[error("port {port} does not hold {expected} data")]
    KindMismatch { port: usize, expected: PortKind },
    #[error("port {port} holds {actual} samples, expected {expected}")]
    LengthMismatch {
        port: usize,
        expected: usize,
        actual: usize,
    },
}

/// Object-safe processing node, driven by the host once per block.
pub trait Node: Send {
    /// Metadata and port layout of this node's class.
    fn describe(&self) -> &'static NodeInfo;

    /// Check the host's wiring once, before the first `execute`.
    fn bind_ports(&self, bindings: &[Binding]) -> Result<(), BindError> {
        check_bindings(self.describe(), bindings)
    }

    /// Process one block. Must not allocate, block or log.
    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError>;
}

/// Static side of a node: class metadata and construction.
pub trait NodeClass: Node + Sized + 'static {
    fn info() -> &'static NodeInfo;

    /// Build a fresh instance with all state at its initial value.
    fn create(settings: &OperatorSettings) -> Self;
}

/// Default binding check: kinds must match, required inputs must be bound.
pub fn check_bindings(info: &NodeInfo, bindings: &[Binding]) -> Result<(), BindError> {
    let inputs = info.interface.inputs;
    if inputs.len() != bindings.len() {
        return Err(BindError::ArityMismatch {
            node: info.name,
            expected: inputs.len(),
            found: bindings.len(),
        });
    }
    for (decl, binding) in inputs.iter().zip(bindings) {
        match *binding {
            Binding::Connected(found) if found != decl.kind => {
                return Err(BindError::KindMismatch {
                    node: info.name,
                    port: decl.name,
                    expected: decl.kind,
                    found,
                });
            }
            Binding::Unbound if decl.is_required() => {
                return Err(BindError::MissingBinding {
                    node: info.name,
                    port: decl.name,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum InputLayout<'a> {
    Direct(&'a [PortBuffer]),
    Resolved {
        sources: &'a [InputSource],
        upstream: &'a [Vec<PortBuffer>],
        externals: &'a [PortBuffer],
        defaults: &'a [PortBuffer],
    },
}

/// Read-only view of a node's input ports for one block.
pub struct BlockInputs<'a> {
    layout: InputLayout<'a>,
}

impl<'a> BlockInputs<'a> {
    /// Inputs held directly in port order.
    pub fn direct(ports: &'a [PortBuffer]) -> Self {
        Self {
            layout: InputLayout::Direct(ports),
        }
    }

    pub(crate) fn resolved(
        sources: &'a [InputSource],
        upstream: &'a [Vec<PortBuffer>],
        externals: &'a [PortBuffer],
        defaults: &'a [PortBuffer],
    ) -> Self {
        Self {
            layout: InputLayout::Resolved {
                sources,
                upstream,
                externals,
                defaults,
            },
        }
    }

    /// The buffer behind input `port`, wherever the host keeps it.
    pub fn port(&self, port: usize) -> Result<&'a PortBuffer, ExecuteError> {
        let found = match self.layout {
            InputLayout::Direct(ports) => ports.get(port),
            InputLayout::Resolved {
                sources,
                upstream,
                externals,
                defaults,
            } => match sources.get(port) {
                Some(InputSource::Upstream { node, port: output }) => {
                    upstream.get(node.0).and_then(|outputs| outputs.get(output.0))
                }
                Some(InputSource::External(id)) => externals.get(id.0),
                Some(InputSource::Default(index)) => defaults.get(*index),
                None => None,
            },
        };
        found.ok_or(ExecuteError::MissingPort { port })
    }

    pub fn audio(&self, port: usize) -> Result<&'a [f32], ExecuteError> {
        match self.port(port)? {
            PortBuffer::Audio(samples) => Ok(samples),
            _ => Err(ExecuteError::KindMismatch {
                port,
                expected: PortKind::Audio,
            }),
        }
    }

    pub fn triggers(&self, port: usize) -> Result<&'a TriggerBuffer, ExecuteError> {
        match self.port(port)? {
            PortBuffer::Trigger(triggers) => Ok(triggers),
            _ => Err(ExecuteError::KindMismatch {
                port,
                expected: PortKind::Trigger,
            }),
        }
    }

    pub fn enum_value(&self, port: usize) -> Result<i32, ExecuteError> {
        match self.port(port)? {
            PortBuffer::Enum(value) => Ok(*value),
            _ => Err(ExecuteError::KindMismatch {
                port,
                expected: PortKind::Enum,
            }),
        }
    }

    pub fn time(&self, port: usize) -> Result<f64, ExecuteError> {
        match self.port(port)? {
            PortBuffer::Time(value) => Ok(*value),
            _ => Err(ExecuteError::KindMismatch {
                port,
                expected: PortKind::Time,
            }),
        }
    }
}

/// Writable view of a node's output ports for one block.
pub struct BlockOutputs<'a> {
    buffers: &'a mut [PortBuffer],
    signals: Option<&'a mut Producer<u8>>,
}

impl<'a> BlockOutputs<'a> {
    pub fn new(buffers: &'a mut [PortBuffer]) -> Self {
        Self {
            buffers,
            signals: None,
        }
    }

    /// Outputs that also forward RT invariant signals to `signals`.
    pub fn with_signals(buffers: &'a mut [PortBuffer], signals: &'a mut Producer<u8>) -> Self {
        Self {
            buffers,
            signals: Some(signals),
        }
    }

    pub fn audio_mut(&mut self, port: usize) -> Result<&mut [f32], ExecuteError> {
        match self.buffers.get_mut(port) {
            Some(PortBuffer::Audio(samples)) => Ok(samples),
            Some(_) => Err(ExecuteError::KindMismatch {
                port,
                expected: PortKind::Audio,
            }),
            None => Err(ExecuteError::MissingPort { port }),
        }
    }

    pub fn time_mut(&mut self, port: usize) -> Result<&mut f64, ExecuteError> {
        match self.buffers.get_mut(port) {
            Some(PortBuffer::Time(value)) => Ok(value),
            Some(_) => Err(ExecuteError::KindMismatch {
                port,
                expected: PortKind::Time,
            }),
            None => Err(ExecuteError::MissingPort { port }),
        }
    }

    /// Raise an RT invariant signal. Dropped when no channel is attached.
    #[inline]
    pub fn signal(&mut self, id: u8) {
        if let Some(tx) = self.signals.as_deref_mut() {
            crate::invariant_rt::signal_invariant(tx, id);
        }
    }
}

/// Fetch an input audio block and check it spans `expected` samples.
pub(crate) fn audio_input<'a>(
    inputs: &BlockInputs<'a>,
    port: usize,
    expected: usize,
) -> Result<&'a [f32], ExecuteError> {
    let samples = inputs.audio(port)?;
    if samples.len() != expected {
        return Err(ExecuteError::LengthMismatch {
            port,
            expected,
            actual: samples.len(),
        });
    }
    Ok(samples)
}
