//! Port declarations: the static vertex interface of a node.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt;

/// The kind of data carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// One block of `f32` samples.
    Audio,
    /// Sparse trigger offsets within one block.
    Trigger,
    /// An integer configuration value (e.g. a comparison type).
    Enum,
    /// A scalar time in seconds.
    Time,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortKind::Audio => "audio",
            PortKind::Trigger => "trigger",
            PortKind::Enum => "enum",
            PortKind::Time => "time",
        };
        f.write_str(name)
    }
}

/// Value the host supplies to an input that has no producer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortDefault {
    /// Fill the audio block with a constant.
    Audio(f32),
    /// A trigger buffer that never fires.
    NoTriggers,
    /// A constant enumeration value.
    Enum(i32),
    /// A constant time in seconds.
    Time(f64),
}

impl PortDefault {
    /// The port kind this default can satisfy.
    pub const fn kind(&self) -> PortKind {
        match self {
            PortDefault::Audio(_) => PortKind::Audio,
            PortDefault::NoTriggers => PortKind::Trigger,
            PortDefault::Enum(_) => PortKind::Enum,
            PortDefault::Time(_) => PortKind::Time,
        }
    }
}

/// A named, typed port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortDecl {
    /// Name used by the host to bind the port.
    pub name: &'static str,
    /// Data kind.
    pub kind: PortKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Default for an unbound input. Inputs without one are required.
    pub default: Option<PortDefault>,
}

impl PortDecl {
    /// A required input or an output.
    pub const fn new(name: &'static str, kind: PortKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            default: None,
        }
    }

    /// An optional input backed by `default`.
    pub const fn with_default(
        name: &'static str,
        description: &'static str,
        default: PortDefault,
    ) -> Self {
        Self {
            name,
            kind: default.kind(),
            description,
            default: Some(default),
        }
    }

    /// True when the host must bind a producer to this input.
    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// The complete port layout of a node class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInterface {
    /// Read ports, in execution index order.
    pub inputs: &'static [PortDecl],
    /// Write ports, in execution index order.
    pub outputs: &'static [PortDecl],
}

impl VertexInterface {
    /// Index of the input named `name`.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    /// Index of the output named `name`.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUTS: &[PortDecl] = &[
        PortDecl::new("In", PortKind::Audio, "Signal."),
        PortDecl::with_default("Type", "Mode.", PortDefault::Enum(0)),
    ];
    const OUTPUTS: &[PortDecl] = &[PortDecl::new("Out", PortKind::Audio, "Result.")];
    const INTERFACE: VertexInterface = VertexInterface {
        inputs: INPUTS,
        outputs: OUTPUTS,
    };

    #[test]
    fn lookup_by_name() {
        assert_eq!(INTERFACE.input_index("Type"), Some(1));
        assert_eq!(INTERFACE.output_index("Out"), Some(0));
        assert_eq!(INTERFACE.input_index("Out"), None);
    }

    #[test]
    fn default_sets_kind_and_optionality() {
        assert!(INPUTS[0].is_required());
        assert!(!INPUTS[1].is_required());
        assert_eq!(INPUTS[1].kind, PortKind::Enum);
    }
}
