//! Elementwise audio operators: compare, pow, sqrt and a one-pole FIR.

use crate::node::{audio_input, BlockInputs, BlockOutputs, ExecuteError, Node, NodeClass, NodeInfo};
use crate::port::{PortDecl, PortDefault, PortKind, VertexInterface};
use crate::settings::OperatorSettings;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const OUT_PORT: &[PortDecl] = &[PortDecl::new("Out", PortKind::Audio, "Audio output.")];

/// Relational test applied by [`Compare`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum Comparison {
    #[default]
    Equals = 0,
    NotEquals = 1,
    LessThan = 2,
    GreaterThan = 3,
    LessThanOrEquals = 4,
    GreaterThanOrEquals = 5,
}

impl Comparison {
    /// Decode an enum port value. Unknown values yield `None`.
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Equals,
            1 => Self::NotEquals,
            2 => Self::LessThan,
            3 => Self::GreaterThan,
            4 => Self::LessThanOrEquals,
            5 => Self::GreaterThanOrEquals,
            _ => return None,
        })
    }

    #[inline]
    pub fn test(self, a: f32, b: f32) -> bool {
        match self {
            Self::Equals => a == b,
            Self::NotEquals => a != b,
            Self::LessThan => a < b,
            Self::GreaterThan => a > b,
            Self::LessThanOrEquals => a <= b,
            Self::GreaterThanOrEquals => a >= b,
        }
    }
}

// ----------------------------------------------------------------------------
// Compare
// ----------------------------------------------------------------------------

pub mod compare {
    pub const IN: usize = 0;
    pub const COMPARE: usize = 1;
    pub const TYPE: usize = 2;
}

const COMPARE_INPUTS: &[PortDecl] = &[
    PortDecl::with_default("In", "Audio input.", PortDefault::Audio(0.0)),
    PortDecl::with_default(
        "Compare",
        "The value to test the input against.",
        PortDefault::Audio(0.0),
    ),
    PortDecl::with_default(
        "Type",
        "How to compare In and Compare.",
        PortDefault::Enum(Comparison::Equals as i32),
    ),
];

static COMPARE_INFO: NodeInfo = NodeInfo {
    name: "Compare",
    display_name: "Compare (Audio)",
    major_version: 1,
    minor_version: 0,
    description: "Compares inputs per sample, outputs 1 if the test holds and 0 otherwise.",
    category: "Utils",
    author: None,
    interface: VertexInterface {
        inputs: COMPARE_INPUTS,
        outputs: OUT_PORT,
    },
};

/// Per-sample relational test, 1.0 for true, 0.0 for false.
#[derive(Debug)]
pub struct Compare {
    block_size: usize,
}

impl NodeClass for Compare {
    fn info() -> &'static NodeInfo {
        &COMPARE_INFO
    }

    fn create(settings: &OperatorSettings) -> Self {
        Self {
            block_size: settings.block_size(),
        }
    }
}

impl Node for Compare {
    fn describe(&self) -> &'static NodeInfo {
        &COMPARE_INFO
    }

    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError> {
        let a = audio_input(inputs, compare::IN, self.block_size)?;
        let b = audio_input(inputs, compare::COMPARE, self.block_size)?;
        // Out-of-range selectors fall back to the declared default.
        let comparison = Comparison::from_i32(inputs.enum_value(compare::TYPE)?).unwrap_or_default();
        let out = outputs.audio_mut(0)?;
        for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
            *o = if comparison.test(x, y) { 1.0 } else { 0.0 };
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Pow
// ----------------------------------------------------------------------------

pub mod pow {
    pub const IN: usize = 0;
    pub const POWER: usize = 1;
}

const POW_INPUTS: &[PortDecl] = &[
    PortDecl::with_default("In", "Audio input.", PortDefault::Audio(0.0)),
    PortDecl::with_default("Power", "Exponent, per sample.", PortDefault::Audio(1.0)),
];

static POW_INFO: NodeInfo = NodeInfo {
    name: "Pow",
    display_name: "Pow (Audio)",
    major_version: 1,
    minor_version: 0,
    description: "Raises the input to the power of the second input.",
    category: "Utils",
    author: None,
    interface: VertexInterface {
        inputs: POW_INPUTS,
        outputs: OUT_PORT,
    },
};

#[derive(Debug)]
pub struct Pow {
    block_size: usize,
}

impl NodeClass for Pow {
    fn info() -> &'static NodeInfo {
        &POW_INFO
    }

    fn create(settings: &OperatorSettings) -> Self {
        Self {
            block_size: settings.block_size(),
        }
    }
}

impl Node for Pow {
    fn describe(&self) -> &'static NodeInfo {
        &POW_INFO
    }

    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError> {
        let base = audio_input(inputs, pow::IN, self.block_size)?;
        let power = audio_input(inputs, pow::POWER, self.block_size)?;
        let out = outputs.audio_mut(0)?;
        for ((o, &x), &p) in out.iter_mut().zip(base).zip(power) {
            *o = x.powf(p);
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Sqrt
// ----------------------------------------------------------------------------

const SQRT_INPUTS: &[PortDecl] = &[PortDecl::with_default(
    "In",
    "Audio input.",
    PortDefault::Audio(0.0),
)];

static SQRT_INFO: NodeInfo = NodeInfo {
    name: "Sqrt",
    display_name: "Sqrt (Audio)",
    major_version: 1,
    minor_version: 0,
    description: "Square root of the input. Negative samples output 0.",
    category: "Utils",
    author: None,
    interface: VertexInterface {
        inputs: SQRT_INPUTS,
        outputs: OUT_PORT,
    },
};

#[derive(Debug)]
pub struct Sqrt {
    block_size: usize,
}

impl NodeClass for Sqrt {
    fn info() -> &'static NodeInfo {
        &SQRT_INFO
    }

    fn create(settings: &OperatorSettings) -> Self {
        Self {
            block_size: settings.block_size(),
        }
    }
}

impl Node for Sqrt {
    fn describe(&self) -> &'static NodeInfo {
        &SQRT_INFO
    }

    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError> {
        let input = audio_input(inputs, 0, self.block_size)?;
        let out = outputs.audio_mut(0)?;
        for (o, &x) in out.iter_mut().zip(input) {
            *o = x.max(0.0).sqrt();
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// OnePoleFir
// ----------------------------------------------------------------------------

pub mod one_pole_fir {
    pub const IN: usize = 0;
    pub const A: usize = 1;
    pub const B: usize = 2;
}

const FIR_INPUTS: &[PortDecl] = &[
    PortDecl::with_default("In", "Audio input.", PortDefault::Audio(0.0)),
    PortDecl::with_default("A", "Gain of the current sample.", PortDefault::Audio(1.0)),
    PortDecl::with_default("B", "Gain of the previous sample.", PortDefault::Audio(0.0)),
];

static FIR_INFO: NodeInfo = NodeInfo {
    name: "OnePoleFir",
    display_name: "One Pole FIR (Audio)",
    major_version: 1,
    minor_version: 0,
    description: "y[n] = a * x[n] + b * x[n-1], with audio-rate coefficients.",
    category: "Utils",
    author: None,
    interface: VertexInterface {
        inputs: FIR_INPUTS,
        outputs: OUT_PORT,
    },
};

/// First-order FIR. Carries one input sample across blocks.
#[derive(Debug)]
pub struct OnePoleFir {
    previous: f32,
    block_size: usize,
}

impl NodeClass for OnePoleFir {
    fn info() -> &'static NodeInfo {
        &FIR_INFO
    }

    fn create(settings: &OperatorSettings) -> Self {
        Self {
            previous: 0.0,
            block_size: settings.block_size(),
        }
    }
}

impl Node for OnePoleFir {
    fn describe(&self) -> &'static NodeInfo {
        &FIR_INFO
    }

    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError> {
        let x = audio_input(inputs, one_pole_fir::IN, self.block_size)?;
        let a = audio_input(inputs, one_pole_fir::A, self.block_size)?;
        let b = audio_input(inputs, one_pole_fir::B, self.block_size)?;
        let out = outputs.audio_mut(0)?;
        let mut previous = self.previous;
        for (((o, &xn), &an), &bn) in out.iter_mut().zip(x).zip(a).zip(b) {
            *o = an * xn + bn * previous;
            previous = xn;
        }
        self.previous = previous;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PortBuffer;
    use approx::assert_abs_diff_eq;

    fn run<N: NodeClass>(node: &mut N, ports: &[PortBuffer], len: usize) -> Vec<f32> {
        let mut out = [PortBuffer::Audio(vec![0.0; len])];
        node.execute(&BlockInputs::direct(ports), &mut BlockOutputs::new(&mut out))
            .unwrap();
        match out {
            [PortBuffer::Audio(samples)] => samples,
            _ => unreachable!(),
        }
    }

    fn settings(block_size: usize) -> OperatorSettings {
        OperatorSettings::new(48_000, block_size).unwrap()
    }

    #[test]
    fn comparison_table() {
        use Comparison::*;
        let cases = [
            (Equals, [false, true, false]),
            (NotEquals, [true, false, true]),
            (LessThan, [true, false, false]),
            (GreaterThan, [false, false, true]),
            (LessThanOrEquals, [true, true, false]),
            (GreaterThanOrEquals, [false, true, true]),
        ];
        for (comparison, expected) in cases {
            let got = [comparison.test(0.0, 1.0), comparison.test(1.0, 1.0), comparison.test(2.0, 1.0)];
            assert_eq!(got, expected, "{:?}", comparison);
            assert_eq!(Comparison::from_i32(comparison as i32), Some(comparison));
        }
        assert_eq!(Comparison::from_i32(6), None);
    }

    #[test]
    fn compare_outputs_ones_and_zeros() {
        let mut node = Compare::create(&settings(3));
        let ports = [
            PortBuffer::Audio(vec![0.0, 0.5, 1.0]),
            PortBuffer::Audio(vec![0.5; 3]),
            PortBuffer::Enum(Comparison::GreaterThanOrEquals as i32),
        ];
        assert_eq!(run(&mut node, &ports, 3), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn compare_unknown_type_falls_back_to_equals() {
        let mut node = Compare::create(&settings(2));
        let ports = [
            PortBuffer::Audio(vec![0.5, 1.0]),
            PortBuffer::Audio(vec![0.5; 2]),
            PortBuffer::Enum(42),
        ];
        assert_eq!(run(&mut node, &ports, 2), vec![1.0, 0.0]);
    }

    #[test]
    fn pow_and_sqrt() {
        let mut pow = Pow::create(&settings(3));
        let ports = [
            PortBuffer::Audio(vec![2.0, 3.0, 4.0]),
            PortBuffer::Audio(vec![2.0, 0.0, 0.5]),
        ];
        let out = run(&mut pow, &ports, 3);
        for (got, want) in out.iter().zip([4.0, 1.0, 2.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
        }

        let mut sqrt = Sqrt::create(&settings(3));
        let ports = [PortBuffer::Audio(vec![9.0, -4.0, 0.25])];
        assert_eq!(run(&mut sqrt, &ports, 3), vec![3.0, 0.0, 0.5]);
    }

    #[test]
    fn fir_carries_previous_sample_across_blocks() {
        let mut fir = OnePoleFir::create(&settings(2));
        let coeffs = |x: Vec<f32>| {
            [
                PortBuffer::Audio(x),
                PortBuffer::Audio(vec![0.5; 2]),
                PortBuffer::Audio(vec![0.5; 2]),
            ]
        };
        assert_eq!(run(&mut fir, &coeffs(vec![2.0, 4.0]), 2), vec![1.0, 3.0]);
        assert_eq!(run(&mut fir, &coeffs(vec![0.0, 0.0]), 2), vec![2.0, 0.0]);
    }
}
