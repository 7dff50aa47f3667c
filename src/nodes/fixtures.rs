//! Test-only node with a required input.

use crate::node::{audio_input, BlockInputs, BlockOutputs, ExecuteError, Node, NodeClass, NodeInfo};
use crate::port::{PortDecl, PortDefault, PortKind, VertexInterface};
use crate::settings::OperatorSettings;

const INPUTS: &[PortDecl] = &[
    PortDecl::new("In", PortKind::Audio, "Signal. Must be bound."),
    PortDecl::with_default("Gain", "Scale factor.", PortDefault::Audio(1.0)),
];
const OUTPUTS: &[PortDecl] = &[PortDecl::new("Out", PortKind::Audio, "In times Gain.")];

static INFO: NodeInfo = NodeInfo {
    name: "Scale",
    display_name: "Scale",
    major_version: 1,
    minor_version: 0,
    description: "Multiplies a bound signal by a gain.",
    category: "Test",
    author: None,
    interface: VertexInterface {
        inputs: INPUTS,
        outputs: OUTPUTS,
    },
};

#[derive(Debug)]
pub(crate) struct Scale {
    block_size: usize,
}

impl NodeClass for Scale {
    fn info() -> &'static NodeInfo {
        &INFO
    }

    fn create(settings: &OperatorSettings) -> Self {
        Self {
            block_size: settings.block_size(),
        }
    }
}

impl Node for Scale {
    fn describe(&self) -> &'static NodeInfo {
        &INFO
    }

    fn execute(
        &mut self,
        inputs: &BlockInputs<'_>,
        outputs: &mut BlockOutputs<'_>,
    ) -> Result<(), ExecuteError> {
        let input = audio_input(inputs, 0, self.block_size)?;
        let gain = audio_input(inputs, 1, self.block_size)?;
        let out = outputs.audio_mut(0)?;
        for ((o, &x), &g) in out.iter_mut().zip(input).zip(gain) {
            *o = x * g;
        }
        Ok(())
    }
}
