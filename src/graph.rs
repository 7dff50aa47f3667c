//! Graph module: nodes, host-fed inputs and the edges between them.
//!
//! Nodes execute in insertion order, so an edge may only run from an
//! earlier node to a later one. Anything else is rejected when the edge is
//! added, together with unknown ports, kind mismatches and a second
//! producer for an input that is already fed.

#![forbid(unsafe_code)]

use crate::invariant_ppt::{assert_invariant, GRAPH_LEGALITY, GRAPH_REJECTS_INVALID};
use crate::node::Node;
use crate::port::{PortDecl, PortKind};
use crate::settings::OperatorSettings;
use std::fmt;

/// Position of a node in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a port within one side of a node's interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub usize);

/// A host-fed input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ext{}", self.0)
    }
}

/// Where an edge takes its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSource {
    /// An output port of an earlier node.
    Node { node: NodeId, port: PortId },
    /// A buffer the host writes before each block.
    External(ExternalId),
}

/// An edge feeding one input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: EdgeSource,
    pub to_node: NodeId,
    pub to_port: PortId,
    /// Data kind carried; must match both ends.
    pub kind: PortKind,
}

/// A node with its host-side label.
pub struct NodeData {
    pub id: NodeId,
    pub label: String,
    pub node: Box<dyn Node>,
}

impl NodeData {
    pub fn inputs(&self) -> &'static [PortDecl] {
        self.node.describe().interface.inputs
    }

    pub fn outputs(&self) -> &'static [PortDecl] {
        self.node.describe().interface.outputs
    }
}

impl fmt::Debug for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.node.describe();
        f.debug_struct("NodeData")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("class", &info.name)
            .field("major_version", &info.major_version)
            .finish()
    }
}

/// Errors that can occur when building the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    InvalidNode(NodeId),
    #[error("node {node} has no port {port}")]
    InvalidPort { node: NodeId, port: PortId },
    #[error("external input {0} does not exist")]
    UnknownExternal(ExternalId),
    #[error("edge carries {edge} data but the port expects {port}")]
    KindMismatch { edge: PortKind, port: PortKind },
    #[error("input {port} of node {node} already has a producer")]
    PortAlreadyConnected { node: NodeId, port: PortId },
    #[error("edge from node {from} to node {to} does not run forward")]
    BackwardEdge { from: NodeId, to: NodeId },
}

/// The signal graph.
#[derive(Debug)]
pub struct Graph {
    settings: OperatorSettings,
    nodes: Vec<NodeData>,
    externals: Vec<PortKind>,
    edges: Vec<Edge>,
}

impl Graph {
    /// An empty graph whose nodes run with `settings`.
    pub fn new(settings: OperatorSettings) -> Self {
        Self {
            settings,
            nodes: Vec::new(),
            externals: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn settings(&self) -> &OperatorSettings {
        &self.settings
    }

    /// Append a node. It runs after every node added before it.
    pub fn add_node(&mut self, label: impl Into<String>, node: Box<dyn Node>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let label = label.into();
        tracing::debug!(%id, %label, class = node.describe().name, "added node");
        self.nodes.push(NodeData { id, label, node });
        id
    }

    /// Declare a host-fed input of `kind`.
    pub fn add_external(&mut self, kind: PortKind) -> ExternalId {
        let id = ExternalId(self.externals.len());
        self.externals.push(kind);
        id
    }

    /// Add an edge after validating both ends.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let result = self.validate_edge(&edge);
        if let Err(err) = &result {
            assert_invariant(
                GRAPH_REJECTS_INVALID,
                true,
                "Invalid edge rejected",
                Some("add_edge"),
            );
            tracing::warn!(?edge, %err, "rejected edge");
            return result;
        }

        self.edges.push(edge);
        assert_invariant(
            GRAPH_LEGALITY,
            self.is_legal(),
            "Edge added, graph remains legal",
            Some("add_edge"),
        );
        Ok(())
    }

    fn validate_edge(&self, edge: &Edge) -> Result<(), GraphError> {
        let target = self
            .nodes
            .get(edge.to_node.0)
            .ok_or(GraphError::InvalidNode(edge.to_node))?;
        let input = target
            .inputs()
            .get(edge.to_port.0)
            .ok_or(GraphError::InvalidPort {
                node: edge.to_node,
                port: edge.to_port,
            })?;

        let source_kind = match edge.from {
            EdgeSource::Node { node, port } => {
                let source = self.nodes.get(node.0).ok_or(GraphError::InvalidNode(node))?;
                if node >= edge.to_node {
                    return Err(GraphError::BackwardEdge {
                        from: node,
                        to: edge.to_node,
                    });
                }
                source
                    .outputs()
                    .get(port.0)
                    .ok_or(GraphError::InvalidPort { node, port })?
                    .kind
            }
            EdgeSource::External(id) => *self
                .externals
                .get(id.0)
                .ok_or(GraphError::UnknownExternal(id))?,
        };

        for kind in [source_kind, input.kind] {
            if kind != edge.kind {
                return Err(GraphError::KindMismatch {
                    edge: edge.kind,
                    port: kind,
                });
            }
        }

        if self.input_edge(edge.to_node, edge.to_port).is_some() {
            return Err(GraphError::PortAlreadyConnected {
                node: edge.to_node,
                port: edge.to_port,
            });
        }
        Ok(())
    }

    fn is_legal(&self) -> bool {
        self.edges.iter().enumerate().all(|(i, edge)| {
            let forward = match edge.from {
                EdgeSource::Node { node, .. } => node < edge.to_node,
                EdgeSource::External(id) => id.0 < self.externals.len(),
            };
            let unique = !self.edges[..i]
                .iter()
                .any(|e| e.to_node == edge.to_node && e.to_port == edge.to_port);
            forward && unique
        })
    }

    /// The edge feeding input `port` of `node`, if any.
    pub fn input_edge(&self, node: NodeId, port: PortId) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.to_node == node && e.to_port == port)
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Kinds of the host-fed inputs, by `ExternalId`.
    pub fn externals(&self) -> &[PortKind] {
        &self.externals
    }

    pub(crate) fn into_nodes(self) -> Vec<NodeData> {
        self.nodes
    }
}
