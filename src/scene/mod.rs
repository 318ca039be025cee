//! Scene graph module
//!
//! Manages the retained node hierarchy and its construction:
//! - `Node`: a single graph element (transform, material, geometry, ...)
//! - `NodeKind`: tagged union of the supported node kinds
//! - `SceneGraph`: arena-backed hierarchy with id registry and instance edges
//! - `NodeFactory`: node wrapper recycling
//! - `NodeSelector`: the mutation entry point that feeds the compiler

pub mod graph;
pub mod kind;
pub mod node;
pub mod node_factory;
pub mod selector;

pub use graph::SceneGraph;
pub use kind::NodeKind;
pub use node::Node;
pub use node_factory::NodeFactory;
pub use selector::NodeSelector;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Arena handle for nodes within a [`SceneGraph`].
    pub struct NodeId;
}

/// Identifies one scene graph, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(pub u32);

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

/// Mutation operation applied to a node attribute.
///
/// `Set`, `Add`, `Inc` and `Remove` are issued by user code through
/// [`NodeSelector`]; `Loaded` and `Searching` are issued internally when an
/// asynchronous resource arrives or an instance node is still resolving its
/// target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Replace an attribute value
    Set,
    /// Append to a collection attribute (layers, children, ...)
    Add,
    /// Increment a numeric attribute
    Inc,
    /// Remove from a collection attribute
    Remove,
    /// A pending resource for this node's core finished loading
    Loaded,
    /// An instance node is still searching for its target
    Searching,
}

impl Op {
    /// Short name used in log lines.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Op::Set => "set",
            Op::Add => "add",
            Op::Inc => "inc",
            Op::Remove => "remove",
            Op::Loaded => "loaded",
            Op::Searching => "searching",
        }
    }
}

/// Declarative node record supplied by the scene description front-end.
///
/// A tree of these records is walked once at engine construction; each record
/// becomes one node, bound to a (possibly shared) state core. The record is
/// `serde`-deserializable so scene files can be plain JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    /// Node kind name, e.g. `"translate"`, `"material"`. Empty means `"group"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Optional user-assigned id, unique within the graph.
    pub id: Option<String>,

    /// Optional explicit core id for state sharing across nodes.
    pub core_id: Option<String>,

    /// Kind-specific attributes.
    pub attributes: serde_json::Map<String, serde_json::Value>,

    /// Child records.
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// Starts a record of the given kind.
    #[must_use]
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    /// Sets the user-assigned node id.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Sets the explicit core id for state sharing.
    #[must_use]
    pub fn with_core_id(mut self, core_id: &str) -> Self {
        self.core_id = Some(core_id.to_string());
        self
    }

    /// Adds one attribute.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Appends a child record.
    #[must_use]
    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }
}
