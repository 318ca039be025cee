//! Compilation levels.
//!
//! A level describes how much of the scene graph a single mutation
//! invalidates. Levels are ordered from most general to most specific; the
//! numeric discriminants double as queue priorities, so the per-frame flush
//! processes broad invalidations before narrow ones and can discard requests
//! already covered by a broader pending one.

use std::fmt;

/// How much of the graph one mutation invalidates.
///
/// Each level subsumes the guarantees of the levels below it in scope:
/// `Scene` ⊃ `Branch` ⊃ (`Subtree` | `Path`) ⊃ `Node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompileLevel {
    /// Recompile the entire scene graph.
    Scene = 0,
    /// Recompile the node, its ancestors up to the root, and its subtree.
    Branch = 1,
    /// Recompile the node and its entire subtree; ancestors untouched.
    Subtree = 2,
    /// Recompile the node and its ancestors up to the root; subtree untouched.
    Path = 3,
    /// Recompile only the node itself.
    Node = 4,
}

impl CompileLevel {
    /// Whether this level covers at least as much of the graph as `other`.
    ///
    /// Only meaningful for the total queue ordering; `Subtree` and `Path`
    /// invalidate disjoint regions but are still ordered for scheduling.
    #[inline]
    #[must_use]
    pub fn at_least_as_general_as(self, other: CompileLevel) -> bool {
        self <= other
    }

    /// Level name used in trace logging.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CompileLevel::Scene => "SCENE",
            CompileLevel::Branch => "BRANCH",
            CompileLevel::Subtree => "SUBTREE",
            CompileLevel::Path => "PATH",
            CompileLevel::Node => "NODE",
        }
    }
}

impl fmt::Display for CompileLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
