//! Per-kind compilation level table.
//!
//! Maps `(node kind, operation, attribute)` to the [`CompileLevel`] a
//! mutation of that shape requires. Structural configuration for the generic
//! node surface (adding and removing children) overrides kind-specific
//! entries; anything unconfigured falls back to a full scene recompile, so
//! an unknown mutation is always safe, just not cheap.
//!
//! Compilation is optimised for attribute update at the cost of
//! restructure: adding or removing children recompiles broadly so the
//! traversal can rediscover which nodes sit inside instanced subtrees.

use crate::compile::CompileLevel;
use crate::scene::{NodeKind, Op};

/// Structural (kind-independent) levels. Checked before kind configs.
fn structural_level(op: Op, attr: &str) -> Option<CompileLevel> {
    match (op, attr) {
        // New children splice into the compiled representation of the branch.
        (Op::Add, "node" | "nodes") => Some(CompileLevel::Branch),
        // Removal must rediscover instanced-subtree membership.
        (Op::Remove, "node" | "nodes") => Some(CompileLevel::Scene),
        _ => None,
    }
}

/// Kind-specific levels.
fn kind_level(kind: &NodeKind, op: Op, attr: &str) -> Option<CompileLevel> {
    match kind {
        // Transforms invalidate everything below them (composed matrices)
        // and the path above (bounding volumes).
        NodeKind::Translate | NodeKind::Rotate | NodeKind::Scale => match op {
            Op::Set | Op::Inc => Some(CompileLevel::Branch),
            _ => None,
        },

        // View and projection compose with ancestor state only.
        NodeKind::LookAt | NodeKind::Camera => match op {
            Op::Set | Op::Inc => Some(CompileLevel::Path),
            _ => None,
        },

        // Material coefficients feed the shared shading stack on the path.
        NodeKind::Material => match op {
            Op::Set | Op::Inc => Some(CompileLevel::Path),
            _ => None,
        },

        NodeKind::Clip => match op {
            Op::Set | Op::Inc => Some(CompileLevel::Path),
            _ => None,
        },

        NodeKind::Texture => match (op, attr) {
            (Op::Set | Op::Add, "layers") => Some(CompileLevel::Path),
            // A newly arrived image can change program generation anywhere
            // the texture is shared.
            (Op::Loaded, _) => Some(CompileLevel::Scene),
            _ => None,
        },

        NodeKind::Geometry => match op {
            // Stream-loaded mesh data arrived.
            Op::Loaded => Some(CompileLevel::Branch),
            _ => None,
        },

        // Keep recompiling an instance while it searches for its target.
        NodeKind::Instance { .. } => match op {
            Op::Searching => Some(CompileLevel::Branch),
            _ => None,
        },

        NodeKind::Flags => match (op, attr) {
            (
                Op::Set | Op::Add,
                "transparent" | "enabled" | "picking" | "backfaces",
            ) => Some(CompileLevel::Branch),
            _ => None,
        },

        // Uniform parameter updates touch only the node's own compiled
        // state; the generated program is unaffected.
        NodeKind::Shader => match (op, attr) {
            (Op::Set | Op::Inc, "params") => Some(CompileLevel::Node),
            _ => None,
        },

        // Light lists illuminate the subtree below the owning node;
        // ancestors are unaffected.
        NodeKind::Lights => match (op, attr) {
            (Op::Set | Op::Add, "lights") => Some(CompileLevel::Subtree),
            _ => None,
        },

        NodeKind::Group | NodeKind::Library => None,
    }
}

/// Resolves the configured compilation level for one mutation.
///
/// Returns `None` when unconfigured; the scheduler then falls back to
/// [`CompileLevel::Scene`].
#[must_use]
pub fn configured_level(kind: &NodeKind, op: Op, attr: &str) -> Option<CompileLevel> {
    structural_level(op, attr).or_else(|| kind_level(kind, op, attr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_are_branch_level() {
        assert_eq!(
            configured_level(&NodeKind::Translate, Op::Set, "x"),
            Some(CompileLevel::Branch)
        );
        assert_eq!(
            configured_level(&NodeKind::Rotate, Op::Inc, "angle"),
            Some(CompileLevel::Branch)
        );
    }

    #[test]
    fn material_is_path_level() {
        assert_eq!(
            configured_level(&NodeKind::Material, Op::Set, "base_color"),
            Some(CompileLevel::Path)
        );
    }

    #[test]
    fn shader_params_are_node_level() {
        assert_eq!(
            configured_level(&NodeKind::Shader, Op::Set, "params"),
            Some(CompileLevel::Node)
        );
    }

    #[test]
    fn structural_removal_overrides_kind() {
        // Even on a transform node, removing a child is a scene recompile.
        assert_eq!(
            configured_level(&NodeKind::Translate, Op::Remove, "node"),
            Some(CompileLevel::Scene)
        );
    }

    #[test]
    fn light_lists_are_subtree_level() {
        assert_eq!(
            configured_level(&NodeKind::Lights, Op::Set, "lights"),
            Some(CompileLevel::Subtree)
        );
    }

    #[test]
    fn unconfigured_mutations_have_no_level() {
        assert_eq!(configured_level(&NodeKind::Group, Op::Set, "whatever"), None);
        // Shader source swaps regenerate programs; unconfigured, so they
        // fall back to a full scene recompile.
        assert_eq!(configured_level(&NodeKind::Shader, Op::Set, "source"), None);
    }
}
