// pass.rs: Pass descriptors: metadata, dependency resolution, artifact IDs
//
// Declares the shipped passes, their dependency edges and the artifacts they
// produce. The pipeline runner uses it to compute the minimal pass list for
// a requested terminal pass.

use std::collections::HashSet;

use crate::node::Node;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    StateInfo,
    DeadCodeElimination,
    TypeCheck,
}

/// Machine-readable artifact identifiers. Each maps to a field of the
/// compilation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    StateTables, // StateInfo
    Optimized,   // Node (decoder)
    Typed,       // Node (annotated tree)
    Symbols,     // SymbolTable
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a pass.
pub struct PassDescriptor {
    /// Name used in diagnostics and timing output.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
    /// Artifacts this pass produces.
    pub outputs: &'static [ArtifactId],
    /// Classes the root must belong to, any one of them.
    pub roots: &'static [&'static str],
    /// The accepted roots, as shown in diagnostics.
    pub root_label: &'static str,
    /// Postconditions (documentation only).
    pub invariants: &'static str,
}

impl PassDescriptor {
    /// Whether the pass can run on a tree rooted at `node`.
    pub fn accepts(&self, node: &Node) -> bool {
        self.roots.iter().any(|class| node.is_a(class))
    }
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::StateInfo => PassDescriptor {
            name: "state_info",
            inputs: &[],
            outputs: &[ArtifactId::StateTables],
            roots: &["Decoder", "DFA"],
            root_label: "Decoder or DFA",
            invariants: "outgoing/incoming/dfa tables filled and locked",
        },
        PassId::DeadCodeElimination => PassDescriptor {
            name: "dead_code_elimination",
            inputs: &[PassId::StateInfo],
            outputs: &[ArtifactId::Optimized],
            roots: &["Decoder"],
            root_label: "Decoder",
            invariants: "every action feeds an output, every input is read",
        },
        PassId::TypeCheck => PassDescriptor {
            name: "type_check",
            inputs: &[],
            outputs: &[ArtifactId::Typed, ArtifactId::Symbols],
            roots: &["Stmt", "Expr"],
            root_label: "Stmt or Expr",
            invariants: "every expression typed, implicit conversions explicit",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

pub const ALL_PASSES: [PassId; 3] = [
    PassId::StateInfo,
    PassId::DeadCodeElimination,
    PassId::TypeCheck,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut scheduled = HashSet::new();
    let mut order = Vec::new();
    schedule(terminal, &mut scheduled, &mut order);
    order
}

/// Depth-first: dependencies are pushed before the pass itself.
fn schedule(pass: PassId, scheduled: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if scheduled.insert(pass) {
        for &dep in descriptor(pass).inputs {
            schedule(dep, scheduled, order);
        }
        order.push(pass);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
