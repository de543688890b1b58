// pipeline.rs: Compilation state and pass orchestration
//
// Holds the input tree and every pass artifact, and runs the minimal set of
// passes for a given terminal PassId. A pass error becomes an error-level
// diagnostic tagged with the pass name and stops the run.
//
// Preconditions: none; a root a pass cannot take is reported, not run.
// Postconditions: every artifact a required pass declares is populated, or
//   has_error is set.
// Failure modes: a root outside a pass's accepted classes (E0402); any pass
//   returning an error.
// Side effects: calls on_pass_complete after each pass; logs pass timings
//   at info level when `time_passes` is set.

use std::time::{Duration, Instant};

use log::info;

use crate::dce::eliminate_dead_code;
use crate::diag::{DiagLevel, Diagnostic};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::pass::{descriptor, required_passes, ArtifactId, PassId};
use crate::state_info::StateInfo;
use crate::type_check::{analyze, SymbolTable};

// ── Options ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Log the wall time of every pass.
    pub time_passes: bool,
}

// ── Artifact storage ───────────────────────────────────────────────────────

/// Holds the input tree, pass artifacts and accumulated diagnostics.
#[derive(Debug)]
pub struct CompilationState {
    pub root: Node,
    pub state_info: Option<StateInfo>,
    /// Decoder after dead-code elimination.
    pub optimized: Option<Node>,
    /// Tree after type checking.
    pub typed: Option<Node>,
    pub symbols: Option<SymbolTable>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
}

impl CompilationState {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            state_info: None,
            optimized: None,
            typed: None,
            symbols: None,
            diagnostics: Vec::new(),
            has_error: false,
        }
    }

    /// Whether the artifact has been produced.
    pub fn has_artifact(&self, artifact: ArtifactId) -> bool {
        match artifact {
            ArtifactId::StateTables => self.state_info.is_some(),
            ArtifactId::Optimized => self.optimized.is_some(),
            ArtifactId::Typed => self.typed.is_some(),
            ArtifactId::Symbols => self.symbols.is_some(),
        }
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

/// Pipeline execution failed in a pass.
/// The diagnostics are available in `CompilationState.diagnostics`.
#[derive(Debug)]
pub struct PipelineError {
    /// The pass that produced the error.
    pub failing_pass: PassId,
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn has_error_diags(diags: &[Diagnostic]) -> bool {
    diags.iter().any(|d| d.level == DiagLevel::Error)
}

/// Split a pass result into its artifact and its diagnostics.
fn outcome<T>(pass_id: PassId, result: Result<T>) -> (Option<T>, Vec<Diagnostic>) {
    match result {
        Ok(artifact) => (Some(artifact), Vec::new()),
        Err(err) => (
            None,
            vec![Diagnostic::from(&err).with_pass(descriptor(pass_id).name)],
        ),
    }
}

/// Per-pass post-processing: callback, accumulate, timing, error check.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    options: &PipelineOptions,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &diags);
    let is_err = has_error_diags(&diags);
    state.diagnostics.extend(diags);
    if options.time_passes {
        info!(
            "{} complete, {:.1}ms",
            descriptor(pass_id).name,
            elapsed.as_secs_f64() * 1000.0
        );
    }
    if is_err {
        state.has_error = true;
        return Err(PipelineError {
            failing_pass: pass_id,
        });
    }
    Ok(())
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: root check → execute → on_pass_complete(callback) → timing → error check.
///
/// Dead-code elimination reuses the state tables of an earlier `StateInfo`
/// run and hands them back, so `state.state_info` describes the input tree
/// after a successful run.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    options: &PipelineOptions,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        let desc = descriptor(pass_id);
        if !desc.accepts(&state.root) {
            let err = Error::UnexpectedNode {
                pass: desc.name,
                expected: desc.root_label,
                found: state.root.kind(),
            };
            let diags = vec![Diagnostic::from(&err)
                .with_pass(desc.name)
                .with_related(state.root.id(), "root")];
            finish_pass(state, pass_id, diags, t.elapsed(), options, &mut on_pass_complete)?;
            continue;
        }
        let diags = match pass_id {
            PassId::StateInfo => {
                let (info, diags) = outcome(pass_id, StateInfo::build(&state.root));
                state.state_info = info;
                diags
            }
            PassId::DeadCodeElimination => {
                let known = state.state_info.take();
                let (result, diags) = outcome(pass_id, eliminate_dead_code(&state.root, known));
                if let Some(result) = result {
                    state.optimized = Some(result.decoder);
                    state.state_info = Some(result.state_info);
                }
                diags
            }
            PassId::TypeCheck => {
                let (result, diags) = outcome(pass_id, analyze(&state.root));
                if let Some(result) = result {
                    state.typed = Some(result.tree);
                    state.symbols = Some(result.symbols);
                }
                diags
            }
        };
        finish_pass(
            state,
            pass_id,
            diags,
            t.elapsed(),
            options,
            &mut on_pass_complete,
        )?;
        debug_assert!(
            desc.outputs.iter().all(|&a| state.has_artifact(a)),
            "{} left a declared artifact empty",
            desc.name
        );
    }
    Ok(())
}
