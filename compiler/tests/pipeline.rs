// Integration tests for the pass pipeline: minimal pass selection, artifact
// population and error reporting through CompilationState.

use irpass::decoder::*;
use irpass::diag::{codes, DiagLevel};
use irpass::expr::{self, Bop, Ty};
use irpass::pass::{descriptor, ArtifactId, PassId};
use irpass::pipeline::{run_pipeline, CompilationState, PipelineOptions};
use irpass::Node;

// ── Test helpers ────────────────────────────────────────────────────────────

/// One automaton emitting `tok` on a clock tick, plus an unused channel.
fn small_decoder() -> (Node, Vec<Node>) {
    let (used, unused) = (channel(1).unwrap(), channel(1).unwrap());
    let tok = token(8, false).unwrap();
    let s: Vec<_> = (0..2).map(|_| state().unwrap()).collect();
    let t = transition(
        &s[0],
        &s[1],
        &delayed_event(2).unwrap(),
        vec![append(&tok, &used).unwrap(), emit(&tok).unwrap()],
    )
    .unwrap();
    let automaton = dfa(&s[0], s.clone(), vec![t]).unwrap();
    let dec = decoder(vec![used, unused], vec![tok], vec![automaton]).unwrap();
    (dec, s)
}

fn run(root: Node, terminal: PassId) -> (CompilationState, Vec<PassId>, bool) {
    let mut state = CompilationState::new(root);
    let mut ran = Vec::new();
    let ok = run_pipeline(
        &mut state,
        terminal,
        &PipelineOptions { time_passes: true },
        |pass, _| ran.push(pass),
    )
    .is_ok();
    (state, ran, ok)
}

// ── Decoder passes ──────────────────────────────────────────────────────────

#[test]
fn dce_runs_state_info_first() {
    let (dec, s) = small_decoder();
    let (state, ran, ok) = run(dec, PassId::DeadCodeElimination);

    assert!(ok);
    assert_eq!(ran, vec![PassId::StateInfo, PassId::DeadCodeElimination]);
    assert!(!state.has_error);
    assert!(state.diagnostics.is_empty());

    let optimized = state.optimized.expect("optimized decoder");
    assert_eq!(optimized.nodes("inputs").unwrap().count(), 1);
    let info = state.state_info.expect("state tables");
    assert_eq!(info.outgoing(&s[0]).unwrap().len(), 1);
    assert!(state.typed.is_none());
}

#[test]
fn state_info_alone_leaves_the_tree_untouched() {
    let (dec, _) = small_decoder();
    let (state, ran, ok) = run(dec.clone(), PassId::StateInfo);
    assert!(ok);
    assert_eq!(ran, vec![PassId::StateInfo]);
    assert!(state.optimized.is_none());
    assert_eq!(state.root, dec);
}

#[test]
fn failing_pass_is_reported() {
    let s: Vec<_> = (0..2).map(|_| state().unwrap()).collect();
    let stray = state().unwrap();
    let automaton = dfa(&stray, s, vec![]).unwrap();
    let dec = decoder(vec![], vec![], vec![automaton.clone()]).unwrap();

    let mut state = CompilationState::new(dec);
    let mut ran = Vec::new();
    let err = run_pipeline(
        &mut state,
        PassId::DeadCodeElimination,
        &PipelineOptions::default(),
        |pass, _| ran.push(pass),
    )
    .unwrap_err();

    assert_eq!(err.failing_pass, PassId::StateInfo);
    assert_eq!(ran, vec![PassId::StateInfo]);
    assert!(state.has_error);
    assert!(state.state_info.is_none());
    assert!(state.optimized.is_none());

    assert_eq!(state.diagnostics.len(), 1);
    let diag = &state.diagnostics[0];
    assert_eq!(diag.level, DiagLevel::Error);
    assert_eq!(diag.code, Some(codes::E0403));
    assert_eq!(diag.pass, Some("state_info"));
    assert_eq!(diag.related_nodes[0].0, automaton.id());
}

#[test]
fn dce_rejects_a_bare_automaton() {
    let s: Vec<_> = (0..1).map(|_| state().unwrap()).collect();
    let automaton = dfa(&s[0], s.clone(), vec![]).unwrap();
    let (state, ran, ok) = run(automaton.clone(), PassId::DeadCodeElimination);

    assert!(!ok);
    assert_eq!(ran, vec![PassId::StateInfo, PassId::DeadCodeElimination]);
    // StateInfo accepts a lone DFA; DCE is refused before it runs.
    assert!(state.has_artifact(ArtifactId::StateTables));
    assert!(!state.has_artifact(ArtifactId::Optimized));
    let diag = &state.diagnostics[0];
    assert_eq!(diag.code, Some(codes::E0402));
    assert_eq!(diag.pass, Some("dead_code_elimination"));
    assert_eq!(diag.related_nodes[0].0, automaton.id());
}

#[test]
fn state_info_refuses_an_expression_root() {
    let sum = expr::bin_op(Bop::Add, expr::int(1).unwrap(), expr::int(2).unwrap()).unwrap();
    let (state, ran, ok) = run(sum, PassId::StateInfo);

    assert!(!ok);
    assert_eq!(ran, vec![PassId::StateInfo]);
    assert!(state.has_error);
    assert!(!state.has_artifact(ArtifactId::StateTables));
    assert_eq!(
        state.diagnostics[0].to_string(),
        "error[E0402]: state_info: expected `Decoder or DFA`, found `BinOp`"
    );
}

#[test]
fn type_check_refuses_a_decoder_root() {
    let (dec, _) = small_decoder();
    let (state, _, ok) = run(dec, PassId::TypeCheck);

    assert!(!ok);
    assert!(state.typed.is_none());
    assert_eq!(state.diagnostics[0].code, Some(codes::E0402));
    assert_eq!(state.diagnostics[0].pass, Some("type_check"));
}

#[test]
fn successful_runs_fill_every_declared_artifact() {
    let (dec, _) = small_decoder();
    let (state, ran, ok) = run(dec, PassId::DeadCodeElimination);
    assert!(ok);
    for pass in ran {
        for &artifact in descriptor(pass).outputs {
            assert!(state.has_artifact(artifact), "{pass:?} left {artifact:?} empty");
        }
    }
    assert!(!state.has_artifact(ArtifactId::Typed));
}

// ── Type checking ───────────────────────────────────────────────────────────

#[test]
fn type_check_fills_tree_and_symbols() {
    let program = expr::block(vec![expr::assign(
        expr::var("x").unwrap(),
        expr::bin_op(Bop::Div, expr::int(7).unwrap(), expr::float(2.0).unwrap()).unwrap(),
    )
    .unwrap()])
    .unwrap();
    let (state, ran, ok) = run(program, PassId::TypeCheck);

    assert!(ok);
    assert_eq!(ran, vec![PassId::TypeCheck]);
    assert!(state.state_info.is_none());
    assert_eq!(state.symbols.unwrap().get("x"), Some(Ty::Float));
    let typed = state.typed.unwrap();
    let val = typed
        .nodes("body")
        .unwrap()
        .next()
        .unwrap()
        .node("val")
        .unwrap()
        .clone();
    assert_eq!(expr::type_of(&val).unwrap(), Some(Ty::Float));
}

#[test]
fn type_errors_become_diagnostics() {
    let program = expr::assign(expr::var("y").unwrap(), expr::var("nope").unwrap()).unwrap();
    let (state, _, ok) = run(program, PassId::TypeCheck);

    assert!(!ok);
    assert!(state.typed.is_none());
    assert!(state.symbols.is_none());
    assert_eq!(
        state.diagnostics[0].to_string(),
        "error[E0302]: name `nope` is not defined"
    );
    assert_eq!(state.diagnostics[0].pass, Some("type_check"));
}
