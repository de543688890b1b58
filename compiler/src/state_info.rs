// state_info.rs: Per-state transition tables for decoder DFAs
//
// Walks a decoder (or a single DFA) and records, for every state:
//   outgoing: transitions leaving it, in DFA order
//   incoming: transitions entering it, in DFA order
//   dfa:      the automaton it belongs to
//
// Preconditions: every DFA lists its start state among its states.
// Postconditions: all three fields are locked when `build` returns.
// Failure modes: `UnexpectedNode` for a root that is neither a decoder nor a
//   DFA; `StartNotInStates` for a DFA violating the precondition.
// Side effects: none.

use log::debug;

use crate::error::{Error, Result};
use crate::meta::{MetaField, MetaRepository};
use crate::node::Node;
use crate::schema::FieldType;
use crate::visit::{walk, Visitor};

pub const OUTGOING: &str = "outgoing";
pub const INCOMING: &str = "incoming";
pub const DFA: &str = "dfa";

const TRANSITIONS: FieldType = FieldType::List(&FieldType::Node("Transition"));

/// Locked snapshot of the state tables of one decoder.
#[derive(Debug)]
pub struct StateInfo {
    repo: MetaRepository,
}

impl StateInfo {
    /// Run the analysis over `root`.
    pub fn build(root: &Node) -> Result<StateInfo> {
        if !matches!(root.kind(), "Decoder" | "DFA") {
            return Err(Error::UnexpectedNode {
                pass: "state_info",
                expected: "Decoder or DFA",
                found: root.kind(),
            });
        }
        let mut repo = MetaRepository::new();
        repo.register(MetaField::new(OUTGOING, "State", TRANSITIONS))?;
        repo.register(MetaField::new(INCOMING, "State", TRANSITIONS))?;
        repo.register(MetaField::new(DFA, "State", FieldType::Node("DFA")))?;

        let mut pass = StateInfoPass {
            repo: &mut repo,
            states: 0,
            transitions: 0,
        };
        pass.visit(root)?;
        let (states, transitions) = (pass.states, pass.transitions);

        repo.lock_all();
        debug!(
            "state_info: {} states, {} transitions annotated",
            states, transitions
        );
        Ok(StateInfo { repo })
    }

    /// Transitions leaving `state`.
    pub fn outgoing(&self, state: &Node) -> Result<Vec<Node>> {
        self.repo.field(OUTGOING)?.get_nodes(state)
    }

    /// Transitions entering `state`.
    pub fn incoming(&self, state: &Node) -> Result<Vec<Node>> {
        self.repo.field(INCOMING)?.get_nodes(state)
    }

    /// The DFA `state` belongs to. Fails for states no DFA lists.
    pub fn dfa(&self, state: &Node) -> Result<&Node> {
        self.repo.field(DFA)?.get_node(state)
    }

    pub fn repository(&self) -> &MetaRepository {
        &self.repo
    }

    pub fn into_repository(self) -> MetaRepository {
        self.repo
    }
}

/// Run the analysis and return the bare repository.
pub fn annotate(root: &Node) -> Result<MetaRepository> {
    StateInfo::build(root).map(StateInfo::into_repository)
}

struct StateInfoPass<'a> {
    repo: &'a mut MetaRepository,
    states: usize,
    transitions: usize,
}

impl Visitor for StateInfoPass<'_> {
    fn visit(&mut self, node: &Node) -> Result<()> {
        match node.kind() {
            "Decoder" => {
                for dfa in node.nodes("dfas")? {
                    self.visit(dfa)?;
                }
                Ok(())
            }
            "DFA" => {
                for transition in node.nodes("transitions")? {
                    self.visit(transition)?;
                }
                let start = node.node("start")?;
                if !node.nodes("states")?.any(|state| state == start) {
                    return Err(Error::StartNotInStates { dfa: node.id() });
                }
                let field = self.repo.field_mut(DFA)?;
                for state in node.nodes("states")? {
                    field.set(state, node)?;
                    self.states += 1;
                }
                Ok(())
            }
            "Transition" => {
                self.repo
                    .field_mut(OUTGOING)?
                    .add(node.node("source")?, node)?;
                self.repo
                    .field_mut(INCOMING)?
                    .add(node.node("destination")?, node)?;
                self.transitions += 1;
                Ok(())
            }
            _ => walk(self, node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{self, Edge};

    struct Chain {
        decoder: Node,
        dfa: Node,
        states: [Node; 3],
        transitions: [Node; 2],
    }

    // A -> B -> C, both on a rising edge of one channel.
    fn chain() -> Chain {
        let ch = decoder::channel(1).unwrap();
        let clk = decoder::external_event(Edge::Rising, &ch).unwrap();
        let states = [
            decoder::state().unwrap(),
            decoder::state().unwrap(),
            decoder::state().unwrap(),
        ];
        let t1 = decoder::transition(&states[0], &states[1], &clk, vec![]).unwrap();
        let t2 = decoder::transition(&states[1], &states[2], &clk, vec![]).unwrap();
        let dfa = decoder::dfa(
            &states[0],
            states.to_vec(),
            vec![t1.clone(), t2.clone()],
        )
        .unwrap();
        let dec = decoder::decoder(vec![ch], vec![], vec![dfa.clone()]).unwrap();
        Chain {
            decoder: dec,
            dfa,
            states,
            transitions: [t1, t2],
        }
    }

    #[test]
    fn chain_tables() {
        let c = chain();
        let info = StateInfo::build(&c.decoder).unwrap();
        let [a, b, cc] = &c.states;
        let [t1, t2] = &c.transitions;

        assert_eq!(info.outgoing(a).unwrap(), vec![t1.clone()]);
        assert!(info.incoming(a).unwrap().is_empty());
        assert_eq!(info.outgoing(b).unwrap(), vec![t2.clone()]);
        assert_eq!(info.incoming(b).unwrap(), vec![t1.clone()]);
        assert!(info.outgoing(cc).unwrap().is_empty());
        assert_eq!(info.incoming(cc).unwrap(), vec![t2.clone()]);
        for state in &c.states {
            assert_eq!(info.dfa(state).unwrap(), &c.dfa);
        }
    }

    #[test]
    fn a_single_dfa_can_be_the_root() {
        let c = chain();
        let info = StateInfo::build(&c.dfa).unwrap();
        assert_eq!(info.outgoing(&c.states[0]).unwrap().len(), 1);
    }

    #[test]
    fn fields_are_locked() {
        let c = chain();
        let mut repo = annotate(&c.decoder).unwrap();
        for name in [OUTGOING, INCOMING, DFA] {
            assert!(repo.field(name).unwrap().is_readonly());
        }
        let err = repo
            .field_mut(OUTGOING)
            .unwrap()
            .add(&c.states[0], &c.transitions[1])
            .unwrap_err();
        assert!(matches!(err, Error::MetaReadonly(_)));
    }

    #[test]
    fn start_must_be_a_state() {
        let stray = decoder::state().unwrap();
        let s = decoder::state().unwrap();
        let dfa = decoder::dfa(&stray, vec![s], vec![]).unwrap();
        let err = StateInfo::build(&dfa).unwrap_err();
        assert!(matches!(err, Error::StartNotInStates { dfa: id } if id == dfa.id()));
    }

    #[test]
    fn only_decoders_and_dfas_are_roots() {
        let c = chain();
        let err = StateInfo::build(&c.transitions[0]).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedNode {
                expected: "Decoder or DFA",
                found: "Transition",
                ..
            }
        ));
    }

    #[test]
    fn states_outside_any_dfa_have_no_dfa() {
        let c = chain();
        let info = StateInfo::build(&c.decoder).unwrap();
        let stray = decoder::state().unwrap();
        assert!(matches!(info.dfa(&stray), Err(Error::MetaNotSet { .. })));
        assert!(info.outgoing(&stray).unwrap().is_empty());
    }
}
