// dce.rs: Dead-code elimination for decoders
//
// Keeps only the work that contributes to an output token:
//   1. actions whose token is not a decoder output are dropped;
//   2. DFAs left without any action are dropped;
//   3. inputs are narrowed to the channels read by a kept `Append` or by the
//      trigger of a kept DFA's transition. A trigger that is itself a
//      transition reads the channels its live `Append`s sample.
//
// Transitions that lose all their actions stay, so the surviving automata
// keep their shape. One sweep, no fixpoint.
//
// Preconditions: the root is a `Decoder`.
// Postconditions: the input decoder is untouched; inputs of the result are
//   in discovery order.
// Failure modes: `UnexpectedNode` for a non-decoder root; `UnknownNode` for
//   action or trigger variants without a rule.
// Side effects: none.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::debug;

use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::node::{Node, Value};
use crate::state_info::StateInfo;
use crate::visit::{unhandled, Visitor};

const PASS: &str = "dead_code_elimination";

/// Output of `eliminate_dead_code`.
#[derive(Debug)]
pub struct DceResult {
    pub decoder: Node,
    /// State tables of the input decoder, computed if none were passed in.
    pub state_info: StateInfo,
}

/// Remove actions, automata and inputs that cannot affect any output.
pub fn eliminate_dead_code(decoder: &Node, state_info: Option<StateInfo>) -> Result<DceResult> {
    if decoder.kind() != "Decoder" {
        return Err(Error::UnexpectedNode {
            pass: PASS,
            expected: "Decoder",
            found: decoder.kind(),
        });
    }
    let state_info = match state_info {
        Some(info) => info,
        None => StateInfo::build(decoder)?,
    };

    let mut pass = DeadCodeElimination {
        used_tokens: decoder.nodes("outputs")?.map(Node::id).collect(),
        used_inputs: IndexMap::new(),
    };

    let mut dfas = Vec::new();
    let mut dropped = 0usize;
    for dfa in decoder.nodes("dfas")? {
        match pass.dfa(dfa)? {
            Some(kept) => dfas.push(kept),
            None => dropped += 1,
        }
    }

    // Channels that trigger kept transitions are live even if never sampled.
    let mut triggers = TriggerScan { pass: &mut pass };
    for dfa in &dfas {
        for transition in dfa.nodes("transitions")? {
            triggers.visit(transition.node("trigger")?)?;
        }
    }

    debug!(
        "{}: kept {} DFAs, dropped {}, {} of {} inputs live",
        PASS,
        dfas.len(),
        dropped,
        pass.used_inputs.len(),
        decoder.nodes("inputs")?.count()
    );

    let inputs = Value::list(pass.used_inputs.into_values());
    let decoder = decoder.with_fields([("inputs", inputs), ("dfas", Value::list(dfas))])?;
    Ok(DceResult {
        decoder,
        state_info,
    })
}

struct DeadCodeElimination {
    used_tokens: HashSet<NodeId>,
    used_inputs: IndexMap<NodeId, Node>,
}

impl DeadCodeElimination {
    /// The DFA with dead actions removed, or `None` if nothing survives.
    fn dfa(&mut self, dfa: &Node) -> Result<Option<Node>> {
        let transitions = dfa
            .nodes("transitions")?
            .map(|transition| self.transition(transition))
            .collect::<Result<Vec<_>>>()?;
        let mut action_count = 0;
        for transition in &transitions {
            action_count += transition.nodes("actions")?.count();
        }
        if action_count == 0 {
            return Ok(None);
        }
        dfa.with_fields([("transitions", Value::list(transitions))])
            .map(Some)
    }

    fn transition(&mut self, transition: &Node) -> Result<Node> {
        let mut actions = Vec::new();
        for action in transition.nodes("actions")? {
            if self.keep_action(action)? {
                actions.push(action.clone());
            }
        }
        transition.with_fields([("actions", Value::list(actions))])
    }

    fn keep_action(&mut self, action: &Node) -> Result<bool> {
        let used = |action: &Node| -> Result<bool> {
            Ok(self.used_tokens.contains(&action.node("token")?.id()))
        };
        match action.kind() {
            "Append" => {
                if !used(action)? {
                    return Ok(false);
                }
                let channel = action.node("channel")?;
                self.used_inputs
                    .entry(channel.id())
                    .or_insert_with(|| channel.clone());
                Ok(true)
            }
            "Start" | "Emit" | "Reset" => used(action),
            _ => Err(unhandled(PASS, action)),
        }
    }
}

/// Collects the channels a trigger event (and its conditions) reads.
struct TriggerScan<'a> {
    pass: &'a mut DeadCodeElimination,
}

impl TriggerScan<'_> {
    fn use_channel(&mut self, node: &Node) -> Result<()> {
        let channel = node.node("channel")?;
        self.pass
            .used_inputs
            .entry(channel.id())
            .or_insert_with(|| channel.clone());
        Ok(())
    }
}

impl Visitor for TriggerScan<'_> {
    fn visit(&mut self, node: &Node) -> Result<()> {
        match node.kind() {
            "ExternalEvent" | "High" | "Low" => self.use_channel(node),
            "Sample" => {
                self.visit(node.node("trigger")?)?;
                self.use_channel(node)
            }
            "InternalEvent" => {
                if let Some(guard) = node.opt_node("guard")? {
                    self.visit(guard)?;
                }
                self.visit(node.node("trigger")?)
            }
            "ConditionBinOp" => {
                self.visit(node.node("left")?)?;
                self.visit(node.node("right")?)
            }
            // Only the actions count; the transition's own trigger does not.
            "Transition" => {
                for action in node.nodes("actions")? {
                    self.pass.keep_action(action)?;
                }
                Ok(())
            }
            "DelayedEvent" | "ConstantCondition" => Ok(()),
            _ => Err(unhandled(PASS, node)),
        }
    }
}
