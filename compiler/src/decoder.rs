// decoder.rs: Hardware decoder language: node taxonomy and builders
//
// A decoder samples input channels and emits tokens. Its behaviour is a set
// of DFAs whose transitions fire on events (channel edges, delays, derived
// events) and run actions on tokens (start, append a channel sample, emit,
// reset).
//
// Every variant except `DebugInfo` carries an optional `name` and an
// optional `dbg` source location. Nodes are shared freely: a `State` is held
// by its DFA's state list and by every transition touching it; a `Channel`
// by the decoder inputs and every event or action reading it.
//
// Preconditions: none.
// Postconditions: `schema()` validates the full variant set.
// Failure modes: builders fail on schema violations only.
// Side effects: none.

use crate::error::Result;
use crate::node::{Node, Value};
use crate::schema::{Field, FieldType, ScalarKind, Schema, Variant};

ir_enum! {
    pub enum Edge as EDGE = "Edge" { Rising, Falling }
}

ir_enum! {
    /// Operator joining two conditions.
    pub enum CondOp as COND_OP = "Bop" { And }
}

// ── Field types ─────────────────────────────────────────────────────────────

const CHANNEL: FieldType = FieldType::Node("Channel");
const CONDITION: FieldType = FieldType::Node("Condition");
const EVENT: FieldType = FieldType::Node("Event");
const TOKEN: FieldType = FieldType::Node("Token");
const STATE: FieldType = FieldType::Node("State");

const NAME: Field = Field {
    name: "name",
    ty: FieldType::Optional(&FieldType::STR),
};

const DBG: Field = Field {
    name: "dbg",
    ty: FieldType::Optional(&FieldType::Node("DebugInfo")),
};

const fn field(name: &'static str, ty: FieldType) -> Field {
    Field { name, ty }
}

pub static DEBUG_INFO: Variant = Variant {
    name: "DebugInfo",
    classes: &[],
    fields: &[
        field("file", FieldType::STR),
        field("line", FieldType::INT),
        field("col", FieldType::INT),
    ],
};

pub static CHANNEL_NODE: Variant = Variant {
    name: "Channel",
    classes: &[],
    fields: &[field("width", FieldType::INT), NAME, DBG],
};

// ── Conditions ──────────────────────────────────────────────────────────────

pub static HIGH: Variant = Variant {
    name: "High",
    classes: &["Condition"],
    fields: &[field("channel", CHANNEL), NAME, DBG],
};

pub static LOW: Variant = Variant {
    name: "Low",
    classes: &["Condition"],
    fields: &[field("channel", CHANNEL), NAME, DBG],
};

pub static CONSTANT_CONDITION: Variant = Variant {
    name: "ConstantCondition",
    classes: &["Condition"],
    fields: &[field("value", FieldType::BOOL), NAME, DBG],
};

pub static CONDITION_BIN_OP: Variant = Variant {
    name: "ConditionBinOp",
    classes: &["Condition"],
    fields: &[
        field("op", FieldType::Scalar(ScalarKind::Enum(&COND_OP))),
        field("left", CONDITION),
        field("right", CONDITION),
        NAME,
        DBG,
    ],
};

// ── Events ──────────────────────────────────────────────────────────────────

pub static EXTERNAL_EVENT: Variant = Variant {
    name: "ExternalEvent",
    classes: &["Event"],
    fields: &[
        field("edge", FieldType::Scalar(ScalarKind::Enum(&EDGE))),
        field("channel", CHANNEL),
        NAME,
        DBG,
    ],
};

pub static DELAYED_EVENT: Variant = Variant {
    name: "DelayedEvent",
    classes: &["Event"],
    fields: &[field("cycles", FieldType::INT), NAME, DBG],
};

pub static INTERNAL_EVENT: Variant = Variant {
    name: "InternalEvent",
    classes: &["Event"],
    fields: &[
        field("trigger", EVENT),
        field("guard", FieldType::Optional(&CONDITION)),
        NAME,
        DBG,
    ],
};

/// A data-carrying event: samples `channel` whenever `trigger` fires.
pub static SAMPLE: Variant = Variant {
    name: "Sample",
    classes: &["Event"],
    fields: &[field("trigger", EVENT), field("channel", CHANNEL), NAME, DBG],
};

// ── Tokens and actions ──────────────────────────────────────────────────────

pub static TOKEN_NODE: Variant = Variant {
    name: "Token",
    classes: &[],
    fields: &[
        field("width", FieldType::INT),
        field("has_duration", FieldType::BOOL),
        NAME,
        DBG,
    ],
};

pub static START: Variant = Variant {
    name: "Start",
    classes: &["Action"],
    fields: &[field("token", TOKEN), NAME, DBG],
};

pub static APPEND: Variant = Variant {
    name: "Append",
    classes: &["Action"],
    fields: &[field("token", TOKEN), field("channel", CHANNEL), NAME, DBG],
};

pub static EMIT: Variant = Variant {
    name: "Emit",
    classes: &["Action"],
    fields: &[field("token", TOKEN), NAME, DBG],
};

pub static RESET: Variant = Variant {
    name: "Reset",
    classes: &["Action"],
    fields: &[field("token", TOKEN), NAME, DBG],
};

// ── Automata ────────────────────────────────────────────────────────────────

pub static STATE_NODE: Variant = Variant {
    name: "State",
    classes: &[],
    fields: &[NAME, DBG],
};

/// A DFA edge. Transitions are events themselves, so one DFA can be
/// triggered by another DFA's transition.
pub static TRANSITION: Variant = Variant {
    name: "Transition",
    classes: &["Event"],
    fields: &[
        field("source", STATE),
        field("destination", STATE),
        field("trigger", EVENT),
        field("actions", FieldType::List(&FieldType::Node("Action"))),
        NAME,
        DBG,
    ],
};

/// `states` must include the start state and every end state.
pub static DFA: Variant = Variant {
    name: "DFA",
    classes: &[],
    fields: &[
        field("start", STATE),
        field("states", FieldType::List(&STATE)),
        field("transitions", FieldType::List(&FieldType::Node("Transition"))),
        NAME,
        DBG,
    ],
};

pub static DECODER: Variant = Variant {
    name: "Decoder",
    classes: &[],
    fields: &[
        field("inputs", FieldType::List(&CHANNEL)),
        field("outputs", FieldType::List(&TOKEN)),
        field("dfas", FieldType::List(&FieldType::Node("DFA"))),
        NAME,
        DBG,
    ],
};

pub fn schema() -> Result<Schema> {
    Schema::new(
        "decoder",
        &[
            &DEBUG_INFO,
            &CHANNEL_NODE,
            &HIGH,
            &LOW,
            &CONSTANT_CONDITION,
            &CONDITION_BIN_OP,
            &EXTERNAL_EVENT,
            &DELAYED_EVENT,
            &INTERNAL_EVENT,
            &SAMPLE,
            &TOKEN_NODE,
            &START,
            &APPEND,
            &EMIT,
            &RESET,
            &STATE_NODE,
            &TRANSITION,
            &DFA,
            &DECODER,
        ],
    )
}

// ── Builders ────────────────────────────────────────────────────────────────

/// Give `node` a name.
pub fn named(node: &Node, name: &str) -> Result<Node> {
    node.with_fields([("name", Value::from(name))])
}

pub fn debug_info(file: &str, line: i64, col: i64) -> Result<Node> {
    Node::new(
        &DEBUG_INFO,
        [
            ("file", Value::from(file)),
            ("line", Value::Int(line)),
            ("col", Value::Int(col)),
        ],
    )
}

pub fn channel(width: i64) -> Result<Node> {
    Node::new(&CHANNEL_NODE, [("width", Value::Int(width))])
}

pub fn high(channel: &Node) -> Result<Node> {
    Node::new(&HIGH, [("channel", channel.into())])
}

pub fn low(channel: &Node) -> Result<Node> {
    Node::new(&LOW, [("channel", channel.into())])
}

pub fn constant(value: bool) -> Result<Node> {
    Node::new(&CONSTANT_CONDITION, [("value", Value::Bool(value))])
}

pub fn condition_bin_op(op: CondOp, left: &Node, right: &Node) -> Result<Node> {
    Node::new(
        &CONDITION_BIN_OP,
        [
            ("op", op.into()),
            ("left", left.into()),
            ("right", right.into()),
        ],
    )
}

pub fn external_event(edge: Edge, channel: &Node) -> Result<Node> {
    Node::new(
        &EXTERNAL_EVENT,
        [("edge", edge.into()), ("channel", channel.into())],
    )
}

pub fn delayed_event(cycles: i64) -> Result<Node> {
    Node::new(&DELAYED_EVENT, [("cycles", Value::Int(cycles))])
}

pub fn internal_event(trigger: &Node, guard: Option<&Node>) -> Result<Node> {
    Node::new(
        &INTERNAL_EVENT,
        [("trigger", trigger.into()), ("guard", guard.into())],
    )
}

pub fn sample(trigger: &Node, channel: &Node) -> Result<Node> {
    Node::new(
        &SAMPLE,
        [("trigger", trigger.into()), ("channel", channel.into())],
    )
}

pub fn token(width: i64, has_duration: bool) -> Result<Node> {
    Node::new(
        &TOKEN_NODE,
        [
            ("width", Value::Int(width)),
            ("has_duration", Value::Bool(has_duration)),
        ],
    )
}

pub fn start(token: &Node) -> Result<Node> {
    Node::new(&START, [("token", token.into())])
}

pub fn append(token: &Node, channel: &Node) -> Result<Node> {
    Node::new(
        &APPEND,
        [("token", token.into()), ("channel", channel.into())],
    )
}

pub fn emit(token: &Node) -> Result<Node> {
    Node::new(&EMIT, [("token", token.into())])
}

pub fn reset(token: &Node) -> Result<Node> {
    Node::new(&RESET, [("token", token.into())])
}

pub fn state() -> Result<Node> {
    Node::new(&STATE_NODE, std::iter::empty())
}

pub fn transition(
    source: &Node,
    destination: &Node,
    trigger: &Node,
    actions: Vec<Node>,
) -> Result<Node> {
    Node::new(
        &TRANSITION,
        [
            ("source", source.into()),
            ("destination", destination.into()),
            ("trigger", trigger.into()),
            ("actions", actions.into()),
        ],
    )
}

pub fn dfa(start: &Node, states: Vec<Node>, transitions: Vec<Node>) -> Result<Node> {
    Node::new(
        &DFA,
        [
            ("start", start.into()),
            ("states", states.into()),
            ("transitions", transitions.into()),
        ],
    )
}

pub fn decoder(inputs: Vec<Node>, outputs: Vec<Node>, dfas: Vec<Node>) -> Result<Node> {
    Node::new(
        &DECODER,
        [
            ("inputs", inputs.into()),
            ("outputs", outputs.into()),
            ("dfas", dfas.into()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn schema_is_consistent() {
        let schema = schema().unwrap();
        assert_eq!(schema.name(), "decoder");
        assert_eq!(schema.variants().count(), 19);
        assert!(schema.variant("Transition").unwrap().is_a("Event"));
    }

    #[test]
    fn build_by_name_matches_builder() {
        let schema = schema().unwrap();
        let a = schema.build("Channel", [("width", Value::Int(8))]).unwrap();
        assert!(a.structurally_eq(&channel(8).unwrap()));
    }

    #[test]
    fn transitions_are_events() {
        let ch = channel(1).unwrap();
        let (s0, s1) = (state().unwrap(), state().unwrap());
        let t = transition(&s0, &s1, &external_event(Edge::Rising, &ch).unwrap(), vec![])
            .unwrap();
        let derived = internal_event(&t, Some(&high(&ch).unwrap())).unwrap();
        assert_eq!(derived.node("trigger").unwrap(), &t);
    }

    #[test]
    fn actions_only_in_action_lists() {
        let (s0, s1) = (state().unwrap(), state().unwrap());
        let trigger = delayed_event(1).unwrap();
        let err = transition(&s0, &s1, &trigger, vec![s0.clone()]).unwrap_err();
        assert!(matches!(err, Error::FieldType { field: "actions", .. }));
    }

    #[test]
    fn names_and_debug_info() {
        let tok = named(&token(8, false).unwrap(), "byte").unwrap();
        assert_eq!(tok.string("name").unwrap(), "byte");
        let located = tok
            .with_fields([("dbg", debug_info("uart.dec", 3, 7).unwrap().into())])
            .unwrap();
        assert_eq!(
            located.to_string(),
            "Token(width=8, has_duration=false, name=\"byte\", dbg=DebugInfo(file=\"uart.dec\", line=3, col=7))"
        );
    }
}
