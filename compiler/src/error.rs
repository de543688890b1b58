// error.rs: Error taxonomy shared by the node layer, metadata and passes
//
// Every failure is fatal to the call that raised it and propagates to the
// caller unchanged. `Error::code` maps each variant to a stable diagnostic
// code so callers can surface it as a compile error (see diag.rs).

use thiserror::Error;

use crate::diag::{codes, DiagCode};
use crate::expr::Ty;
use crate::id::NodeId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Node construction or schema definition.
    Schema,
    /// Metadata repository or field misuse.
    Metadata,
    /// Type checking of the expression language.
    Type,
    /// A pass met a node shape it does not handle.
    Pass,
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Schema violations ──
    #[error("missing value for field `{field}` of `{variant}`")]
    MissingField {
        variant: &'static str,
        field: &'static str,
    },
    #[error("`{variant}` has no field `{field}`")]
    UnknownField { variant: &'static str, field: String },
    #[error("field `{field}` of `{variant}` given more than once")]
    DuplicateArgument {
        variant: &'static str,
        field: &'static str,
    },
    #[error("field `{field}` of `{variant}` requires values of type `{expected}` not `{found}`")]
    FieldType {
        variant: &'static str,
        field: &'static str,
        expected: String,
        found: String,
    },
    #[error("node variant `{0}` declared more than once")]
    DuplicateVariant(&'static str),
    #[error("`{variant}` declares field `{field}` more than once")]
    DuplicateFieldDecl {
        variant: &'static str,
        field: &'static str,
    },
    #[error("field `{field}` of `{variant}` refers to unknown node class `{class}`")]
    UnknownClass {
        variant: &'static str,
        field: &'static str,
        class: &'static str,
    },
    #[error("unknown node variant `{0}`")]
    UnknownVariant(String),

    // ── Metadata misuse ──
    #[error("metadata `{field}` not defined on nodes of type `{variant}`")]
    MetaNodeType { field: String, variant: &'static str },
    #[error("metadata `{field}` needs values of type `{expected}` not `{found}`")]
    MetaValueType {
        field: String,
        expected: String,
        found: String,
    },
    #[error("entry type `{entry}` of metadata `{field}` is not a list")]
    MetaNotList { field: String, entry: String },
    #[error("trying to write readonly metadata `{0}`")]
    MetaReadonly(String),
    #[error("metadata `{field}` not set on node {node}")]
    MetaNotSet { field: String, node: NodeId },
    #[error("metadata field `{0}` already defined")]
    MetaDuplicate(String),
    #[error("undefined metadata field `{0}`")]
    MetaUndefined(String),

    // ── Type checking ──
    #[error("cannot redeclare `{name}` ({declared}) with different type `{found}`")]
    Redeclared {
        name: String,
        declared: Ty,
        found: Ty,
    },
    #[error("name `{0}` is not defined")]
    Undefined(String),
    #[error("`{0}` object is not subscriptable")]
    NotSubscriptable(Ty),
    #[error("array indices must be `Int`, not `{0}`")]
    NonIntIndex(Ty),
    #[error("{bound} loop bound needs to be of type `Int`, not `{found}`")]
    NonIntBound { bound: &'static str, found: Ty },
    #[error("cannot return `{found}` as `{}`", .expected.map_or("<none>".to_string(), |t| t.to_string()))]
    ReturnMismatch { expected: Option<Ty>, found: Ty },
    #[error("cannot combine `{left}` and `{right}` in `{op}`")]
    OperandMismatch {
        op: &'static str,
        left: Ty,
        right: Ty,
    },
    #[error("cannot assign arrays (`{0}`)")]
    ArrayAssign(Ty),
    #[error("there are no arrays of `{0}`")]
    NoArrayType(Ty),
    #[error("function `{name}` has {args} arguments but {types} argument types")]
    ArityMismatch {
        name: String,
        args: usize,
        types: usize,
    },
    #[error("`{0}` node carries no type")]
    Untyped(&'static str),

    // ── Pass structure ──
    #[error("{pass}: unhandled node `{variant}`")]
    UnknownNode {
        pass: &'static str,
        variant: &'static str,
    },
    #[error("{pass}: expected `{expected}`, found `{found}`")]
    UnexpectedNode {
        pass: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("start state of DFA {dfa} is not one of its states")]
    StartNotInStates { dfa: NodeId },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingField { .. }
            | Error::UnknownField { .. }
            | Error::DuplicateArgument { .. }
            | Error::FieldType { .. }
            | Error::DuplicateVariant(_)
            | Error::DuplicateFieldDecl { .. }
            | Error::UnknownClass { .. }
            | Error::UnknownVariant(_) => ErrorKind::Schema,
            Error::MetaNodeType { .. }
            | Error::MetaValueType { .. }
            | Error::MetaNotList { .. }
            | Error::MetaReadonly(_)
            | Error::MetaNotSet { .. }
            | Error::MetaDuplicate(_)
            | Error::MetaUndefined(_) => ErrorKind::Metadata,
            Error::Redeclared { .. }
            | Error::Undefined(_)
            | Error::NotSubscriptable(_)
            | Error::NonIntIndex(_)
            | Error::NonIntBound { .. }
            | Error::ReturnMismatch { .. }
            | Error::OperandMismatch { .. }
            | Error::ArrayAssign(_)
            | Error::NoArrayType(_)
            | Error::ArityMismatch { .. }
            | Error::Untyped(_) => ErrorKind::Type,
            Error::UnknownNode { .. }
            | Error::UnexpectedNode { .. }
            | Error::StartNotInStates { .. } => ErrorKind::Pass,
        }
    }

    /// Stable diagnostic code for this error.
    pub fn code(&self) -> DiagCode {
        match self {
            Error::MissingField { .. } => codes::E0101,
            Error::UnknownField { .. } => codes::E0102,
            Error::DuplicateArgument { .. } => codes::E0103,
            Error::FieldType { .. } => codes::E0104,
            Error::DuplicateVariant(_) => codes::E0105,
            Error::DuplicateFieldDecl { .. } => codes::E0106,
            Error::UnknownClass { .. } => codes::E0107,
            Error::UnknownVariant(_) => codes::E0108,
            Error::MetaNodeType { .. } => codes::E0201,
            Error::MetaValueType { .. } => codes::E0202,
            Error::MetaNotList { .. } => codes::E0203,
            Error::MetaReadonly(_) => codes::E0204,
            Error::MetaNotSet { .. } => codes::E0205,
            Error::MetaDuplicate(_) => codes::E0206,
            Error::MetaUndefined(_) => codes::E0207,
            Error::Redeclared { .. } => codes::E0301,
            Error::Undefined(_) => codes::E0302,
            Error::NotSubscriptable(_) => codes::E0303,
            Error::NonIntIndex(_) => codes::E0304,
            Error::NonIntBound { .. } => codes::E0305,
            Error::ReturnMismatch { .. } => codes::E0306,
            Error::OperandMismatch { .. } => codes::E0307,
            Error::ArrayAssign(_) => codes::E0308,
            Error::NoArrayType(_) => codes::E0309,
            Error::ArityMismatch { .. } => codes::E0310,
            Error::Untyped(_) => codes::E0311,
            Error::UnknownNode { .. } => codes::E0401,
            Error::UnexpectedNode { .. } => codes::E0402,
            Error::StartNotInStates { .. } => codes::E0403,
        }
    }

    /// Remediation hint for the errors where one is obvious.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Redeclared { .. } => {
                Some("the first assignment fixes a name's type for the whole program")
            }
            Error::NotSubscriptable(_) => Some("only array-typed names can be indexed"),
            Error::NonIntIndex(_) | Error::NonIntBound { .. } => {
                Some("insert an explicit integer cast")
            }
            Error::MetaReadonly(_) => {
                Some("metadata is frozen once the pass that computed it has finished")
            }
            Error::UnknownNode { .. } => Some("add an explicit rule for this node variant"),
            _ => None,
        }
    }
}
