// diag.rs: Unified diagnostics model
//
// Turns pass and construction errors into user-facing diagnostics with
// stable codes. Codes are grouped by the error kind that raises them:
// E01xx schema, E02xx metadata, E03xx type checking, E04xx pass structure.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::Serialize;

use crate::error::Error;
use crate::id::NodeId;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    pub const E0101: DiagCode = DiagCode("E0101"); // missing field
    pub const E0102: DiagCode = DiagCode("E0102"); // unknown field
    pub const E0103: DiagCode = DiagCode("E0103"); // field given twice
    pub const E0104: DiagCode = DiagCode("E0104"); // field value type
    pub const E0105: DiagCode = DiagCode("E0105"); // duplicate variant
    pub const E0106: DiagCode = DiagCode("E0106"); // duplicate field declaration
    pub const E0107: DiagCode = DiagCode("E0107"); // unknown node class
    pub const E0108: DiagCode = DiagCode("E0108"); // unknown variant

    pub const E0201: DiagCode = DiagCode("E0201"); // metadata owner mismatch
    pub const E0202: DiagCode = DiagCode("E0202"); // metadata value type
    pub const E0203: DiagCode = DiagCode("E0203"); // add on non-list metadata
    pub const E0204: DiagCode = DiagCode("E0204"); // write after lock
    pub const E0205: DiagCode = DiagCode("E0205"); // unset scalar metadata
    pub const E0206: DiagCode = DiagCode("E0206"); // duplicate metadata field
    pub const E0207: DiagCode = DiagCode("E0207"); // undefined metadata field

    pub const E0301: DiagCode = DiagCode("E0301"); // redeclaration
    pub const E0302: DiagCode = DiagCode("E0302"); // undefined name
    pub const E0303: DiagCode = DiagCode("E0303"); // not subscriptable
    pub const E0304: DiagCode = DiagCode("E0304"); // non-Int index
    pub const E0305: DiagCode = DiagCode("E0305"); // non-Int loop bound
    pub const E0306: DiagCode = DiagCode("E0306"); // return type mismatch
    pub const E0307: DiagCode = DiagCode("E0307"); // operand mismatch
    pub const E0308: DiagCode = DiagCode("E0308"); // array assignment
    pub const E0309: DiagCode = DiagCode("E0309"); // no array type
    pub const E0310: DiagCode = DiagCode("E0310"); // argument arity
    pub const E0311: DiagCode = DiagCode("E0311"); // untyped expression

    pub const E0401: DiagCode = DiagCode("E0401"); // unhandled node
    pub const E0402: DiagCode = DiagCode("E0402"); // unexpected root
    pub const E0403: DiagCode = DiagCode("E0403"); // start state missing
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any pass.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub message: String,
    pub hint: Option<String>,
    /// Pass that raised the diagnostic, when known.
    pub pass: Option<&'static str>,
    /// Nodes giving context, with a label each.
    pub related_nodes: Vec<(NodeId, String)>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint, pass or related nodes.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            message: message.into(),
            hint: None,
            pass: None,
            related_nodes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_pass(mut self, pass: &'static str) -> Self {
        self.pass = Some(pass);
        self
    }

    pub fn with_related(mut self, node: NodeId, label: impl Into<String>) -> Self {
        self.related_nodes.push((node, label.into()));
        self
    }
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        let diag = Diagnostic::new(DiagLevel::Error, err.to_string()).with_code(err.code());
        let diag = match err {
            Error::MetaNotSet { node, .. } => diag.with_related(*node, "queried node"),
            Error::StartNotInStates { dfa } => diag.with_related(*dfa, "automaton"),
            _ => diag,
        };
        match err.hint() {
            Some(hint) => diag.with_hint(hint),
            None => diag,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}
