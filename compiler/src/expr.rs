// expr.rs: Expression/statement language: node taxonomy and builders
//
// A small typed imperative language: integer, float and boolean scalars and
// arrays, arithmetic/logic/comparison operators, explicit casts, assignment,
// blocks, conditionals, counted loops, returns and function definitions.
//
// Every expression variant carries an optional `type` field, left empty by
// front ends and filled in by the type checker (type_check.rs). `Return` is
// both a statement and an expression.
//
// Preconditions: none.
// Postconditions: `schema()` validates the full variant set.
// Failure modes: builders fail on schema violations only.
// Side effects: none.

use crate::error::Result;
use crate::node::{Node, Value};
use crate::schema::{Field, FieldType, ScalarKind, Schema, Variant};

// ── Enums ───────────────────────────────────────────────────────────────────

ir_enum! {
    /// Static type of an expression or a symbol.
    pub enum Ty as TYPE = "Type" {
        Int,
        IntArray,
        Float,
        FloatArray,
        Bool,
        BoolArray,
        Void,
    }
}

impl Ty {
    pub fn is_array(self) -> bool {
        matches!(self, Ty::IntArray | Ty::FloatArray | Ty::BoolArray)
    }

    /// Array type with this element type. There are no `Void` arrays.
    pub fn to_array(self) -> Option<Ty> {
        match self {
            Ty::Int | Ty::IntArray => Some(Ty::IntArray),
            Ty::Float | Ty::FloatArray => Some(Ty::FloatArray),
            Ty::Bool | Ty::BoolArray => Some(Ty::BoolArray),
            Ty::Void => None,
        }
    }

    /// Element type of an array type; scalars map to themselves.
    pub fn to_scalar(self) -> Ty {
        match self {
            Ty::IntArray => Ty::Int,
            Ty::FloatArray => Ty::Float,
            Ty::BoolArray => Ty::Bool,
            other => other,
        }
    }
}

ir_enum! {
    pub enum Uop as UOP = "Uop" { Neg, Not }
}

ir_enum! {
    pub enum Bop as BOP = "Bop" { Add, Sub, Mul, Div, Mod, And, Or }
}

impl Bop {
    /// Arithmetic operators, under which two `Bool` operands become `Int`.
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Bop::Add | Bop::Sub | Bop::Mul | Bop::Div | Bop::Mod)
    }
}

ir_enum! {
    pub enum Cop as COP = "Cop" { Eq, Ne, Lt, Gt, Le, Ge }
}

// ── Field types ─────────────────────────────────────────────────────────────

const TYPE_TAG: FieldType = FieldType::Scalar(ScalarKind::Enum(&TYPE));
const EXPR: FieldType = FieldType::Node("Expr");
const STMT: FieldType = FieldType::Node("Stmt");

const TYPE_FIELD: Field = Field {
    name: "type",
    ty: FieldType::Optional(&TYPE_TAG),
};

const fn field(name: &'static str, ty: FieldType) -> Field {
    Field { name, ty }
}

const EXPR_CLASSES: &[&str] = &["Expr"];
const STMT_CLASSES: &[&str] = &["Stmt"];

// ── Expressions ─────────────────────────────────────────────────────────────

pub static BIN_OP: Variant = Variant {
    name: "BinOp",
    classes: EXPR_CLASSES,
    fields: &[
        field("op", FieldType::Scalar(ScalarKind::Enum(&BOP))),
        field("left", EXPR),
        field("right", EXPR),
        TYPE_FIELD,
    ],
};

pub static CMP_OP: Variant = Variant {
    name: "CmpOp",
    classes: EXPR_CLASSES,
    fields: &[
        field("op", FieldType::Scalar(ScalarKind::Enum(&COP))),
        field("left", EXPR),
        field("right", EXPR),
        TYPE_FIELD,
    ],
};

pub static UN_OP: Variant = Variant {
    name: "UnOp",
    classes: EXPR_CLASSES,
    fields: &[
        field("op", FieldType::Scalar(ScalarKind::Enum(&UOP))),
        field("e", EXPR),
        TYPE_FIELD,
    ],
};

pub static REF: Variant = Variant {
    name: "Ref",
    classes: EXPR_CLASSES,
    fields: &[
        field("name", FieldType::STR),
        field("index", FieldType::Optional(&EXPR)),
        TYPE_FIELD,
    ],
};

pub static INT_CONST: Variant = Variant {
    name: "IntConst",
    classes: EXPR_CLASSES,
    fields: &[field("val", FieldType::INT), TYPE_FIELD],
};

pub static FLOAT_CONST: Variant = Variant {
    name: "FloatConst",
    classes: EXPR_CLASSES,
    fields: &[field("val", FieldType::FLOAT), TYPE_FIELD],
};

pub static BOOL_CONST: Variant = Variant {
    name: "BoolConst",
    classes: EXPR_CLASSES,
    fields: &[field("val", FieldType::BOOL), TYPE_FIELD],
};

pub static VOID_CONST: Variant = Variant {
    name: "VoidConst",
    classes: EXPR_CLASSES,
    fields: &[TYPE_FIELD],
};

pub static CAST_TO_FLOAT: Variant = Variant {
    name: "CastToFloat",
    classes: EXPR_CLASSES,
    fields: &[field("expr", EXPR), TYPE_FIELD],
};

pub static CAST_TO_INT: Variant = Variant {
    name: "CastToInt",
    classes: EXPR_CLASSES,
    fields: &[field("expr", EXPR), TYPE_FIELD],
};

pub static CAST_TO_BOOL: Variant = Variant {
    name: "CastToBool",
    classes: EXPR_CLASSES,
    fields: &[field("expr", EXPR), TYPE_FIELD],
};

// ── Statements ──────────────────────────────────────────────────────────────

pub static ASSIGN: Variant = Variant {
    name: "Assign",
    classes: STMT_CLASSES,
    fields: &[field("ref", FieldType::Node("Ref")), field("val", EXPR)],
};

pub static BLOCK: Variant = Variant {
    name: "Block",
    classes: STMT_CLASSES,
    fields: &[field("body", FieldType::List(&STMT))],
};

pub static IF: Variant = Variant {
    name: "If",
    classes: STMT_CLASSES,
    fields: &[
        field("cond", EXPR),
        field("body", STMT),
        field("else_body", FieldType::Optional(&STMT)),
    ],
};

pub static FOR: Variant = Variant {
    name: "For",
    classes: STMT_CLASSES,
    fields: &[
        field("var", FieldType::STR),
        field("min", EXPR),
        field("max", EXPR),
        field("body", STMT),
    ],
};

pub static RETURN: Variant = Variant {
    name: "Return",
    classes: &["Stmt", "Expr"],
    fields: &[field("val", EXPR), TYPE_FIELD],
};

pub static FUNC_DEF: Variant = Variant {
    name: "FuncDef",
    classes: STMT_CLASSES,
    fields: &[
        field("name", FieldType::STR),
        field("args", FieldType::List(&FieldType::STR)),
        field("body", STMT),
        field("arg_types", FieldType::List(&TYPE_TAG)),
        field("return_type", TYPE_TAG),
    ],
};

/// All variants of the language, validated as one schema.
pub fn schema() -> Result<Schema> {
    Schema::new(
        "expr",
        &[
            &BIN_OP,
            &CMP_OP,
            &UN_OP,
            &REF,
            &INT_CONST,
            &FLOAT_CONST,
            &BOOL_CONST,
            &VOID_CONST,
            &CAST_TO_FLOAT,
            &CAST_TO_INT,
            &CAST_TO_BOOL,
            &ASSIGN,
            &BLOCK,
            &IF,
            &FOR,
            &RETURN,
            &FUNC_DEF,
        ],
    )
}

/// The `type` annotation of an expression, if the type checker set one.
pub fn type_of(expr: &Node) -> Result<Option<Ty>> {
    expr.opt_enumeration("type")
}

// ── Builders ────────────────────────────────────────────────────────────────
//
// Builders leave `type` empty; the type checker fills it in.

pub fn int(val: i64) -> Result<Node> {
    Node::new(&INT_CONST, [("val", Value::Int(val))])
}

pub fn float(val: f64) -> Result<Node> {
    Node::new(&FLOAT_CONST, [("val", Value::Float(val))])
}

pub fn boolean(val: bool) -> Result<Node> {
    Node::new(&BOOL_CONST, [("val", Value::Bool(val))])
}

pub fn void() -> Result<Node> {
    Node::new(&VOID_CONST, std::iter::empty())
}

pub fn bin_op(op: Bop, left: Node, right: Node) -> Result<Node> {
    Node::new(
        &BIN_OP,
        [
            ("op", op.into()),
            ("left", left.into()),
            ("right", right.into()),
        ],
    )
}

pub fn cmp_op(op: Cop, left: Node, right: Node) -> Result<Node> {
    Node::new(
        &CMP_OP,
        [
            ("op", op.into()),
            ("left", left.into()),
            ("right", right.into()),
        ],
    )
}

pub fn un_op(op: Uop, e: Node) -> Result<Node> {
    Node::new(&UN_OP, [("op", op.into()), ("e", e.into())])
}

/// A plain reference to `name`.
pub fn var(name: &str) -> Result<Node> {
    Node::new(&REF, [("name", Value::from(name))])
}

/// `name[index]`.
pub fn index(name: &str, index: Node) -> Result<Node> {
    Node::new(&REF, [("name", Value::from(name)), ("index", index.into())])
}

pub fn cast_to_int(expr: Node) -> Result<Node> {
    Node::new(&CAST_TO_INT, [("expr", expr.into())])
}

pub fn cast_to_float(expr: Node) -> Result<Node> {
    Node::new(&CAST_TO_FLOAT, [("expr", expr.into())])
}

pub fn cast_to_bool(expr: Node) -> Result<Node> {
    Node::new(&CAST_TO_BOOL, [("expr", expr.into())])
}

pub fn assign(target: Node, val: Node) -> Result<Node> {
    Node::new(&ASSIGN, [("ref", target.into()), ("val", val.into())])
}

pub fn block(body: Vec<Node>) -> Result<Node> {
    Node::new(&BLOCK, [("body", Value::from(body))])
}

pub fn if_stmt(cond: Node, body: Node, else_body: Option<Node>) -> Result<Node> {
    Node::new(
        &IF,
        [
            ("cond", cond.into()),
            ("body", body.into()),
            ("else_body", else_body.into()),
        ],
    )
}

pub fn for_loop(var: &str, min: Node, max: Node, body: Node) -> Result<Node> {
    Node::new(
        &FOR,
        [
            ("var", Value::from(var)),
            ("min", min.into()),
            ("max", max.into()),
            ("body", body.into()),
        ],
    )
}

pub fn ret(val: Node) -> Result<Node> {
    Node::new(&RETURN, [("val", val.into())])
}

pub fn func_def(
    name: &str,
    args: &[(&str, Ty)],
    return_type: Ty,
    body: Node,
) -> Result<Node> {
    Node::new(
        &FUNC_DEF,
        [
            ("name", Value::from(name)),
            ("args", Value::list(args.iter().map(|(arg, _)| *arg))),
            ("body", body.into()),
            ("arg_types", Value::list(args.iter().map(|(_, ty)| *ty))),
            ("return_type", return_type.into()),
        ],
    )
}
