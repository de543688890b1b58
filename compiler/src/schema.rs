// schema.rs: Field registry: variants, fields and type descriptors
//
// Every node variant declares its complete, flat field table statically.
// Fields a variant conceptually inherits (a decoder node's `name`, an
// expression's `type`) are listed on the variant itself, so a field table
// never has more than one source and no lineage resolution happens at
// runtime. Class membership (`Transition` is an `Event`, `Return` is both a
// `Stmt` and an `Expr`) is declared alongside and drives node-typed fields.
//
// Preconditions: none.
// Postconditions: a `Schema` only exists for a consistent set of variants.
// Failure modes: duplicate variants, duplicate fields, dangling class refs.
// Side effects: none.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::node::{Node, Value};

// ── Enum tags ───────────────────────────────────────────────────────────────

/// A named, closed set of enum members usable as a scalar field type.
#[derive(Debug, PartialEq, Eq)]
pub struct EnumDef {
    pub name: &'static str,
    pub members: &'static [&'static str],
}

/// Rust enums that can be stored in node fields. Implemented by `ir_enum!`.
pub trait IrEnum: Copy + Sized {
    fn def() -> &'static EnumDef;
    fn member(self) -> &'static str;
    fn from_member(member: &str) -> Option<Self>;
}

// ── Type descriptors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    Str,
    Enum(&'static EnumDef),
}

impl ScalarKind {
    fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (ScalarKind::Int, Value::Int(_))
            | (ScalarKind::Float, Value::Float(_))
            | (ScalarKind::Bool, Value::Bool(_))
            | (ScalarKind::Str, Value::Str(_)) => true,
            (ScalarKind::Enum(def), Value::Enum(member)) => {
                member.def().name == def.name && def.members.contains(&member.member())
            }
            _ => false,
        }
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarKind),
    /// A node whose variant is, or belongs to, the named class.
    Node(&'static str),
    List(&'static FieldType),
    Set(&'static FieldType),
    Optional(&'static FieldType),
}

impl FieldType {
    pub const INT: FieldType = FieldType::Scalar(ScalarKind::Int);
    pub const FLOAT: FieldType = FieldType::Scalar(ScalarKind::Float);
    pub const BOOL: FieldType = FieldType::Scalar(ScalarKind::Bool);
    pub const STR: FieldType = FieldType::Scalar(ScalarKind::Str);

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    /// Element type of a `List[T]`, the only shape `MetaField::add` accepts.
    pub fn list_element(&self) -> Option<&'static FieldType> {
        match self {
            FieldType::List(inner) => Some(*inner),
            _ => None,
        }
    }

    /// The node class this type refers to, looking through wrappers.
    pub fn node_class(&self) -> Option<&'static str> {
        match self {
            FieldType::Node(class) => Some(*class),
            FieldType::List(inner) | FieldType::Set(inner) | FieldType::Optional(inner) => {
                inner.node_class()
            }
            FieldType::Scalar(_) => None,
        }
    }

    /// Does `value` satisfy this type, recursively for wrappers?
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Optional(_), Value::None) => true,
            (FieldType::Optional(inner), value) => inner.admits(value),
            (FieldType::Scalar(kind), value) => kind.admits(value),
            (FieldType::Node(class), Value::Node(node)) => node.is_a(class),
            (FieldType::List(inner), Value::List(items)) => {
                items.iter().all(|item| inner.admits(item))
            }
            (FieldType::Set(inner), Value::Set(items)) => {
                items.iter().all(|item| inner.admits(item)) && all_distinct(items)
            }
            _ => false,
        }
    }
}

fn all_distinct(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(i, item)| !items[..i].contains(item))
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(ScalarKind::Int) => f.write_str("Int"),
            FieldType::Scalar(ScalarKind::Float) => f.write_str("Float"),
            FieldType::Scalar(ScalarKind::Bool) => f.write_str("Bool"),
            FieldType::Scalar(ScalarKind::Str) => f.write_str("Str"),
            FieldType::Scalar(ScalarKind::Enum(def)) => f.write_str(def.name),
            FieldType::Node(class) => f.write_str(class),
            FieldType::List(inner) => write!(f, "List[{}]", inner),
            FieldType::Set(inner) => write!(f, "Set[{}]", inner),
            FieldType::Optional(inner) => write!(f, "Optional[{}]", inner),
        }
    }
}

// ── Fields and variants ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

impl Field {
    pub fn is_optional(&self) -> bool {
        self.ty.is_optional()
    }

    /// Child fields hold nodes (directly or through a wrapper).
    pub fn is_child(&self) -> bool {
        self.ty.node_class().is_some()
    }
}

/// One concrete case of an IR's node type.
#[derive(Debug)]
pub struct Variant {
    pub name: &'static str,
    /// Every class this variant belongs to (flattened ancestry).
    pub classes: &'static [&'static str],
    /// Complete, ordered field table.
    pub fields: &'static [Field],
}

impl Variant {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_a(&self, class: &str) -> bool {
        self.name == class || self.classes.contains(&class)
    }

    pub fn child_fields(&self) -> impl Iterator<Item = &'static Field> {
        self.fields.iter().filter(|f| f.is_child())
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Variant {}

// ── Selectors ───────────────────────────────────────────────────────────────

/// Picks the fields `Node::map` rewrites.
#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    /// Every field holding nodes.
    Children,
    /// Fields whose declared node class is one of these (exact match on the
    /// declared class, not on subclasses).
    Classes(&'a [&'a str]),
    /// Fields with one of these names.
    Fields(&'a [&'a str]),
}

impl Selector<'_> {
    pub fn selects(&self, field: &Field) -> bool {
        match self {
            Selector::Children => field.is_child(),
            Selector::Classes(classes) => field
                .ty
                .node_class()
                .is_some_and(|class| classes.contains(&class)),
            Selector::Fields(names) => names.contains(&field.name),
        }
    }
}

// ── Schema ──────────────────────────────────────────────────────────────────

/// The validated set of variants of one IR.
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    variants: IndexMap<&'static str, &'static Variant>,
}

impl Schema {
    /// Register `variants` under `name`, checking the set is consistent.
    pub fn new(name: &'static str, variants: &[&'static Variant]) -> Result<Self> {
        let mut table: IndexMap<&'static str, &'static Variant> = IndexMap::new();
        for &variant in variants {
            for (i, field) in variant.fields.iter().enumerate() {
                if variant.fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(Error::DuplicateFieldDecl {
                        variant: variant.name,
                        field: field.name,
                    });
                }
            }
            if table.insert(variant.name, variant).is_some() {
                return Err(Error::DuplicateVariant(variant.name));
            }
        }

        let known = |class: &str| table.values().any(|v| v.is_a(class));
        for variant in table.values() {
            for field in variant.fields {
                if let Some(class) = field.ty.node_class() {
                    if !known(class) {
                        return Err(Error::UnknownClass {
                            variant: variant.name,
                            field: field.name,
                            class,
                        });
                    }
                }
            }
        }

        Ok(Schema {
            name,
            variants: table,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn variant(&self, name: &str) -> Result<&'static Variant> {
        self.variants
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownVariant(name.to_string()))
    }

    pub fn variants(&self) -> impl Iterator<Item = &'static Variant> + '_ {
        self.variants.values().copied()
    }

    /// Construct a node by variant name, e.g. for trees built by a front end.
    pub fn build<'f>(
        &self,
        variant: &str,
        fields: impl IntoIterator<Item = (&'f str, Value)>,
    ) -> Result<Node> {
        Node::new(self.variant(variant)?, fields)
    }
}
