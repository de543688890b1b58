// node.rs: Immutable, validated IR nodes
//
// A `Node` is a shared handle to a variant plus one value per declared
// field. Construction checks completeness and types once; afterwards the
// node is never mutated. "Changing" a node means building a new one with
// `with_fields` or `map`, which reuse the untouched field values (subtrees
// are shared, not copied).
//
// Preconditions: variants come from a consistent field table (schema.rs).
// Postconditions: every live node satisfies its variant's field table.
// Failure modes: unknown, duplicated, missing or wrongly typed fields.
// Side effects: allocates a fresh `NodeId` per constructed node.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::schema::{EnumDef, Field, IrEnum, Selector, Variant};

// ── Values ──────────────────────────────────────────────────────────────────

/// A member of an `EnumDef`, stored in a node field.
#[derive(Debug, Clone, Copy)]
pub struct EnumValue {
    def: &'static EnumDef,
    member: &'static str,
}

impl EnumValue {
    pub fn of<E: IrEnum>(member: E) -> Self {
        EnumValue {
            def: E::def(),
            member: member.member(),
        }
    }

    pub fn def(&self) -> &'static EnumDef {
        self.def
    }

    pub fn member(&self) -> &'static str {
        self.member
    }

    /// Convert back to the Rust enum, if this value belongs to it.
    pub fn get<E: IrEnum>(&self) -> Option<E> {
        if self.def.name == E::def().name {
            E::from_member(self.member)
        } else {
            None
        }
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.def.name == other.def.name && self.member == other.member
    }
}

/// The value of one node field.
///
/// `PartialEq` compares nodes by identity; use `structurally_eq` to compare
/// subtrees by content.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value of an optional field.
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Enum(EnumValue),
    Node(Node),
    List(Vec<Value>),
    Set(Vec<Value>),
}

impl Value {
    /// Build a `List` from anything convertible to values.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Value {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a `Set`, keeping the first occurrence of repeated elements.
    pub fn set<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Value {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            let item = item.into();
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Value::Set(unique)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Elements of a `List` or `Set`.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_enum<E: IrEnum>(&self) -> Option<E> {
        match self {
            Value::Enum(member) => member.get(),
            _ => None,
        }
    }

    /// Short description of the value's runtime shape, for error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::Str(_) => "Str".to_string(),
            Value::Enum(member) => member.def().name.to_string(),
            Value::Node(node) => node.kind().to_string(),
            Value::List(_) => "List".to_string(),
            Value::Set(_) => "Set".to_string(),
        }
    }

    /// Content equality, ignoring node identity.
    pub fn structurally_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Node(a), Value::Node(b)) => a.structurally_eq(b),
            (Value::List(a), Value::List(b)) | (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structurally_eq(y))
            }
            _ => self == other,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        Value::Node(node.clone())
    }
}

impl From<Vec<Node>> for Value {
    fn from(nodes: Vec<Node>) -> Self {
        Value::list(nodes)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::Enum(member) => f.write_str(member.member()),
            Value::Node(node) => write!(f, "{}", node),
            Value::List(items) => write_seq(f, "[", items, "]"),
            Value::Set(items) => write_seq(f, "{", items, "}"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}

// ── Nodes ───────────────────────────────────────────────────────────────────

/// An immutable IR node. Cloning shares the node; identity is preserved.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

struct NodeData {
    id: NodeId,
    variant: &'static Variant,
    /// One value per field, in field-table order.
    values: Vec<Value>,
}

fn check_field(variant: &'static Variant, field: &'static Field, value: &Value) -> Result<()> {
    if field.ty.admits(value) {
        Ok(())
    } else {
        Err(Error::FieldType {
            variant: variant.name,
            field: field.name,
            expected: field.ty.to_string(),
            found: value.type_name(),
        })
    }
}

impl Node {
    /// Construct a node of `variant` from named field values.
    ///
    /// Omitted optional fields are `Value::None`; omitting a required field,
    /// naming an unknown field, naming a field twice or passing a value of
    /// the wrong type fails.
    pub fn new<'f>(
        variant: &'static Variant,
        fields: impl IntoIterator<Item = (&'f str, Value)>,
    ) -> Result<Node> {
        let mut slots: Vec<Option<Value>> = vec![None; variant.fields.len()];
        for (name, value) in fields {
            let index = variant
                .field_index(name)
                .ok_or_else(|| Error::UnknownField {
                    variant: variant.name,
                    field: name.to_string(),
                })?;
            if slots[index].is_some() {
                return Err(Error::DuplicateArgument {
                    variant: variant.name,
                    field: variant.fields[index].name,
                });
            }
            slots[index] = Some(value);
        }

        let mut values = Vec::with_capacity(slots.len());
        for (field, slot) in variant.fields.iter().zip(slots) {
            let value = match slot {
                Some(value) => value,
                None if field.is_optional() => Value::None,
                None => {
                    return Err(Error::MissingField {
                        variant: variant.name,
                        field: field.name,
                    })
                }
            };
            check_field(variant, field, &value)?;
            values.push(value);
        }
        Ok(Node::from_parts(variant, values))
    }

    fn from_parts(variant: &'static Variant, values: Vec<Value>) -> Node {
        Node(Arc::new(NodeData {
            id: NodeId::fresh(),
            variant,
            values,
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn variant(&self) -> &'static Variant {
        self.0.variant
    }

    /// Name of this node's variant.
    pub fn kind(&self) -> &'static str {
        self.0.variant.name
    }

    pub fn is_a(&self, class: &str) -> bool {
        self.0.variant.is_a(class)
    }

    /// Fields paired with their values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static Field, &Value)> + '_ {
        self.0.variant.fields.iter().zip(&self.0.values)
    }

    /// Every node directly held by a field (including list/set elements).
    pub fn children(&self) -> impl Iterator<Item = &Node> + '_ {
        self.0
            .values
            .iter()
            .flat_map(|value| match value {
                Value::Node(_) => std::slice::from_ref(value),
                Value::List(items) | Value::Set(items) => items.as_slice(),
                _ => &[],
            })
            .filter_map(Value::as_node)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.0
            .variant
            .field_index(name)
            .ok_or_else(|| Error::UnknownField {
                variant: self.kind(),
                field: name.to_string(),
            })
    }

    fn shape_error(&self, index: usize, expected: &str) -> Error {
        Error::FieldType {
            variant: self.kind(),
            field: self.0.variant.fields[index].name,
            expected: expected.to_string(),
            found: self.0.values[index].type_name(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        Ok(&self.0.values[self.index_of(name)?])
    }

    /// A required node-valued field.
    pub fn node(&self, name: &str) -> Result<&Node> {
        let index = self.index_of(name)?;
        self.0.values[index]
            .as_node()
            .ok_or_else(|| self.shape_error(index, "node"))
    }

    /// An optional node-valued field.
    pub fn opt_node(&self, name: &str) -> Result<Option<&Node>> {
        let index = self.index_of(name)?;
        match &self.0.values[index] {
            Value::None => Ok(None),
            Value::Node(node) => Ok(Some(node)),
            _ => Err(self.shape_error(index, "node")),
        }
    }

    /// The node elements of a list- or set-valued field.
    pub fn nodes(&self, name: &str) -> Result<impl Iterator<Item = &Node> + '_> {
        let index = self.index_of(name)?;
        let items = self.0.values[index]
            .as_elements()
            .ok_or_else(|| self.shape_error(index, "List"))?;
        Ok(items.iter().filter_map(Value::as_node))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        let index = self.index_of(name)?;
        match self.0.values[index] {
            Value::Int(v) => Ok(v),
            _ => Err(self.shape_error(index, "Int")),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool> {
        let index = self.index_of(name)?;
        match self.0.values[index] {
            Value::Bool(v) => Ok(v),
            _ => Err(self.shape_error(index, "Bool")),
        }
    }

    pub fn string(&self, name: &str) -> Result<&str> {
        let index = self.index_of(name)?;
        match &self.0.values[index] {
            Value::Str(v) => Ok(v),
            _ => Err(self.shape_error(index, "Str")),
        }
    }

    pub fn enumeration<E: IrEnum>(&self, name: &str) -> Result<E> {
        let index = self.index_of(name)?;
        self.0.values[index]
            .as_enum()
            .ok_or_else(|| self.shape_error(index, E::def().name))
    }

    pub fn opt_enumeration<E: IrEnum>(&self, name: &str) -> Result<Option<E>> {
        let index = self.index_of(name)?;
        match &self.0.values[index] {
            Value::None => Ok(None),
            value => value
                .as_enum()
                .map(Some)
                .ok_or_else(|| self.shape_error(index, E::def().name)),
        }
    }

    /// Functional update: a new node with `updates` applied and every other
    /// field value reused. Only the updated values are re-validated.
    ///
    /// With no updates the node itself is returned, identity included.
    pub fn with_fields<'f>(
        &self,
        updates: impl IntoIterator<Item = (&'f str, Value)>,
    ) -> Result<Node> {
        let variant = self.variant();
        let mut values: Option<Vec<Value>> = None;
        let mut seen = vec![false; variant.fields.len()];
        for (name, value) in updates {
            let index = self.index_of(name)?;
            let field = &variant.fields[index];
            if seen[index] {
                return Err(Error::DuplicateArgument {
                    variant: variant.name,
                    field: field.name,
                });
            }
            seen[index] = true;
            check_field(variant, field, &value)?;
            values.get_or_insert_with(|| self.0.values.clone())[index] = value;
        }
        Ok(match values {
            Some(values) => Node::from_parts(variant, values),
            None => self.clone(),
        })
    }

    /// Rebuild this node, passing every node held by a selected field (or
    /// every node element of a selected list/set field) through `transform`.
    /// Unselected fields and non-node values are carried over untouched.
    pub fn map<F>(&self, selector: &Selector<'_>, mut transform: F) -> Result<Node>
    where
        F: FnMut(&Node) -> Result<Node>,
    {
        let variant = self.variant();
        let mut values = Vec::with_capacity(self.0.values.len());
        for (field, value) in self.fields() {
            if selector.selects(field) {
                let mapped = map_value(value, &mut transform)?;
                check_field(variant, field, &mapped)?;
                values.push(mapped);
            } else {
                values.push(value.clone());
            }
        }
        Ok(Node::from_parts(variant, values))
    }

    /// Content equality: same variant and structurally equal field values.
    pub fn structurally_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.variant() == other.variant()
                && self
                    .0
                    .values
                    .iter()
                    .zip(&other.0.values)
                    .all(|(a, b)| a.structurally_eq(b)))
    }
}

fn map_value<F>(value: &Value, transform: &mut F) -> Result<Value>
where
    F: FnMut(&Node) -> Result<Node>,
{
    let mut element = |item: &Value| match item {
        Value::Node(node) => transform(node).map(Value::Node),
        other => Ok(other.clone()),
    };
    match value {
        Value::List(items) => Ok(Value::List(
            items.iter().map(&mut element).collect::<Result<_>>()?,
        )),
        Value::Set(items) => Ok(Value::Set(
            items.iter().map(&mut element).collect::<Result<_>>()?,
        )),
        other => element(other),
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind())?;
        let mut first = true;
        for (field, value) in self.fields() {
            if value.is_none() {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", field.name, value)?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self, self.id())
    }
}
