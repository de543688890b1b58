// meta.rs: Out-of-band metadata attached to nodes
//
// A `MetaField` is a side table from node identity to a value. Passes use
// them to annotate an immutable tree without rebuilding it. Each field is
// scoped to a node class and a value type, and can be locked read-only once
// the pass that fills it is done, after which its entries are a snapshot.
//
// Entries are keyed by `NodeId`, never by the node itself, so a table never
// keeps a tree alive. Looking up a node from a discarded tree just misses.
//
// Preconditions: none.
// Postconditions: every stored value satisfies the field's value type.
// Failure modes: owner/value type mismatch, writes after lock, reads of unset
//   scalar entries, duplicate or unknown field names.
// Side effects: none.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::trace;

use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::node::{Node, Value};
use crate::schema::FieldType;

static EMPTY_LIST: Value = Value::List(Vec::new());

// ── Metadata field ──────────────────────────────────────────────────────────

/// One named side table.
#[derive(Debug)]
pub struct MetaField {
    name: String,
    /// Node class the field is defined on.
    owner: &'static str,
    value_type: FieldType,
    readonly: bool,
    entries: HashMap<NodeId, Value>,
}

impl MetaField {
    /// A writable, empty field.
    pub fn new(name: impl Into<String>, owner: &'static str, value_type: FieldType) -> Self {
        Self {
            name: name.into(),
            owner,
            value_type,
            readonly: false,
            entries: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn value_type(&self) -> FieldType {
        self.value_type
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Freeze the field. There is no way back.
    pub fn lock(&mut self) {
        trace!("metadata `{}` locked with {} entries", self.name, self.entries.len());
        self.readonly = true;
    }

    /// Number of nodes with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_node(&self, node: &Node) -> Result<()> {
        if node.is_a(self.owner) {
            Ok(())
        } else {
            Err(Error::MetaNodeType {
                field: self.name.clone(),
                variant: node.kind(),
            })
        }
    }

    fn check_value(&self, expected: &FieldType, value: &Value) -> Result<()> {
        if expected.admits(value) {
            Ok(())
        } else {
            Err(Error::MetaValueType {
                field: self.name.clone(),
                expected: expected.to_string(),
                found: value.type_name(),
            })
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            Err(Error::MetaReadonly(self.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Store `value` for `node`, replacing any previous entry.
    pub fn set(&mut self, node: &Node, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_node(node)?;
        self.check_value(&self.value_type, &value)?;
        self.check_writable()?;
        self.entries.insert(node.id(), value);
        Ok(())
    }

    /// Append `value` to the list stored for `node`. Only valid for
    /// `List[T]` fields; the list starts out empty.
    pub fn add(&mut self, node: &Node, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_node(node)?;
        let element = self
            .value_type
            .list_element()
            .ok_or_else(|| Error::MetaNotList {
                field: self.name.clone(),
                entry: self.value_type.to_string(),
            })?;
        self.check_value(element, &value)?;
        self.check_writable()?;
        match self
            .entries
            .entry(node.id())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(items) => items.push(value),
            // `set` only admits lists for list-typed fields.
            other => *other = Value::List(vec![value]),
        }
        Ok(())
    }

    /// The entry for `node`. List fields read as empty when never written;
    /// scalar fields fail.
    pub fn get(&self, node: &Node) -> Result<&Value> {
        self.check_node(node)?;
        match self.entries.get(&node.id()) {
            Some(value) => Ok(value),
            None if self.value_type.list_element().is_some() => Ok(&EMPTY_LIST),
            None => Err(Error::MetaNotSet {
                field: self.name.clone(),
                node: node.id(),
            }),
        }
    }

    /// The entry for `node` as a single node.
    pub fn get_node(&self, node: &Node) -> Result<&Node> {
        let value = self.get(node)?;
        value.as_node().ok_or_else(|| Error::MetaValueType {
            field: self.name.clone(),
            expected: "node".to_string(),
            found: value.type_name(),
        })
    }

    /// The entry for `node` as a list of nodes.
    pub fn get_nodes(&self, node: &Node) -> Result<Vec<Node>> {
        let value = self.get(node)?;
        let items = value.as_elements().ok_or_else(|| Error::MetaValueType {
            field: self.name.clone(),
            expected: "List".to_string(),
            found: value.type_name(),
        })?;
        Ok(items.iter().filter_map(Value::as_node).cloned().collect())
    }
}

// ── Repository ──────────────────────────────────────────────────────────────

/// Named metadata fields, in registration order.
#[derive(Debug, Default)]
pub struct MetaRepository {
    fields: IndexMap<String, MetaField>,
}

impl MetaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, field: MetaField) -> Result<()> {
        if self.fields.contains_key(field.name()) {
            return Err(Error::MetaDuplicate(field.name.clone()));
        }
        self.fields.insert(field.name.clone(), field);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Result<&MetaField> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::MetaUndefined(name.to_string()))
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut MetaField> {
        self.fields
            .get_mut(name)
            .ok_or_else(|| Error::MetaUndefined(name.to_string()))
    }

    /// Shorthand for `field(name)?.get(node)`.
    pub fn get(&self, name: &str, node: &Node) -> Result<&Value> {
        self.field(name)?.get(node)
    }

    pub fn lock_all(&mut self) {
        for field in self.fields.values_mut() {
            field.lock();
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
