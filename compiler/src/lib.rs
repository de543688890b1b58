// irpass: Typed immutable IR trees, metadata side tables and visitor passes
//
// Library root. The node layer (schema, node, id) and the metadata layer
// (meta) are shared by every pass; decoder and expr declare the two shipped
// languages.

#[macro_use]
mod macros;

pub mod dce;
pub mod decoder;
pub mod diag;
pub mod dump;
pub mod error;
pub mod expr;
pub mod id;
pub mod meta;
pub mod node;
pub mod pass;
pub mod pipeline;
pub mod schema;
pub mod state_info;
pub mod type_check;
pub mod visit;

pub use error::{Error, ErrorKind, Result};
pub use node::{Node, Value};
