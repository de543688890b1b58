// type_check.rs: Bottom-up type inference and coercion for the expr language
//
// Rewrites a statement/expression tree so every expression carries its
// `type`, inserting explicit casts where operands are implicitly converted,
// and records the type of every assigned name.
//
// Coercion rules:
//   Float wins over Int, Int wins over anything else;
//   two Bool operands of an arithmetic operator become Int;
//   negating a Bool makes it Int, `Not` makes its operand Bool;
//   comparisons are Bool.
//
// Preconditions: expression `type` fields may be empty or stale.
// Postconditions: every expression reached has its `type` set; the symbol
//   table holds the first type each name was assigned.
// Failure modes: redeclaration with another type, undefined names, bad
//   indices, non-Int loop bounds, return mismatches, array assignment,
//   `Void` arrays, argument/type count mismatch, uncombinable operands.
// Side effects: none.

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::expr::{self, Bop, Cop, Ty, Uop, CAST_TO_BOOL, CAST_TO_FLOAT, CAST_TO_INT};
use crate::node::{Node, Value};
use crate::schema::{IrEnum, Selector, Variant};
use crate::visit::{rewrite_children, unhandled, Rewriter};

const PASS: &str = "type_check";

// ── Symbol table ────────────────────────────────────────────────────────────

/// Name → type, flat across the whole program, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SymbolTable {
    symbols: IndexMap<String, Ty>,
}

impl SymbolTable {
    pub fn get(&self, name: &str) -> Option<Ty> {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Ty)> + '_ {
        self.symbols.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Record `name: ty`. The first declaration of a name fixes its type.
    pub fn declare(&mut self, name: &str, ty: Ty) -> Result<()> {
        match self.symbols.get(name) {
            Some(&declared) if declared != ty => Err(Error::Redeclared {
                name: name.to_string(),
                declared,
                found: ty,
            }),
            Some(_) => Ok(()),
            None => {
                self.symbols.insert(name.to_string(), ty);
                Ok(())
            }
        }
    }
}

// ── Entry point ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct TypeCheckResult {
    /// The fully annotated tree.
    pub tree: Node,
    pub symbols: SymbolTable,
}

/// Type-check `tree` (a statement or an expression).
pub fn analyze(tree: &Node) -> Result<TypeCheckResult> {
    let mut checker = TypeChecker::default();
    let tree = checker.rewrite(tree)?;
    debug!("{}: {} symbols declared", PASS, checker.symbols.len());
    Ok(TypeCheckResult {
        tree,
        symbols: checker.symbols,
    })
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn ty(expr: &Node) -> Result<Ty> {
    expr::type_of(expr)?.ok_or(Error::Untyped(expr.kind()))
}

fn cast_variant(target: Ty) -> Option<&'static Variant> {
    match target {
        Ty::Int => Some(&CAST_TO_INT),
        Ty::Float => Some(&CAST_TO_FLOAT),
        Ty::Bool => Some(&CAST_TO_BOOL),
        _ => None,
    }
}

/// `expr` converted to `target` (a scalar), wrapping it in a cast if needed.
fn ensure(expr: Node, target: Ty) -> Result<Node> {
    let found = ty(&expr)?;
    if found == target {
        return Ok(expr);
    }
    let variant = cast_variant(target).ok_or(Error::OperandMismatch {
        op: "cast",
        left: found,
        right: target,
    })?;
    Node::new(variant, [("expr", expr.into()), ("type", target.into())])
}

/// Common type of two different operand types.
fn promote(op: &'static str, left: Ty, right: Ty) -> Result<Ty> {
    if left == Ty::Float || right == Ty::Float {
        Ok(Ty::Float)
    } else if left == Ty::Int || right == Ty::Int {
        Ok(Ty::Int)
    } else {
        Err(Error::OperandMismatch { op, left, right })
    }
}

// ── Checker ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct TypeChecker {
    symbols: SymbolTable,
    /// Declared return type of the enclosing function, if any.
    return_type: Option<Ty>,
}

impl Rewriter for TypeChecker {
    fn rewrite(&mut self, node: &Node) -> Result<Node> {
        match node.kind() {
            "BinOp" => self.bin_op(node),
            "CmpOp" => self.cmp_op(node),
            "UnOp" => self.un_op(node),
            "Ref" => self.reference(node),
            "IntConst" => node.with_fields([("type", Ty::Int.into())]),
            "FloatConst" => node.with_fields([("type", Ty::Float.into())]),
            "BoolConst" => node.with_fields([("type", Ty::Bool.into())]),
            "VoidConst" => node.with_fields([("type", Ty::Void.into())]),
            "CastToInt" => ensure(self.rewrite(node.node("expr")?)?, Ty::Int),
            "CastToFloat" => ensure(self.rewrite(node.node("expr")?)?, Ty::Float),
            "CastToBool" => ensure(self.rewrite(node.node("expr")?)?, Ty::Bool),
            "Assign" => self.assign(node),
            "For" => self.for_loop(node),
            "Return" => self.ret(node),
            "FuncDef" => self.func_def(node),
            _ if node.is_a("Stmt") || node.is_a("Expr") => {
                rewrite_children(self, node, &Selector::Classes(&["Stmt", "Expr"]))
            }
            _ => Err(unhandled(PASS, node)),
        }
    }
}

impl TypeChecker {
    fn operands(&mut self, node: &Node) -> Result<(Node, Node)> {
        let left = self.rewrite(node.node("left")?)?;
        let right = self.rewrite(node.node("right")?)?;
        Ok((left, right))
    }

    fn bin_op(&mut self, node: &Node) -> Result<Node> {
        let op: Bop = node.enumeration("op")?;
        let (left, right) = self.operands(node)?;
        let (lt, rt) = (ty(&left)?, ty(&right)?);
        let target = if lt == rt {
            if lt == Ty::Bool && op.is_arithmetic() {
                Ty::Int
            } else {
                lt
            }
        } else {
            promote(op.member(), lt, rt)?
        };
        let (left, right) = if lt == rt && target == lt {
            (left, right)
        } else {
            (ensure(left, target)?, ensure(right, target)?)
        };
        node.with_fields([
            ("left", left.into()),
            ("right", right.into()),
            ("type", target.into()),
        ])
    }

    fn cmp_op(&mut self, node: &Node) -> Result<Node> {
        let op: Cop = node.enumeration("op")?;
        let (left, right) = self.operands(node)?;
        let (lt, rt) = (ty(&left)?, ty(&right)?);
        let (left, right) = if lt == rt {
            (left, right)
        } else {
            let target = promote(op.member(), lt, rt)?;
            (ensure(left, target)?, ensure(right, target)?)
        };
        node.with_fields([
            ("left", left.into()),
            ("right", right.into()),
            ("type", Ty::Bool.into()),
        ])
    }

    fn un_op(&mut self, node: &Node) -> Result<Node> {
        let op: Uop = node.enumeration("op")?;
        let e = self.rewrite(node.node("e")?)?;
        let e = match op {
            Uop::Neg if ty(&e)? == Ty::Bool => ensure(e, Ty::Int)?,
            Uop::Neg => e,
            Uop::Not => ensure(e, Ty::Bool)?,
        };
        let result = ty(&e)?;
        node.with_fields([("e", e.into()), ("type", result.into())])
    }

    /// The checked index of a `Ref`, if it has one.
    fn index(&mut self, reference: &Node) -> Result<Option<Node>> {
        let Some(index) = reference.opt_node("index")? else {
            return Ok(None);
        };
        let index = self.rewrite(index)?;
        match ty(&index)? {
            Ty::Int => Ok(Some(index)),
            other => Err(Error::NonIntIndex(other)),
        }
    }

    fn reference(&mut self, node: &Node) -> Result<Node> {
        let name = node.string("name")?;
        let declared = self
            .symbols
            .get(name)
            .ok_or_else(|| Error::Undefined(name.to_string()))?;
        let index = self.index(node)?;
        let result = match &index {
            None => declared,
            Some(_) if declared.is_array() => declared.to_scalar(),
            Some(_) => return Err(Error::NotSubscriptable(declared)),
        };
        node.with_fields([("type", result.into()), ("index", Value::from(index))])
    }

    fn assign(&mut self, node: &Node) -> Result<Node> {
        let val = self.rewrite(node.node("val")?)?;
        let vt = ty(&val)?;
        if vt.is_array() {
            return Err(Error::ArrayAssign(vt));
        }
        let target = node.node("ref")?;
        let index = self.index(target)?;
        let declared = match index {
            None => vt,
            Some(_) => vt.to_array().ok_or(Error::NoArrayType(vt))?,
        };
        self.symbols.declare(target.string("name")?, declared)?;
        let target =
            target.with_fields([("type", declared.into()), ("index", Value::from(index))])?;
        node.with_fields([("ref", target.into()), ("val", val.into())])
    }

    fn for_loop(&mut self, node: &Node) -> Result<Node> {
        let min = self.rewrite(node.node("min")?)?;
        let found = ty(&min)?;
        if found != Ty::Int {
            return Err(Error::NonIntBound {
                bound: "Lower",
                found,
            });
        }
        let max = self.rewrite(node.node("max")?)?;
        let found = ty(&max)?;
        if found != Ty::Int {
            return Err(Error::NonIntBound {
                bound: "Upper",
                found,
            });
        }
        self.symbols.declare(node.string("var")?, Ty::Int)?;
        let body = self.rewrite(node.node("body")?)?;
        node.with_fields([
            ("min", min.into()),
            ("max", max.into()),
            ("body", body.into()),
        ])
    }

    fn ret(&mut self, node: &Node) -> Result<Node> {
        let val = self.rewrite(node.node("val")?)?;
        let found = ty(&val)?;
        if self.return_type != Some(found) {
            return Err(Error::ReturnMismatch {
                expected: self.return_type,
                found,
            });
        }
        node.with_fields([("val", val.into()), ("type", found.into())])
    }

    fn func_def(&mut self, node: &Node) -> Result<Node> {
        let args = node.get("args")?.as_elements().unwrap_or_default();
        let types = node.get("arg_types")?.as_elements().unwrap_or_default();
        if args.len() != types.len() {
            return Err(Error::ArityMismatch {
                name: node.string("name")?.to_string(),
                args: args.len(),
                types: types.len(),
            });
        }
        for (arg, arg_type) in args.iter().zip(types) {
            if let (Value::Str(name), Some(arg_type)) = (arg, arg_type.as_enum::<Ty>()) {
                self.symbols.declare(name, arg_type)?;
            }
        }

        let enclosing = self.return_type.replace(node.enumeration("return_type")?);
        let typed = rewrite_children(self, node, &Selector::Classes(&["Stmt"]));
        self.return_type = enclosing;
        typed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{
        assign, bin_op, block, boolean, cast_to_float, cast_to_int, cmp_op, float, for_loop,
        func_def, index, int, ret, un_op, var, void,
    };

    fn check(tree: Node) -> TypeCheckResult {
        analyze(&tree).unwrap()
    }

    #[test]
    fn int_plus_bool_casts_the_bool() {
        let result = check(bin_op(Bop::Add, int(1).unwrap(), boolean(true).unwrap()).unwrap());
        assert_eq!(
            result.tree.to_string(),
            "BinOp(op=Add, left=IntConst(val=1, type=Int), \
             right=CastToInt(expr=BoolConst(val=true, type=Bool), type=Int), type=Int)"
        );
    }

    #[test]
    fn bool_arithmetic_becomes_int_but_logic_stays_bool() {
        let sum = check(bin_op(Bop::Mul, boolean(true).unwrap(), boolean(false).unwrap()).unwrap());
        assert_eq!(ty(&sum.tree).unwrap(), Ty::Int);
        assert_eq!(sum.tree.node("left").unwrap().kind(), "CastToInt");

        let and = check(bin_op(Bop::And, boolean(true).unwrap(), boolean(false).unwrap()).unwrap());
        assert_eq!(ty(&and.tree).unwrap(), Ty::Bool);
        assert_eq!(and.tree.node("left").unwrap().kind(), "BoolConst");
    }

    #[test]
    fn float_wins() {
        let result = check(bin_op(Bop::Sub, int(1).unwrap(), float(2.5).unwrap()).unwrap());
        assert_eq!(ty(&result.tree).unwrap(), Ty::Float);
        assert_eq!(result.tree.node("left").unwrap().kind(), "CastToFloat");
        assert_eq!(result.tree.node("right").unwrap().kind(), "FloatConst");
    }

    #[test]
    fn comparisons_are_bool() {
        let result = check(cmp_op(Cop::Lt, int(1).unwrap(), float(2.0).unwrap()).unwrap());
        assert_eq!(ty(&result.tree).unwrap(), Ty::Bool);
        assert_eq!(result.tree.node("left").unwrap().kind(), "CastToFloat");
    }

    #[test]
    fn uncombinable_operands() {
        let err = analyze(&bin_op(Bop::Add, boolean(true).unwrap(), void().unwrap()).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OperandMismatch {
                op: "Add",
                left: Ty::Bool,
                right: Ty::Void
            }
        ));
    }

    #[test]
    fn unary_operators() {
        let neg = check(un_op(Uop::Neg, boolean(true).unwrap()).unwrap());
        assert_eq!(ty(&neg.tree).unwrap(), Ty::Int);
        let neg = check(un_op(Uop::Neg, float(1.0).unwrap()).unwrap());
        assert_eq!(ty(&neg.tree).unwrap(), Ty::Float);
        let not = check(un_op(Uop::Not, int(3).unwrap()).unwrap());
        assert_eq!(ty(&not.tree).unwrap(), Ty::Bool);
        assert_eq!(not.tree.node("e").unwrap().kind(), "CastToBool");
    }

    #[test]
    fn casts_collapse_when_redundant() {
        let result = check(cast_to_int(int(1).unwrap()).unwrap());
        assert_eq!(result.tree.to_string(), "IntConst(val=1, type=Int)");

        let result = check(cast_to_float(int(1).unwrap()).unwrap());
        assert_eq!(
            result.tree.to_string(),
            "CastToFloat(expr=IntConst(val=1, type=Int), type=Float)"
        );
    }

    #[test]
    fn redeclaration_with_other_type_fails() {
        let program = block(vec![
            assign(var("x").unwrap(), int(1).unwrap()).unwrap(),
            assign(var("x").unwrap(), float(1.0).unwrap()).unwrap(),
        ])
        .unwrap();
        let err = analyze(&program).unwrap_err();
        assert!(matches!(
            err,
            Error::Redeclared {
                declared: Ty::Int,
                found: Ty::Float,
                ..
            }
        ));
    }

    #[test]
    fn same_type_reassignment_is_fine() {
        let program = block(vec![
            assign(var("x").unwrap(), int(1).unwrap()).unwrap(),
            assign(var("y").unwrap(), var("x").unwrap()).unwrap(),
            assign(var("x").unwrap(), int(2).unwrap()).unwrap(),
        ])
        .unwrap();
        let result = check(program);
        assert_eq!(
            result.symbols.iter().collect::<Vec<_>>(),
            vec![("x", Ty::Int), ("y", Ty::Int)]
        );
    }

    #[test]
    fn indexed_assignment_declares_an_array() {
        let program = block(vec![
            assign(index("a", int(0).unwrap()).unwrap(), float(1.5).unwrap()).unwrap(),
            assign(var("b").unwrap(), index("a", int(1).unwrap()).unwrap()).unwrap(),
        ])
        .unwrap();
        let result = check(program);
        assert_eq!(result.symbols.get("a"), Some(Ty::FloatArray));
        assert_eq!(result.symbols.get("b"), Some(Ty::Float));
    }

    #[test]
    fn reference_errors() {
        let err = analyze(&var("nope").unwrap()).unwrap_err();
        assert!(matches!(err, Error::Undefined(name) if name == "nope"));

        let program = block(vec![
            assign(var("x").unwrap(), int(1).unwrap()).unwrap(),
            assign(var("y").unwrap(), index("x", int(0).unwrap()).unwrap()).unwrap(),
        ])
        .unwrap();
        assert!(matches!(
            analyze(&program).unwrap_err(),
            Error::NotSubscriptable(Ty::Int)
        ));

        let program = block(vec![
            assign(index("a", int(0).unwrap()).unwrap(), int(1).unwrap()).unwrap(),
            assign(var("y").unwrap(), index("a", float(0.0).unwrap()).unwrap()).unwrap(),
        ])
        .unwrap();
        assert!(matches!(
            analyze(&program).unwrap_err(),
            Error::NonIntIndex(Ty::Float)
        ));
    }

    #[test]
    fn array_values_cannot_be_assigned() {
        let program = block(vec![
            assign(index("a", int(0).unwrap()).unwrap(), int(1).unwrap()).unwrap(),
            assign(var("b").unwrap(), var("a").unwrap()).unwrap(),
        ])
        .unwrap();
        assert!(matches!(
            analyze(&program).unwrap_err(),
            Error::ArrayAssign(Ty::IntArray)
        ));
    }

    #[test]
    fn no_void_arrays() {
        let program = assign(index("v", int(0).unwrap()).unwrap(), void().unwrap()).unwrap();
        assert!(matches!(
            analyze(&program).unwrap_err(),
            Error::NoArrayType(Ty::Void)
        ));
    }

    #[test]
    fn loop_bounds_must_be_int() {
        let body = block(vec![]).unwrap();
        let program = for_loop("i", int(0).unwrap(), float(10.0).unwrap(), body.clone()).unwrap();
        let err = analyze(&program).unwrap_err();
        assert!(matches!(
            err,
            Error::NonIntBound {
                bound: "Upper",
                found: Ty::Float
            }
        ));

        let program = for_loop("i", boolean(true).unwrap(), int(3).unwrap(), body).unwrap();
        assert!(matches!(
            analyze(&program).unwrap_err(),
            Error::NonIntBound { bound: "Lower", .. }
        ));
    }

    #[test]
    fn loop_variable_is_int() {
        let body = assign(var("s").unwrap(), var("i").unwrap()).unwrap();
        let program = for_loop("i", int(0).unwrap(), int(3).unwrap(), body).unwrap();
        let result = check(program);
        assert_eq!(result.symbols.get("i"), Some(Ty::Int));
        assert_eq!(result.symbols.get("s"), Some(Ty::Int));
    }

    #[test]
    fn functions_check_their_returns() {
        let body = ret(bin_op(Bop::Add, var("a").unwrap(), int(1).unwrap()).unwrap()).unwrap();
        let f = func_def("inc", &[("a", Ty::Int)], Ty::Int, body).unwrap();
        let result = check(f);
        assert_eq!(result.symbols.get("a"), Some(Ty::Int));
        let body = result.tree.node("body").unwrap();
        assert_eq!(ty(body).unwrap(), Ty::Int);

        let body = ret(float(1.0).unwrap()).unwrap();
        let f = func_def("g", &[], Ty::Int, body).unwrap();
        assert!(matches!(
            analyze(&f).unwrap_err(),
            Error::ReturnMismatch {
                expected: Some(Ty::Int),
                found: Ty::Float
            }
        ));
    }

    #[test]
    fn return_outside_a_function() {
        let err = analyze(&ret(int(0).unwrap()).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            Error::ReturnMismatch {
                expected: None,
                found: Ty::Int
            }
        ));
    }

    #[test]
    fn argument_lists_must_line_up() {
        let f = func_def("f", &[("a", Ty::Int)], Ty::Void, block(vec![]).unwrap())
            .unwrap()
            .with_fields([("arg_types", Value::list(Vec::<Ty>::new()))])
            .unwrap();
        assert!(matches!(
            analyze(&f).unwrap_err(),
            Error::ArityMismatch {
                args: 1,
                types: 0,
                ..
            }
        ));
    }

    #[test]
    fn symbols_serialize_in_declaration_order() {
        let program = block(vec![
            assign(var("z").unwrap(), boolean(true).unwrap()).unwrap(),
            assign(var("a").unwrap(), float(0.5).unwrap()).unwrap(),
        ])
        .unwrap();
        let result = check(program);
        assert_eq!(
            serde_json::to_string(&result.symbols).unwrap(),
            r#"{"z":"Bool","a":"Float"}"#
        );
    }

    #[test]
    fn non_language_nodes_are_rejected() {
        let node = crate::decoder::state().unwrap();
        assert!(matches!(
            analyze(&node).unwrap_err(),
            Error::UnknownNode {
                pass: "type_check",
                variant: "State"
            }
        ));
    }
}
