// visit.rs: Visitor and rewriter traits over node trees
//
// Two traversal styles:
//
// - `Visitor` reads a tree (analysis passes that fill side tables).
// - `Rewriter` returns a new tree of the same shape (transform passes).
//
// Implementations override `visit`/`rewrite` and dispatch with a `match` on
// `node.kind()`. Arms for variants they handle do the work; the fallback arm
// calls `walk`/`rewrite_children` to recurse into every child field, or
// returns `unhandled(..)` when the pass only accepts a closed set of
// variants.
//
// Preconditions: none.
// Postconditions: `walk` reaches every child field (node, optional node,
//   list and set elements) in field order.
// Failure modes: the first error returned by a visit aborts the traversal.
// Side effects: none.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::schema::Selector;

/// Read-only traversal. The default recurses into all children.
pub trait Visitor {
    fn visit(&mut self, node: &Node) -> Result<()> {
        walk(self, node)
    }
}

/// Visit every child of `node`, in field order.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> Result<()> {
    for child in node.children() {
        visitor.visit(child)?;
    }
    Ok(())
}

/// Tree-to-tree traversal. The default rebuilds `node` from rewritten
/// children.
pub trait Rewriter {
    fn rewrite(&mut self, node: &Node) -> Result<Node> {
        rewrite_children(self, node, &Selector::Children)
    }
}

/// Rebuild `node`, rewriting the children held by fields `selector` picks.
pub fn rewrite_children<R: Rewriter + ?Sized>(
    rewriter: &mut R,
    node: &Node,
    selector: &Selector<'_>,
) -> Result<Node> {
    node.map(selector, |child| rewriter.rewrite(child))
}

/// Error for a variant `pass` has no rule for.
pub fn unhandled(pass: &'static str, node: &Node) -> Error {
    Error::UnknownNode {
        pass,
        variant: node.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{self, Bop, Ty};
    use crate::node::Value;

    #[derive(Default)]
    struct ConstCounter {
        ints: usize,
        seen: Vec<&'static str>,
    }

    impl Visitor for ConstCounter {
        fn visit(&mut self, node: &Node) -> Result<()> {
            self.seen.push(node.kind());
            match node.kind() {
                "IntConst" => {
                    self.ints += 1;
                    Ok(())
                }
                _ => walk(self, node),
            }
        }
    }

    fn sample() -> Node {
        // x = 1 + (2 * y)
        let product = expr::bin_op(Bop::Mul, expr::int(2).unwrap(), expr::var("y").unwrap())
            .unwrap();
        let sum = expr::bin_op(Bop::Add, expr::int(1).unwrap(), product).unwrap();
        expr::assign(expr::var("x").unwrap(), sum).unwrap()
    }

    #[test]
    fn walk_reaches_every_node_in_field_order() {
        let mut counter = ConstCounter::default();
        counter.visit(&sample()).unwrap();
        assert_eq!(counter.ints, 2);
        assert_eq!(
            counter.seen,
            vec!["Assign", "Ref", "BinOp", "IntConst", "BinOp", "IntConst", "Ref"]
        );
    }

    struct Typer;

    impl Rewriter for Typer {
        fn rewrite(&mut self, node: &Node) -> Result<Node> {
            match node.kind() {
                "IntConst" => node.with_fields([("type", Value::from(Ty::Int))]),
                "Ref" => Err(unhandled("typer", node)),
                _ => rewrite_children(self, node, &Selector::Children),
            }
        }
    }

    #[test]
    fn rewrite_rebuilds_and_stops_on_error() {
        let tree = expr::bin_op(Bop::Add, expr::int(1).unwrap(), expr::int(2).unwrap())
            .unwrap();
        let typed = Typer.rewrite(&tree).unwrap();
        assert_eq!(
            typed.to_string(),
            "BinOp(op=Add, left=IntConst(val=1, type=Int), right=IntConst(val=2, type=Int))"
        );
        // The input tree is untouched.
        assert_eq!(expr::type_of(tree.node("left").unwrap()).unwrap(), None);

        let err = Typer.rewrite(&sample()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownNode {
                pass: "typer",
                variant: "Ref"
            }
        ));
    }

    struct Identity;
    impl Rewriter for Identity {}

    #[test]
    fn default_rewriter_copies_structure() {
        let tree = sample();
        let copy = Identity.rewrite(&tree).unwrap();
        assert_ne!(copy, tree);
        assert!(copy.structurally_eq(&tree));
    }
}
