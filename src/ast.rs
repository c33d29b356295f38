//! Arithmetic expression trees.
//!
//! Trees are built bottom-up and never mutated afterwards. Each node owns its
//! children, so a tree has no shared subtrees and no cycles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ArithmeticError;

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mult,
    Div,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mult => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Apply the operator with the same semantics as the generated code:
    /// wrapping add/sub/mul and truncating signed division.
    pub fn apply(self, left: i64, right: i64) -> Result<i64, ArithmeticError> {
        match self {
            BinaryOp::Add => Ok(left.wrapping_add(right)),
            BinaryOp::Sub => Ok(left.wrapping_sub(right)),
            BinaryOp::Mult => Ok(left.wrapping_mul(right)),
            BinaryOp::Div => {
                if right == 0 {
                    return Err(ArithmeticError::DivisionByZero);
                }
                left.checked_div(right).ok_or(ArithmeticError::Overflow)
            }
        }
    }
}

/// Node tag, as seen by traversal visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Add,
    Sub,
    Mult,
    Div,
    Atom(i64),
}

impl From<BinaryOp> for NodeKind {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => NodeKind::Add,
            BinaryOp::Sub => NodeKind::Sub,
            BinaryOp::Mult => NodeKind::Mult,
            BinaryOp::Div => NodeKind::Div,
        }
    }
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Integer literal.
    Atom(i64),
    /// `left op right`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn atom(value: i64) -> Self {
        Expr::Atom(value)
    }

    /// Build an internal node owning both children.
    pub fn create(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Atom(value) => NodeKind::Atom(*value),
            Expr::Binary { op, .. } => (*op).into(),
        }
    }

    /// Visit a node before its children.
    pub fn traverse_preorder<F: FnMut(&Expr)>(&self, mut visit: F) {
        self.preorder(&mut visit);
    }

    /// Visit the left child, then the node, then the right child.
    pub fn traverse_inorder<F: FnMut(&Expr)>(&self, mut visit: F) {
        self.inorder(&mut visit);
    }

    /// Visit both children before the node.
    pub fn traverse_postorder<F: FnMut(&Expr)>(&self, mut visit: F) {
        self.postorder(&mut visit);
    }

    fn preorder<F: FnMut(&Expr)>(&self, visit: &mut F) {
        visit(self);
        if let Expr::Binary { left, right, .. } = self {
            left.preorder(visit);
            right.preorder(visit);
        }
    }

    fn inorder<F: FnMut(&Expr)>(&self, visit: &mut F) {
        match self {
            Expr::Atom(_) => visit(self),
            Expr::Binary { left, right, .. } => {
                left.inorder(visit);
                visit(self);
                right.inorder(visit);
            }
        }
    }

    fn postorder<F: FnMut(&Expr)>(&self, visit: &mut F) {
        if let Expr::Binary { left, right, .. } = self {
            left.postorder(visit);
            right.postorder(visit);
        }
        visit(self);
    }

    /// Destroy the tree in postorder.
    ///
    /// Children are released before their parent and `on_release` sees every
    /// node exactly once, right before it is freed.
    pub fn release<F: FnMut(NodeKind)>(self, mut on_release: F) {
        self.release_node(&mut on_release);
    }

    fn release_node<F: FnMut(NodeKind)>(self, on_release: &mut F) {
        match self {
            Expr::Atom(value) => on_release(NodeKind::Atom(value)),
            Expr::Binary { op, left, right } => {
                (*left).release_node(on_release);
                (*right).release_node(on_release);
                on_release(op.into());
            }
        }
    }

    /// Reference evaluator. Generated code must agree with it on every tree it
    /// accepts.
    pub fn evaluate(&self) -> Result<i64, ArithmeticError> {
        match self {
            Expr::Atom(value) => Ok(*value),
            Expr::Binary { op, left, right } => {
                let l = left.evaluate()?;
                let r = right.evaluate()?;
                op.apply(l, r)
            }
        }
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.traverse_preorder(|_| count += 1);
        count
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Atom(_) => 1,
            Expr::Binary { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Atom(value) => write!(f, "{}", value),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_3_4() -> Expr {
        Expr::create(BinaryOp::Add, Expr::atom(3), Expr::atom(4))
    }

    fn kinds_of(walk: impl FnOnce(&mut dyn FnMut(&Expr))) -> Vec<NodeKind> {
        let mut seen = Vec::new();
        walk(&mut |e: &Expr| seen.push(e.kind()));
        seen
    }

    #[test]
    fn test_preorder() {
        let tree = add_3_4();
        let seen = kinds_of(|f| tree.traverse_preorder(f));
        assert_eq!(
            seen,
            vec![NodeKind::Add, NodeKind::Atom(3), NodeKind::Atom(4)]
        );
    }

    #[test]
    fn test_inorder() {
        let tree = add_3_4();
        let seen = kinds_of(|f| tree.traverse_inorder(f));
        assert_eq!(
            seen,
            vec![NodeKind::Atom(3), NodeKind::Add, NodeKind::Atom(4)]
        );
    }

    #[test]
    fn test_postorder() {
        let tree = add_3_4();
        let seen = kinds_of(|f| tree.traverse_postorder(f));
        assert_eq!(
            seen,
            vec![NodeKind::Atom(3), NodeKind::Atom(4), NodeKind::Add]
        );
    }

    #[test]
    fn test_release_visits_each_node_once() {
        let tree = Expr::create(
            BinaryOp::Mult,
            Expr::create(BinaryOp::Sub, Expr::atom(1), Expr::atom(2)),
            Expr::create(
                BinaryOp::Div,
                Expr::atom(3),
                Expr::create(BinaryOp::Add, Expr::atom(4), Expr::atom(5)),
            ),
        );
        let total = tree.node_count();

        let mut released = Vec::new();
        tree.release(|kind| released.push(kind));

        assert_eq!(released.len(), total);
        assert_eq!(
            released,
            vec![
                NodeKind::Atom(1),
                NodeKind::Atom(2),
                NodeKind::Sub,
                NodeKind::Atom(3),
                NodeKind::Atom(4),
                NodeKind::Atom(5),
                NodeKind::Add,
                NodeKind::Div,
                NodeKind::Mult,
            ]
        );
    }

    #[test]
    fn test_evaluate() {
        let tree = Expr::create(BinaryOp::Mult, add_3_4(), Expr::atom(2));
        assert_eq!(tree.evaluate(), Ok(14));

        let tree = Expr::create(BinaryOp::Div, Expr::atom(10), Expr::atom(2));
        assert_eq!(tree.evaluate(), Ok(5));

        let tree = Expr::create(BinaryOp::Sub, Expr::atom(2), Expr::atom(10));
        assert_eq!(tree.evaluate(), Ok(-8));

        let tree = Expr::create(BinaryOp::Div, Expr::atom(-7), Expr::atom(2));
        assert_eq!(tree.evaluate(), Ok(-3));
    }

    #[test]
    fn test_evaluate_division_by_zero() {
        let tree = Expr::create(BinaryOp::Div, Expr::atom(10), Expr::atom(0));
        assert_eq!(tree.evaluate(), Err(ArithmeticError::DivisionByZero));

        // Zero produced by a subexpression.
        let tree = Expr::create(
            BinaryOp::Add,
            Expr::atom(1),
            Expr::create(
                BinaryOp::Div,
                Expr::atom(5),
                Expr::create(BinaryOp::Sub, Expr::atom(3), Expr::atom(3)),
            ),
        );
        assert_eq!(tree.evaluate(), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_evaluate_overflow() {
        let tree = Expr::create(BinaryOp::Div, Expr::atom(i64::MIN), Expr::atom(-1));
        assert_eq!(tree.evaluate(), Err(ArithmeticError::Overflow));

        let tree = Expr::create(BinaryOp::Add, Expr::atom(i64::MAX), Expr::atom(1));
        assert_eq!(tree.evaluate(), Ok(i64::MIN));
    }

    #[test]
    fn test_display_and_shape() {
        let tree = Expr::create(BinaryOp::Mult, add_3_4(), Expr::atom(2));
        assert_eq!(tree.to_string(), "((3 + 4) * 2)");
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"binary":{"op":"add","left":{"atom":3},"right":{"atom":4}}}"#;
        let tree: Expr = serde_json::from_str(json).unwrap();
        assert_eq!(tree, add_3_4());
        assert_eq!(serde_json::to_string(&tree).unwrap(), json);
    }
}
