//! Tree to operation sequence.
//!
//! Evaluation uses two accumulators. Every subtree leaves its value in A;
//! a binary node spills the left value to the native stack while the right
//! subtree is generated, then reloads both operands as A = left, B = right
//! before combining them. Stack traffic grows with tree depth.

use super::ops::Operation;
use crate::ast::{BinaryOp, Expr};

/// Generate the operations of a complete function returning `expr`.
///
/// RBX backs accumulator B and is callee-saved, so the function saves it on
/// entry and restores it before returning.
pub fn generate(expr: &Expr) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(expr.node_count() * 4 + 3);
    ops.push(Operation::PushAccumB);
    generate_expr(expr, &mut ops);
    ops.push(Operation::PopAccumB);
    ops.push(Operation::Return);
    ops
}

/// Generate `expr` so that its value ends up in accumulator A.
pub fn generate_expr(expr: &Expr, ops: &mut Vec<Operation>) {
    match expr {
        Expr::Atom(value) => {
            ops.push(Operation::PushImmediate(*value));
            ops.push(Operation::PopAccumA);
        }
        Expr::Binary { op, left, right } => {
            generate_expr(left, ops);
            ops.push(Operation::PushAccumA);
            generate_expr(right, ops);
            ops.push(Operation::PushAccumA);
            ops.push(Operation::PopAccumB);
            ops.push(Operation::PopAccumA);
            ops.push(combine(*op));
        }
    }
}

fn combine(op: BinaryOp) -> Operation {
    match op {
        BinaryOp::Add => Operation::Add,
        BinaryOp::Sub => Operation::Sub,
        BinaryOp::Mult => Operation::Mult,
        BinaryOp::Div => Operation::Div,
    }
}
