//! Pretty-printers for trees, operation sequences and machine code.

use std::fmt::Write;

use crate::ast::Expr;
#[cfg(feature = "jit")]
use crate::jit::{Operation, assembler};

/// Tree view of an expression.
pub fn tree(expr: &Expr) -> String {
    let mut out = String::new();
    print_node(&mut out, expr, "", "");
    out
}

fn print_node(out: &mut String, expr: &Expr, prefix: &str, child_prefix: &str) {
    match expr {
        Expr::Atom(value) => {
            let _ = writeln!(out, "{}Atom({})", prefix, value);
        }
        Expr::Binary { op, left, right } => {
            let _ = writeln!(out, "{}{:?}", prefix, op);
            print_node(
                out,
                left,
                &format!("{}├── ", child_prefix),
                &format!("{}│   ", child_prefix),
            );
            print_node(
                out,
                right,
                &format!("{}└── ", child_prefix),
                &format!("{}    ", child_prefix),
            );
        }
    }
}

/// One line per operation, prefixed with its byte offset in the encoded code.
#[cfg(feature = "jit")]
pub fn operations(ops: &[Operation]) -> String {
    let mut out = String::new();
    let mut offset = 0;
    for op in ops {
        let _ = writeln!(out, "{:04x}  {}", offset, op);
        offset += assembler::operation_len(op);
    }
    out
}

/// Hex dump, 16 bytes per row.
pub fn hex(code: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in code.chunks(16).enumerate() {
        let _ = write!(out, "{:04x} ", row * 16);
        for byte in chunk {
            let _ = write!(out, " {:02x}", byte);
        }
        out.push('\n');
    }
    out
}
