//! In-process tests: compile trees and compare the native result against the
//! reference evaluator.

#![cfg(all(feature = "jit", target_arch = "x86_64", unix))]

use exprjit::jit::{CodeBuffer, JitCompiler, Operation, codegen};
use exprjit::{ArithmeticError, BinaryOp, Expr, JitConfig, JitError};

fn atom(value: i64) -> Expr {
    Expr::atom(value)
}

fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::create(op, left, right)
}

fn run(expr: &Expr) -> i64 {
    JitCompiler::default()
        .compile(expr)
        .unwrap_or_else(|e| panic!("compile {} failed: {}", expr, e))
        .invoke()
        .unwrap()
}

fn assert_agrees(expr: &Expr) {
    let expected = expr.evaluate().unwrap();
    assert_eq!(run(expr), expected, "mismatch for {}", expr);
}

#[test]
fn test_mult_add() {
    let tree = bin(BinaryOp::Mult, bin(BinaryOp::Add, atom(3), atom(4)), atom(2));
    assert_eq!(tree.evaluate(), Ok(14));
    assert_eq!(run(&tree), 14);
}

#[test]
fn test_div() {
    let tree = bin(BinaryOp::Div, atom(10), atom(2));
    assert_eq!(tree.evaluate(), Ok(5));
    assert_eq!(run(&tree), 5);
}

#[test]
fn test_div_by_zero_is_rejected() {
    let tree = bin(BinaryOp::Div, atom(10), atom(0));
    assert_eq!(tree.evaluate(), Err(ArithmeticError::DivisionByZero));
    let err = JitCompiler::default().compile(&tree).err().unwrap();
    assert!(matches!(
        err,
        JitError::Arithmetic(ArithmeticError::DivisionByZero)
    ));
}

#[test]
fn test_operand_order() {
    assert_agrees(&bin(BinaryOp::Sub, atom(2), atom(10)));
    assert_agrees(&bin(BinaryOp::Div, atom(100), atom(7)));
    assert_agrees(&bin(BinaryOp::Div, atom(7), atom(100)));
}

#[test]
fn test_signed_division() {
    assert_agrees(&bin(BinaryOp::Div, atom(-7), atom(2)));
    assert_agrees(&bin(BinaryOp::Div, atom(7), atom(-2)));
    assert_agrees(&bin(BinaryOp::Div, atom(-9), atom(-3)));
}

#[test]
fn test_large_literals_and_wrapping() {
    assert_agrees(&atom(i64::MAX));
    assert_agrees(&atom(i64::MIN));
    assert_agrees(&bin(BinaryOp::Add, atom(i64::MAX), atom(1)));
    assert_agrees(&bin(BinaryOp::Mult, atom(0x1_0000_0001), atom(0x7FFF_FFFF)));
    assert_agrees(&bin(BinaryOp::Sub, atom(i64::MIN), atom(1)));
}

#[test]
fn test_right_leaning_and_left_leaning_chains() {
    let mut left = atom(1);
    let mut right = atom(1);
    for i in 2..40 {
        left = bin(BinaryOp::Add, left, atom(i));
        right = bin(BinaryOp::Sub, atom(i), right);
    }
    assert_agrees(&left);
    assert_agrees(&right);
}

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn tree(&mut self, depth: usize) -> Expr {
        if depth == 0 || self.next_u64() % 4 == 0 {
            return atom(self.next_u64() as i64 % 2001 - 1000);
        }
        let op = match self.next_u64() % 4 {
            0 => BinaryOp::Add,
            1 => BinaryOp::Sub,
            2 => BinaryOp::Mult,
            _ => BinaryOp::Div,
        };
        let left = self.tree(depth - 1);
        let right = self.tree(depth - 1);
        bin(op, left, right)
    }
}

#[test]
fn test_generated_trees_agree_with_evaluator() {
    let mut rng = Lcg(0x5EED);
    let mut checked = 0;
    for _ in 0..300 {
        let tree = rng.tree(6);
        if tree.evaluate().is_err() {
            continue;
        }
        assert_agrees(&tree);
        checked += 1;
    }
    assert!(checked > 20);
}

#[test]
fn test_compile_twice_is_byte_identical() {
    let mut rng = Lcg(42);
    let compiler = JitCompiler::default();
    for _ in 0..20 {
        let tree = rng.tree(5);
        let config = JitConfig {
            check_arithmetic: false,
            ..JitConfig::default()
        };
        let unchecked = JitCompiler::new(config);
        let first = unchecked.compile(&tree).unwrap();
        let second = unchecked.compile(&tree).unwrap();
        assert_eq!(first.code(), second.code());
        assert_eq!(first.code(), compiler.assemble(&tree).unwrap().as_slice());
    }
}

#[test]
fn test_generated_code_preserves_rbx() {
    // Calling the same code repeatedly must leave the caller's state intact.
    let tree = bin(BinaryOp::Mult, atom(6), bin(BinaryOp::Sub, atom(9), atom(2)));
    let compiled = JitCompiler::default().compile(&tree).unwrap();
    let mut total = 0i64;
    for i in 0..100 {
        total += compiled.invoke().unwrap() + i;
    }
    assert_eq!(total, 42 * 100 + 4950);
}

extern "C" fn native_sub(a: i64, b: i64) -> i64 {
    a - b
}

#[test]
fn test_call_native_function() {
    let mut buf = CodeBuffer::allocate(64).unwrap();
    buf.emit_all(&[
        Operation::PushAccumB,
        Operation::PushImmediate(50),
        Operation::PushImmediate(8),
        Operation::PopParam2,
        Operation::PopParam1,
        Operation::Call(native_sub as usize),
        Operation::PopAccumB,
        Operation::Return,
    ])
    .unwrap();
    let code = buf.finalize().unwrap();
    assert_eq!(unsafe { code.invoke() }.unwrap(), 42);
}

static ANCHOR: u64 = 0;

#[test]
fn test_push_address() {
    let addr = &ANCHOR as *const u64 as usize;
    let mut buf = CodeBuffer::allocate(32).unwrap();
    buf.emit_all(&[Operation::PushAddress(addr), Operation::PopAccumA, Operation::Return])
        .unwrap();
    let code = buf.finalize().unwrap();
    assert_eq!(unsafe { code.invoke() }.unwrap() as usize, addr);
}

#[test]
fn test_generated_operations_run_in_raw_buffer() {
    let tree = bin(BinaryOp::Add, atom(3), atom(4));
    let ops = codegen::generate(&tree);
    let mut buf = CodeBuffer::allocate(128).unwrap();
    buf.emit_all(&ops).unwrap();
    let code = buf.finalize().unwrap();
    assert_eq!(unsafe { code.invoke() }.unwrap(), 7);
}

#[test]
fn test_tree_from_json() {
    let json = r#"{"binary":{"op":"div","left":{"binary":{"op":"mult","left":{"atom":6},"right":{"atom":7}}},"right":{"atom":2}}}"#;
    let tree: Expr = serde_json::from_str(json).unwrap();
    assert_eq!(run(&tree), 21);
}
