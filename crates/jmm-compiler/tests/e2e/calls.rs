//! Method calls: own-class, static, imported, constructors and varargs

use super::harness::*;
use jmm_ast::{BinaryOp, Expr, Param, Stmt, Type, VarDecl};

fn sum_method() -> jmm_ast::MethodDecl {
    // int sum(int... xs) { i = 0; s = 0; while (i < xs.length) { s = s + xs[i]; i = i + 1; } return s; }
    let xs = || var("xs", Type::int_array());
    method(
        "sum",
        vec![Param::varargs("xs", Type::Int)],
        Type::Int,
        vec![local("i", Type::Int), local("s", Type::Int)],
        vec![
            Stmt::assign("i", int(0)),
            Stmt::assign("s", int(0)),
            Stmt::while_loop(
                bin(BinaryOp::Lt, ivar("i"), Expr::length(xs())),
                Stmt::Block(vec![
                    Stmt::assign(
                        "s",
                        bin(BinaryOp::Add, ivar("s"), Expr::index(xs(), ivar("i"))),
                    ),
                    Stmt::assign("i", bin(BinaryOp::Add, ivar("i"), int(1))),
                ]),
            ),
            ret(ivar("s")),
        ],
    )
}

// ============================================================================
// Own-class calls
// ============================================================================

#[test]
fn test_call_own_method() {
    let prog = program(
        vec![],
        vec![
            method(
                "add",
                vec![param("a", Type::Int), param("b", Type::Int)],
                Type::Int,
                vec![],
                vec![ret(bin(BinaryOp::Add, ivar("a"), ivar("b")))],
            ),
            method(
                "run",
                vec![],
                Type::Int,
                vec![],
                vec![ret(call_this("add", vec![int(2), int(3)], Type::Int))],
            ),
        ],
    );
    expect_i32(&prog, "run", &[], 5);
}

#[test]
fn test_recursion() {
    // int fact(int n) { int r; if (n < 2) r = 1; else r = n * this.fact(n - 1); return r; }
    let recurse = call_this(
        "fact",
        vec![bin(BinaryOp::Sub, ivar("n"), int(1))],
        Type::Int,
    );
    let prog = program(
        vec![],
        vec![method(
            "fact",
            vec![param("n", Type::Int)],
            Type::Int,
            vec![local("r", Type::Int)],
            vec![
                Stmt::if_else(
                    bin(BinaryOp::Lt, ivar("n"), int(2)),
                    Stmt::assign("r", int(1)),
                    Stmt::assign("r", bin(BinaryOp::Mul, ivar("n"), recurse)),
                ),
                ret(ivar("r")),
            ],
        )],
    );
    expect_i32(&prog, "fact", &[5], 120);
    expect_i32(&prog, "fact", &[1], 1);
}

#[test]
fn test_static_call_through_class_name() {
    let twice = static_method(
        "twice",
        vec![param("x", Type::Int)],
        Type::Int,
        vec![],
        vec![ret(bin(BinaryOp::Mul, ivar("x"), int(2)))],
    );
    let call = Expr::call(
        Expr::var(CLASS, Type::class(CLASS)),
        "twice",
        vec![int(21)],
        Type::Int,
    );
    let prog = program(
        vec![],
        vec![twice, method("run", vec![], Type::Int, vec![], vec![ret(call)])],
    );
    let text = compile(&prog).unwrap();
    assert!(text.contains("invokestatic Prog/twice(I)I"));
    assert_eq!(run(&text, "run", &[]).unwrap().int(), 42);
}

#[test]
fn test_discarded_result_is_popped() {
    let prog = program(
        vec![VarDecl::new("hits", Type::Int)],
        vec![
            method(
                "bump",
                vec![],
                Type::Int,
                vec![],
                vec![
                    Stmt::assign("hits", bin(BinaryOp::Add, ivar("hits"), int(1))),
                    ret(ivar("hits")),
                ],
            ),
            method(
                "run",
                vec![],
                Type::Int,
                vec![],
                vec![
                    Stmt::Expr(call_this("bump", vec![], Type::Int)),
                    Stmt::Expr(call_this("bump", vec![], Type::Int)),
                    ret(ivar("hits")),
                ],
            ),
        ],
    );
    let run = compile_and_run(&prog, "run", &[]).unwrap();
    assert_eq!(run.int(), 2);
}

// ============================================================================
// Imported classes
// ============================================================================

#[test]
fn test_external_static_call() {
    let main = static_method(
        "main",
        vec![param("args", Type::array_of(Type::String))],
        Type::Void,
        vec![local("x", Type::Int)],
        vec![
            Stmt::assign("x", bin(BinaryOp::Mul, int(6), int(7))),
            Stmt::Expr(call_io("println", vec![ivar("x")], Type::Void)),
        ],
    );
    let prog = program(vec![], vec![main]);
    let text = compile(&prog).unwrap();
    assert!(text.contains(".method public static main([Ljava/lang/String;)V"));
    assert!(text.contains("invokestatic io/println(I)V"));

    let run = run(&text, "main", &[Value::Null]).unwrap();
    assert!(run.result.is_none());
    assert_eq!(
        run.machine.external_calls,
        vec![("io/println".to_string(), vec![Value::Int(42)])]
    );
}

// ============================================================================
// Objects
// ============================================================================

#[test]
fn test_new_object_and_call() {
    // Prog p; p = new Prog(); p.set(7); return p.get();
    let p = || var("p", Type::class(CLASS));
    let prog = program(
        vec![VarDecl::new("value", Type::Int)],
        vec![
            method(
                "set",
                vec![param("v", Type::Int)],
                Type::Void,
                vec![],
                vec![Stmt::assign("value", ivar("v"))],
            ),
            method("get", vec![], Type::Int, vec![], vec![ret(ivar("value"))]),
            method(
                "run",
                vec![],
                Type::Int,
                vec![local("p", Type::class(CLASS))],
                vec![
                    Stmt::assign("p", Expr::new_object(CLASS)),
                    Stmt::Expr(Expr::call(p(), "set", vec![int(7)], Type::Void)),
                    ret(Expr::call(p(), "get", vec![], Type::Int)),
                ],
            ),
        ],
    );
    let text = compile(&prog).unwrap();
    assert!(text.contains("new Prog\n   dup\n"));
    assert!(text.contains("invokespecial Prog/<init>()V"));

    let run = run(&text, "run", &[]).unwrap();
    assert_eq!(run.int(), 7);
    // The fresh instance was written, not the receiver
    assert_eq!(run.field("value"), Value::Int(0));
}

// ============================================================================
// Varargs
// ============================================================================

#[test]
fn test_varargs_packing() {
    let call = call_this(
        "sum",
        vec![int(1), int(2), int(3), int(4), int(5)],
        Type::Int,
    );
    let prog = program(
        vec![],
        vec![
            sum_method(),
            method("run", vec![], Type::Int, vec![], vec![ret(call)]),
        ],
    );
    let text = compile(&prog).unwrap();
    assert!(text.contains(".method public varargs sum([I)I"));
    assert!(text.contains("invokevirtual Prog/sum([I)I"));
    expect_i32(&prog, "run", &[], 15);
}

#[test]
fn test_varargs_with_fixed_params() {
    // int pick(int a, int b, int c, int... rest) { return rest[0] * 10 + rest[1]; }
    let rest = || var("rest", Type::int_array());
    let pick = method(
        "pick",
        vec![
            param("a", Type::Int),
            param("b", Type::Int),
            param("c", Type::Int),
            Param::varargs("rest", Type::Int),
        ],
        Type::Int,
        vec![],
        vec![ret(bin(
            BinaryOp::Add,
            bin(BinaryOp::Mul, Expr::index(rest(), int(0)), int(10)),
            Expr::index(rest(), int(1)),
        ))],
    );
    let call = call_this(
        "pick",
        vec![int(1), int(2), int(3), int(4), int(5)],
        Type::Int,
    );
    let prog = program(
        vec![],
        vec![pick, method("run", vec![], Type::Int, vec![], vec![ret(call)])],
    );
    expect_i32(&prog, "run", &[], 45);
}

#[test]
fn test_varargs_array_passed_through() {
    let call = call_this(
        "sum",
        vec![Expr::array_lit(Type::Int, vec![int(10), int(20)])],
        Type::Int,
    );
    let prog = program(
        vec![],
        vec![
            sum_method(),
            method("run", vec![], Type::Int, vec![], vec![ret(call)]),
        ],
    );
    expect_i32(&prog, "run", &[], 30);
}

#[test]
fn test_varargs_with_no_values() {
    let call = call_this("sum", vec![], Type::Int);
    let prog = program(
        vec![],
        vec![
            sum_method(),
            method("run", vec![], Type::Int, vec![], vec![ret(call)]),
        ],
    );
    expect_i32(&prog, "run", &[], 0);
}
