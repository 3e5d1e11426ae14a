//! Integration tests for the Falcon interpreter
//!
//! Tests the full pipeline from source text to program output:
//! - Expression evaluation and precedence
//! - Control flow and functions
//! - Builtins
//! - Error kinds and exit codes

use falcon::value::Value;
use falcon::{compile, ErrorKind, Interpreter, RunOptions};

/// Helper to compile and run a program against the given input
fn run_with_input(source: &str, input: &str) -> (falcon::Result<()>, String) {
    let mut output = Vec::new();
    let result = falcon::run_source(source, input.as_bytes(), &mut output);
    (result, String::from_utf8(output).expect("output is utf-8"))
}

/// Helper to get the output of a program that must succeed
fn output_of(source: &str) -> String {
    let (result, output) = run_with_input(source, "");
    if let Err(err) = result {
        panic!("program failed: {err}\n{source}");
    }
    output
}

/// Helper to get the error kind a program fails with, at compile or run time
fn error_of(source: &str) -> ErrorKind {
    let (result, _) = run_with_input(source, "");
    result.expect_err("program should fail").kind
}

/// Helper to read a binding after a successful run
fn value_after(source: &str, name: &str) -> Value {
    let program = compile(source).expect("program compiles");
    let mut output = Vec::new();
    let mut interp = Interpreter::new(&program, &b""[..], &mut output);
    interp.run().expect("program runs");
    interp
        .value_of(name)
        .cloned()
        .unwrap_or_else(|| panic!("no binding named {name}"))
}

// ============================================
// Arithmetic
// ============================================

#[test]
fn test_division() {
    for (a, b) in [(1.0, 2.0), (7.0, 4.0), (0.5, 0.25), (10.0, 3.0), (0.0, 5.0)] {
        let source = format!("x = {a} / {b}");
        assert_eq!(value_after(&source, "x"), Value::Number(a / b), "{source}");
    }
}

#[test]
fn test_division_by_zero() {
    assert_eq!(error_of("x = 1 / 0"), ErrorKind::DivideByZero);
    assert_eq!(error_of("x = 1 / (2 - 2)"), ErrorKind::DivideByZero);
}

#[test]
fn test_precedence() {
    assert_eq!(value_after("x = 2 + 3 * 4", "x"), Value::Number(14.0));
    assert_eq!(value_after("x = 2 * 3 + 4", "x"), Value::Number(10.0));
    assert_eq!(value_after("x = 2 + 3 * 2 ** 2", "x"), Value::Number(14.0));
    assert_eq!(value_after("x = 10 - 4 - 3", "x"), Value::Number(3.0));
    assert_eq!(value_after("x = 1 + 2 < 4", "x"), Value::Bool(true));
}

#[test]
fn test_bracket_regions() {
    assert_eq!(value_after("x = (2 + 3) * 4", "x"), Value::Number(20.0));
    assert_eq!(value_after("x = 2 * (3 + 4) * 5", "x"), Value::Number(70.0));
    assert_eq!(value_after("x = ((1 + 1) * (2 + 2)) ** 2", "x"), Value::Number(64.0));
    assert_eq!(value_after("x = 10 - (4 - 3)", "x"), Value::Number(9.0));
    assert_eq!(error_of("x = (2 + 3"), ErrorKind::Syntactic);
}

#[test]
fn test_power_is_left_associative() {
    // current semantics: (2 ** 3) ** 2
    assert_eq!(value_after("x = 2 ** 3 ** 2", "x"), Value::Number(64.0));
    assert_eq!(value_after("x = 2 ** (3 ** 2)", "x"), Value::Number(512.0));
}

#[test]
fn test_in_place_temporaries_inside_loops() {
    let source = "i = 0\ns = 0\nwhile i < 4\ns = s + i * 2 + 1\ni = i + 1\nend";
    assert_eq!(value_after(source, "s"), Value::Number(16.0));
}

// ============================================
// Strings
// ============================================

#[test]
fn test_concatenation_folding() {
    assert_eq!(value_after(r#"x = ("a" + "b") + "c""#, "x"), Value::string("abc"));
    assert_eq!(value_after(r#"x = "a" + "b" + "c""#, "x"), Value::string("abc"));
    assert_eq!(value_after(r#"x = "a" + ("b" + "c")"#, "x"), Value::string("abc"));
}

#[test]
fn test_concatenation_converts_right_operand() {
    assert_eq!(output_of(r#"print("n=" + 2.5)"#), "n=2.5");
    assert_eq!(output_of(r#"print("b=" + (1 < 2))"#), "b=true");
    assert_eq!(output_of(r#"print("x=" + nil)"#), "x=Nil");
    assert_eq!(error_of(r#"x = 1 + "a""#), ErrorKind::TypeCompatibility);
}

#[test]
fn test_repetition() {
    assert_eq!(output_of(r#"print("ab" * 3)"#), "ababab");
    assert_eq!(output_of(r#"print("ab" * 0, "|")"#), "|");
    assert_eq!(error_of(r#"x = "ab" * (0 - 1)"#), ErrorKind::Runtime);
}

#[test]
fn test_oversized_repetition_fails_cleanly() {
    assert_eq!(error_of(r#"x = "ab" * 1e30"#), ErrorKind::Internal);
    assert_eq!(error_of(r#"x = "ab" * 2 ** 2000"#), ErrorKind::Internal);
    assert_eq!(error_of("n = 2 ** 2000\nx = \"ab\" * n"), ErrorKind::Internal);
    // inf - inf is nan
    assert_eq!(
        error_of("n = 2 ** 2000\nx = \"ab\" * (n - n)"),
        ErrorKind::Runtime
    );
    assert_eq!(output_of(r#"print("" * 1e30, "|")"#), "|");
}

#[test]
fn test_substring_cut() {
    let source = "s = \"hello\"\na = s[1:3]\nb = s[:2]\nc = s[3:]\nd = s[4:2]\nprint(a, \"|\", b, \"|\", c, \"|\", d)";
    assert_eq!(output_of(source), "el|he|lo|");
}

#[test]
fn test_substring_cut_with_variable_bounds() {
    let source = "s = \"falcon\"\ni = 1\nj = 4\nprint(s[i:j])";
    assert_eq!(output_of(source), "alc");
}

#[test]
fn test_substring_cut_type_errors() {
    assert_eq!(error_of("n = 5\nx = n[0:1]"), ErrorKind::TypeCompatibility);
    assert_eq!(
        error_of("s = \"abc\"\nk = \"1\"\nx = s[k:2]"),
        ErrorKind::TypeCompatibility
    );
}

#[test]
fn test_escape_sequences() {
    assert_eq!(output_of(r#"print("a\tb\n", "q\"\\")"#), "a\tb\nq\"\\");
}

#[test]
fn test_string_comparison() {
    assert_eq!(output_of(r#"print("abc" < "abd", " ", "b" == "b")"#), "true true");
}

// ============================================
// Relations and number formatting
// ============================================

#[test]
fn test_relational_type_mismatch() {
    assert_eq!(error_of(r#"x = 1 == "a""#), ErrorKind::TypeCompatibility);
    assert_eq!(error_of("x = true < false"), ErrorKind::TypeCompatibility);
    assert_eq!(error_of("x = nil == 0"), ErrorKind::TypeCompatibility);
}

#[test]
fn test_bool_and_nil_equality() {
    assert_eq!(output_of("print(true == (1 < 2), nil == nil, nil != nil)"), "truetruefalse");
}

#[test]
fn test_number_formatting() {
    assert_eq!(output_of("print(1 / 3)"), "0.333333");
    assert_eq!(output_of("print(0.1 + 0.2)"), "0.3");
    assert_eq!(output_of("print(100000)"), "100000");
    assert_eq!(output_of("print(1000000)"), "1e+06");
    assert_eq!(output_of("print(1e20)"), "1e+20");
    assert_eq!(output_of("print(0 - 2.5)"), "-2.5");
}

#[test]
fn test_print_literals() {
    assert_eq!(output_of("print(nil, true, false)"), "Niltruefalse");
}

// ============================================
// Control flow
// ============================================

#[test]
fn test_while_loop() {
    let source = "i = 0\nwhile i < 3\nprint(i)\ni = i + 1\nend";
    assert_eq!(output_of(source), "012");
}

#[test]
fn test_if_else() {
    let source = "x = 5\nif x > 3\nprint(\"big\")\nelse\nprint(\"small\")\nend\n";
    assert_eq!(output_of(source), "big");
    let source = "x = 1\nif x > 3\nprint(\"big\")\nelse\nprint(\"small\")\nend\n";
    assert_eq!(output_of(source), "small");
}

#[test]
fn test_falsy_conditions() {
    let source = "if \"\"\nprint(1)\nend\nif nil\nprint(2)\nend\nif 0\nprint(3)\nend\nif false\nprint(4)\nend\nif \"x\"\nprint(5)\nend";
    assert_eq!(output_of(source), "5");
}

#[test]
fn test_nested_loops() {
    let source = "i = 1\nwhile i <= 3\nj = 1\nwhile j <= i\nprint(\"*\")\nj = j + 1\nend\nprint(\"\\n\")\ni = i + 1\nend";
    assert_eq!(output_of(source), "*\n**\n***\n");
}

#[test]
fn test_comments_and_blank_lines() {
    let source = "// leading comment\n\nx = 1 /* inline */ + 2\n/* spans\nlines */\nprint(x) // trailing";
    assert_eq!(output_of(source), "3");
}

#[test]
fn test_step_limit() {
    let program = compile("while 1\nend").unwrap();
    let mut output = Vec::new();
    let mut interp = Interpreter::new(&program, &b""[..], &mut output).with_options(RunOptions {
        step_limit: Some(1000),
    });
    let err = interp.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.exit_code(), 13);
}

// ============================================
// Functions
// ============================================

#[test]
fn test_function_call() {
    let source = "function add(a, b)\nreturn a + b\nend\nx = add(2, 3)\nprint(x)";
    assert_eq!(output_of(source), "5");
}

#[test]
fn test_function_without_return_yields_nil() {
    let source = "function f()\nend\nx = f()\nprint(x)";
    assert_eq!(output_of(source), "Nil");
}

#[test]
fn test_function_called_repeatedly() {
    let source = "function sq(n)\nreturn n * n\nend\na = sq(3)\nb = sq(4)\nprint(a, \" \", b)";
    assert_eq!(output_of(source), "9 16");
}

#[test]
fn test_function_reads_globals() {
    let source = "g = 10\nfunction f(a)\nreturn a + g\nend\nx = f(1)\nprint(x)";
    assert_eq!(output_of(source), "11");
}

#[test]
fn test_function_assignments_are_local() {
    let source = "x = 1\nfunction f()\nx = 2\nreturn x\nend\ny = f()\nprint(x, y)";
    assert_eq!(output_of(source), "12");
}

#[test]
fn test_function_calls_function() {
    let source = "function inc(n)\nreturn n + 1\nend\nfunction twice(n)\nm = inc(n)\nm = inc(m)\nreturn m\nend\nx = twice(5)\nprint(x)";
    assert_eq!(output_of(source), "7");
}

#[test]
fn test_early_return() {
    let source = "function sign(n)\nif n < 0\nreturn 0 - 1\nend\nif n == 0\nreturn 0\nend\nreturn 1\nend\na = sign(0 - 5)\nb = sign(0)\nc = sign(7)\nprint(a, b, c)";
    assert_eq!(output_of(source), "-101");
}

#[test]
fn test_function_call_statement_discards_result() {
    let source = "function hello(name)\nprint(\"hi \" + name)\nend\nhello(\"bob\")";
    assert_eq!(output_of(source), "hi bob");
}

#[test]
fn test_function_body_skipped_until_called() {
    assert_eq!(output_of("function f()\nprint(\"in\")\nend\nprint(\"out\")"), "out");
}

#[test]
fn test_function_errors() {
    assert_eq!(error_of("x = nope(1)"), ErrorKind::UndefinedFunction);
    assert_eq!(error_of("function f(a)\nend\nf()"), ErrorKind::Syntactic);
    assert_eq!(error_of("return 1"), ErrorKind::Syntactic);
    assert_eq!(error_of("function f()\nf()\nend"), ErrorKind::UndefinedFunction);
}

// ============================================
// Builtins
// ============================================

#[test]
fn test_input_and_numeric() {
    let source = "a = input()\nb = input()\nc = input()\nn = numeric(a)\nprint(n + 1, \"|\", b, \"|\", c, \"|\")";
    let (result, output) = run_with_input(source, "41\nabc\n");
    result.unwrap();
    assert_eq!(output, "42|abc||");
}

#[test]
fn test_numeric_rejects_text() {
    assert_eq!(error_of("x = numeric(\"abc\")"), ErrorKind::TypeChange);
    assert_eq!(value_after("x = numeric(\" 12.5kg\")", "x"), Value::Number(12.5));
}

#[test]
fn test_type_of() {
    let source = "a = typeOf(\"x\")\nb = typeOf(nil)\nc = typeOf(1)\nd = typeOf(true)\ne = typeOf(print)\nprint(a, b, c, d, e)";
    assert_eq!(output_of(source), "80316");
}

#[test]
fn test_len() {
    assert_eq!(output_of("n = len(\"falcon\")\nm = len(42)\nprint(n, m)"), "60");
}

#[test]
fn test_find() {
    let source = "a = find(\"hello\", \"ll\")\nb = find(\"abc\", \"z\")\nc = find(\"abc\", \"\")\nprint(a, b, c)";
    assert_eq!(output_of(source), "3Nil1");
    assert_eq!(error_of("x = find(1, \"a\")"), ErrorKind::TypeCompatibility);
}

#[test]
fn test_sort_is_idempotent() {
    let source = "s = sort(\"banana\")\nt = sort(s)\nprint(s, \"|\", t)";
    assert_eq!(output_of(source), "aaabnn|aaabnn");
    assert_eq!(error_of("x = sort(5)"), ErrorKind::TypeCompatibility);
}

#[test]
fn test_print_assignment_is_nil() {
    let source = "x = print(\"a\")\nprint(x)";
    assert_eq!(output_of(source), "aNil");
}

// ============================================
// Determinism
// ============================================

#[test]
fn test_reexecution_is_deterministic() {
    let source = "function sq(n)\nreturn n * n\nend\ni = 0\nacc = \"\"\nwhile i < 4\nv = sq(i)\nacc = acc + v + \",\"\ni = i + 1\nend\nline = input()\nprint(acc, line)";
    let program = compile(source).unwrap();

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let mut output = Vec::new();
        Interpreter::new(&program, &b"end\n"[..], &mut output)
            .run()
            .unwrap();
        outputs.push(String::from_utf8(output).unwrap());
    }
    assert_eq!(outputs[0], "0,1,4,9,end");
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_one_interpreter_runs_twice() {
    let program = compile("x = 1\nx = x + 1\nprint(x)").unwrap();
    let mut output = Vec::new();
    let mut interp = Interpreter::new(&program, &b""[..], &mut output);
    interp.run().unwrap();
    interp.run().unwrap();
    assert_eq!(interp.value_of("x"), Some(&Value::Number(2.0)));
    drop(interp);
    assert_eq!(String::from_utf8(output).unwrap(), "22");
}

// ============================================
// Diagnostics
// ============================================

#[test]
fn test_lexical_errors() {
    assert_eq!(error_of("x = 1."), ErrorKind::Lexical);
    assert_eq!(error_of("x = \"abc"), ErrorKind::Lexical);
    assert_eq!(error_of("x = 1 ! 2"), ErrorKind::Lexical);
    assert_eq!(error_of("x = \"\\q\""), ErrorKind::Lexical);
}

#[test]
fn test_runtime_undefined_variable() {
    let source = "if 0\nx = 1\nend\nprint(x)";
    assert_eq!(error_of(source), ErrorKind::UndefinedVariable);
}

#[test]
fn test_output_before_failure_is_kept() {
    let (result, output) = run_with_input("print(\"before\")\nx = 1 / 0\nprint(\"after\")", "");
    assert_eq!(result.unwrap_err().kind, ErrorKind::DivideByZero);
    assert_eq!(output, "before");
}

#[test]
fn test_runtime_error_points_at_source() {
    let source = "x = 1\ny = x / 0";
    let err = run_with_input(source, "").0.unwrap_err();
    let span = err.span.expect("runtime error has a span");
    assert!(span.start >= 6 && span.end <= source.len(), "{span}");
}

#[test]
fn test_exit_codes_by_phase() {
    assert_eq!(error_of("x = (").exit_code(), 2);
    assert_eq!(error_of("x = y").exit_code(), 3);
    assert_eq!(error_of("import = 1").exit_code(), 5);
    assert_eq!(error_of("x = \"a\" - 1").exit_code(), 5);
    assert_eq!(error_of("x = numeric(\"z\")").exit_code(), 12);
}

#[test]
fn test_dump_listing_and_json() {
    let program = compile("x = 1\nif x\nprint(x)\nend").unwrap();
    let listing = program.to_string();
    assert!(listing.contains("brafal"), "{listing}");
    assert!(listing.contains("print"), "{listing}");

    let json = serde_json::to_value(&program).unwrap();
    let instructions = json["instructions"].as_array().unwrap();
    assert_eq!(instructions.len(), program.len());
    assert_eq!(instructions[1]["opcode"], "BranchFalse");
}
