#[macro_use]
mod common;

lox_test! {
    function_call_and_return,
    "fun add(a, b) { return a + b; }\nprint add(2, 3);",
    "5"
}

lox_test! {
    function_without_return_yields_nil,
    "fun noop() {}\nprint noop();",
    "nil"
}

lox_test! {
    recursion,
    "fun fib(n) {\n  if (n < 2) return n;\n  return fib(n - 1) + fib(n - 2);\n}\nprint fib(8);",
    "21"
}

lox_test! {
    closures_capture_their_defining_environment,
    "fun makeCounter() {\n  var count = 0;\n  fun increment() {\n    count = count + 1;\n    return count;\n  }\n  return increment;\n}\nvar counter = makeCounter();\nprint counter();\nprint counter();\nprint counter();",
    "1",
    "2",
    "3"
}

lox_test! {
    two_closures_from_the_same_function_are_independent,
    "fun makeCounter() {\n  var count = 0;\n  fun increment() { count = count + 1; return count; }\n  return increment;\n}\nvar a = makeCounter();\nvar b = makeCounter();\nprint a();\nprint a();\nprint b();",
    "1",
    "2",
    "1"
}

lox_test! {
    functions_are_first_class_values,
    "fun identity(f) { return f; }\nfun greet() { print \"hi\"; }\nidentity(greet)();",
    "hi"
}

lox_test! {
    clock_native_function_returns_a_number,
    "print clock() >= 0.0;",
    "true"
}
