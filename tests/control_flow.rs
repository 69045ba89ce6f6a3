#[macro_use]
mod common;

lox_test! {
    if_else_picks_a_branch,
    "if (1 < 2) print \"yes\"; else print \"no\";",
    "yes"
}

lox_test! {
    if_without_else_is_allowed,
    "if (false) print \"unreachable\";\nprint \"done\";",
    "done"
}

lox_test! {
    dangling_else_binds_to_nearest_if,
    "if (true) if (false) print \"a\"; else print \"b\";",
    "b"
}

lox_test! {
    while_loop_runs_until_false,
    "var i = 0;\nwhile (i < 3) {\n  print i;\n  i = i + 1;\n}",
    "0",
    "1",
    "2"
}

lox_test! {
    for_loop_desugars_to_while,
    "for (var i = 0; i < 3; i = i + 1) print i;",
    "0",
    "1",
    "2"
}

lox_test! {
    for_loop_clauses_are_all_optional,
    "fun loop() {\n  var i = 0;\n  for (;;) {\n    if (i >= 2) return;\n    print i;\n    i = i + 1;\n  }\n}\nloop();",
    "0",
    "1"
}
