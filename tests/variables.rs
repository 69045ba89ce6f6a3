#[macro_use]
mod common;

lox_test! {
    uninitialized_variable_is_nil,
    "var a; print a;",
    "nil"
}

lox_test! {
    global_variable_assignment,
    "var a = \"before\"; print a; a = \"after\"; print a;",
    "before",
    "after"
}

lox_test! {
    block_scope_shadows_outer,
    "var a = \"outer\";\n{\n  var a = \"inner\";\n  print a;\n}\nprint a;",
    "inner",
    "outer"
}

lox_test! {
    assignment_does_not_create_a_new_binding,
    "var a = 1;\n{\n  a = 2;\n}\nprint a;",
    "2"
}

lox_test! {
    nested_blocks_see_enclosing_scopes,
    "var a = \"global\";\n{\n  var b = \"block\";\n  {\n    print a;\n    print b;\n  }\n}",
    "global",
    "block"
}
