#[macro_use]
mod common;

lox_test! {
    arithmetic_precedence,
    "print 2 + 3 * 4;",
    "14"
}

lox_test! {
    unary_negation,
    "print -(1 + 2);",
    "-3"
}

lox_test! {
    string_concatenation,
    r#"print "foo" + "bar";"#,
    "foobar"
}

lox_test! {
    numbers_print_without_trailing_zero,
    "print 6 / 2; print 7 / 2;",
    "3",
    "3.5"
}

lox_test! {
    comparison_operators,
    "print 1 < 2; print 2 <= 2; print 3 > 2; print 3 >= 4;",
    "true",
    "true",
    "true",
    "false"
}

lox_test! {
    equality_is_by_value_for_scalars,
    r#"print 1 == 1.0; print "a" == "a"; print nil == nil;"#,
    "true",
    "true",
    "true"
}

lox_test! {
    equality_is_by_identity_for_instances,
    "class Box {}\nvar a = Box();\nvar b = Box();\nprint a == b;\nprint a == a;",
    "false",
    "true"
}

lox_test! {
    falsy_values_are_false_and_nil,
    "if (!nil) print \"nil is falsy\";\nif (!false) print \"false is falsy\";\nif (0) print \"zero is truthy\";",
    "nil is falsy",
    "false is falsy",
    "zero is truthy"
}

lox_test! {
    logical_and_short_circuits,
    "fun loud() { print \"called\"; return true; }\nprint false and loud();",
    "false"
}

lox_test! {
    logical_or_short_circuits,
    "fun loud() { print \"called\"; return false; }\nprint true or loud();",
    "true"
}

lox_test! {
    logical_operators_return_an_operand_not_a_bool,
    "print 1 and 2; print nil or \"default\";",
    "2",
    "default"
}

lox_test! {
    grouping_overrides_precedence,
    "print (2 + 3) * 4;",
    "20"
}
