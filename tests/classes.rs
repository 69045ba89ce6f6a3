#[macro_use]
mod common;

lox_test! {
    instances_carry_their_own_fields,
    "class Box {}\nvar a = Box();\nvar b = Box();\na.value = 1;\nb.value = 2;\nprint a.value;\nprint b.value;",
    "1",
    "2"
}

lox_test! {
    methods_see_their_own_instance_via_this,
    "class Box {\n  init(value) { this.value = value; }\n  show() { print this.value; }\n}\nBox(42).show();",
    "42"
}

lox_test! {
    init_implicitly_returns_the_instance,
    "class Box {\n  init(value) { this.value = value; }\n}\nvar b = Box(7);\nprint b.value;",
    "7"
}

lox_test! {
    methods_bound_off_an_instance_keep_their_this,
    "class Box {\n  init(value) { this.value = value; }\n  show() { print this.value; }\n}\nvar b = Box(9);\nvar show = b.show;\nshow();",
    "9"
}

lox_test! {
    inheritance_shares_superclass_methods,
    "class Animal {\n  speak() { print \"...\"; }\n}\nclass Dog < Animal {}\nDog().speak();",
    "..."
}

lox_test! {
    subclass_can_override_and_call_super,
    "class Animal {\n  speak() { print \"...\"; }\n}\nclass Dog < Animal {\n  speak() {\n    super.speak();\n    print \"Woof\";\n  }\n}\nDog().speak();",
    "...",
    "Woof"
}

lox_test! {
    class_is_printable_as_a_value,
    "class Box {}\nprint Box;",
    "<class Box>"
}

lox_test! {
    instance_is_printable_as_a_value,
    "class Box {}\nprint Box();",
    "<instance Box>"
}
