use crate::gc::{Heap, RawValue, ValueRef};

/// Renders a value the way `print` and the REPL's `>` prompt show it.
pub fn stringify(heap: &Heap, r: ValueRef) -> String {
    match heap.get(r) {
        RawValue::Uninit | RawValue::Nil => "nil".to_string(),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Number(n) => format_number(*n),
        RawValue::Str(s) => s.to_string(),
        RawValue::Native(native) => native.to_string(),
        RawValue::Function(f) => f.to_string(),
        RawValue::Class(c) => c.to_string(),
        RawValue::Instance(i) => {
            let crate::gc::RawValue::Class(class) = heap.get(i.class) else {
                unreachable!("instance's class handle must resolve to a class value");
            };
            format!("<instance {}>", class.name)
        }
    }
}

/// Lox prints integral doubles without a trailing `.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n == 0.0 && n.is_sign_negative() {
        "-0".to_string()
    } else if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// `false` and `nil` are falsy; everything else is truthy.
pub fn is_truthy(heap: &Heap, r: ValueRef) -> bool {
    match heap.get(r) {
        RawValue::Uninit | RawValue::Nil => false,
        RawValue::Bool(b) => *b,
        _ => true,
    }
}

/// Equality by value for scalars, by identity (same handle) for everything
/// else — so two distinct instances are never `==`, even with identical
/// fields.
pub fn values_equal(heap: &Heap, a: ValueRef, b: ValueRef) -> bool {
    match (heap.get(a), heap.get(b)) {
        (RawValue::Uninit | RawValue::Nil, RawValue::Uninit | RawValue::Nil) => true,
        (RawValue::Bool(x), RawValue::Bool(y)) => x == y,
        (RawValue::Number(x), RawValue::Number(y)) => x == y,
        (RawValue::Str(x), RawValue::Str(y)) => x == y,
        (RawValue::Function(x), RawValue::Function(y)) => {
            std::rc::Rc::ptr_eq(&x.declaration, &y.declaration) && x.closure == y.closure
        }
        _ => a == b,
    }
}
