use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::gc::{EnvRef, ValueRef};
use crate::interpreter::Interpreter;
use crate::stmt::FunctionData;
use crate::token::Token;

/// The static parts of a function or method: name, parameters, body. Shared
/// via `Rc` so defining `fun f() {}` once doesn't re-clone its body on every
/// call or every time a closure captures it.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<crate::stmt::Stmt>,
}

impl From<&FunctionData> for FunctionDecl {
    fn from(data: &FunctionData) -> Self {
        FunctionDecl { name: data.name.clone(), params: data.params.clone(), body: data.body.clone() }
    }
}

/// A callable closure: a declaration paired with the environment it closed
/// over at definition time.
#[derive(Debug, Clone)]
pub struct FunctionObj {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl FunctionObj {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Returns a new `FunctionObj` whose closure has `this` (and `super`,
    /// transparently, since it's the closure's enclosing scope) bound to
    /// `instance`. Used when a method is looked up off an instance.
    pub fn bind(&self, interpreter: &mut Interpreter, instance: ValueRef) -> Result<FunctionObj, RuntimeError> {
        let env = interpreter.heap_mut().alloc_env(
            Some(self.closure),
            crate::gc::EnvKind::Local(Vec::new()),
            &self.declaration.name,
        )?;
        interpreter.heap_mut().define_local(env, instance);
        Ok(FunctionObj { declaration: Rc::clone(&self.declaration), closure: env, is_initializer: self.is_initializer })
    }
}

impl fmt::Display for FunctionObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

/// A function implemented in the host rather than in Lox. `func` is a plain
/// fn pointer: native functions close over nothing.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&mut Interpreter, Vec<ValueRef>) -> Result<ValueRef, RuntimeError>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

pub fn globals() -> Vec<NativeFunction> {
    vec![
        NativeFunction { name: "clock", arity: 0, func: native_clock },
        NativeFunction { name: "env", arity: 0, func: native_env },
        NativeFunction { name: "quit", arity: 0, func: native_quit },
        NativeFunction { name: "help", arity: 0, func: native_help },
    ]
}

fn native_clock(interpreter: &mut Interpreter, _args: Vec<ValueRef>) -> Result<ValueRef, RuntimeError> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock should be after the unix epoch")
        .as_secs_f64();
    Ok(interpreter.heap_mut().alloc_value(crate::gc::RawValue::Number(now)))
}

/// Dumps the current environment chain, innermost first, one binding per
/// line. Diagnostic aid, not exercised by ordinary programs.
fn native_env(interpreter: &mut Interpreter, _args: Vec<ValueRef>) -> Result<ValueRef, RuntimeError> {
    interpreter.print_environment_chain();
    Ok(interpreter.heap_mut().alloc_value(crate::gc::RawValue::Nil))
}

fn native_quit(_interpreter: &mut Interpreter, _args: Vec<ValueRef>) -> Result<ValueRef, RuntimeError> {
    std::process::exit(0);
}

fn native_help(interpreter: &mut Interpreter, _args: Vec<ValueRef>) -> Result<ValueRef, RuntimeError> {
    interpreter.writeln("Native functions: clock(), env(), quit(), help()");
    Ok(interpreter.heap_mut().alloc_value(crate::gc::RawValue::Nil))
}
