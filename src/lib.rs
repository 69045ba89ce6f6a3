#![allow(clippy::needless_return)]

//! loxwalk is a tree-walking interpreter for Lox, the little dynamically
//! typed, lexically scoped language from *Crafting Interpreters*. It is a
//! hobby project: not hardened, not fast, and not meant to run anything
//! you'd call production code.
//!
//! ## Pipeline
//! Source text passes through four stages before it runs:
//!
//! 1. **Scanning** ([`scanner`]) turns characters into [`Token`](token::Token)s,
//!    reporting lexical mistakes (unterminated strings, stray characters) as
//!    [`ScanError`](error::ScanError).
//! 2. **Parsing** ([`parser`]) turns tokens into an AST of [`Expr`](expr::Expr)
//!    and [`Stmt`](stmt::Stmt) nodes via recursive descent, reporting grammar
//!    mistakes as [`ParseError`](error::ParseError). The parser synchronizes
//!    after an error instead of bailing, so one run can surface several
//!    mistakes at once.
//! 3. **Resolving** ([`resolver`]) walks the AST once before evaluation,
//!    assigning every local variable reference a `(depth, slot)` pair so the
//!    interpreter never has to search an environment chain by name. Scoping
//!    mistakes that are syntactically fine but semantically wrong — reading
//!    a local in its own initializer, a bare `return` at the top level,
//!    `this` outside a class — are reported here as
//!    [`ResolveError`](error::ResolveError).
//! 4. **Interpreting** ([`interpreter`]) walks the resolved AST and evaluates
//!    it directly, no bytecode involved. Values and environments live in a
//!    mark-sweep [`Heap`](gc::Heap) addressed by opaque handles rather than
//!    behind `Rc<RefCell<_>>`. Runtime mistakes (type errors, division by
//!    zero, calling a non-callable) are reported as
//!    [`RuntimeError`](error::RuntimeError).
//!
//! Each stage keeps going after an error where it can, so a single `run`
//! reports as much as possible instead of stopping at the first mistake.
//! Whether anything went wrong is tracked by a pair of flags in [`error`],
//! inspected by the caller ([`crate::run_file`]/[`crate::run_prompt`]) to
//! decide the process exit code.

use std::fs;
use std::io::{self, Write};

pub mod ast;
pub mod class;
pub mod error;
pub mod expr;
pub mod function;
pub mod gc;
pub mod interpreter;
pub mod limits;
pub mod literal;
pub mod object;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;

use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// Owns the one [`Interpreter`] (and therefore the one [`gc::Heap`]) a run of
/// the language uses, so state — global variables, open closures — survives
/// across REPL lines.
pub struct Loxwalk {
    interpreter: Interpreter,
}

impl Loxwalk {
    pub fn new(output: Box<dyn Write>) -> Self {
        Loxwalk { interpreter: Interpreter::new(output) }
    }

    /// Reads and runs a whole file. Exits the process with the conventional
    /// `sysexits.h` codes on failure: 65 for a compile-time error, 70 for an
    /// uncaught runtime error, 74 if the file itself couldn't be read.
    pub fn run_file(&mut self, path: &str) {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                eprintln!("Could not read '{path}': {err}");
                process_exit(74);
            }
        };

        self.run(&contents);

        if error::did_error() {
            process_exit(65);
        }
        if error::did_runtime_error() {
            process_exit(70);
        }
    }

    /// Runs one line (or block) of REPL input, clearing the error flags
    /// afterward so a mistake on one line doesn't poison the next.
    pub fn run_line(&mut self, source: &str) {
        self.run(source);
        error::reset_error();
    }

    fn run(&mut self, source: &str) {
        let scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens();

        if error::did_error() {
            return;
        }

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();

        if error::did_error() {
            return;
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        resolver.resolve(&statements);

        if error::did_error() {
            return;
        }

        self.interpreter.interpret(&statements);
    }
}

fn process_exit(code: i32) -> ! {
    io::stdout().flush().ok();
    std::process::exit(code);
}
