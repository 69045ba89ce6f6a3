use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::token::{Token, Type};

static HAD_ERROR: AtomicBool = AtomicBool::new(false);
static HAD_RUNTIME_ERROR: AtomicBool = AtomicBool::new(false);

/// Checks if a static error occurred during scanning, parsing, or resolving.
pub fn did_error() -> bool {
    HAD_ERROR.load(Ordering::SeqCst)
}

/// Checks if an error occurred while interpreting.
pub fn did_runtime_error() -> bool {
    HAD_RUNTIME_ERROR.load(Ordering::SeqCst)
}

/// Resets both error flags. Used between REPL lines so a mistake on one
/// line doesn't poison later ones.
pub fn reset_error() {
    HAD_ERROR.store(false, Ordering::SeqCst);
    HAD_RUNTIME_ERROR.store(false, Ordering::SeqCst);
}

fn mark_error() {
    HAD_ERROR.store(true, Ordering::SeqCst);
}

fn mark_runtime_error() {
    HAD_RUNTIME_ERROR.store(true, Ordering::SeqCst);
}

/// An error produced while scanning source text into tokens.
#[derive(Debug, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

impl ScanError {
    pub fn report(&self) {
        eprintln!("{self}");
        mark_error();
    }
}

/// An error produced while building the AST from tokens.
#[derive(Debug)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token.r#type == Type::EOF {
            write!(f, "[line {}] Error at end: {}", self.token.line, self.message)
        } else {
            write!(
                f,
                "[line {}] Error at '{}': {}",
                self.token.line, self.token.lexeme, self.message
            )
        }
    }
}

impl ParseError {
    pub fn report(&self) {
        eprintln!("{self}");
        mark_error();
    }
}

/// An error produced while statically resolving variable bindings.
#[derive(Debug)]
pub struct ResolveError {
    pub token: Token,
    pub message: String,
}

impl std::error::Error for ResolveError {}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}] Error at '{}': {}",
            self.token.line, self.token.lexeme, self.message
        )
    }
}

impl ResolveError {
    pub fn report(&self) {
        eprintln!("{self}");
        mark_error();
    }
}

/// An error raised while evaluating a program. Also the vehicle for fatal,
/// non-recoverable conditions (allocator exhaustion, stack overflow) that
/// the interpreter cannot keep running after.
#[derive(Debug)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
    pub fatal: bool,
}

impl std::error::Error for RuntimeError {}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n[line {}]", self.message, self.token.line)
    }
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError { token, message: message.into(), fatal: false }
    }

    pub fn fatal(token: Token, message: impl Into<String>) -> Self {
        RuntimeError { token, message: message.into(), fatal: true }
    }

    pub fn report(&self) {
        eprintln!("{self}");
        mark_runtime_error();
    }
}

/// Aggregates the four stage-specific error types for callers that want to
/// treat the whole pipeline uniformly (the REPL, the CLI driver).
#[derive(Debug, Error)]
pub enum LoxError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
