use std::collections::HashMap;
use std::mem;

use crate::ast::NodeId;
use crate::error::ResolveError;
use crate::expr::*;
use crate::interpreter::Interpreter;
use crate::limits::MAX_LOCALS;
use crate::stmt::*;
use crate::token::Token;

enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

enum ClassType {
    None,
    Class,
    Subclass,
}

struct ScopeEntry {
    slot: u32,
    defined: bool,
}

/// Static pass between parsing and evaluation. Walks the AST once, assigns
/// every local declaration a `(depth, slot)` pair, and hands each resolved
/// reference's result to the interpreter's side table via `NodeId`.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    scopes: Vec<HashMap<String, ScopeEntry>>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Resolver { interpreter, scopes: Vec::new(), current_function: FunctionType::None, current_class: ClassType::None }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        expr.accept(self);
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        stmt.accept(self);
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], kind: FunctionType) {
        let enclosing_function = mem::replace(&mut self.current_function, kind);

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };

        if scope.len() >= MAX_LOCALS {
            ResolveError {
                token: name.clone(),
                message: format!("Too many local variables in this scope (max {MAX_LOCALS})"),
            }
            .report();
            return;
        }

        if scope.contains_key(&name.lexeme) {
            ResolveError {
                token: name.clone(),
                message: format!("A variable is already defined with name '{}' in this scope", name.lexeme),
            }
            .report();
        }

        let slot = scope.len() as u32;
        scope.insert(name.lexeme.clone(), ScopeEntry { slot, defined: false });
    }

    fn define(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };
        if let Some(entry) = scope.get_mut(&name.lexeme) {
            entry.defined = true;
        }
    }

    /// Inserts a pre-defined slot-0 binding (`this`, `super`) directly,
    /// bypassing `declare`/`define` since these never come from source.
    fn declare_builtin(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("begin_scope called before declare_builtin")
            .insert(name.to_string(), ScopeEntry { slot: 0, defined: true });
    }

    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(entry) = scope.get(&name.lexeme) {
                self.interpreter.resolve(id, depth, entry.slot);
                return;
            }
        }
        // Unresolved: falls through to the global table at runtime.
    }
}

impl<'a> ExprVisitor<()> for Resolver<'a> {
    fn visit_variable_expr(&mut self, data: &VariableData) {
        if let Some(scope) = self.scopes.last() {
            if let Some(entry) = scope.get(&data.name.lexeme) {
                if !entry.defined {
                    ResolveError {
                        token: data.name.clone(),
                        message: "Cannot read local variable in its own initializer".to_string(),
                    }
                    .report();
                }
            }
        }

        self.resolve_local(data.id, &data.name);
    }

    fn visit_assign_expr(&mut self, data: &AssignData) {
        self.resolve_expr(&data.value);
        self.resolve_local(data.id, &data.name);
    }

    fn visit_literal_expr(&mut self, _data: &LiteralValue) {}

    fn visit_logical_expr(&mut self, data: &LogicalData) {
        self.resolve_expr(&data.left);
        self.resolve_expr(&data.right);
    }

    fn visit_unary_expr(&mut self, data: &UnaryData) {
        self.resolve_expr(&data.expr);
    }

    fn visit_binary_expr(&mut self, data: &BinaryData) {
        self.resolve_expr(&data.left);
        self.resolve_expr(&data.right);
    }

    fn visit_grouping_expr(&mut self, data: &GroupingData) {
        self.resolve_expr(&data.expr);
    }

    fn visit_call_expr(&mut self, data: &CallData) {
        self.resolve_expr(&data.callee);
        for argument in &data.arguments {
            self.resolve_expr(argument);
        }
    }

    fn visit_get_expr(&mut self, data: &GetData) {
        self.resolve_expr(&data.object);
    }

    fn visit_set_expr(&mut self, data: &SetData) {
        self.resolve_expr(&data.value);
        self.resolve_expr(&data.object);
    }

    fn visit_this_expr(&mut self, data: &ThisData) {
        if let ClassType::None = self.current_class {
            ResolveError { token: data.keyword.clone(), message: "Cannot use 'this' outside of a class".to_string() }.report();
            return;
        }

        self.resolve_local(data.id, &data.keyword);
    }

    fn visit_super_expr(&mut self, data: &SuperData) {
        match self.current_class {
            ClassType::Subclass => (),
            ClassType::None => {
                ResolveError { token: data.keyword.clone(), message: "Cannot use 'super' outside of a class".to_string() }.report();
            }
            ClassType::Class => {
                ResolveError {
                    token: data.keyword.clone(),
                    message: "Cannot use 'super' in a class with no superclass".to_string(),
                }
                .report();
            }
        }

        self.resolve_local(data.id, &data.keyword);
    }
}

impl<'a> StmtVisitor<()> for Resolver<'a> {
    fn visit_block_stmt(&mut self, data: &BlockData) {
        self.begin_scope();
        self.resolve(&data.statements);
        self.end_scope();
    }

    fn visit_var_stmt(&mut self, data: &VarData) {
        self.declare(&data.name);
        if let Some(initializer) = &data.initializer {
            self.resolve_expr(initializer);
        }
        self.define(&data.name);
    }

    fn visit_function_stmt(&mut self, data: &FunctionData) {
        self.declare(&data.name);
        self.define(&data.name);

        self.resolve_function(&data.params, &data.body, FunctionType::Function);
    }

    fn visit_expression_stmt(&mut self, data: &ExpressionData) {
        self.resolve_expr(&data.expr);
    }

    fn visit_if_stmt(&mut self, data: &IfData) {
        self.resolve_expr(&data.condition);
        self.resolve_stmt(&data.then_branch);
        if let Some(else_branch) = &data.else_branch {
            self.resolve_stmt(else_branch);
        }
    }

    fn visit_print_stmt(&mut self, data: &PrintData) {
        self.resolve_expr(&data.expr);
    }

    fn visit_return_stmt(&mut self, data: &ReturnData) {
        if let FunctionType::None = self.current_function {
            ResolveError { token: data.keyword.clone(), message: "Cannot return from top-level code".to_string() }.report();
        }

        if let Some(value) = &data.value {
            if let FunctionType::Initializer = self.current_function {
                ResolveError {
                    token: data.keyword.clone(),
                    message: "Cannot return a value from an initializer".to_string(),
                }
                .report();
                return;
            }

            self.resolve_expr(value);
        }
    }

    fn visit_while_stmt(&mut self, data: &WhileData) {
        self.resolve_expr(&data.condition);
        self.resolve_stmt(&data.body);
    }

    fn visit_class_stmt(&mut self, data: &ClassData) {
        let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

        self.declare(&data.name);
        self.define(&data.name);

        if let Some(superclass) = &data.superclass {
            if data.name.lexeme == superclass.name.lexeme {
                ResolveError { token: superclass.name.clone(), message: "A class cannot inherit from itself".to_string() }.report();
            }

            self.current_class = ClassType::Subclass;
            self.resolve_local(superclass.id, &superclass.name);

            self.begin_scope();
            self.declare_builtin("super");
        }

        self.begin_scope();
        self.declare_builtin("this");

        for method in &data.methods {
            let kind = if method.name.lexeme == "init" { FunctionType::Initializer } else { FunctionType::Method };
            self.resolve_function(&method.params, &method.body, kind);
        }

        self.end_scope();

        if data.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }
}
