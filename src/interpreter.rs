use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::ast::NodeId;
use crate::class::{ClassObj, GetResult, InstanceObj};
use crate::error::RuntimeError;
use crate::expr::*;
use crate::function::{self, FunctionDecl, FunctionObj};
use crate::gc::{EnvKind, EnvRef, GlobalTable, Heap, RawValue, ValueRef};
use crate::object;
use crate::stmt::*;
use crate::token::{Token, Type};

/// What a statement handed back up the call stack: either nothing special,
/// or a `return` unwinding toward the call frame that started the function.
pub enum Signal {
    None,
    Return(ValueRef),
}

/// Walks the resolved AST, evaluating as it goes. Holds the one [`Heap`] for
/// the program's lifetime, the current lexical environment, and the
/// resolver's `NodeId -> (depth, slot)` side table.
pub struct Interpreter {
    heap: Heap,
    globals: EnvRef,
    env: EnvRef,
    side_table: HashMap<NodeId, (usize, u32)>,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new(output: Box<dyn Write>) -> Self {
        let mut heap = Heap::new();
        let bootstrap = Token::new(Type::EOF, String::new(), None, 0);
        let globals = heap
            .alloc_env(None, EnvKind::Global(GlobalTable::new()), &bootstrap)
            .expect("global environment must always allocate");

        for native in function::globals() {
            let name = native.name;
            let value = heap.alloc_value(RawValue::Native(native));
            heap.define_global(globals, name, value);
        }

        Interpreter { heap, globals, env: globals, side_table: HashMap::new(), output }
    }

    /// Called by the resolver once per resolvable reference.
    pub fn resolve(&mut self, id: NodeId, depth: usize, slot: u32) {
        self.side_table.insert(id, (depth, slot));
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn writeln(&mut self, text: &str) {
        let _ = writeln!(self.output, "{text}");
    }

    /// Diagnostic dump for the native `env()` function: one line per scope
    /// in the chain, innermost first.
    pub fn print_environment_chain(&mut self) {
        let mut cur = Some(self.env);
        let mut depth = 0;
        while let Some(e) = cur {
            let summary = self.heap.env_summary(e);
            self.writeln(&format!("[{depth}] {summary}"));
            cur = self.heap.enclosing(e);
            depth += 1;
        }
    }

    pub fn interpret(&mut self, statements: &[Stmt]) {
        for statement in statements {
            if let Err(err) = self.execute(statement) {
                let fatal = err.fatal;
                err.report();
                if fatal {
                    break;
                }
            }
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Signal, RuntimeError> {
        stmt.accept(self)
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<ValueRef, RuntimeError> {
        expr.accept(self)
    }

    /// A token without real source position, used only where an environment
    /// allocation needs *a* token for its stack-overflow diagnostic but the
    /// AST node carrying it (a bare block) doesn't store one.
    fn synthetic_token(&self) -> Token {
        Token::new(Type::EOF, String::new(), None, 0)
    }

    fn define_variable(&mut self, name: &Token, value: ValueRef) {
        if self.env == self.globals {
            self.heap.define_global(self.env, &name.lexeme, value);
        } else {
            self.heap.define_local(self.env, value);
        }
    }

    fn lookup_variable(&mut self, id: NodeId, name: &Token) -> Result<ValueRef, RuntimeError> {
        match self.side_table.get(&id) {
            Some(&(depth, slot)) => Ok(self.heap.get_at(self.env, depth, slot)),
            None => self.heap.get_global(self.globals, name),
        }
    }

    fn as_number_pair(&self, a: ValueRef, b: ValueRef, op: &Token) -> Result<(f64, f64), RuntimeError> {
        match (self.heap.get(a), self.heap.get(b)) {
            (RawValue::Number(x), RawValue::Number(y)) => Ok((*x, *y)),
            _ => Err(RuntimeError::new(op.clone(), "Operands must be numbers.")),
        }
    }

    /// Runs `statements` in a fresh scope, restoring the previous scope and
    /// deactivating `block_env` on every exit path (normal, `return`, or
    /// error) so a surviving closure stays alive only through whatever still
    /// references it.
    fn execute_block(&mut self, statements: &[Stmt], block_env: EnvRef) -> Result<Signal, RuntimeError> {
        let previous = self.env;
        self.env = block_env;

        let mut signal = Signal::None;
        let mut error = None;
        for statement in statements {
            match self.execute(statement) {
                Ok(Signal::None) => {}
                Ok(ret @ Signal::Return(_)) => {
                    signal = ret;
                    break;
                }
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        self.env = previous;
        self.heap.deactivate_env(block_env);

        match error {
            Some(e) => Err(e),
            None => Ok(signal),
        }
    }

    fn call_value(&mut self, callee: ValueRef, paren: &Token, args: Vec<ValueRef>) -> Result<ValueRef, RuntimeError> {
        match self.heap.get(callee).clone() {
            RawValue::Native(native) => {
                if args.len() != native.arity {
                    return Err(RuntimeError::new(
                        paren.clone(),
                        format!("Expected {} arguments but got {}.", native.arity, args.len()),
                    ));
                }
                (native.func)(self, args)
            }
            RawValue::Function(func) => self.call_function(&func, args, paren),
            RawValue::Class(class) => self.instantiate(callee, &class, args, paren),
            other => Err(RuntimeError::new(
                paren.clone(),
                format!("Can only call functions and classes, not a {}.", other.type_name()),
            )),
        }
    }

    fn call_function(&mut self, func: &FunctionObj, args: Vec<ValueRef>, paren: &Token) -> Result<ValueRef, RuntimeError> {
        if args.len() != func.arity() {
            return Err(RuntimeError::new(
                paren.clone(),
                format!("Expected {} arguments but got {}.", func.arity(), args.len()),
            ));
        }

        let call_env = self.heap.alloc_env(Some(func.closure), EnvKind::Local(Vec::new()), &func.declaration.name)?;
        for arg in args {
            self.heap.define_local(call_env, arg);
        }

        let signal = self.execute_block(&func.declaration.body, call_env)?;

        if func.is_initializer {
            return Ok(self.heap.get_at(func.closure, 0, 0));
        }

        match signal {
            Signal::Return(value) => Ok(value),
            Signal::None => Ok(self.heap.alloc_value(RawValue::Nil)),
        }
    }

    fn instantiate(&mut self, class_ref: ValueRef, class: &ClassObj, args: Vec<ValueRef>, paren: &Token) -> Result<ValueRef, RuntimeError> {
        let instance = InstanceObj { class: class_ref, fields: Vec::new() };
        let instance_ref = self.heap.alloc_value(RawValue::Instance(instance));

        if let Some(initializer) = class.find_method(&self.heap, "init") {
            self.heap.lock(instance_ref, paren)?;
            let bound = initializer.bind(self, instance_ref);
            self.heap.unlock();
            self.call_function(&bound?, args, paren)?;
        } else if !args.is_empty() {
            return Err(RuntimeError::new(paren.clone(), format!("Expected 0 arguments but got {}.", args.len())));
        }

        Ok(instance_ref)
    }
}

impl ExprVisitor<Result<ValueRef, RuntimeError>> for Interpreter {
    fn visit_assign_expr(&mut self, data: &AssignData) -> Result<ValueRef, RuntimeError> {
        let value = self.evaluate(&data.value)?;
        match self.side_table.get(&data.id) {
            Some(&(depth, slot)) => self.heap.assign_at(self.env, depth, slot, value),
            None => self.heap.assign_global(self.globals, &data.name, value)?,
        }
        Ok(value)
    }

    fn visit_binary_expr(&mut self, data: &BinaryData) -> Result<ValueRef, RuntimeError> {
        let left = self.evaluate(&data.left)?;
        self.heap.lock(left, &data.operator)?;
        let right = self.evaluate(&data.right);
        self.heap.unlock();
        let right = right?;

        match data.operator.r#type {
            Type::BangEqual => {
                let eq = object::values_equal(&self.heap, left, right);
                Ok(self.heap.alloc_value(RawValue::Bool(!eq)))
            }
            Type::EqualEqual => {
                let eq = object::values_equal(&self.heap, left, right);
                Ok(self.heap.alloc_value(RawValue::Bool(eq)))
            }
            Type::Plus => match (self.heap.get(left), self.heap.get(right)) {
                (RawValue::Number(l), RawValue::Number(r)) => {
                    let sum = l + r;
                    Ok(self.heap.alloc_value(RawValue::Number(sum)))
                }
                (RawValue::Str(l), RawValue::Str(r)) => {
                    let joined = format!("{l}{r}");
                    Ok(self.heap.alloc_value(RawValue::Str(Rc::from(joined.as_str()))))
                }
                (RawValue::Str(l), RawValue::Number(r)) => {
                    let joined = format!("{l}{}", object::format_number(*r));
                    Ok(self.heap.alloc_value(RawValue::Str(Rc::from(joined.as_str()))))
                }
                (RawValue::Number(l), RawValue::Str(r)) => {
                    let joined = format!("{}{r}", object::format_number(*l));
                    Ok(self.heap.alloc_value(RawValue::Str(Rc::from(joined.as_str()))))
                }
                _ => Err(RuntimeError::new(data.operator.clone(), "Operands must be two numbers or two strings.")),
            },
            Type::Greater => {
                let (l, r) = self.as_number_pair(left, right, &data.operator)?;
                Ok(self.heap.alloc_value(RawValue::Bool(l > r)))
            }
            Type::GreaterEqual => {
                let (l, r) = self.as_number_pair(left, right, &data.operator)?;
                Ok(self.heap.alloc_value(RawValue::Bool(l >= r)))
            }
            Type::Less => {
                let (l, r) = self.as_number_pair(left, right, &data.operator)?;
                Ok(self.heap.alloc_value(RawValue::Bool(l < r)))
            }
            Type::LessEqual => {
                let (l, r) = self.as_number_pair(left, right, &data.operator)?;
                Ok(self.heap.alloc_value(RawValue::Bool(l <= r)))
            }
            Type::Minus => {
                let (l, r) = self.as_number_pair(left, right, &data.operator)?;
                Ok(self.heap.alloc_value(RawValue::Number(l - r)))
            }
            Type::Star => {
                let (l, r) = self.as_number_pair(left, right, &data.operator)?;
                Ok(self.heap.alloc_value(RawValue::Number(l * r)))
            }
            Type::Slash => {
                let (l, r) = self.as_number_pair(left, right, &data.operator)?;
                if r == 0.0 {
                    return Err(RuntimeError::new(data.operator.clone(), "Division by zero."));
                }
                Ok(self.heap.alloc_value(RawValue::Number(l / r)))
            }
            _ => unreachable!(),
        }
    }

    fn visit_call_expr(&mut self, data: &CallData) -> Result<ValueRef, RuntimeError> {
        let callee = self.evaluate(&data.callee)?;
        self.heap.lock(callee, &data.paren)?;
        let mut locked = 1usize;

        let mut args = Vec::with_capacity(data.arguments.len());
        for arg_expr in &data.arguments {
            let arg = match self.evaluate(arg_expr) {
                Ok(v) => v,
                Err(e) => {
                    self.heap.unlock_n(locked);
                    return Err(e);
                }
            };
            if let Err(e) = self.heap.lock(arg, &data.paren) {
                self.heap.unlock_n(locked);
                return Err(e);
            }
            locked += 1;
            args.push(arg);
        }

        let result = self.call_value(callee, &data.paren, args);
        self.heap.unlock_n(locked);
        result
    }

    fn visit_get_expr(&mut self, data: &GetData) -> Result<ValueRef, RuntimeError> {
        let object = self.evaluate(&data.object)?;
        let RawValue::Instance(instance) = self.heap.get(object) else {
            return Err(RuntimeError::new(data.name.clone(), "Only instances have properties."));
        };
        let found = instance.get(&self.heap, &data.name);

        match found {
            Some(GetResult::Field(v)) => Ok(v),
            Some(GetResult::Method(m)) => {
                let bound = m.bind(self, object)?;
                Ok(self.heap.alloc_value(RawValue::Function(bound)))
            }
            None => Err(RuntimeError::new(data.name.clone(), format!("Undefined property '{}'.", data.name.lexeme))),
        }
    }

    fn visit_grouping_expr(&mut self, data: &GroupingData) -> Result<ValueRef, RuntimeError> {
        self.evaluate(&data.expr)
    }

    fn visit_literal_expr(&mut self, data: &LiteralValue) -> Result<ValueRef, RuntimeError> {
        let raw = match data {
            LiteralValue::Nil => RawValue::Nil,
            LiteralValue::Bool(b) => RawValue::Bool(*b),
            LiteralValue::Number(n) => RawValue::Number(*n),
            LiteralValue::String(s) => RawValue::Str(Rc::from(s.as_str())),
        };
        Ok(self.heap.alloc_value(raw))
    }

    fn visit_logical_expr(&mut self, data: &LogicalData) -> Result<ValueRef, RuntimeError> {
        let left = self.evaluate(&data.left)?;
        let truthy = object::is_truthy(&self.heap, left);

        if data.operator.r#type == Type::Or {
            if truthy {
                return Ok(left);
            }
        } else if !truthy {
            return Ok(left);
        }

        self.evaluate(&data.right)
    }

    fn visit_set_expr(&mut self, data: &SetData) -> Result<ValueRef, RuntimeError> {
        let object = self.evaluate(&data.object)?;
        self.heap.lock(object, &data.name)?;
        let value = self.evaluate(&data.value);
        self.heap.unlock();
        let value = value?;

        match self.heap.get_mut(object) {
            RawValue::Instance(instance) => {
                instance.set(&data.name, value)?;
                Ok(value)
            }
            _ => Err(RuntimeError::new(data.name.clone(), "Only instances have fields.")),
        }
    }

    fn visit_super_expr(&mut self, data: &SuperData) -> Result<ValueRef, RuntimeError> {
        let &(depth, _) = self
            .side_table
            .get(&data.id)
            .expect("resolver always resolves a 'super' reference");
        let superclass_ref = self.heap.get_at(self.env, depth, 0);
        let instance_ref = self.heap.get_at(self.env, depth - 1, 0);

        let RawValue::Class(superclass) = self.heap.get(superclass_ref) else {
            unreachable!("'super' must resolve to a class value");
        };
        let method = superclass.find_method(&self.heap, &data.method.lexeme).ok_or_else(|| {
            RuntimeError::new(data.method.clone(), format!("Undefined property '{}'.", data.method.lexeme))
        })?;

        let bound = method.bind(self, instance_ref)?;
        Ok(self.heap.alloc_value(RawValue::Function(bound)))
    }

    fn visit_this_expr(&mut self, data: &ThisData) -> Result<ValueRef, RuntimeError> {
        self.lookup_variable(data.id, &data.keyword)
    }

    fn visit_unary_expr(&mut self, data: &UnaryData) -> Result<ValueRef, RuntimeError> {
        let right = self.evaluate(&data.expr)?;

        match data.operator.r#type {
            Type::Minus => match self.heap.get(right) {
                RawValue::Number(n) => {
                    let n = -n;
                    Ok(self.heap.alloc_value(RawValue::Number(n)))
                }
                _ => Err(RuntimeError::new(data.operator.clone(), "Operand must be a number.")),
            },
            Type::Bang => {
                let truthy = object::is_truthy(&self.heap, right);
                Ok(self.heap.alloc_value(RawValue::Bool(!truthy)))
            }
            _ => unreachable!(),
        }
    }

    fn visit_variable_expr(&mut self, data: &VariableData) -> Result<ValueRef, RuntimeError> {
        let value = self.lookup_variable(data.id, &data.name)?;

        #[cfg(feature = "uninit-var-error")]
        if matches!(self.heap.get(value), RawValue::Uninit) {
            return Err(RuntimeError::new(
                data.name.clone(),
                format!("Cannot read uninitialized variable '{}'.", data.name.lexeme),
            ));
        }

        Ok(value)
    }
}

impl StmtVisitor<Result<Signal, RuntimeError>> for Interpreter {
    fn visit_block_stmt(&mut self, data: &BlockData) -> Result<Signal, RuntimeError> {
        let token = self.synthetic_token();
        let block_env = self.heap.alloc_env(Some(self.env), EnvKind::Local(Vec::new()), &token)?;
        self.execute_block(&data.statements, block_env)
    }

    fn visit_class_stmt(&mut self, data: &ClassData) -> Result<Signal, RuntimeError> {
        let superclass_ref = match &data.superclass {
            Some(sc) => {
                let v = self.lookup_variable(sc.id, &sc.name)?;
                if !matches!(self.heap.get(v), RawValue::Class(_)) {
                    return Err(RuntimeError::new(sc.name.clone(), "Superclass must be a class."));
                }
                Some(v)
            }
            None => None,
        };

        let method_env = match superclass_ref {
            Some(sup) => {
                self.heap.lock(sup, &data.name)?;
                let env = self.heap.alloc_env(Some(self.env), EnvKind::Local(Vec::new()), &data.name)?;
                self.heap.define_local(env, sup);
                self.heap.unlock();
                env
            }
            None => self.env,
        };

        let mut methods = Vec::with_capacity(data.methods.len());
        for method in &data.methods {
            let declaration = Rc::new(FunctionDecl::from(method));
            let is_initializer = method.name.lexeme == "init";
            let func = FunctionObj { declaration, closure: method_env, is_initializer };
            methods.push((Rc::from(method.name.lexeme.as_str()), func));
        }

        let class = ClassObj { name: Rc::from(data.name.lexeme.as_str()), superclass: superclass_ref, methods: Rc::new(methods) };
        let class_ref = self.heap.alloc_value(RawValue::Class(class));

        if superclass_ref.is_some() {
            self.heap.deactivate_env(method_env);
        }

        self.define_variable(&data.name, class_ref);

        Ok(Signal::None)
    }

    fn visit_expression_stmt(&mut self, data: &ExpressionData) -> Result<Signal, RuntimeError> {
        self.evaluate(&data.expr)?;
        Ok(Signal::None)
    }

    fn visit_function_stmt(&mut self, data: &FunctionData) -> Result<Signal, RuntimeError> {
        let declaration = Rc::new(FunctionDecl::from(data));
        let func = FunctionObj { declaration, closure: self.env, is_initializer: false };
        let value = self.heap.alloc_value(RawValue::Function(func));
        self.define_variable(&data.name, value);
        Ok(Signal::None)
    }

    fn visit_if_stmt(&mut self, data: &IfData) -> Result<Signal, RuntimeError> {
        let cond = self.evaluate(&data.condition)?;
        if object::is_truthy(&self.heap, cond) {
            self.execute(&data.then_branch)
        } else if let Some(else_branch) = &data.else_branch {
            self.execute(else_branch)
        } else {
            Ok(Signal::None)
        }
    }

    fn visit_print_stmt(&mut self, data: &PrintData) -> Result<Signal, RuntimeError> {
        let value = self.evaluate(&data.expr)?;
        let text = object::stringify(&self.heap, value);
        self.writeln(&text);
        Ok(Signal::None)
    }

    fn visit_return_stmt(&mut self, data: &ReturnData) -> Result<Signal, RuntimeError> {
        let value = match &data.value {
            Some(expr) => self.evaluate(expr)?,
            None => self.heap.alloc_value(RawValue::Nil),
        };
        Ok(Signal::Return(value))
    }

    fn visit_var_stmt(&mut self, data: &VarData) -> Result<Signal, RuntimeError> {
        let value = match &data.initializer {
            Some(init) => self.evaluate(init)?,
            None => self.heap.alloc_value(RawValue::Uninit),
        };
        self.define_variable(&data.name, value);
        Ok(Signal::None)
    }

    fn visit_while_stmt(&mut self, data: &WhileData) -> Result<Signal, RuntimeError> {
        loop {
            let cond = self.evaluate(&data.condition)?;
            if !object::is_truthy(&self.heap, cond) {
                return Ok(Signal::None);
            }
            match self.execute(&data.body)? {
                Signal::None => {}
                ret @ Signal::Return(_) => return Ok(ret),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    /// Runs `source` through the full pipeline and returns everything
    /// written by `print`.
    fn capture(source: &str) -> String {
        let scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens();
        let mut parser = Parser::new(tokens);
        let statements = parser.parse();

        let sink = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(Box::new(SharedBuffer(sink.clone())));
        {
            let mut resolver = Resolver::new(&mut interpreter);
            resolver.resolve(&statements);
        }
        interpreter.interpret(&statements);

        let bytes = sink.borrow().clone();
        String::from_utf8(bytes).unwrap()
    }

    struct SharedBuffer(Rc<std::cell::RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(capture("print 1 + 2 * 3;"), "7\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(capture(r#"print "foo" + "bar";"#), "foobar\n");
    }

    #[test]
    fn division_by_zero_reports_runtime_error() {
        crate::error::reset_error();
        assert_eq!(capture("print 1 / 0;"), "");
        assert!(crate::error::did_runtime_error());
    }

    #[test]
    fn closures_capture_their_defining_scope() {
        let out = capture(
            "fun makeCounter() {\n\
               var i = 0;\n\
               fun count() { i = i + 1; print i; }\n\
               return count;\n\
             }\n\
             var counter = makeCounter();\n\
             counter();\n\
             counter();",
        );
        assert_eq!(out, "1\n2\n");
    }

    #[test]
    fn classes_support_inheritance_and_super() {
        let out = capture(
            "class Animal {\n\
               speak() { print \"...\"; }\n\
             }\n\
             class Dog < Animal {\n\
               speak() {\n\
                 super.speak();\n\
                 print \"Woof\";\n\
               }\n\
             }\n\
             Dog().speak();",
        );
        assert_eq!(out, "...\nWoof\n");
    }

    #[test]
    fn init_always_returns_the_instance() {
        let out = capture(
            "class Box {\n\
               init(value) { this.value = value; }\n\
             }\n\
             var b = Box(42);\n\
             print b.value;",
        );
        assert_eq!(out, "42\n");
    }

    #[test]
    fn uninitialized_variable_defaults_to_nil() {
        assert_eq!(capture("var x; print x;"), "nil\n");
    }
}
