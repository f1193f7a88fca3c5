//! Lowering: a table of per-node emission hooks over the kernel AST.
//!
//! Each backend implements [`Lowering`] to control the emitted dialect.
//! The trait's default methods are the fixed-behavior handlers shared by
//! every target; the rest are no-op seams for backends to override.
//! [`emit`] routes each node kind to its handler.

pub mod glsl;

pub use glsl::GlslLowering;

use crate::ast::Node;
use crate::diagnostic::Diagnostic;
use crate::infer::is_safe_dependencies;
use crate::kernel::{DeclarationRecord, KernelFunction, STATE_IN_FOR_LOOP_INIT};
use crate::span::Spanned;
use crate::types::Ty;

/// Per-node emission hooks. Handlers append string fragments to `out` and
/// recurse through [`emit`].
#[allow(unused_variables)]
pub trait Lowering {
    fn target_name(&self) -> &'static str;

    /// Lowered type name used in emitted declarations. A missing mapping
    /// is a fatal diagnostic at the declaration site.
    fn type_map(&self, ty: Ty) -> Option<&'static str>;

    // ── Fixed-behavior handlers ──

    /// Nested function declarations notify the host and are not lowered in
    /// place.
    fn function_declaration(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if fx.has_nested_function_hook() {
            let ty = match fx.infer_type(node)? {
                Some(Ty::LiteralInteger) | None => Ty::Number,
                Some(ty) => ty,
            };
            let text = fx.source_slice(node.span).unwrap_or("").to_string();
            fx.fire_nested_function(&text, ty);
        }
        Ok(())
    }

    fn conditional(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Conditional {
            test,
            consequent,
            alternate,
        } = &node.node
        {
            out.push("(".to_string());
            emit(self, fx, test, out)?;
            out.push("?".to_string());
            emit(self, fx, consequent, out)?;
            out.push(":".to_string());
            emit(self, fx, alternate, out)?;
            out.push(")".to_string());
        }
        Ok(())
    }

    fn expression_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::ExpressionStatement(expression) = &node.node {
            emit(self, fx, expression, out)?;
            out.push(";".to_string());
        }
        Ok(())
    }

    fn break_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        out.push("break;".to_string());
        Ok(())
    }

    fn continue_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        out.push("continue;\n".to_string());
        Ok(())
    }

    fn sequence(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Sequence(expressions) = &node.node {
            for (i, expression) in expressions.iter().enumerate() {
                if i > 0 {
                    out.push(",".to_string());
                }
                emit(self, fx, expression, out)?;
            }
        }
        Ok(())
    }

    fn unary(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Unary {
            op,
            prefix,
            argument,
        } = &node.node
        {
            if *prefix {
                out.push(op.as_str().to_string());
                emit(self, fx, argument, out)?;
            } else {
                emit(self, fx, argument, out)?;
                out.push(op.as_str().to_string());
            }
        }
        Ok(())
    }

    fn update(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Update {
            op,
            prefix,
            argument,
        } = &node.node
        {
            if *prefix {
                out.push(op.as_str().to_string());
                emit(self, fx, argument, out)?;
            } else {
                emit(self, fx, argument, out)?;
                out.push(op.as_str().to_string());
            }
        }
        Ok(())
    }

    fn logical(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Logical { op, left, right } = &node.node {
            out.push("(".to_string());
            emit(self, fx, left, out)?;
            out.push(op.as_str().to_string());
            emit(self, fx, right, out)?;
            out.push(")".to_string());
        }
        Ok(())
    }

    fn variable_declarator(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::VariableDeclarator { id, init } = &node.node {
            emit(self, fx, id, out)?;
            if let Some(init) = init {
                out.push("=".to_string());
                emit(self, fx, init, out)?;
            }
        }
        Ok(())
    }

    /// Typed declaration: `<lowered-type> user_<name>=<init>` for the first
    /// declarator, comma-joined declarators after it, then `;`. Records a
    /// declaration table entry per declarator (trailing declarators reuse
    /// the inferred type but are unsafe).
    fn variable_declaration(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        let declarations = match &node.node {
            Node::VariableDeclaration { declarations, .. } => declarations,
            _ => return Ok(()),
        };
        let first = match declarations.first() {
            Some(first) => first,
            None => return Ok(()),
        };

        let mut ty = match fx.infer_type(first)? {
            Some(ty) => ty,
            None => {
                return Err(fx.ast_error("could not infer declaration type", first.span));
            }
        };
        if ty == Ty::LiteralInteger {
            ty = if fx.is_state(STATE_IN_FOR_LOOP_INIT) {
                Ty::Integer
            } else {
                Ty::Number
            };
        }
        let lowered = match self.type_map(ty) {
            Some(lowered) => lowered,
            None => {
                return Err(fx.ast_error(
                    format!("type '{}' is not handled by the {} type map", ty, self.target_name()),
                    node.span,
                ));
            }
        };

        for (i, declarator) in declarations.iter().enumerate() {
            if let Node::VariableDeclarator { id, init } = &declarator.node {
                if let Node::Identifier(name) = &id.node {
                    let name = name.clone();
                    let mut dependencies = Vec::new();
                    if let Some(init) = init {
                        fx.dependencies(init, &mut dependencies, false)?;
                    }
                    let is_safe = i == 0 && is_safe_dependencies(&dependencies);
                    fx.declare(
                        name,
                        DeclarationRecord {
                            ty,
                            dependencies,
                            is_safe,
                        },
                    );
                }
            }
        }

        let mut fragments: Vec<String> = Vec::new();
        for (i, declarator) in declarations.iter().enumerate() {
            if i == 0 {
                if let Node::VariableDeclarator { id, init } = &declarator.node {
                    if let Node::Identifier(name) = &id.node {
                        fragments.push(format!("{} user_{}=", lowered, name));
                    }
                    if let Some(init) = init {
                        emit(self, fx, init, &mut fragments)?;
                    }
                }
            } else {
                fragments.push(",".to_string());
                emit(self, fx, declarator, &mut fragments)?;
            }
        }
        fragments.push(";".to_string());
        // The joined result is pushed exactly once.
        out.push(fragments.join(""));
        Ok(())
    }

    // ── No-op seams for backend specialization ──

    fn function_expression(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn return_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn literal(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn binary(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn identifier(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn assignment(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn empty_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn block(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn if_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn for_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn while_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn do_while_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn this_expression(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn member(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn call(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn array(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }

    fn debugger_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        Ok(())
    }
}

/// Route a node to its handler. The AST enum is closed, so the dispatch is
/// total; unsupported syntax never reaches this point (the parser rejects
/// it).
pub fn emit<L: Lowering + ?Sized>(
    lowering: &mut L,
    fx: &mut KernelFunction,
    node: &Spanned<Node>,
    out: &mut Vec<String>,
) -> Result<(), Diagnostic> {
    match &node.node {
        Node::FunctionDeclaration { .. } => lowering.function_declaration(fx, node, out),
        Node::FunctionExpression { .. } => lowering.function_expression(fx, node, out),
        Node::Return(_) => lowering.return_statement(fx, node, out),
        Node::Literal(_) => lowering.literal(fx, node, out),
        Node::Binary { .. } => lowering.binary(fx, node, out),
        Node::Logical { .. } => lowering.logical(fx, node, out),
        Node::Unary { .. } => lowering.unary(fx, node, out),
        Node::Update { .. } => lowering.update(fx, node, out),
        Node::Identifier(_) => lowering.identifier(fx, node, out),
        Node::Assignment { .. } => lowering.assignment(fx, node, out),
        Node::ExpressionStatement(_) => lowering.expression_statement(fx, node, out),
        Node::Empty => lowering.empty_statement(fx, node, out),
        Node::Block(_) => lowering.block(fx, node, out),
        Node::If { .. } => lowering.if_statement(fx, node, out),
        Node::Break => lowering.break_statement(fx, node, out),
        Node::Continue => lowering.continue_statement(fx, node, out),
        Node::For { .. } => lowering.for_statement(fx, node, out),
        Node::While { .. } => lowering.while_statement(fx, node, out),
        Node::DoWhile { .. } => lowering.do_while_statement(fx, node, out),
        Node::VariableDeclaration { .. } => lowering.variable_declaration(fx, node, out),
        Node::VariableDeclarator { .. } => lowering.variable_declarator(fx, node, out),
        Node::This => lowering.this_expression(fx, node, out),
        Node::Sequence(_) => lowering.sequence(fx, node, out),
        Node::Member { .. } => lowering.member(fx, node, out),
        Node::Call { .. } => lowering.call(fx, node, out),
        Node::Array(_) => lowering.array(fx, node, out),
        Node::Debugger => lowering.debugger_statement(fx, node, out),
        Node::Conditional { .. } => lowering.conditional(fx, node, out),
    }
}

impl KernelFunction {
    /// Produce the lowered source string. The result is cached; repeated
    /// calls return the same string.
    pub fn to_source(&mut self, lowering: &mut dyn Lowering) -> Result<String, Vec<Diagnostic>> {
        if let Some(cached) = &self.cached_source {
            return Ok(cached.clone());
        }
        let ast = self.ast()?.clone();
        let mut fragments = Vec::new();
        emit(lowering, self, &ast, &mut fragments).map_err(|d| vec![d])?;
        let source = fragments.join("");
        self.cached_source = Some(source.clone());
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelSettings;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    /// A bare-bones backend: the core fixed handlers plus just enough
    /// expression emission to observe them.
    struct TestLowering;

    impl Lowering for TestLowering {
        fn target_name(&self) -> &'static str {
            "test"
        }

        fn type_map(&self, ty: Ty) -> Option<&'static str> {
            match ty {
                Ty::Number | Ty::Float => Some("float"),
                Ty::Integer => Some("int"),
                Ty::Boolean => Some("bool"),
                _ => None,
            }
        }

        fn literal(
            &mut self,
            _fx: &mut KernelFunction,
            node: &Spanned<Node>,
            out: &mut Vec<String>,
        ) -> Result<(), Diagnostic> {
            if let Node::Literal(crate::ast::Literal::Number { value, .. }) = &node.node {
                out.push(format!("{}", value));
            }
            Ok(())
        }

        fn identifier(
            &mut self,
            _fx: &mut KernelFunction,
            node: &Spanned<Node>,
            out: &mut Vec<String>,
        ) -> Result<(), Diagnostic> {
            if let Node::Identifier(name) = &node.node {
                out.push(format!("user_{}", name));
            }
            Ok(())
        }
    }

    fn unit(source: &str) -> KernelFunction {
        KernelFunction::new(source, KernelSettings::default()).unwrap()
    }

    fn parse_stmt(source: &str) -> Spanned<Node> {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        Parser::new(tokens)
            .parse_program()
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    fn lower(fx: &mut KernelFunction, source: &str) -> String {
        let node = parse_stmt(source);
        let mut out = Vec::new();
        emit(&mut TestLowering, fx, &node, &mut out).unwrap();
        out.join("")
    }

    #[test]
    fn test_conditional_handler() {
        let mut fx = unit("function f() { return 1; }");
        assert_eq!(lower(&mut fx, "c ? 1 : 2;"), "(user_c?1:2);");
    }

    #[test]
    fn test_break_and_continue() {
        let mut fx = unit("function f() { return 1; }");
        assert_eq!(lower(&mut fx, "break;"), "break;");
        assert_eq!(lower(&mut fx, "continue;"), "continue;\n");
    }

    #[test]
    fn test_sequence_is_comma_joined() {
        let mut fx = unit("function f() { return 1; }");
        assert_eq!(lower(&mut fx, "a, b, c;"), "user_a,user_b,user_c;");
    }

    #[test]
    fn test_unary_and_update_prefix_rules() {
        let mut fx = unit("function f() { return 1; }");
        assert_eq!(lower(&mut fx, "-a;"), "-user_a;");
        assert_eq!(lower(&mut fx, "a++;"), "user_a++;");
        assert_eq!(lower(&mut fx, "++a;"), "++user_a;");
    }

    #[test]
    fn test_logical_handler() {
        let mut fx = unit("function f() { return 1; }");
        assert_eq!(lower(&mut fx, "a && b;"), "(user_a&&user_b);");
    }

    #[test]
    fn test_variable_declaration_lowering() {
        let mut fx = unit("function f() { return 1; }");
        assert_eq!(lower(&mut fx, "var x = 1;"), "float user_x=1;");
        let record = fx.declaration("x").unwrap();
        assert_eq!(record.ty, Ty::Number);
        assert!(record.is_safe);
    }

    #[test]
    fn test_trailing_declarators_are_unsafe() {
        let mut fx = unit("function f() { return 1; }");
        assert_eq!(lower(&mut fx, "var x = 1, y = 2;"), "float user_x=1,user_y=2;");
        assert!(fx.declaration("x").unwrap().is_safe);
        assert!(!fx.declaration("y").unwrap().is_safe);
        assert_eq!(fx.declaration("y").unwrap().ty, Ty::Number);
    }

    #[test]
    fn test_for_loop_init_coercion() {
        // With the state pushed, an integer-literal declaration is Integer.
        let mut fx = unit("function f() { return 1; }");
        fx.push_state(STATE_IN_FOR_LOOP_INIT);
        assert_eq!(lower(&mut fx, "var i = 0;"), "int user_i=0;");
        assert_eq!(fx.declaration("i").unwrap().ty, Ty::Integer);
        fx.pop_state(STATE_IN_FOR_LOOP_INIT).unwrap();

        // Without the state, the same initializer is Number.
        let mut fx = unit("function f() { return 1; }");
        assert_eq!(lower(&mut fx, "var i = 0;"), "float user_i=0;");
        assert_eq!(fx.declaration("i").unwrap().ty, Ty::Number);
    }

    #[test]
    fn test_missing_type_map_entry_is_fatal() {
        let mut fx = unit("function f() { return 1; }");
        let node = parse_stmt("var v = [1, 2];");
        let mut out = Vec::new();
        let err = emit(&mut TestLowering, &mut fx, &node, &mut out).unwrap_err();
        assert!(err.message.contains("not handled by the test type map"));
    }

    #[test]
    fn test_multiplied_initializer_is_unsafe() {
        let mut fx = unit("function f() { return 1; }");
        lower(&mut fx, "var x = 2 * 3;");
        assert!(!fx.declaration("x").unwrap().is_safe);
    }

    #[test]
    fn test_nested_function_hook() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<(String, Ty)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut fx = unit("function f() { function inner() { return 1.5; } return 1; }")
            .with_on_nested_function(move |text, ty| {
                sink.borrow_mut().push((text.to_string(), ty));
            });
        let ast = fx.ast().unwrap().clone();
        let mut out = Vec::new();
        // walk the body statements directly; the declaration statement
        // containing `inner` fires the hook
        if let Node::FunctionExpression { body, .. } = &ast.node {
            if let Node::Block(statements) = &body.node {
                for statement in statements {
                    emit(&mut TestLowering, &mut fx, statement, &mut out).unwrap();
                }
            }
        }
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("function inner()"));
        assert_eq!(seen[0].1, Ty::Number);
    }

    #[test]
    fn test_to_source_is_cached_and_idempotent() {
        let mut fx = unit("function f() { return 1; }");
        let first = fx.to_source(&mut TestLowering).unwrap();
        let second = fx.to_source(&mut TestLowering).unwrap();
        assert_eq!(first, second);
    }
}
