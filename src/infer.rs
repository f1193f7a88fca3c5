//! Type oracle and dependency analysis over the untyped AST.
//!
//! `infer_type` gives total coverage of the supported subset: `Ok(None)`
//! is the soft unknown (callers decide whether to escalate), `Err` is a
//! fatal shape error carrying the source location.

use crate::ast::{BinaryOp, Literal, MemberProperty, Node};
use crate::diagnostic::Diagnostic;
use crate::kernel::{Dependency, DependencyOrigin, KernelFunction};
use crate::signature::signature_of;
use crate::span::Spanned;
use crate::types::Ty;

/// The recognized math intrinsics, rooted at the `Math` identifier.
pub const MATH_FUNCTIONS: [&str; 20] = [
    "abs", "acos", "asin", "atan", "atan2", "ceil", "cos", "exp", "floor", "log", "log2", "max",
    "min", "pow", "random", "round", "sign", "sin", "sqrt", "tan",
];

/// Intrinsics whose result is an `Integer` rather than a `Number`.
pub const MATH_INTEGER_FUNCTIONS: [&str; 3] = ["ceil", "floor", "round"];

/// The recognized math constants.
pub const MATH_CONSTANTS: [&str; 8] = [
    "E", "PI", "SQRT2", "SQRT1_2", "LN2", "LN10", "LOG2E", "LOG10E",
];

/// If `callee` is a `Math.<name>` member, return the property name.
pub fn math_callee_name(callee: &Spanned<Node>) -> Option<&str> {
    if let Node::Member { object, property } = &callee.node {
        if let (Node::Identifier(base), MemberProperty::Named(name)) = (&object.node, property) {
            if base == "Math" {
                return Some(&name.node);
            }
        }
    }
    None
}

fn math_function_type(name: &str) -> Option<Ty> {
    if MATH_INTEGER_FUNCTIONS.contains(&name) {
        Some(Ty::Integer)
    } else if MATH_FUNCTIONS.contains(&name) {
        Some(Ty::Number)
    } else {
        None
    }
}

impl KernelFunction {
    /// The semantic type of `node`, or `Ok(None)` when an identifier cannot
    /// be resolved.
    pub fn infer_type(&mut self, node: &Spanned<Node>) -> Result<Option<Ty>, Diagnostic> {
        match &node.node {
            Node::Array(elements) => match elements.len() {
                2 => Ok(Some(Ty::Array2)),
                3 => Ok(Some(Ty::Array3)),
                4 => Ok(Some(Ty::Array4)),
                n => Err(self.ast_error(
                    format!("unsupported array literal length {}", n),
                    node.span,
                )),
            },
            Node::Literal(Literal::Number { integer, .. }) => {
                if *integer {
                    Ok(Some(Ty::LiteralInteger))
                } else {
                    Ok(Some(Ty::Number))
                }
            }
            Node::Literal(Literal::Boolean(_)) => Ok(Some(Ty::Boolean)),
            Node::Call { callee, arguments } => {
                if let Some(name) = math_callee_name(callee) {
                    return match math_function_type(name) {
                        Some(ty) => Ok(Some(ty)),
                        None => Err(self.ast_error(
                            format!("unknown math function 'Math.{}'", name),
                            node.span,
                        )),
                    };
                }
                if let Node::Identifier(name) = &callee.node {
                    let name = name.clone();
                    let mut types = Vec::with_capacity(arguments.len());
                    for argument in arguments {
                        types.push(self.infer_type(argument)?);
                    }
                    self.record_call_arguments(&name, types);
                    return Ok(self.lookup_return_type(&name));
                }
                Err(self.ast_error("unsupported call target", callee.span))
            }
            Node::Binary { op, left, .. } => match op {
                BinaryOp::Mod => Ok(Some(Ty::Number)),
                BinaryOp::Lt | BinaryOp::Gt => Ok(Some(Ty::Boolean)),
                _ => {
                    let left_ty = self.infer_type(left)?;
                    Ok(left_ty.map(|ty| ty.index_once().unwrap_or(ty)))
                }
            },
            Node::Logical { .. } => Ok(Some(Ty::Boolean)),
            Node::Unary { argument, .. } | Node::Update { argument, .. } => {
                self.infer_type(argument)
            }
            Node::VariableDeclaration { declarations, .. } => match declarations.last() {
                Some(declaration) => self.infer_type(declaration),
                None => Ok(None),
            },
            Node::VariableDeclarator { init, .. } => match init {
                Some(init) => self.infer_type(init),
                None => Ok(None),
            },
            Node::Return(argument) => match argument {
                Some(argument) => self.infer_type(argument),
                None => Ok(None),
            },
            Node::FunctionDeclaration { body, .. } | Node::FunctionExpression { body, .. } => {
                self.infer_type(body)
            }
            Node::Block(statements) => match statements.last() {
                Some(statement) => self.infer_type(statement),
                None => Ok(None),
            },
            Node::ExpressionStatement(expression) => self.infer_type(expression),
            Node::Identifier(name) => {
                if name == "Infinity" {
                    Ok(Some(Ty::Integer))
                } else if self.is_argument(name) {
                    let name = name.clone();
                    Ok(self.argument_type(&name))
                } else if let Some(declaration) = self.declaration(name) {
                    Ok(Some(declaration.ty))
                } else {
                    Ok(None)
                }
            }
            Node::Conditional { consequent, .. } => self.infer_type(consequent),
            Node::Assignment { value, .. } => self.infer_type(value),
            Node::Sequence(expressions) => match expressions.last() {
                Some(expression) => self.infer_type(expression),
                None => Ok(None),
            },
            Node::Member { .. } => self.member_type(node),
            Node::This
            | Node::Empty
            | Node::Break
            | Node::Continue
            | Node::Debugger
            | Node::If { .. }
            | Node::For { .. }
            | Node::While { .. }
            | Node::DoWhile { .. } => Ok(None),
        }
    }

    fn member_type(&mut self, node: &Spanned<Node>) -> Result<Option<Ty>, Diagnostic> {
        // `Math.PI` and friends, plus bare intrinsic references.
        if let Node::Member { object, property } = &node.node {
            if let (Node::Identifier(base), MemberProperty::Named(name)) = (&object.node, property)
            {
                if base == "Math" {
                    if MATH_CONSTANTS.contains(&name.node.as_str()) {
                        return Ok(Some(Ty::Number));
                    }
                    if let Some(ty) = math_function_type(&name.node) {
                        return Ok(Some(ty));
                    }
                    return Err(self.ast_error(
                        format!("unknown math property 'Math.{}'", name.node),
                        node.span,
                    ));
                }
            }
        }

        let signature = match signature_of(node) {
            Some(signature) => signature,
            None => {
                return Err(self.ast_error("unhandled member expression signature", node.span))
            }
        };

        let (base, depth) = strip_computed(node);
        match signature.as_str() {
            "value[]" | "value[][]" | "value[][][]" => {
                let name = match &base.node {
                    Node::Identifier(name) => name.clone(),
                    _ => return Err(self.ast_error("expected identifier base", base.span)),
                };
                let ty = if self.is_argument(&name) {
                    self.argument_type(&name)
                } else {
                    self.declaration(&name).map(|d| d.ty)
                };
                Ok(ty.map(|ty| peel(ty, depth)))
            }
            "value.value" => {
                let (object, property) = match &base.node {
                    Node::Member { object, property } => (object, property),
                    _ => return Err(self.ast_error("expected member base", base.span)),
                };
                let channel = match property {
                    MemberProperty::Named(name) => name.node.as_str(),
                    MemberProperty::Computed(_) => unreachable!("signature is 'value.value'"),
                };
                if !crate::signature::COLOR_CHANNELS.contains(&channel) {
                    return Err(self.ast_error(
                        format!("unhandled member expression property '{}'", channel),
                        node.span,
                    ));
                }
                let object = object.clone();
                let ty = self.infer_type(&object)?;
                Ok(ty.map(|ty| peel(ty, 1)))
            }
            "this.thread.value" | "this.output.value" => Ok(Some(Ty::Integer)),
            "this.constants.value"
            | "this.constants.value[]"
            | "this.constants.value[][]"
            | "this.constants.value[][][]" => {
                let name = match &base.node {
                    Node::Member {
                        property: MemberProperty::Named(name),
                        ..
                    } => name.node.clone(),
                    _ => return Err(self.ast_error("expected constant name", base.span)),
                };
                let ty = match self.constant_types.get(&name) {
                    Some(ty) => ty.normalized_constant(),
                    None => {
                        return Err(self.ast_error(
                            format!("constant '{}' has no registered type", name),
                            node.span,
                        ))
                    }
                };
                Ok(Some(peel(ty, depth)))
            }
            "fn()[]" | "fn()[][]" | "fn()[][][]" => {
                let call = base.clone();
                let ty = self.infer_type(&call)?;
                Ok(ty.map(|ty| peel(ty, depth)))
            }
            other => Err(self.ast_error(
                format!("unhandled member expression signature '{}'", other),
                node.span,
            )),
        }
    }

    /// Collect the dependency records of `node` into `out`.
    ///
    /// `is_not_safe` is the contextual clobber: enclosing `*` or `/`
    /// forces literal contributors to unsafe.
    pub fn dependencies(
        &mut self,
        node: &Spanned<Node>,
        out: &mut Vec<Dependency>,
        is_not_safe: bool,
    ) -> Result<(), Diagnostic> {
        match &node.node {
            Node::Literal(Literal::Number { value, .. }) => {
                out.push(Dependency {
                    origin: DependencyOrigin::Literal,
                    name: None,
                    is_safe: !is_not_safe && value.is_finite(),
                });
            }
            Node::Literal(Literal::Boolean(_)) => {
                out.push(Dependency {
                    origin: DependencyOrigin::Literal,
                    name: None,
                    is_safe: !is_not_safe,
                });
            }
            Node::Identifier(name) => {
                if let Some(declaration) = self.declaration(name) {
                    out.push(Dependency {
                        origin: DependencyOrigin::Declaration,
                        name: Some(name.clone()),
                        is_safe: !is_not_safe && declaration.is_safe,
                    });
                } else if self.is_argument(name) {
                    out.push(Dependency {
                        origin: DependencyOrigin::Argument,
                        name: Some(name.clone()),
                        is_safe: false,
                    });
                }
            }
            Node::Binary { op, left, right } => {
                let child_flag = matches!(op, BinaryOp::Mul | BinaryOp::Div);
                self.dependencies(left, out, child_flag)?;
                self.dependencies(right, out, child_flag)?;
            }
            Node::Logical { left, right, .. } => {
                self.dependencies(left, out, is_not_safe)?;
                self.dependencies(right, out, is_not_safe)?;
            }
            Node::Unary { argument, .. } | Node::Update { argument, .. } => {
                self.dependencies(argument, out, is_not_safe)?;
            }
            Node::Call { callee, .. } => {
                let name = match &callee.node {
                    Node::Identifier(name) => Some(name.clone()),
                    _ => math_callee_name(callee).map(str::to_string),
                };
                // Call interiors are not introspected; the result is safe.
                out.push(Dependency {
                    origin: DependencyOrigin::Function,
                    name,
                    is_safe: true,
                });
            }
            Node::Array(_) => {
                out.push(Dependency {
                    origin: DependencyOrigin::ArrayLiteral,
                    name: None,
                    is_safe: true,
                });
            }
            Node::VariableDeclarator { init, .. } => {
                if let Some(init) = init {
                    self.dependencies(init, out, is_not_safe)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// The unit's return type: the configured one, else inferred from the
    /// function body (`LiteralInteger` promotes to `Number`), defaulting to
    /// `Number`. Memoized.
    pub fn resolved_return_type(&mut self) -> Result<Ty, Vec<Diagnostic>> {
        if let Some(ty) = self.return_type {
            return Ok(ty);
        }
        let ast = self.ast()?.clone();
        let ty = self.infer_type(&ast).map_err(|d| vec![d])?;
        let ty = match ty {
            Some(Ty::LiteralInteger) | None => Ty::Number,
            Some(ty) => ty,
        };
        self.return_type = Some(ty);
        Ok(ty)
    }
}

/// Apply `depth` levels of the type-lookup map. Types the map does not
/// cover stay themselves, so scalar collapse saturates.
fn peel(ty: Ty, depth: usize) -> Ty {
    let mut ty = ty;
    for _ in 0..depth {
        ty = ty.index_once().unwrap_or(ty);
    }
    ty
}

/// Walk computed accesses inward, returning the innermost non-computed node
/// and the number of brackets stripped.
fn strip_computed(node: &Spanned<Node>) -> (&Spanned<Node>, usize) {
    let mut current = node;
    let mut depth = 0;
    while let Node::Member {
        object,
        property: MemberProperty::Computed(_),
    } = &current.node
    {
        depth += 1;
        current = &**object;
    }
    (current, depth)
}

/// True when every dependency is safe.
pub fn is_safe_dependencies(dependencies: &[Dependency]) -> bool {
    dependencies.iter().all(|d| d.is_safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelSettings, STATE_IN_FOR_LOOP_INIT};

    fn unit(source: &str, argument_types: Vec<Ty>) -> KernelFunction {
        KernelFunction::new(
            source,
            KernelSettings {
                argument_types,
                ..Default::default()
            },
        )
        .unwrap()
    }

    /// The expression of the first `return` statement in the body.
    fn return_expr(fx: &mut KernelFunction) -> Spanned<Node> {
        let ast = fx.ast().unwrap().clone();
        let body = match &ast.node {
            Node::FunctionExpression { body, .. } => body,
            other => panic!("expected function, got {}", other.kind_name()),
        };
        let statements = match &body.node {
            Node::Block(statements) => statements,
            other => panic!("expected block, got {}", other.kind_name()),
        };
        for statement in statements {
            if let Node::Return(Some(argument)) = &statement.node {
                return (**argument).clone();
            }
        }
        panic!("no return statement");
    }

    fn type_of_return(source: &str, argument_types: Vec<Ty>) -> Option<Ty> {
        let mut fx = unit(source, argument_types);
        let expr = return_expr(&mut fx);
        fx.infer_type(&expr).unwrap()
    }

    #[test]
    fn test_math_sets_are_exact() {
        assert_eq!(MATH_FUNCTIONS.len(), 20);
        assert_eq!(MATH_CONSTANTS.len(), 8);
        for name in MATH_INTEGER_FUNCTIONS {
            assert!(MATH_FUNCTIONS.contains(&name));
        }
        assert!(!MATH_FUNCTIONS.contains(&"clamp"));
        assert!(!MATH_FUNCTIONS.contains(&"hypot"));
        assert!(MATH_CONSTANTS.contains(&"SQRT1_2"));
        assert!(MATH_CONSTANTS.contains(&"LOG10E"));
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(
            type_of_return("function f() { return 1; }", vec![]),
            Some(Ty::LiteralInteger)
        );
        assert_eq!(
            type_of_return("function f() { return 1.5; }", vec![]),
            Some(Ty::Number)
        );
        assert_eq!(
            type_of_return("function f() { return true; }", vec![]),
            Some(Ty::Boolean)
        );
    }

    #[test]
    fn test_typed_argument() {
        assert_eq!(
            type_of_return("function f(a) { return a; }", vec![Ty::Array4]),
            Some(Ty::Array4)
        );
    }

    #[test]
    fn test_indexed_argument() {
        assert_eq!(
            type_of_return("function f(a) { return a[0]; }", vec![Ty::Array]),
            Some(Ty::Number)
        );
    }

    #[test]
    fn test_double_indexed_image() {
        // HTMLImage peels to Array(4), then to Number
        assert_eq!(
            type_of_return("function f(img) { return img[0][1]; }", vec![Ty::HTMLImage]),
            Some(Ty::Number)
        );
    }

    #[test]
    fn test_this_thread_is_integer() {
        assert_eq!(
            type_of_return("function f() { return this.thread.x; }", vec![]),
            Some(Ty::Integer)
        );
        assert_eq!(
            type_of_return("function f() { return this.output.y; }", vec![]),
            Some(Ty::Integer)
        );
    }

    #[test]
    fn test_math_intrinsics() {
        assert_eq!(
            type_of_return("function f() { return Math.floor(1.5); }", vec![]),
            Some(Ty::Integer)
        );
        assert_eq!(
            type_of_return("function f() { return Math.sin(1.5); }", vec![]),
            Some(Ty::Number)
        );
        assert_eq!(
            type_of_return("function f() { return Math.PI; }", vec![]),
            Some(Ty::Number)
        );
    }

    #[test]
    fn test_unknown_math_function_is_fatal() {
        let mut fx = unit("function f() { return Math.clamp(1, 2, 3); }", vec![]);
        let expr = return_expr(&mut fx);
        let err = fx.infer_type(&expr).unwrap_err();
        assert!(err.message.contains("unknown math function"));
        assert!(err.line.is_some(), "textual units carry a location");
    }

    #[test]
    fn test_binary_rules() {
        assert_eq!(
            type_of_return("function f(a) { return a % 2; }", vec![Ty::Number]),
            Some(Ty::Number)
        );
        assert_eq!(
            type_of_return("function f(a) { return a < 2; }", vec![Ty::Number]),
            Some(Ty::Boolean)
        );
        // projection of the left operand's type through the lookup map
        assert_eq!(
            type_of_return("function f(a) { return a + a; }", vec![Ty::Array]),
            Some(Ty::Number)
        );
        // falls back to the left type itself for scalars
        assert_eq!(
            type_of_return("function f(a) { return a + 1; }", vec![Ty::Number]),
            Some(Ty::Number)
        );
    }

    #[test]
    fn test_infinity_is_integer() {
        assert_eq!(
            type_of_return("function f() { return Infinity; }", vec![]),
            Some(Ty::Integer)
        );
    }

    #[test]
    fn test_conditional_takes_consequent() {
        assert_eq!(
            type_of_return("function f(a) { return a > 0 ? 1.5 : 2; }", vec![Ty::Number]),
            Some(Ty::Number)
        );
    }

    #[test]
    fn test_array_expression_type() {
        assert_eq!(
            type_of_return("function f() { return [1, 2, 3]; }", vec![]),
            Some(Ty::Array3)
        );
    }

    #[test]
    fn test_constant_types() {
        let mut fx = KernelFunction::new(
            "function f() { return this.constants.size; }",
            KernelSettings {
                constant_types: [("size".to_string(), Ty::Float)].into_iter().collect(),
                ..Default::default()
            },
        )
        .unwrap();
        let expr = return_expr(&mut fx);
        // Float normalizes to Number through the constant oracle
        assert_eq!(fx.infer_type(&expr).unwrap(), Some(Ty::Number));
    }

    #[test]
    fn test_constant_without_type_is_fatal() {
        let mut fx = unit("function f() { return this.constants.missing; }", vec![]);
        let expr = return_expr(&mut fx);
        let err = fx.infer_type(&expr).unwrap_err();
        assert!(err.message.contains("no registered type"));
    }

    #[test]
    fn test_indexed_constant() {
        let mut fx = KernelFunction::new(
            "function f() { return this.constants.lut[0]; }",
            KernelSettings {
                constant_types: [("lut".to_string(), Ty::Array)].into_iter().collect(),
                ..Default::default()
            },
        )
        .unwrap();
        let expr = return_expr(&mut fx);
        assert_eq!(fx.infer_type(&expr).unwrap(), Some(Ty::Number));
    }

    #[test]
    fn test_call_result_indexing() {
        let mut fx = KernelFunction::new(
            "function f() { return palette(0)[1]; }",
            KernelSettings::default(),
        )
        .unwrap()
        .with_lookup_return_type(|name| (name == "palette").then_some(Ty::Array4));
        let expr = return_expr(&mut fx);
        assert_eq!(fx.infer_type(&expr).unwrap(), Some(Ty::Number));
    }

    #[test]
    fn test_channel_access_peels_once() {
        let mut fx = unit("function f(v) { return v.r; }", vec![Ty::Array4]);
        let expr = return_expr(&mut fx);
        assert_eq!(fx.infer_type(&expr).unwrap(), Some(Ty::Number));
    }

    #[test]
    fn test_unhandled_member_shape_is_fatal() {
        let mut fx = unit("function f(v) { return v.lo.hi; }", vec![Ty::Array4]);
        let expr = return_expr(&mut fx);
        assert!(fx.infer_type(&expr).is_err());
    }

    #[test]
    fn test_call_argument_recording() {
        let mut fx = unit("function f(a) { return helper(a, 1); }", vec![Ty::Array2]);
        let expr = return_expr(&mut fx);
        let _ = fx.infer_type(&expr).unwrap();
        let bindings = fx.called_function_arguments.get("helper").unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0][0], Some(Ty::Array2));
        assert_eq!(bindings[0][1], Some(Ty::LiteralInteger));
    }

    #[test]
    fn test_resolved_return_type_promotes_literal() {
        let mut fx = unit("function f() { return 1; }", vec![]);
        assert_eq!(fx.resolved_return_type().unwrap(), Ty::Number);
    }

    #[test]
    fn test_resolved_return_type_configured() {
        let mut fx = KernelFunction::new(
            "function f() { return 1; }",
            KernelSettings {
                return_type: Some(Ty::Integer),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(fx.resolved_return_type().unwrap(), Ty::Integer);
    }

    // --- Dependency / safety tests ---

    fn deps_of_return(source: &str, argument_types: Vec<Ty>) -> Vec<Dependency> {
        let mut fx = unit(source, argument_types);
        let expr = return_expr(&mut fx);
        let mut out = Vec::new();
        fx.dependencies(&expr, &mut out, false).unwrap();
        out
    }

    #[test]
    fn test_literal_dependency_is_safe() {
        let deps = deps_of_return("function f() { return 1 + 2; }", vec![]);
        assert_eq!(deps.len(), 2);
        assert!(is_safe_dependencies(&deps));
    }

    #[test]
    fn test_argument_dependency_is_unsafe() {
        let deps = deps_of_return("function f(a) { return a + 1; }", vec![Ty::Number]);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].origin, DependencyOrigin::Argument);
        assert!(!deps[0].is_safe);
        assert!(deps[1].is_safe);
    }

    #[test]
    fn test_multiplication_clobbers_safety() {
        let deps = deps_of_return("function f() { return 2 * 3; }", vec![]);
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| !d.is_safe));
        let deps = deps_of_return("function f() { return 2 / 3; }", vec![]);
        assert!(deps.iter().all(|d| !d.is_safe));
        let deps = deps_of_return("function f() { return 2 + 3; }", vec![]);
        assert!(deps.iter().all(|d| d.is_safe));
    }

    #[test]
    fn test_call_and_array_dependencies_are_safe() {
        let deps = deps_of_return("function f() { return helper(1); }", vec![]);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].origin, DependencyOrigin::Function);
        assert!(deps[0].is_safe);

        let deps = deps_of_return("function f() { return [1, 2]; }", vec![]);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].origin, DependencyOrigin::ArrayLiteral);
        assert!(deps[0].is_safe);
    }

    #[test]
    fn test_declaration_safety_is_transitive() {
        use crate::kernel::DeclarationRecord;
        let mut fx = unit("function f() { return x; }", vec![]);
        fx.declare(
            "x",
            DeclarationRecord {
                ty: Ty::Number,
                dependencies: vec![Dependency {
                    origin: DependencyOrigin::Argument,
                    name: Some("a".to_string()),
                    is_safe: false,
                }],
                is_safe: false,
            },
        );
        let expr = return_expr(&mut fx);
        let mut out = Vec::new();
        fx.dependencies(&expr, &mut out, false).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].origin, DependencyOrigin::Declaration);
        assert!(!out[0].is_safe);
    }

    #[test]
    fn test_multiplication_clobbers_safe_declarations() {
        use crate::kernel::DeclarationRecord;
        let mut fx = unit("function f() { return x * 2; }", vec![]);
        fx.declare(
            "x",
            DeclarationRecord {
                ty: Ty::Number,
                dependencies: vec![Dependency {
                    origin: DependencyOrigin::Literal,
                    name: None,
                    is_safe: true,
                }],
                is_safe: true,
            },
        );
        let expr = return_expr(&mut fx);
        let mut out = Vec::new();
        fx.dependencies(&expr, &mut out, false).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].origin, DependencyOrigin::Declaration);
        // the enclosing `*` clobbers the declaration's recorded safety
        assert!(!out[0].is_safe);
        assert!(!out[1].is_safe);
    }

    #[test]
    fn test_for_loop_state_is_tracked() {
        // The oracle itself reports the literal; the walker's declaration
        // handler applies the in-for-loop-init coercion.
        let mut fx = unit("function f() { return 0; }", vec![]);
        fx.push_state(STATE_IN_FOR_LOOP_INIT);
        assert!(fx.is_state(STATE_IN_FOR_LOOP_INIT));
        fx.pop_state(STATE_IN_FOR_LOOP_INIT).unwrap();
    }
}
