//! GLSL lowering — produces fragment-shader style source from the kernel
//! AST.
//!
//! Thread indices map to `threadId`, output dimensions to `uOutputDim`,
//! constants to `constants_<name>` uniforms. Array-typed values index with
//! an `int(...)` cast since user variables are lowered as floats.

use super::{emit, Lowering};
use crate::ast::{BinaryOp, Literal, MemberProperty, Node};
use crate::diagnostic::Diagnostic;
use crate::infer::math_callee_name;
use crate::kernel::{KernelFunction, STATE_IN_FOR_LOOP_INIT};
use crate::signature::Origin;
use crate::span::Spanned;
use crate::types::Ty;

pub struct GlslLowering;

impl GlslLowering {
    pub fn new() -> Self {
        Self
    }

    fn math_function(&self, name: &str) -> &'static str {
        match name {
            "abs" => "abs",
            "acos" => "acos",
            "asin" => "asin",
            "atan" | "atan2" => "atan",
            "ceil" => "ceil",
            "cos" => "cos",
            "exp" => "exp",
            "floor" => "floor",
            "log" => "log",
            "log2" => "log2",
            "max" => "max",
            "min" => "min",
            "pow" => "pow",
            "random" => "rand",
            "round" => "round",
            "sign" => "sign",
            "sin" => "sin",
            "sqrt" => "sqrt",
            "tan" => "tan",
            _ => "",
        }
    }

    fn math_constant(&self, name: &str) -> Option<&'static str> {
        let value = match name {
            "E" => "2.718281828459045",
            "PI" => "3.141592653589793",
            "SQRT2" => "1.4142135623730951",
            "SQRT1_2" => "0.7071067811865476",
            "LN2" => "0.6931471805599453",
            "LN10" => "2.302585092994046",
            "LOG2E" => "1.4426950408889634",
            "LOG10E" => "0.4342944819032518",
            _ => return None,
        };
        Some(value)
    }

    fn emit_indices(
        &mut self,
        fx: &mut KernelFunction,
        indices: &[&Spanned<Node>],
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        for index in indices {
            out.push("[int(".to_string());
            emit(self, fx, index, out)?;
            out.push(")]".to_string());
        }
        Ok(())
    }
}

impl Default for GlslLowering {
    fn default() -> Self {
        Self::new()
    }
}

impl Lowering for GlslLowering {
    fn target_name(&self) -> &'static str {
        "glsl"
    }

    fn type_map(&self, ty: Ty) -> Option<&'static str> {
        let lowered = match ty {
            Ty::Number | Ty::Float | Ty::LiteralInteger => "float",
            Ty::Integer => "int",
            Ty::Boolean => "bool",
            Ty::Array2 => "vec2",
            Ty::Array3 => "vec3",
            Ty::Array4 => "vec4",
            Ty::Array | Ty::Array2D | Ty::Array3D => "sampler2D",
            Ty::Input | Ty::NumberTexture | Ty::ArrayTexture4 => "sampler2D",
            Ty::HTMLImage => "sampler2D",
            Ty::HTMLImageArray => "sampler2DArray",
        };
        Some(lowered)
    }

    fn function_expression(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        let body = match &node.node {
            Node::FunctionExpression { body, .. } | Node::FunctionDeclaration { body, .. } => {
                body.clone()
            }
            _ => return Ok(()),
        };
        let return_type = fx
            .resolved_return_type()
            .map_err(|mut errors| errors.remove(0))?;
        let lowered_return = self.type_map(return_type).unwrap_or("float");

        let mut params = Vec::new();
        for i in 0..fx.argument_names.len() {
            let name = fx.argument_names[i].clone();
            let ty = fx.argument_type(&name).unwrap_or(Ty::Number);
            let lowered = match self.type_map(ty) {
                Some(lowered) => lowered,
                None => {
                    return Err(fx.ast_error(
                        format!("argument type '{}' is not handled by the glsl type map", ty),
                        node.span,
                    ))
                }
            };
            params.push(format!("{} user_{}", lowered, name));
        }

        out.push(format!(
            "{} {}({}) {{\n",
            lowered_return,
            fx.name,
            params.join(", ")
        ));
        emit(self, fx, &body, out)?;
        out.push("}\n".to_string());
        Ok(())
    }

    fn block(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Block(statements) = &node.node {
            for statement in statements {
                emit(self, fx, statement, out)?;
                out.push("\n".to_string());
            }
        }
        Ok(())
    }

    fn return_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Return(argument) = &node.node {
            match argument {
                Some(argument) => {
                    out.push("return ".to_string());
                    emit(self, fx, argument, out)?;
                    out.push(";".to_string());
                }
                None => out.push("return;".to_string()),
            }
        }
        Ok(())
    }

    fn literal(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Literal(literal) = &node.node {
            match literal {
                Literal::Number { value, integer } => {
                    // Integer literals stay integral in loop-init position,
                    // where declarations lower to `int`.
                    if *integer && fx.is_state(STATE_IN_FOR_LOOP_INIT) {
                        out.push(format!("{}", value));
                    } else if value.fract() == 0.0 && value.is_finite() {
                        out.push(format!("{:.1}", value));
                    } else {
                        out.push(format!("{}", value));
                    }
                }
                Literal::Boolean(value) => out.push(value.to_string()),
            }
        }
        Ok(())
    }

    fn identifier(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Identifier(name) = &node.node {
            if name == "Infinity" {
                // Preserved quirk: Infinity types as Integer upstream, but
                // lowers to the largest representable float.
                out.push("3.402823466e38".to_string());
            } else {
                out.push(format!("user_{}", name));
            }
        }
        let _ = fx;
        Ok(())
    }

    fn binary(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Binary { op, left, right } = &node.node {
            if *op == BinaryOp::Mod {
                out.push("mod(".to_string());
                emit(self, fx, left, out)?;
                out.push(", ".to_string());
                emit(self, fx, right, out)?;
                out.push(")".to_string());
                return Ok(());
            }
            // GLSL has no strict equality
            let op = match op {
                BinaryOp::StrictEq => "==",
                BinaryOp::StrictNotEq => "!=",
                other => other.as_str(),
            };
            out.push("(".to_string());
            emit(self, fx, left, out)?;
            out.push(op.to_string());
            emit(self, fx, right, out)?;
            out.push(")".to_string());
        }
        Ok(())
    }

    fn assignment(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Assignment { op, target, value } = &node.node {
            emit(self, fx, target, out)?;
            out.push(op.as_str().to_string());
            emit(self, fx, value, out)?;
        }
        Ok(())
    }

    fn if_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::If {
            test,
            consequent,
            alternate,
        } = &node.node
        {
            out.push("if (".to_string());
            emit(self, fx, test, out)?;
            out.push(") {\n".to_string());
            emit(self, fx, consequent, out)?;
            out.push("}".to_string());
            if let Some(alternate) = alternate {
                out.push(" else {\n".to_string());
                emit(self, fx, alternate, out)?;
                out.push("}".to_string());
            }
        }
        Ok(())
    }

    fn for_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::For {
            init,
            test,
            update,
            body,
        } = &node.node
        {
            // bounded loops guard against runaway iteration with a
            // collision-free internal counter
            let guard = fx
                .loop_max_iterations
                .map(|max| (fx.get_internal_variable_name("safeI"), max));
            if let Some((name, _)) = &guard {
                out.push(format!("int {}=0;\n", name));
            }
            out.push("for (".to_string());
            match init {
                Some(init) => {
                    fx.push_state(STATE_IN_FOR_LOOP_INIT);
                    let emitted = emit(self, fx, init, out);
                    fx.pop_state(STATE_IN_FOR_LOOP_INIT)?;
                    emitted?;
                    // variable declarations carry their own ';'
                    if !matches!(init.node, Node::VariableDeclaration { .. }) {
                        out.push(";".to_string());
                    }
                }
                None => out.push(";".to_string()),
            }
            if let Some(test) = test {
                emit(self, fx, test, out)?;
            }
            out.push(";".to_string());
            if let Some(update) = update {
                emit(self, fx, update, out)?;
            }
            out.push(") {\n".to_string());
            if let Some((name, max)) = &guard {
                out.push(format!("if ({}++>={}) break;\n", name, max));
            }
            emit(self, fx, body, out)?;
            out.push("}".to_string());
        }
        Ok(())
    }

    fn while_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::While { test, body } = &node.node {
            out.push("while (".to_string());
            emit(self, fx, test, out)?;
            out.push(") {\n".to_string());
            emit(self, fx, body, out)?;
            out.push("}".to_string());
        }
        Ok(())
    }

    fn do_while_statement(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::DoWhile { body, test } = &node.node {
            out.push("do {\n".to_string());
            emit(self, fx, body, out)?;
            out.push("} while (".to_string());
            emit(self, fx, test, out)?;
            out.push(");".to_string());
        }
        Ok(())
    }

    fn call(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Call { callee, arguments } = &node.node {
            let name = if let Some(math_name) = math_callee_name(callee) {
                let lowered = self.math_function(math_name);
                if lowered.is_empty() {
                    return Err(fx.ast_error(
                        format!("unknown math function 'Math.{}'", math_name),
                        node.span,
                    ));
                }
                lowered.to_string()
            } else if let Node::Identifier(name) = &callee.node {
                // record argument bindings for sub-kernel back-propagation
                fx.infer_type(node)?;
                name.clone()
            } else {
                return Err(fx.ast_error("unsupported call target", callee.span));
            };
            out.push(format!("{}(", name));
            for (i, argument) in arguments.iter().enumerate() {
                if i > 0 {
                    out.push(", ".to_string());
                }
                emit(self, fx, argument, out)?;
            }
            out.push(")".to_string());
        }
        Ok(())
    }

    fn member(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        // Math constants short-circuit without decomposition.
        if let Node::Member { object, property } = &node.node {
            if let (Node::Identifier(base), MemberProperty::Named(name)) = (&object.node, property)
            {
                if base == "Math" {
                    if let Some(value) = self.math_constant(&name.node) {
                        out.push(value.to_string());
                        return Ok(());
                    }
                }
            }
        }

        let detail = fx.member_detail(node)?;
        match detail.origin {
            Origin::Math => {
                return Err(fx.ast_error(
                    format!("'Math.{}' is not valid outside a call", detail.name),
                    node.span,
                ))
            }
            Origin::Constants => {
                out.push(format!("constants_{}", detail.name));
            }
            Origin::User => match detail.signature.as_str() {
                "this.thread.value" => {
                    out.push(format!("threadId.{}", detail.name));
                    return Ok(());
                }
                "this.output.value" => {
                    out.push(format!("uOutputDim.{}", detail.name));
                    return Ok(());
                }
                "value.value" => {
                    let component = match detail.property.as_deref() {
                        Some("r") => "x",
                        Some("g") => "y",
                        Some("b") => "z",
                        Some("a") => "w",
                        _ => {
                            return Err(fx.ast_error(
                                "unhandled member expression property",
                                node.span,
                            ))
                        }
                    };
                    out.push(format!("user_{}.{}", detail.name, component));
                    return Ok(());
                }
                "fn()[]" | "fn()[][]" | "fn()[][][]" => {
                    // re-emit the call, then the indices
                    let mut call = node;
                    while let Node::Member { object, .. } = &call.node {
                        call = &**object;
                    }
                    let call = call.clone();
                    emit(self, fx, &call, out)?;
                }
                _ => {
                    out.push(format!("user_{}", detail.name));
                }
            },
        }

        let indices: Vec<&Spanned<Node>> = [detail.z_property, detail.y_property, detail.x_property]
            .into_iter()
            .flatten()
            .collect();
        self.emit_indices(fx, &indices, out)
    }

    fn array(
        &mut self,
        fx: &mut KernelFunction,
        node: &Spanned<Node>,
        out: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if let Node::Array(elements) = &node.node {
            out.push(format!("vec{}(", elements.len()));
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push(", ".to_string());
                }
                emit(self, fx, element, out)?;
            }
            out.push(")".to_string());
        }
        Ok(())
    }
}
