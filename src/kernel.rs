use std::collections::HashMap;

use crate::ast::Node;
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::span::{Span, Spanned};
use crate::types::Ty;

/// Traversal-state label recognized by the type oracle: forces an
/// `Integer` reading of loop-init declarations.
pub const STATE_IN_FOR_LOOP_INIT: &str = "in-for-loop-init";

/// A host-supplied constant value. The transpiler types constants through
/// the parallel `constant_types` table; values are carried for emission
/// and serialization.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Number(f64),
    Array(Vec<f64>),
}

/// Kernel input: source text, or a pre-built AST accepted verbatim.
#[derive(Clone, Debug)]
pub enum KernelSource {
    Text(String),
    Ast(Spanned<Node>),
}

impl From<&str> for KernelSource {
    fn from(s: &str) -> Self {
        KernelSource::Text(s.to_string())
    }
}

impl From<String> for KernelSource {
    fn from(s: String) -> Self {
        KernelSource::Text(s)
    }
}

impl From<Spanned<Node>> for KernelSource {
    fn from(ast: Spanned<Node>) -> Self {
        KernelSource::Ast(ast)
    }
}

/// Where a value feeding a declaration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependencyOrigin {
    Literal,
    Declaration,
    Argument,
    Function,
    ArrayLiteral,
}

/// One contributor to a declared value.
///
/// A literal is safe iff finite; arguments are always unsafe (their values
/// originate from the host); declaration safety is transitive; call results
/// and array literals are safe. Enclosing `*` or `/` clobbers safety.
#[derive(Clone, Debug)]
pub struct Dependency {
    pub origin: DependencyOrigin,
    pub name: Option<String>,
    pub is_safe: bool,
}

/// A typed, dependency-tagged local declaration. Immutable once recorded.
#[derive(Clone, Debug)]
pub struct DeclarationRecord {
    pub ty: Ty,
    pub dependencies: Vec<Dependency>,
    pub is_safe: bool,
}

/// Construction settings. Every field has a default; `output` defaults to a
/// single-element shape so that sub-kernels need not name one.
#[derive(Clone, Debug)]
pub struct KernelSettings {
    pub name: Option<String>,
    pub is_root_kernel: bool,
    pub is_sub_kernel: bool,
    pub debug: bool,
    pub constants: HashMap<String, ConstantValue>,
    pub constant_types: HashMap<String, Ty>,
    /// Overrides name scanning; required when the source is a pre-built AST
    /// with arguments.
    pub argument_names: Option<Vec<String>>,
    pub argument_types: Vec<Ty>,
    pub argument_sizes: Vec<Option<Vec<usize>>>,
    pub output: Vec<usize>,
    pub loop_max_iterations: Option<u32>,
    pub return_type: Option<Ty>,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            name: None,
            is_root_kernel: false,
            is_sub_kernel: false,
            debug: false,
            constants: HashMap::new(),
            constant_types: HashMap::new(),
            argument_names: None,
            argument_types: Vec::new(),
            argument_sizes: Vec::new(),
            output: vec![1],
            loop_max_iterations: None,
            return_type: None,
        }
    }
}

type LookupReturnType = Box<dyn Fn(&str) -> Option<Ty>>;
type OnNestedFunction = Box<dyn FnMut(&str, Ty)>;

/// One function being transpiled: the root kernel or a sub-kernel.
///
/// Owns the declaration table, the traversal-state stack, and the internal
/// variable-name counter. Once the lowered source has been produced the
/// instance is logically immutable.
impl std::fmt::Debug for KernelFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelFunction")
            .field("name", &self.name)
            .field("is_root_kernel", &self.is_root_kernel)
            .field("is_sub_kernel", &self.is_sub_kernel)
            .field("debug", &self.debug)
            .field("argument_names", &self.argument_names)
            .field("argument_types", &self.argument_types)
            .field("argument_sizes", &self.argument_sizes)
            .field("constants", &self.constants)
            .field("constant_types", &self.constant_types)
            .field("output", &self.output)
            .field("loop_max_iterations", &self.loop_max_iterations)
            .field("return_type", &self.return_type)
            .field("declarations", &self.declarations)
            .field("states", &self.states)
            .field("internal_name_counts", &self.internal_name_counts)
            .field(
                "called_function_arguments",
                &self.called_function_arguments,
            )
            .field("parent_call_bindings", &self.parent_call_bindings)
            .field("ast", &self.ast)
            .field("cached_source", &self.cached_source)
            .finish()
    }
}

pub struct KernelFunction {
    source: KernelSource,
    /// The text actually handed to the parser (the synthetic
    /// `const parser_<name> = ...;` binding). Spans and located
    /// diagnostics are relative to this text.
    parse_source: Option<String>,
    pub name: String,
    pub is_root_kernel: bool,
    pub is_sub_kernel: bool,
    pub debug: bool,
    pub argument_names: Vec<String>,
    argument_types: Vec<Option<Ty>>,
    pub argument_sizes: Vec<Option<Vec<usize>>>,
    pub constants: HashMap<String, ConstantValue>,
    pub constant_types: HashMap<String, Ty>,
    pub output: Vec<usize>,
    pub loop_max_iterations: Option<u32>,
    pub(crate) return_type: Option<Ty>,
    pub(crate) declarations: HashMap<String, DeclarationRecord>,
    states: Vec<String>,
    internal_name_counts: HashMap<String, u32>,
    /// Per-call argument bindings recorded while walking this unit's call
    /// expressions, keyed by callee name. Sub-kernels read this through
    /// `with_parent`.
    pub(crate) called_function_arguments: HashMap<String, Vec<Vec<Option<Ty>>>>,
    /// Snapshot of the parent's bindings for this unit's name.
    parent_call_bindings: Vec<Vec<Option<Ty>>>,
    lookup_return_type: Option<LookupReturnType>,
    on_nested_function: Option<OnNestedFunction>,
    ast: Option<Spanned<Node>>,
    pub(crate) cached_source: Option<String>,
}

impl KernelFunction {
    pub fn new(
        source: impl Into<KernelSource>,
        settings: KernelSettings,
    ) -> Result<Self, Diagnostic> {
        let source = source.into();

        if let KernelSource::Text(text) = &source {
            if !looks_like_function(text) {
                return Err(Diagnostic::error(format!(
                    "source is not a recognizable function: '{}'",
                    text.trim().chars().take(40).collect::<String>()
                )));
            }
        }

        let name = if settings.is_root_kernel {
            "kernel".to_string()
        } else if let Some(name) = settings.name {
            name
        } else {
            match &source {
                KernelSource::Text(text) => extract_function_name(text).unwrap_or_default(),
                KernelSource::Ast(ast) => ast_function_name(ast).unwrap_or_default(),
            }
        };
        if name.is_empty() {
            return Err(Diagnostic::error("kernel function name is missing".to_string()));
        }

        let argument_names = if let Some(names) = settings.argument_names {
            names
        } else {
            match &source {
                KernelSource::Text(text) => extract_argument_names(text),
                KernelSource::Ast(ast) => ast_argument_names(ast),
            }
        };

        if !settings.argument_types.is_empty()
            && settings.argument_types.len() != argument_names.len()
        {
            return Err(Diagnostic::error(format!(
                "function '{}' has {} arguments but {} argument types were supplied",
                name,
                argument_names.len(),
                settings.argument_types.len()
            )));
        }

        if settings.output.is_empty() {
            return Err(Diagnostic::error(format!(
                "function '{}' has an empty output shape",
                name
            )));
        }

        let mut argument_types: Vec<Option<Ty>> =
            settings.argument_types.into_iter().map(Some).collect();
        argument_types.resize(argument_names.len(), None);

        let mut argument_sizes = settings.argument_sizes;
        argument_sizes.resize(argument_names.len(), None);

        Ok(Self {
            source,
            parse_source: None,
            name,
            is_root_kernel: settings.is_root_kernel,
            is_sub_kernel: settings.is_sub_kernel,
            debug: settings.debug,
            argument_names,
            argument_types,
            argument_sizes,
            constants: settings.constants,
            constant_types: settings.constant_types,
            output: settings.output,
            loop_max_iterations: settings.loop_max_iterations,
            return_type: settings.return_type,
            declarations: HashMap::new(),
            states: Vec::new(),
            internal_name_counts: HashMap::new(),
            called_function_arguments: HashMap::new(),
            parent_call_bindings: Vec::new(),
            lookup_return_type: None,
            on_nested_function: None,
            ast: None,
            cached_source: None,
        })
    }

    /// Snapshot the parent's call-binding table for this unit's name, so
    /// unresolved argument types can be back-propagated (§ argument_type).
    pub fn with_parent(mut self, parent: &KernelFunction) -> Self {
        if let Some(bindings) = parent.called_function_arguments.get(&self.name) {
            self.parent_call_bindings = bindings.clone();
        }
        self
    }

    pub fn with_lookup_return_type(
        mut self,
        lookup: impl Fn(&str) -> Option<Ty> + 'static,
    ) -> Self {
        self.lookup_return_type = Some(Box::new(lookup));
        self
    }

    pub fn with_on_nested_function(mut self, hook: impl FnMut(&str, Ty) + 'static) -> Self {
        self.on_nested_function = Some(Box::new(hook));
        self
    }

    // --- AST construction ---

    /// The parsed function AST. Text sources are wrapped in a synthetic
    /// binding (`const parser_<name> = <source>;`) and the function
    /// expression is extracted from its initializer; pre-built ASTs are
    /// returned verbatim. Cached after the first call.
    pub fn ast(&mut self) -> Result<&Spanned<Node>, Vec<Diagnostic>> {
        if self.ast.is_none() {
            let ast = match &self.source {
                KernelSource::Ast(ast) => ast.clone(),
                KernelSource::Text(text) => {
                    let wrapped = format!("const parser_{} = {};", self.name, text);
                    // stored up front so failed parses can still render
                    // located diagnostics
                    self.parse_source = Some(wrapped);
                    let wrapped = self.parse_source.as_deref().unwrap();
                    let (tokens, lex_errors) = Lexer::new(wrapped).tokenize();
                    if !lex_errors.is_empty() {
                        return Err(lex_errors);
                    }
                    let statements = Parser::new(tokens).parse_program()?;
                    extract_parsed_function(statements).ok_or_else(|| {
                        vec![Diagnostic::error(format!(
                            "could not parse '{}' as a function",
                            self.name
                        ))]
                    })?
                }
            };
            self.ast = Some(ast);
        }
        Ok(self.ast.as_ref().unwrap())
    }

    /// The text spans refer to, when the unit was built from text.
    pub fn source_text(&self) -> Option<&str> {
        self.parse_source.as_deref()
    }

    pub fn source_slice(&self, span: Span) -> Option<&str> {
        let text = self.source_text()?;
        let start = (span.start as usize).min(text.len());
        let end = (span.end as usize).min(text.len()).max(start);
        text.get(start..end)
    }

    /// Build a fatal traversal diagnostic. Textual units get the offending
    /// snippet plus line/column; AST units get the message alone.
    pub fn ast_error(&self, message: impl Into<String>, span: Span) -> Diagnostic {
        let d = Diagnostic::error(message.into());
        match self.source_text() {
            Some(text) => d.located(text, span),
            None => d,
        }
    }

    // --- Traversal state stack ---

    pub fn push_state(&mut self, label: impl Into<String>) {
        self.states.push(label.into());
    }

    /// Pop `label` off the state stack. Popping anything but the current
    /// top is fatal and leaves the stack unchanged.
    pub fn pop_state(&mut self, label: &str) -> Result<(), Diagnostic> {
        match self.states.last() {
            Some(top) if top == label => {
                self.states.pop();
                Ok(())
            }
            top => Err(Diagnostic::error(format!(
                "cannot pop traversal state '{}': current state is '{}'",
                label,
                top.map(String::as_str).unwrap_or("<empty>")
            ))),
        }
    }

    pub fn is_state(&self, label: &str) -> bool {
        self.states.last().map(String::as_str) == Some(label)
    }

    // --- Internal variable names ---

    /// Collision-free emitted identifier: the first issuance of a base name
    /// returns it unchanged, later issuances append the issue count.
    pub fn get_internal_variable_name(&mut self, name: &str) -> String {
        let count = self.internal_name_counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            name.to_string()
        } else {
            format!("{}{}", name, count)
        }
    }

    // --- Declarations and arguments ---

    pub fn declare(&mut self, name: impl Into<String>, record: DeclarationRecord) {
        self.declarations.insert(name.into(), record);
    }

    pub fn declaration(&self, name: &str) -> Option<&DeclarationRecord> {
        self.declarations.get(name)
    }

    pub fn is_argument(&self, name: &str) -> bool {
        self.argument_names.iter().any(|n| n == name)
    }

    /// The type of argument `name`. An empty local slot consults the
    /// parent's call bindings at the same positional index; the first
    /// non-null entry is memoized into the slot (the only permitted
    /// post-construction mutation of the argument types).
    pub fn argument_type(&mut self, name: &str) -> Option<Ty> {
        let index = self.argument_names.iter().position(|n| n == name)?;
        if let Some(ty) = self.argument_types[index] {
            return Some(ty);
        }
        for call in &self.parent_call_bindings {
            if let Some(Some(ty)) = call.get(index) {
                self.argument_types[index] = Some(*ty);
                return Some(*ty);
            }
        }
        None
    }

    pub fn argument_types(&self) -> &[Option<Ty>] {
        &self.argument_types
    }

    pub(crate) fn record_call_arguments(&mut self, callee: &str, types: Vec<Option<Ty>>) {
        self.called_function_arguments
            .entry(callee.to_string())
            .or_default()
            .push(types);
    }

    pub(crate) fn lookup_return_type(&self, name: &str) -> Option<Ty> {
        self.lookup_return_type.as_ref().and_then(|f| f(name))
    }

    pub fn has_nested_function_hook(&self) -> bool {
        self.on_nested_function.is_some()
    }

    pub(crate) fn fire_nested_function(&mut self, source: &str, return_type: Ty) {
        if let Some(mut hook) = self.on_nested_function.take() {
            hook(source, return_type);
            self.on_nested_function = Some(hook);
        }
    }

    // --- Serialization ---

    /// Deterministic payload: the parsed AST plus the restricted settings
    /// object. Round-tripping the settings through construction reproduces
    /// an equivalent unit.
    pub fn to_payload(&mut self) -> Result<KernelPayload, Vec<Diagnostic>> {
        let ast = self.ast()?.clone();
        Ok(KernelPayload {
            ast,
            settings: SerializedSettings {
                source: match &self.source {
                    KernelSource::Text(text) => Some(text.clone()),
                    KernelSource::Ast(_) => None,
                },
                name: self.name.clone(),
                constants: self.constants.clone(),
                constant_types: self.constant_types.clone(),
                is_root_kernel: self.is_root_kernel,
                is_sub_kernel: self.is_sub_kernel,
                debug: self.debug,
                output: self.output.clone(),
                loop_max_iterations: self.loop_max_iterations,
                argument_names: self.argument_names.clone(),
                argument_types: self.argument_types.clone(),
                argument_sizes: self.argument_sizes.clone(),
                return_type: self.return_type,
            },
        })
    }
}

fn looks_like_function(text: &str) -> bool {
    text.trim_start().starts_with("function")
}

fn extract_function_name(text: &str) -> Option<String> {
    let rest = text.trim_start().strip_prefix("function")?;
    let head: String = rest.chars().take_while(|&c| c != '(').collect();
    let name = head.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return None;
    }
    Some(name.to_string())
}

fn extract_argument_names(text: &str) -> Vec<String> {
    let open = match text.find('(') {
        Some(i) => i,
        None => return Vec::new(),
    };
    let close = match text[open..].find(')') {
        Some(i) => open + i,
        None => return Vec::new(),
    };
    text[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn ast_function_name(ast: &Spanned<Node>) -> Option<String> {
    match &ast.node {
        Node::FunctionDeclaration { name, .. } | Node::FunctionExpression { name, .. } => {
            name.as_ref().map(|n| n.node.clone())
        }
        _ => None,
    }
}

fn ast_argument_names(ast: &Spanned<Node>) -> Vec<String> {
    match &ast.node {
        Node::FunctionDeclaration { params, .. } | Node::FunctionExpression { params, .. } => {
            params.iter().map(|p| p.node.clone()).collect()
        }
        _ => Vec::new(),
    }
}

/// Pull the function expression out of the synthetic
/// `const parser_<name> = <fn>;` binding.
fn extract_parsed_function(statements: Vec<Spanned<Node>>) -> Option<Spanned<Node>> {
    let first = statements.into_iter().next()?;
    if let Node::VariableDeclaration { declarations, .. } = first.node {
        let declarator = declarations.into_iter().next()?;
        if let Node::VariableDeclarator { init, .. } = declarator.node {
            let init = *init?;
            if matches!(
                init.node,
                Node::FunctionExpression { .. } | Node::FunctionDeclaration { .. }
            ) {
                return Some(init);
            }
        }
    }
    None
}

/// Serialization payload: parsed AST + the restricted settings object.
#[derive(Clone, Debug)]
pub struct KernelPayload {
    pub ast: Spanned<Node>,
    pub settings: SerializedSettings,
}

#[derive(Clone, Debug)]
pub struct SerializedSettings {
    pub source: Option<String>,
    pub name: String,
    pub constants: HashMap<String, ConstantValue>,
    pub constant_types: HashMap<String, Ty>,
    pub is_root_kernel: bool,
    pub is_sub_kernel: bool,
    pub debug: bool,
    pub output: Vec<usize>,
    pub loop_max_iterations: Option<u32>,
    pub argument_names: Vec<String>,
    pub argument_types: Vec<Option<Ty>>,
    pub argument_sizes: Vec<Option<Vec<usize>>>,
    pub return_type: Option<Ty>,
}

impl KernelPayload {
    /// Rebuild a unit from the payload settings.
    pub fn restore(&self) -> Result<KernelFunction, Diagnostic> {
        let s = &self.settings;
        let settings = KernelSettings {
            name: Some(s.name.clone()),
            is_root_kernel: s.is_root_kernel,
            is_sub_kernel: s.is_sub_kernel,
            debug: s.debug,
            constants: s.constants.clone(),
            constant_types: s.constant_types.clone(),
            argument_names: Some(s.argument_names.clone()),
            argument_types: Vec::new(),
            argument_sizes: s.argument_sizes.clone(),
            output: s.output.clone(),
            loop_max_iterations: s.loop_max_iterations,
            return_type: s.return_type,
        };
        let source: KernelSource = match &s.source {
            Some(text) => KernelSource::Text(text.clone()),
            None => KernelSource::Ast(self.ast.clone()),
        };
        let mut unit = KernelFunction::new(source, settings)?;
        // Preserve partially-resolved argument types as-is.
        unit.argument_types = s.argument_types.clone();
        Ok(unit)
    }

    /// Serialize to JSON (hand-rolled, no serde dependency).
    pub fn to_json(&self) -> String {
        let s = &self.settings;
        let mut out = String::from("{\n  \"settings\": {\n");

        match &s.source {
            Some(text) => {
                out.push_str(&format!("    \"source\": {},\n", json_string(text)));
            }
            None => out.push_str("    \"source\": null,\n"),
        }
        out.push_str(&format!("    \"name\": {},\n", json_string(&s.name)));

        let mut constant_names: Vec<&String> = s.constants.keys().collect();
        constant_names.sort();
        out.push_str("    \"constants\": {");
        for (i, name) in constant_names.iter().enumerate() {
            let comma = if i + 1 < constant_names.len() { "," } else { "" };
            let value = match &s.constants[*name] {
                ConstantValue::Number(n) => json_number(*n),
                ConstantValue::Array(values) => {
                    let parts: Vec<String> = values.iter().map(|v| json_number(*v)).collect();
                    format!("[{}]", parts.join(","))
                }
            };
            out.push_str(&format!("{}: {}{}", json_string(name), value, comma));
        }
        out.push_str("},\n");

        let mut type_names: Vec<&String> = s.constant_types.keys().collect();
        type_names.sort();
        out.push_str("    \"constantTypes\": {");
        for (i, name) in type_names.iter().enumerate() {
            let comma = if i + 1 < type_names.len() { "," } else { "" };
            out.push_str(&format!(
                "{}: {}{}",
                json_string(name),
                json_string(s.constant_types[*name].display()),
                comma
            ));
        }
        out.push_str("},\n");

        out.push_str(&format!("    \"isRootKernel\": {},\n", s.is_root_kernel));
        out.push_str(&format!("    \"isSubKernel\": {},\n", s.is_sub_kernel));
        out.push_str(&format!("    \"debug\": {},\n", s.debug));

        let shape: Vec<String> = s.output.iter().map(|d| d.to_string()).collect();
        out.push_str(&format!("    \"output\": [{}],\n", shape.join(",")));

        match s.loop_max_iterations {
            Some(n) => out.push_str(&format!("    \"loopMaxIterations\": {},\n", n)),
            None => out.push_str("    \"loopMaxIterations\": null,\n"),
        }

        let names: Vec<String> = s.argument_names.iter().map(|n| json_string(n)).collect();
        out.push_str(&format!("    \"argumentNames\": [{}],\n", names.join(",")));

        let types: Vec<String> = s
            .argument_types
            .iter()
            .map(|t| match t {
                Some(ty) => json_string(ty.display()),
                None => "null".to_string(),
            })
            .collect();
        out.push_str(&format!("    \"argumentTypes\": [{}],\n", types.join(",")));

        let sizes: Vec<String> = s
            .argument_sizes
            .iter()
            .map(|size| match size {
                Some(dims) => {
                    let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                    format!("[{}]", parts.join(","))
                }
                None => "null".to_string(),
            })
            .collect();
        out.push_str(&format!("    \"argumentSizes\": [{}],\n", sizes.join(",")));

        match s.return_type {
            Some(ty) => out.push_str(&format!(
                "    \"returnType\": {}\n",
                json_string(ty.display())
            )),
            None => out.push_str("    \"returnType\": null\n"),
        }

        out.push_str("  },\n");
        out.push_str(&format!("  \"ast\": {}\n", ast_json(&self.ast)));
        out.push_str("}\n");
        out
    }
}

/// JSON-escape a string and wrap in quotes.
fn json_string(s: &str) -> String {
    let mut out = String::from('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn json_number(n: f64) -> String {
    if n.is_finite() {
        format!("{}", n)
    } else {
        "null".to_string()
    }
}

/// Compact one-line JSON rendering of an AST subtree.
fn ast_json(node: &Spanned<Node>) -> String {
    use crate::ast::{Literal, MemberProperty};

    fn opt(node: &Option<Box<Spanned<Node>>>) -> String {
        match node {
            Some(n) => ast_json(n),
            None => "null".to_string(),
        }
    }

    fn list(nodes: &[Spanned<Node>]) -> String {
        let parts: Vec<String> = nodes.iter().map(ast_json).collect();
        format!("[{}]", parts.join(","))
    }

    let kind = node.node.kind_name();
    match &node.node {
        Node::FunctionDeclaration { name, params, body }
        | Node::FunctionExpression { name, params, body } => {
            let name = match name {
                Some(n) => json_string(&n.node),
                None => "null".to_string(),
            };
            let params: Vec<String> = params.iter().map(|p| json_string(&p.node)).collect();
            format!(
                "{{\"type\":{},\"name\":{},\"params\":[{}],\"body\":{}}}",
                json_string(kind),
                name,
                params.join(","),
                ast_json(body)
            )
        }
        Node::Return(argument) => {
            format!("{{\"type\":{},\"argument\":{}}}", json_string(kind), opt(argument))
        }
        Node::Literal(Literal::Number { value, .. }) => {
            format!("{{\"type\":{},\"value\":{}}}", json_string(kind), json_number(*value))
        }
        Node::Literal(Literal::Boolean(value)) => {
            format!("{{\"type\":{},\"value\":{}}}", json_string(kind), value)
        }
        Node::Binary { op, left, right } => format!(
            "{{\"type\":{},\"operator\":{},\"left\":{},\"right\":{}}}",
            json_string(kind),
            json_string(op.as_str()),
            ast_json(left),
            ast_json(right)
        ),
        Node::Logical { op, left, right } => format!(
            "{{\"type\":{},\"operator\":{},\"left\":{},\"right\":{}}}",
            json_string(kind),
            json_string(op.as_str()),
            ast_json(left),
            ast_json(right)
        ),
        Node::Unary { op, prefix, argument } => format!(
            "{{\"type\":{},\"operator\":{},\"prefix\":{},\"argument\":{}}}",
            json_string(kind),
            json_string(op.as_str()),
            prefix,
            ast_json(argument)
        ),
        Node::Update { op, prefix, argument } => format!(
            "{{\"type\":{},\"operator\":{},\"prefix\":{},\"argument\":{}}}",
            json_string(kind),
            json_string(op.as_str()),
            prefix,
            ast_json(argument)
        ),
        Node::Identifier(name) => {
            format!("{{\"type\":{},\"name\":{}}}", json_string(kind), json_string(name))
        }
        Node::Assignment { op, target, value } => format!(
            "{{\"type\":{},\"operator\":{},\"left\":{},\"right\":{}}}",
            json_string(kind),
            json_string(op.as_str()),
            ast_json(target),
            ast_json(value)
        ),
        Node::ExpressionStatement(expr) => {
            format!("{{\"type\":{},\"expression\":{}}}", json_string(kind), ast_json(expr))
        }
        Node::Empty | Node::Break | Node::Continue | Node::This | Node::Debugger => {
            format!("{{\"type\":{}}}", json_string(kind))
        }
        Node::Block(statements) => {
            format!("{{\"type\":{},\"body\":{}}}", json_string(kind), list(statements))
        }
        Node::If {
            test,
            consequent,
            alternate,
        } => format!(
            "{{\"type\":{},\"test\":{},\"consequent\":{},\"alternate\":{}}}",
            json_string(kind),
            ast_json(test),
            ast_json(consequent),
            opt(alternate)
        ),
        Node::For {
            init,
            test,
            update,
            body,
        } => format!(
            "{{\"type\":{},\"init\":{},\"test\":{},\"update\":{},\"body\":{}}}",
            json_string(kind),
            opt(init),
            opt(test),
            opt(update),
            ast_json(body)
        ),
        Node::While { test, body } => format!(
            "{{\"type\":{},\"test\":{},\"body\":{}}}",
            json_string(kind),
            ast_json(test),
            ast_json(body)
        ),
        Node::DoWhile { body, test } => format!(
            "{{\"type\":{},\"body\":{},\"test\":{}}}",
            json_string(kind),
            ast_json(body),
            ast_json(test)
        ),
        Node::VariableDeclaration { kind: var_kind, declarations } => format!(
            "{{\"type\":{},\"kind\":{},\"declarations\":{}}}",
            json_string(kind),
            json_string(var_kind.as_str()),
            list(declarations)
        ),
        Node::VariableDeclarator { id, init } => format!(
            "{{\"type\":{},\"id\":{},\"init\":{}}}",
            json_string(kind),
            ast_json(id),
            opt(init)
        ),
        Node::Sequence(expressions) => {
            format!("{{\"type\":{},\"expressions\":{}}}", json_string(kind), list(expressions))
        }
        Node::Member { object, property } => {
            let (computed, prop) = match property {
                MemberProperty::Computed(index) => (true, ast_json(index)),
                MemberProperty::Named(name) => (
                    false,
                    format!("{{\"type\":\"Identifier\",\"name\":{}}}", json_string(&name.node)),
                ),
            };
            format!(
                "{{\"type\":{},\"computed\":{},\"object\":{},\"property\":{}}}",
                json_string(kind),
                computed,
                ast_json(object),
                prop
            )
        }
        Node::Call { callee, arguments } => format!(
            "{{\"type\":{},\"callee\":{},\"arguments\":{}}}",
            json_string(kind),
            ast_json(callee),
            list(arguments)
        ),
        Node::Array(elements) => {
            format!("{{\"type\":{},\"elements\":{}}}", json_string(kind), list(elements))
        }
        Node::Conditional {
            test,
            consequent,
            alternate,
        } => format!(
            "{{\"type\":{},\"test\":{},\"consequent\":{},\"alternate\":{}}}",
            json_string(kind),
            ast_json(test),
            ast_json(consequent),
            ast_json(alternate)
        ),
    }
}
